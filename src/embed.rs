//! Sealing the covered section inside the output container and getting it back.
//!
//! Block layout before encryption: encoded section image, then its position
//! (8 bytes) and its dimension (8 bytes), all integers big-endian.

use image::{DynamicImage, GenericImageView, imageops};
use tracing::{debug, warn};

use crate::codec::{self, ImageKind};
use crate::encryption::{self, EncryptionKey};
use crate::error::{DrmError, Result};
use crate::jfif::JfifContainer;
use crate::riff::RiffContainer;
use crate::section::Section;
use crate::{Dimension, Point};

const TRAILER_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSection {
    pub position: Point,
    pub dimension: Dimension,
    /// Section pixels, encoded in the carrier's format.
    pub image: Vec<u8>,
}

impl EmbeddedSection {
    pub fn new(position: Point, dimension: Dimension, image: Vec<u8>) -> Self {
        Self {
            position,
            dimension,
            image,
        }
    }

    pub fn section(&self) -> Section {
        Section::from_parts(self.position, self.dimension)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.image.len() + TRAILER_SIZE);
        bytes.extend_from_slice(&self.image);
        bytes.extend_from_slice(&<[u8; 8]>::from(self.position));
        bytes.extend_from_slice(&<[u8; 8]>::from(self.dimension));
        bytes
    }
}

impl TryFrom<&[u8]> for EmbeddedSection {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        if value.len() < TRAILER_SIZE {
            return Err(DrmError::CorruptedEmbeddedBlock);
        }
        let split = value.len() - TRAILER_SIZE;
        let position = Point::try_from(&value[split..split + 8])?;
        let dimension = Dimension::try_from(&value[split + 8..])?;
        Ok(Self::new(position, dimension, value[..split].to_vec()))
    }
}

/// Encrypts `section` and stores it in the carrier, replacing any earlier block.
pub fn embed(
    carrier: &[u8],
    kind: ImageKind,
    section: &EmbeddedSection,
    key: &EncryptionKey,
) -> Result<Vec<u8>> {
    let sealed = encryption::encrypt(&section.to_bytes(), key)?;
    let output = match kind {
        ImageKind::Jpeg => {
            let mut container = JfifContainer::parse(carrier)?;
            container.set_payload(&sealed)?;
            container.to_bytes()?
        }
        ImageKind::WebP => {
            let mut container = RiffContainer::parse(carrier)?;
            container.set_payload(&sealed);
            container.to_bytes()?
        }
    };
    debug!(%kind, sealed_len = sealed.len(), "section embedded");
    Ok(output)
}

pub fn embed_jpeg(carrier: &[u8], section: &EmbeddedSection, key: &EncryptionKey) -> Result<Vec<u8>> {
    embed(carrier, ImageKind::Jpeg, section, key)
}

pub fn embed_webp(carrier: &[u8], section: &EmbeddedSection, key: &EncryptionKey) -> Result<Vec<u8>> {
    embed(carrier, ImageKind::WebP, section, key)
}

/// Whether the carrier holds an embedded block, without decrypting it.
pub fn has_embedded_section(carrier: &[u8], kind: ImageKind) -> Result<bool> {
    Ok(match kind {
        ImageKind::Jpeg => JfifContainer::parse(carrier)?.has_payload(),
        ImageKind::WebP => RiffContainer::parse(carrier)?.has_payload(),
    })
}

pub fn extract(carrier: &[u8], kind: ImageKind, key: &EncryptionKey) -> Result<EmbeddedSection> {
    let sealed = match kind {
        ImageKind::Jpeg => JfifContainer::parse(carrier)?.payload(),
        ImageKind::WebP => RiffContainer::parse(carrier)?
            .payload()
            .map(<[u8]>::to_vec),
    }
    .ok_or(DrmError::EmbeddedBlockNotFound)?;

    let plain = encryption::decrypt(&sealed, key)?;
    EmbeddedSection::try_from(plain.as_slice())
}

pub fn extract_jpeg(carrier: &[u8], key: &EncryptionKey) -> Result<EmbeddedSection> {
    extract(carrier, ImageKind::Jpeg, key)
}

pub fn extract_webp(carrier: &[u8], key: &EncryptionKey) -> Result<EmbeddedSection> {
    extract(carrier, ImageKind::WebP, key)
}

/// Pastes the embedded section back over the carrier and re-encodes it.
///
/// The result carries no embedded block. Bytes after a JPEG carrier's EOI
/// are copied to the result.
pub fn restore(carrier: &[u8], kind: ImageKind, key: &EncryptionKey) -> Result<Vec<u8>> {
    let section = extract(carrier, kind, key)?;
    let image = codec::decode(carrier, kind)?;
    let old = codec::decode(&section.image, kind)?;

    let (width, height) = image.dimensions();
    let fits = |start: u32, len: u32, limit: u32| start.checked_add(len).is_some_and(|end| end <= limit);
    if old.dimensions() != (section.dimension.width, section.dimension.height)
        || !fits(section.position.x, section.dimension.width, width)
        || !fits(section.position.y, section.dimension.height, height)
    {
        warn!(
            x = section.position.x,
            y = section.position.y,
            width = section.dimension.width,
            height = section.dimension.height,
            "embedded section does not match the carrier"
        );
        return Err(DrmError::CorruptedEmbeddedBlock);
    }

    let x = i64::from(section.position.x);
    let y = i64::from(section.position.y);
    let restored = if image.color().has_alpha() {
        let mut canvas = image.to_rgba8();
        imageops::replace(&mut canvas, &old.to_rgba8(), x, y);
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas = image.to_rgb8();
        imageops::replace(&mut canvas, &old.to_rgb8(), x, y);
        DynamicImage::ImageRgb8(canvas)
    };

    debug!(%kind, x, y, "section restored");
    let encoded = codec::encode(&restored, kind)?;
    match kind {
        ImageKind::Jpeg => carry_trailing(carrier, encoded),
        ImageKind::WebP => Ok(encoded),
    }
}

fn carry_trailing(carrier: &[u8], encoded: Vec<u8>) -> Result<Vec<u8>> {
    let source = JfifContainer::parse(carrier)?;
    let Some(trailing) = source.trailing() else {
        return Ok(encoded);
    };
    let mut container = JfifContainer::parse(&encoded)?;
    container.set_trailing(trailing);
    container.to_bytes()
}

pub fn restore_jpeg(carrier: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    restore(carrier, ImageKind::Jpeg, key)
}

pub fn restore_webp(carrier: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    restore(carrier, ImageKind::WebP, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn key() -> EncryptionKey {
        EncryptionKey::new([0x5Au8; 32])
    }

    fn carrier(kind: ImageKind) -> Vec<u8> {
        let img = RgbImage::from_fn(12, 12, |x, y| Rgb([(x * 20) as u8, (y * 20) as u8, 99]));
        codec::encode(&DynamicImage::ImageRgb8(img), kind).unwrap()
    }

    fn patch(kind: ImageKind) -> EmbeddedSection {
        let img = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let bytes = codec::encode(&DynamicImage::ImageRgb8(img), kind).unwrap();
        EmbeddedSection::new(Point::new(4, 5), Dimension::new(3, 2), bytes)
    }

    #[test]
    fn block_layout() {
        let section = EmbeddedSection::new(Point::new(1, 2), Dimension::new(3, 4), vec![9, 9]);
        let bytes = section.to_bytes();
        assert_eq!(
            bytes,
            [9, 9, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4]
        );
        assert_eq!(EmbeddedSection::try_from(bytes.as_slice()), Ok(section));
        assert_eq!(
            EmbeddedSection::try_from(&bytes[..15]),
            Err(DrmError::CorruptedEmbeddedBlock)
        );
    }

    #[test]
    fn embeds_and_extracts_in_both_containers() {
        for kind in [ImageKind::Jpeg, ImageKind::WebP] {
            let section = patch(kind);
            let out = embed(&carrier(kind), kind, &section, &key()).unwrap();
            assert!(has_embedded_section(&out, kind).unwrap());
            assert!(codec::decode(&out, kind).is_ok());
            assert_eq!(extract(&out, kind, &key()), Ok(section));
        }
    }

    #[test]
    fn missing_block_is_reported() {
        assert_eq!(
            extract_jpeg(&carrier(ImageKind::Jpeg), &key()),
            Err(DrmError::EmbeddedBlockNotFound)
        );
        assert_eq!(
            extract_webp(&carrier(ImageKind::WebP), &key()),
            Err(DrmError::EmbeddedBlockNotFound)
        );
    }

    #[test]
    fn wrong_key_fails_restore() {
        let out = embed_webp(&carrier(ImageKind::WebP), &patch(ImageKind::WebP), &key()).unwrap();
        assert_eq!(
            restore_webp(&out, &EncryptionKey::new([0x11; 32])),
            Err(DrmError::CorruptedEmbeddedBlock)
        );
    }

    #[test]
    fn restore_pastes_section_back() {
        let out = embed_webp(&carrier(ImageKind::WebP), &patch(ImageKind::WebP), &key()).unwrap();
        let restored = restore_webp(&out, &key()).unwrap();
        assert!(!has_embedded_section(&restored, ImageKind::WebP).unwrap());

        let pixels = codec::decode(&restored, ImageKind::WebP).unwrap().to_rgb8();
        assert_eq!(pixels.get_pixel(4, 5), &Rgb([1, 2, 3]));
        assert_eq!(pixels.get_pixel(6, 6), &Rgb([1, 2, 3]));
        assert_eq!(pixels.get_pixel(7, 5), &Rgb([140, 100, 99]));
    }

    #[test]
    fn restore_keeps_jpeg_trailer() {
        let trailer = [0xFF, 0xD8, 0xFF, 0xE2, 0x00, 0x04, 0x4D, 0x50, 0xFF, 0xD9];
        let mut carrier = carrier(ImageKind::Jpeg);
        carrier.extend_from_slice(&trailer);

        let out = embed_jpeg(&carrier, &patch(ImageKind::Jpeg), &key()).unwrap();
        assert!(out.ends_with(&trailer));
        let restored = restore_jpeg(&out, &key()).unwrap();
        assert!(restored.ends_with(&trailer));
        assert!(!has_embedded_section(&restored, ImageKind::Jpeg).unwrap());
    }

    #[test]
    fn section_outside_carrier_is_corrupt() {
        let mut section = patch(ImageKind::WebP);
        section.position = Point::new(11, 0);
        let out = embed_webp(&carrier(ImageKind::WebP), &section, &key()).unwrap();
        assert_eq!(
            restore_webp(&out, &key()),
            Err(DrmError::CorruptedEmbeddedBlock)
        );
    }
}
