//! JPEG/WebP decoding and encoding on top of the `image` crate.

use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::warn;

use crate::constants::DEFAULT_JPEG_QUALITY;
use crate::error::{DrmError, Result};
use crate::riff::{RIFF_SIGNATURE, WEBP_FORM_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    WebP,
}

impl ImageKind {
    /// Detects the format by examining magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.len() >= 12 && bytes[0..4] == RIFF_SIGNATURE && bytes[8..12] == WEBP_FORM_TYPE
        {
            Some(ImageKind::WebP)
        } else {
            None
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::WebP => ImageFormat::WebP,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::WebP => "webp",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageKind::Jpeg => f.write_str("JPEG"),
            ImageKind::WebP => f.write_str("WebP"),
        }
    }
}

pub fn decode(bytes: &[u8], kind: ImageKind) -> Result<DynamicImage> {
    image::load_from_memory_with_format(bytes, kind.image_format()).map_err(|e| {
        warn!(%kind, len = bytes.len(), error = %e, "decode failed");
        DrmError::DecodeFailed
    })
}

pub fn encode(image: &DynamicImage, kind: ImageKind) -> Result<Vec<u8>> {
    encode_with_quality(image, kind, DEFAULT_JPEG_QUALITY)
}

/// `quality` only applies to JPEG; WebP output is always lossless.
pub fn encode_with_quality(image: &DynamicImage, kind: ImageKind, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let result = match kind {
        ImageKind::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            image.to_rgb8().write_with_encoder(encoder)
        }
        ImageKind::WebP => {
            let encoder = WebPEncoder::new_lossless(&mut buf);
            if image.color().has_alpha() {
                image.to_rgba8().write_with_encoder(encoder)
            } else {
                image.to_rgb8().write_with_encoder(encoder)
            }
        }
    };

    result.map_err(|e| {
        warn!(%kind, width = image.width(), height = image.height(), error = %e, "encode failed");
        DrmError::EncodeFailed
    })?;
    Ok(buf.into_inner())
}
