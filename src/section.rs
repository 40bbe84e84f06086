use image::GenericImageView;
use tracing::debug;

use crate::codec::{self, ImageKind};
use crate::error::{DrmError, Result};
use crate::{Dimension, Point};

/// Rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Section {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Section {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_parts(position: Point, dimension: Dimension) -> Self {
        Self::new(position.x, position.y, dimension.width, dimension.height)
    }

    /// Intersection with an image of the given size, or `None` when empty.
    pub fn clamp_to(&self, image_width: u32, image_height: u32) -> Option<Section> {
        if self.x >= image_width || self.y >= image_height {
            return None;
        }
        let width = self.width.min(image_width - self.x);
        let height = self.height.min(image_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Section::new(self.x, self.y, width, height))
    }
}

/// Crops `bytes` to `section` and re-encodes the crop in the same format.
///
/// Sections reaching past the image edge are clamped; a section with no
/// overlap fails with [`DrmError::SectionOutOfBounds`]. Returns the clamped
/// rectangle along with the encoded crop.
pub fn crop_section(bytes: &[u8], kind: ImageKind, section: Section) -> Result<(Section, Vec<u8>)> {
    let image = codec::decode(bytes, kind)?;
    let (width, height) = image.dimensions();
    let clamped = section
        .clamp_to(width, height)
        .ok_or(DrmError::SectionOutOfBounds)?;

    let cropped = image.crop_imm(clamped.x, clamped.y, clamped.width, clamped.height);
    let encoded = codec::encode(&cropped, kind)?;
    debug!(
        %kind,
        x = clamped.x,
        y = clamped.y,
        width = clamped.width,
        height = clamped.height,
        out_len = encoded.len(),
        "section extracted"
    );
    Ok((clamped, encoded))
}

pub fn get_section(bytes: &[u8], kind: ImageKind, section: Section) -> Result<Vec<u8>> {
    crop_section(bytes, kind, section).map(|(_, encoded)| encoded)
}

pub fn get_section_jpeg(bytes: &[u8], section: Section) -> Result<Vec<u8>> {
    get_section(bytes, ImageKind::Jpeg, section)
}

pub fn get_section_webp(bytes: &[u8], section: Section) -> Result<Vec<u8>> {
    get_section(bytes, ImageKind::WebP, section)
}
