//! Stateful watermark builder.
//!
//! A task collects a target, a watermark, a placement and a key. `process`
//! composites the watermark and keeps the covered pixels; `render` encodes
//! the composite with the covered pixels sealed inside it.

use image::{DynamicImage, GenericImageView, imageops};
use num_enum::{FromPrimitive, IntoPrimitive};
use tracing::debug;

use crate::codec::{self, ImageKind};
use crate::constants::DEFAULT_JPEG_QUALITY;
use crate::embed::{self, EmbeddedSection};
use crate::encryption::EncryptionKey;
use crate::error::{DrmError, Result};
use crate::{Dimension, Point};

/// Horizontal anchor. Any nonzero byte selects `Right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OriginX {
    Left = 0,
    #[num_enum(default)]
    Right = 1,
}

/// Vertical anchor. Any nonzero byte selects `Bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OriginY {
    Top = 0,
    #[num_enum(default)]
    Bottom = 1,
}

/// Offset of the watermark from the edges selected by the origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            origin_x: OriginX::Left,
            origin_y: OriginY::Top,
        }
    }
}

impl Placement {
    pub fn new(x: u32, y: u32, origin_x: OriginX, origin_y: OriginY) -> Self {
        Self {
            x,
            y,
            origin_x,
            origin_y,
        }
    }

    /// Top-left corner of the watermark inside the target.
    ///
    /// Fails when any part of the watermark would fall outside the target.
    pub fn absolute_position(&self, target: Dimension, watermark: Dimension) -> Result<Point> {
        let x = resolve_axis(
            self.x,
            self.origin_x == OriginX::Left,
            target.width,
            watermark.width,
        )?;
        let y = resolve_axis(
            self.y,
            self.origin_y == OriginY::Top,
            target.height,
            watermark.height,
        )?;
        Ok(Point::new(x, y))
    }
}

fn resolve_axis(offset: u32, from_start: bool, target: u32, watermark: u32) -> Result<u32> {
    let free = target
        .checked_sub(watermark)
        .ok_or(DrmError::WatermarkOutOfBounds)?;
    if offset > free {
        return Err(DrmError::WatermarkOutOfBounds);
    }
    Ok(if from_start { offset } else { free - offset })
}

fn dimension_of(image: &DynamicImage) -> Dimension {
    let (width, height) = image.dimensions();
    Dimension::new(width, height)
}

#[derive(Debug)]
struct Processed {
    output: DynamicImage,
    old_section: DynamicImage,
    position: Point,
}

#[derive(Debug)]
pub struct WatermarkTask {
    target: Option<DynamicImage>,
    watermark: Option<DynamicImage>,
    placement: Placement,
    key: Option<EncryptionKey>,
    jpeg_quality: u8,
    processed: Option<Processed>,
}

impl Default for WatermarkTask {
    fn default() -> Self {
        Self::new()
    }
}

impl WatermarkTask {
    pub fn new() -> Self {
        Self {
            target: None,
            watermark: None,
            placement: Placement::default(),
            key: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            processed: None,
        }
    }

    pub fn set_position(&mut self, x: u32, y: u32, origin_x: OriginX, origin_y: OriginY) {
        self.set_placement(Placement::new(x, y, origin_x, origin_y));
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
        self.processed = None;
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn set_target(&mut self, target: DynamicImage) {
        self.target = Some(target);
        self.processed = None;
    }

    pub fn set_watermark(&mut self, watermark: DynamicImage) {
        self.watermark = Some(watermark);
        self.processed = None;
    }

    /// Decodes and stores the target. On failure the previous target is kept,
    /// but processed output is dropped either way.
    pub fn load_target(&mut self, bytes: &[u8], kind: ImageKind) -> Result<()> {
        self.processed = None;
        let image = codec::decode(bytes, kind)?;
        self.set_target(image);
        Ok(())
    }

    /// Decodes and stores the watermark. On failure the previous watermark is kept,
    /// but processed output is dropped either way.
    pub fn load_watermark(&mut self, bytes: &[u8], kind: ImageKind) -> Result<()> {
        self.processed = None;
        let image = codec::decode(bytes, kind)?;
        self.set_watermark(image);
        Ok(())
    }

    pub fn set_key(&mut self, key: EncryptionKey) {
        self.key = Some(key);
        self.processed = None;
    }

    /// Drops the processed output. Setters whose argument is rejected before
    /// it reaches the task still call this.
    pub fn invalidate(&mut self) {
        self.processed = None;
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn set_jpeg_quality(&mut self, quality: u8) {
        self.jpeg_quality = quality.clamp(1, 100);
    }

    pub fn target(&self) -> Option<&DynamicImage> {
        self.target.as_ref()
    }

    pub fn watermark(&self) -> Option<&DynamicImage> {
        self.watermark.as_ref()
    }

    pub fn watermark_dimension(&self) -> Option<Dimension> {
        self.watermark.as_ref().map(dimension_of)
    }

    pub fn absolute_watermark_position(&self) -> Result<Point> {
        let target = self.target.as_ref().ok_or(DrmError::TargetNotSet)?;
        let watermark = self.watermark.as_ref().ok_or(DrmError::WatermarkNotSet)?;
        self.placement
            .absolute_position(dimension_of(target), dimension_of(watermark))
    }

    /// Composites the watermark over the target, alpha-blended, and saves
    /// the pixels it covers.
    pub fn process(&mut self) -> Result<()> {
        let target = self.target.as_ref().ok_or(DrmError::TargetNotSet)?;
        let watermark = self.watermark.as_ref().ok_or(DrmError::WatermarkNotSet)?;
        let size = dimension_of(watermark);
        let position = self
            .placement
            .absolute_position(dimension_of(target), size)?;

        let mut canvas = target.to_rgba8();
        let covered =
            imageops::crop_imm(&canvas, position.x, position.y, size.width, size.height).to_image();
        imageops::overlay(
            &mut canvas,
            &watermark.to_rgba8(),
            i64::from(position.x),
            i64::from(position.y),
        );

        let keep_alpha = target.color().has_alpha();
        let (output, old_section) = if keep_alpha {
            (
                DynamicImage::ImageRgba8(canvas),
                DynamicImage::ImageRgba8(covered),
            )
        } else {
            (
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
                DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(covered).to_rgb8()),
            )
        };

        debug!(
            x = position.x,
            y = position.y,
            width = size.width,
            height = size.height,
            "watermark composited"
        );
        self.processed = Some(Processed {
            output,
            old_section,
            position,
        });
        Ok(())
    }

    pub fn is_processed(&self) -> bool {
        self.processed.is_some()
    }

    pub fn output(&self) -> Option<&DynamicImage> {
        self.processed.as_ref().map(|p| &p.output)
    }

    pub fn old_section(&self) -> Option<&DynamicImage> {
        self.processed.as_ref().map(|p| &p.old_section)
    }

    /// Encodes the covered pixels alone.
    pub fn render_old_section(&self, kind: ImageKind) -> Result<Vec<u8>> {
        let processed = self.processed.as_ref().ok_or(DrmError::NotProcessed)?;
        codec::encode_with_quality(&processed.old_section, kind, self.jpeg_quality)
    }

    /// Encodes the composite with the encrypted covered pixels embedded.
    pub fn render(&self, kind: ImageKind) -> Result<Vec<u8>> {
        let processed = self.processed.as_ref().ok_or(DrmError::NotProcessed)?;
        let key = self.key.as_ref().ok_or(DrmError::KeyNotSet)?;

        let carrier = codec::encode_with_quality(&processed.output, kind, self.jpeg_quality)?;
        let old_bytes =
            codec::encode_with_quality(&processed.old_section, kind, self.jpeg_quality)?;
        let section = EmbeddedSection::new(
            processed.position,
            dimension_of(&processed.old_section),
            old_bytes,
        );

        let output = embed::embed(&carrier, kind, &section, key)?;
        debug!(%kind, len = output.len(), "watermarked output rendered");
        Ok(output)
    }
}
