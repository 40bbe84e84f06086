//! JPEG/WebP section extraction and reversible watermarking.
//!
//! The watermark task composites a watermark onto a target image and hides
//! the covered pixels, encrypted, inside the output file (APP10 segments for
//! JPEG, a private RIFF chunk for WebP) so a key holder can restore the
//! original. Everything is reachable from C through [`ffi`] and from
//! JavaScript through [`wasm`].

pub mod codec;
pub mod constants;
pub mod embed;
pub mod encryption;
pub mod error;
#[cfg(not(target_arch = "wasm32"))]
pub mod ffi;
pub mod jfif;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod riff;
pub mod section;
pub mod settings;
pub mod wasm;
pub mod watermark_task;

pub use codec::ImageKind;
pub use embed::EmbeddedSection;
pub use encryption::EncryptionKey;
pub use error::{DrmError, Result};
pub use section::Section;
pub use watermark_task::{OriginX, OriginY, Placement, WatermarkTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [u8; 8] {
    fn from(value: Point) -> Self {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&value.x.to_be_bytes());
        bytes[4..8].copy_from_slice(&value.y.to_be_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for Point {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        let (x, y) = read_u32_pair(value)?;
        Ok(Self { x, y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<Dimension> for [u8; 8] {
    fn from(value: Dimension) -> Self {
        let mut bytes = [0u8; 8];
        bytes[0..4].copy_from_slice(&value.width.to_be_bytes());
        bytes[4..8].copy_from_slice(&value.height.to_be_bytes());
        bytes
    }
}

impl TryFrom<&[u8]> for Dimension {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        let (width, height) = read_u32_pair(value)?;
        Ok(Self { width, height })
    }
}

fn read_u32_pair(value: &[u8]) -> Result<(u32, u32)> {
    if value.len() != 8 {
        return Err(DrmError::CorruptedEmbeddedBlock);
    }
    let first = u32::from_be_bytes([value[0], value[1], value[2], value[3]]);
    let second = u32::from_be_bytes([value[4], value[5], value[6], value[7]]);
    Ok((first, second))
}

/// Get the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_bytes_are_big_endian() {
        let bytes: [u8; 8] = Point::new(0x0102, 0x0A0B0C0D).into();
        assert_eq!(bytes, [0x00, 0x00, 0x01, 0x02, 0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(Point::try_from(&bytes[..]), Ok(Point::new(0x0102, 0x0A0B0C0D)));
    }

    #[test]
    fn dimension_requires_eight_bytes() {
        assert_eq!(
            Dimension::try_from(&[0u8; 7][..]),
            Err(DrmError::CorruptedEmbeddedBlock)
        );
        let bytes: [u8; 8] = Dimension::new(640, 480).into();
        assert_eq!(Dimension::try_from(&bytes[..]), Ok(Dimension::new(640, 480)));
    }

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
