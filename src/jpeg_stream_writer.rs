//! JPEG codestream writer.
//!
//! `JpegStreamWriter` emits markers and length-prefixed segments into a
//! growable buffer. Entropy-coded data is copied verbatim; it is expected to
//! be already byte-stuffed.

use crate::constants::{SEGMENT_LENGTH_SIZE, SEGMENT_MAX_DATA_SIZE};
use crate::error::{DrmError, Result};
use crate::jfif::JfifSegment;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};

#[derive(Debug, Default)]
pub struct JpegStreamWriter {
    destination: Vec<u8>,
}

impl JpegStreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            destination: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destination.is_empty()
    }

    pub fn write_byte(&mut self, value: u8) {
        self.destination.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.destination.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.destination.extend_from_slice(bytes);
    }

    pub fn write_marker_byte(&mut self, marker: u8) {
        self.write_byte(JPEG_MARKER_START_BYTE);
        self.write_byte(marker);
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) {
        self.write_marker_byte(marker as u8);
    }

    pub fn write_start_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::StartOfImage)
    }

    pub fn write_end_of_image(&mut self) {
        self.write_marker(JpegMarkerCode::EndOfImage)
    }

    /// Writes marker, length field and payload.
    pub fn write_segment(&mut self, marker: u8, data: &[u8]) -> Result<()> {
        if data.len() > SEGMENT_MAX_DATA_SIZE {
            return Err(DrmError::InvalidMarkerSegmentSize);
        }
        self.write_marker_byte(marker);
        self.write_u16((data.len() + SEGMENT_LENGTH_SIZE) as u16);
        self.write_bytes(data);
        Ok(())
    }

    pub fn write_jfif_segment(&mut self, segment: &JfifSegment) -> Result<()> {
        match segment {
            JfifSegment::Standalone(marker) => {
                self.write_marker_byte(*marker);
                Ok(())
            }
            JfifSegment::Marker { marker, data } => self.write_segment(*marker, data),
            JfifSegment::EntropyCoded(data) | JfifSegment::Trailing(data) => {
                self.write_bytes(data);
                Ok(())
            }
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.destination
    }
}
