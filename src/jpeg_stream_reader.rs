use crate::error::{DrmError, Result};
use crate::jfif::JfifSegment;
use crate::jpeg_marker_code::{
    JPEG_MARKER_START_BYTE, JpegMarkerCode, is_restart_marker, is_standalone_marker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegStreamReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

/// Splits a JPEG byte stream into marker segments and entropy-coded data
/// without decoding any of it.
pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
    state: JpegStreamReaderState,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            position: 0,
            state: JpegStreamReaderState::BeforeStartOfImage,
        }
    }

    pub fn state(&self) -> JpegStreamReaderState {
        self.state
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining_data(&self) -> &[u8] {
        &self.source[self.position..]
    }

    /// Reads every segment up to and including EOI.
    pub fn read_segments(&mut self) -> Result<Vec<JfifSegment>> {
        let mut segments = Vec::new();
        self.read_start_of_image()?;
        segments.push(JfifSegment::Standalone(JpegMarkerCode::StartOfImage as u8));

        loop {
            if self.state == JpegStreamReaderState::ScanSection {
                let data = self.read_entropy_coded_data()?;
                segments.push(JfifSegment::EntropyCoded(data));
                self.state = JpegStreamReaderState::HeaderSection;
            }

            let marker = self.read_marker()?;
            if marker == JpegMarkerCode::StartOfImage as u8 {
                return Err(DrmError::StartOfImageMarkerNotFound);
            }
            if marker == JpegMarkerCode::EndOfImage as u8 {
                segments.push(JfifSegment::Standalone(marker));
                self.state = JpegStreamReaderState::EndOfImage;
                let trailing = self.remaining_data();
                if !trailing.is_empty() {
                    segments.push(JfifSegment::Trailing(trailing.to_vec()));
                    self.position = self.source.len();
                }
                break;
            }
            if is_standalone_marker(marker) {
                segments.push(JfifSegment::Standalone(marker));
                continue;
            }

            let data = self.read_segment_data()?;
            segments.push(JfifSegment::Marker { marker, data });
            if marker == JpegMarkerCode::StartOfScan as u8 {
                self.state = JpegStreamReaderState::ScanSection;
            }
        }

        Ok(segments)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.position >= self.source.len() {
            return Err(DrmError::UnexpectedEndOfData);
        }
        let val = self.source[self.position];
        self.position += 1;
        Ok(val)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }

    /// Reads a marker, skipping any fill bytes (`FF FF ...`) in front of it.
    pub fn read_marker(&mut self) -> Result<u8> {
        if self.read_u8()? != JPEG_MARKER_START_BYTE {
            return Err(DrmError::JpegMarkerStartByteNotFound);
        }
        let mut marker = self.read_u8()?;
        while marker == JPEG_MARKER_START_BYTE {
            marker = self.read_u8()?;
        }
        if marker == 0x00 {
            return Err(DrmError::JpegMarkerStartByteNotFound);
        }
        Ok(marker)
    }

    fn read_start_of_image(&mut self) -> Result<()> {
        if self.source.len() < 2
            || self.source[0] != JPEG_MARKER_START_BYTE
            || self.source[1] != JpegMarkerCode::StartOfImage as u8
        {
            return Err(DrmError::StartOfImageMarkerNotFound);
        }
        self.position = 2;
        self.state = JpegStreamReaderState::HeaderSection;
        Ok(())
    }

    /// Reads the length field and the payload of a marker segment.
    fn read_segment_data(&mut self) -> Result<Vec<u8>> {
        let length = self.read_u16()? as usize;
        if length < 2 {
            return Err(DrmError::InvalidMarkerSegmentSize);
        }
        let end = self.position + length - 2;
        if end > self.source.len() {
            return Err(DrmError::UnexpectedEndOfData);
        }
        let data = self.source[self.position..end].to_vec();
        self.position = end;
        Ok(data)
    }

    /// Consumes scan data up to the next marker that is neither a stuffed
    /// zero nor a restart marker.
    fn read_entropy_coded_data(&mut self) -> Result<Vec<u8>> {
        let start = self.position;
        let mut index = start;

        loop {
            if index >= self.source.len() {
                return Err(DrmError::UnexpectedEndOfData);
            }
            if self.source[index] != JPEG_MARKER_START_BYTE {
                index += 1;
                continue;
            }
            let next = *self
                .source
                .get(index + 1)
                .ok_or(DrmError::UnexpectedEndOfData)?;
            if next == 0x00 || is_restart_marker(next) {
                index += 2;
                continue;
            }
            break;
        }

        self.position = index;
        Ok(self.source[start..index].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_stream() -> Vec<u8> {
        vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46, // APP0
            0xFF, 0xDA, 0x00, 0x03, 0x01, // SOS
            0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56, // scan data with stuffing and RST0
            0xFF, 0xFF, 0xD9, // fill byte then EOI
        ]
    }

    #[test]
    fn splits_segments_and_scan_data() {
        let data = minimal_stream();
        let mut reader = JpegStreamReader::new(&data);
        let segments = reader.read_segments().unwrap();

        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0], JfifSegment::Standalone(0xD8));
        assert_eq!(
            segments[1],
            JfifSegment::Marker {
                marker: 0xE0,
                data: vec![0x4A, 0x46]
            }
        );
        assert_eq!(
            segments[2],
            JfifSegment::Marker {
                marker: 0xDA,
                data: vec![0x01]
            }
        );
        assert_eq!(
            segments[3],
            JfifSegment::EntropyCoded(vec![0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56])
        );
        assert_eq!(segments[4], JfifSegment::Standalone(0xD9));
        assert_eq!(reader.state(), JpegStreamReaderState::EndOfImage);
    }

    #[test]
    fn keeps_bytes_after_end_of_image() {
        let mut data = minimal_stream();
        data.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE2, 0x00, 0x02, 0xFF, 0xD9]);
        let mut reader = JpegStreamReader::new(&data);
        let segments = reader.read_segments().unwrap();

        assert_eq!(segments.len(), 6);
        assert_eq!(
            segments[5],
            JfifSegment::Trailing(vec![0xFF, 0xD8, 0xFF, 0xE2, 0x00, 0x02, 0xFF, 0xD9])
        );
        assert!(reader.remaining_data().is_empty());
    }

    #[test]
    fn rejects_missing_soi() {
        let data = [0xFF, 0xD9];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_segments(),
            Err(DrmError::StartOfImageMarkerNotFound)
        );
    }

    #[test]
    fn rejects_truncated_segment() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x01];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(reader.read_segments(), Err(DrmError::UnexpectedEndOfData));
    }

    #[test]
    fn rejects_bad_segment_length() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x01];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_segments(),
            Err(DrmError::InvalidMarkerSegmentSize)
        );
    }

    #[test]
    fn rejects_missing_end_of_image() {
        let data = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(reader.read_segments(), Err(DrmError::UnexpectedEndOfData));
    }

    #[test]
    fn rejects_garbage_between_segments() {
        let data = [0xFF, 0xD8, 0x00, 0xE0];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(
            reader.read_segments(),
            Err(DrmError::JpegMarkerStartByteNotFound)
        );
    }
}
