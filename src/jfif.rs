//! Segment-level JPEG (JFIF) container.
//!
//! A parsed container re-serializes byte-for-byte, apart from fill bytes in
//! front of markers, which are dropped. Bytes after EOI (MPF images, gain
//! maps) are kept as a trailing segment. The embedded
//! payload is stored in APP10 segments tagged with
//! [`PAYLOAD_SEGMENT_SIGNATURE`] and a sequence number, so payloads larger
//! than one segment survive reordering.

use crate::constants::{
    PAYLOAD_SEGMENT_HEADER_SIZE, PAYLOAD_SEGMENT_MAX_DATA_SIZE, PAYLOAD_SEGMENT_SIGNATURE,
};
use crate::error::{DrmError, Result};
use crate::jpeg_marker_code::{JpegMarkerCode, is_application_marker};
use crate::jpeg_stream_reader::JpegStreamReader;
use crate::jpeg_stream_writer::JpegStreamWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JfifSegment {
    /// Marker without a length field (SOI, EOI, RSTn, TEM).
    Standalone(u8),
    /// Length-prefixed segment; `data` excludes the length field.
    Marker { marker: u8, data: Vec<u8> },
    /// Entropy-coded bytes following a SOS segment, still byte-stuffed.
    EntropyCoded(Vec<u8>),
    /// Bytes following EOI, kept verbatim.
    Trailing(Vec<u8>),
}

impl JfifSegment {
    pub fn marker(&self) -> Option<u8> {
        match self {
            JfifSegment::Standalone(marker) | JfifSegment::Marker { marker, .. } => Some(*marker),
            JfifSegment::EntropyCoded(_) | JfifSegment::Trailing(_) => None,
        }
    }

    /// Size of the segment once serialized.
    pub fn encoded_len(&self) -> usize {
        match self {
            JfifSegment::Standalone(_) => 2,
            JfifSegment::Marker { data, .. } => 4 + data.len(),
            JfifSegment::EntropyCoded(data) | JfifSegment::Trailing(data) => data.len(),
        }
    }

    fn is_application(&self) -> bool {
        matches!(self, JfifSegment::Marker { marker, .. } if is_application_marker(*marker))
    }

    /// Sequence number and data if this is one of our payload segments.
    fn payload_part(&self) -> Option<(u16, &[u8])> {
        match self {
            JfifSegment::Marker { marker, data }
                if *marker == JpegMarkerCode::ApplicationData10 as u8
                    && data.len() >= PAYLOAD_SEGMENT_HEADER_SIZE
                    && data.starts_with(PAYLOAD_SEGMENT_SIGNATURE) =>
            {
                let sig = PAYLOAD_SEGMENT_SIGNATURE.len();
                let order = u16::from_be_bytes([data[sig], data[sig + 1]]);
                Some((order, &data[PAYLOAD_SEGMENT_HEADER_SIZE..]))
            }
            _ => None,
        }
    }

    fn payload_segment(order: u16, chunk: &[u8]) -> Self {
        let mut data = Vec::with_capacity(PAYLOAD_SEGMENT_HEADER_SIZE + chunk.len());
        data.extend_from_slice(PAYLOAD_SEGMENT_SIGNATURE);
        data.extend_from_slice(&order.to_be_bytes());
        data.extend_from_slice(chunk);
        JfifSegment::Marker {
            marker: JpegMarkerCode::ApplicationData10 as u8,
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JfifContainer {
    segments: Vec<JfifSegment>,
}

impl JfifContainer {
    pub fn new(segments: Vec<JfifSegment>) -> Self {
        Self { segments }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = JpegStreamReader::new(bytes);
        let segments = reader.read_segments()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[JfifSegment] {
        &self.segments
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let capacity = self.segments.iter().map(JfifSegment::encoded_len).sum();
        let mut writer = JpegStreamWriter::with_capacity(capacity);
        for segment in &self.segments {
            writer.write_jfif_segment(segment)?;
        }
        Ok(writer.into_inner())
    }

    pub fn has_payload(&self) -> bool {
        self.segments.iter().any(|s| s.payload_part().is_some())
    }

    /// Reassembles the embedded payload in sequence order.
    pub fn payload(&self) -> Option<Vec<u8>> {
        let mut parts: Vec<(u16, &[u8])> = self
            .segments
            .iter()
            .filter_map(JfifSegment::payload_part)
            .collect();
        if parts.is_empty() {
            return None;
        }
        parts.sort_by_key(|(order, _)| *order);

        let mut payload = Vec::with_capacity(parts.iter().map(|(_, d)| d.len()).sum());
        for (_, data) in parts {
            payload.extend_from_slice(data);
        }
        Some(payload)
    }

    /// Bytes that followed EOI in the parsed file, if any.
    pub fn trailing(&self) -> Option<&[u8]> {
        self.segments.iter().find_map(|s| match s {
            JfifSegment::Trailing(data) => Some(data.as_slice()),
            _ => None,
        })
    }

    /// Replaces the bytes after EOI; an empty slice removes them.
    pub fn set_trailing(&mut self, data: &[u8]) {
        self.segments.retain(|s| !matches!(s, JfifSegment::Trailing(_)));
        if !data.is_empty() {
            self.segments.push(JfifSegment::Trailing(data.to_vec()));
        }
    }

    /// Returns the number of payload segments removed.
    pub fn remove_payload(&mut self) -> usize {
        let before = self.segments.len();
        self.segments.retain(|s| s.payload_part().is_none());
        before - self.segments.len()
    }

    /// Replaces any existing payload. New segments go after the last APPn
    /// segment, or right after SOI when the file has none.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<()> {
        let chunk_count = payload.len().div_ceil(PAYLOAD_SEGMENT_MAX_DATA_SIZE).max(1);
        if chunk_count > u16::MAX as usize + 1 {
            return Err(DrmError::PayloadTooLarge);
        }

        self.remove_payload();
        let insert_at = self
            .segments
            .iter()
            .rposition(JfifSegment::is_application)
            .map(|i| i + 1)
            .unwrap_or(1)
            .min(self.segments.len());

        let new_segments: Vec<JfifSegment> = if payload.is_empty() {
            vec![JfifSegment::payload_segment(0, &[])]
        } else {
            payload
                .chunks(PAYLOAD_SEGMENT_MAX_DATA_SIZE)
                .enumerate()
                .map(|(order, chunk)| JfifSegment::payload_segment(order as u16, chunk))
                .collect()
        };

        self.segments.splice(insert_at..insert_at, new_segments);
        Ok(())
    }
}

impl TryFrom<&[u8]> for JfifContainer {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::parse(value)
    }
}
