//! Chunk-level RIFF container for WebP files.

use crate::constants::PAYLOAD_CHUNK_ID;
use crate::error::{DrmError, Result};

pub const RIFF_SIGNATURE: [u8; 4] = *b"RIFF";
pub const WEBP_FORM_TYPE: [u8; 4] = *b"WEBP";

const RIFF_HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffChunk {
    pub id: [u8; 4],
    pub data: Vec<u8>,
}

impl RiffChunk {
    pub fn new(id: [u8; 4], data: Vec<u8>) -> Self {
        Self { id, data }
    }

    /// FourCC as text; non-ASCII ids are shown escaped.
    pub fn id_str(&self) -> String {
        self.id.escape_ascii().to_string()
    }

    fn encoded_len(&self) -> usize {
        CHUNK_HEADER_SIZE + self.data.len() + (self.data.len() & 1)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        let size = u32::try_from(self.data.len()).map_err(|_| DrmError::PayloadTooLarge)?;
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.data);
        if self.data.len() & 1 == 1 {
            out.push(0);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffContainer {
    form_type: [u8; 4],
    chunks: Vec<RiffChunk>,
}

impl RiffContainer {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RIFF_HEADER_SIZE || bytes[0..4] != RIFF_SIGNATURE {
            return Err(DrmError::InvalidRiffHeader);
        }
        let form_type: [u8; 4] = [bytes[8], bytes[9], bytes[10], bytes[11]];
        if form_type != WEBP_FORM_TYPE {
            return Err(DrmError::InvalidRiffHeader);
        }

        let riff_size = read_u32_le(&bytes[4..8]) as usize;
        if riff_size < 4 {
            return Err(DrmError::InvalidRiffHeader);
        }
        let end = CHUNK_HEADER_SIZE
            .checked_add(riff_size)
            .ok_or(DrmError::InvalidRiffHeader)?;
        if end > bytes.len() {
            return Err(DrmError::UnexpectedEndOfData);
        }

        let mut chunks = Vec::new();
        let mut position = RIFF_HEADER_SIZE;
        while position < end {
            if position + CHUNK_HEADER_SIZE > end {
                return Err(DrmError::InvalidChunkSize);
            }
            let id = [
                bytes[position],
                bytes[position + 1],
                bytes[position + 2],
                bytes[position + 3],
            ];
            let size = read_u32_le(&bytes[position + 4..position + 8]) as usize;
            let data_start = position + CHUNK_HEADER_SIZE;
            let data_end = data_start
                .checked_add(size)
                .filter(|&e| e <= end)
                .ok_or(DrmError::InvalidChunkSize)?;

            chunks.push(RiffChunk::new(id, bytes[data_start..data_end].to_vec()));
            // A trailing pad byte may be missing on the last chunk.
            position = (data_end + (size & 1)).min(end);
        }

        Ok(Self { form_type, chunks })
    }

    pub fn chunks(&self) -> &[RiffChunk] {
        &self.chunks
    }

    pub fn find_chunk(&self, id: &[u8; 4]) -> Option<&RiffChunk> {
        self.chunks.iter().find(|c| &c.id == id)
    }

    pub fn push_chunk(&mut self, chunk: RiffChunk) {
        self.chunks.push(chunk);
    }

    /// Returns the number of chunks removed.
    pub fn remove_chunks(&mut self, id: &[u8; 4]) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| &c.id != id);
        before - self.chunks.len()
    }

    pub fn has_payload(&self) -> bool {
        self.find_chunk(&PAYLOAD_CHUNK_ID).is_some()
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.find_chunk(&PAYLOAD_CHUNK_ID).map(|c| c.data.as_slice())
    }

    /// Replaces any existing payload chunk; the new one is appended after
    /// the image chunks.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.remove_chunks(&PAYLOAD_CHUNK_ID);
        self.push_chunk(RiffChunk::new(PAYLOAD_CHUNK_ID, payload.to_vec()));
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body_len: usize = 4 + self.chunks.iter().map(RiffChunk::encoded_len).sum::<usize>();
        let riff_size = u32::try_from(body_len).map_err(|_| DrmError::PayloadTooLarge)?;

        let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body_len);
        out.extend_from_slice(&RIFF_SIGNATURE);
        out.extend_from_slice(&riff_size.to_le_bytes());
        out.extend_from_slice(&self.form_type);
        for chunk in &self.chunks {
            chunk.write_to(&mut out)?;
        }
        Ok(out)
    }
}

impl TryFrom<&[u8]> for RiffContainer {
    type Error = DrmError;

    fn try_from(value: &[u8]) -> Result<Self> {
        Self::parse(value)
    }
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
