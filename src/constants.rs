// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// The maximum size of the data bytes that fit in a segment.
pub const SEGMENT_MAX_DATA_SIZE: usize = u16::MAX as usize - SEGMENT_LENGTH_SIZE;

// Identifier at the start of every APP10 segment that carries the embedded payload.
pub const PAYLOAD_SEGMENT_SIGNATURE: &[u8; 5] = b"DRMS\0";

// Signature plus the big-endian u16 sequence number.
pub const PAYLOAD_SEGMENT_HEADER_SIZE: usize = PAYLOAD_SEGMENT_SIGNATURE.len() + 2;

pub const PAYLOAD_SEGMENT_MAX_DATA_SIZE: usize =
    SEGMENT_MAX_DATA_SIZE - PAYLOAD_SEGMENT_HEADER_SIZE;

// FourCC of the RIFF chunk that carries the embedded payload in WebP files.
pub const PAYLOAD_CHUNK_ID: [u8; 4] = *b"drms";

pub const AES_BLOCK_SIZE: usize = 16;
pub const ENCRYPTION_KEY_SIZE: usize = 32;

// Quality used whenever the library re-encodes a JPEG.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
