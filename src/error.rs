use thiserror::Error;

/// Errors raised by the codec, container and watermark layers.
///
/// The discriminants are stable: they are returned as-is through the C ABI,
/// where `0` means success.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrmError {
    #[error("Invalid argument")]
    InvalidArgument = 1,
    #[error("Image could not be decoded")]
    DecodeFailed = 2,
    #[error("Image could not be encoded")]
    EncodeFailed = 3,
    #[error("Section lies outside the image")]
    SectionOutOfBounds = 4,

    // Watermark task state
    #[error("Target image is not set")]
    TargetNotSet = 10,
    #[error("Watermark image is not set")]
    WatermarkNotSet = 11,
    #[error("Task not yet processed")]
    NotProcessed = 12,
    #[error("Encryption key not set")]
    KeyNotSet = 13,
    #[error("Encryption key must be 32 bytes")]
    InvalidKeyLength = 14,
    #[error("Watermark does not fit inside the target at the requested position")]
    WatermarkOutOfBounds = 15,

    // Containers
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound = 20,
    #[error("JPEG marker start byte not found")]
    JpegMarkerStartByteNotFound = 21,
    #[error("Invalid marker segment size")]
    InvalidMarkerSegmentSize = 22,
    #[error("File ended prematurely")]
    UnexpectedEndOfData = 23,
    #[error("Invalid RIFF/WebP header")]
    InvalidRiffHeader = 24,
    #[error("Invalid RIFF chunk size")]
    InvalidChunkSize = 25,
    #[error("Payload too large for the container")]
    PayloadTooLarge = 26,

    // Embedded block
    #[error("Cannot find embedded block")]
    EmbeddedBlockNotFound = 30,
    #[error("Corrupted embedded block")]
    CorruptedEmbeddedBlock = 31,
}

impl DrmError {
    /// Status code reported through the C ABI.
    pub fn code(self) -> u32 {
        self as u32
    }
}

pub type Result<T> = std::result::Result<T, DrmError>;
