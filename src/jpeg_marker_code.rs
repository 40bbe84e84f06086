use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// TEM: For temporary private use in arithmetic coding.
    Temporary = 0x01,

    /// SOF0: Baseline DCT.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Extended sequential DCT, Huffman coding.
    StartOfFrameExtendedSequential = 0xC1,
    /// SOF2: Progressive DCT, Huffman coding.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Lossless (sequential), Huffman coding.
    StartOfFrameLossless = 0xC3,

    /// DHT: Define Huffman table(s).
    DefineHuffmanTable = 0xC4,

    /// SOF5..SOF7: Differential frames, Huffman coding.
    StartOfFrameDifferentialSequential = 0xC5,
    StartOfFrameDifferentialProgressive = 0xC6,
    StartOfFrameDifferentialLossless = 0xC7,

    /// JPG: Reserved for JPEG extensions.
    JpegExtension = 0xC8,

    /// SOF9..SOF11: Arithmetic coding.
    StartOfFrameExtendedSequentialArithmetic = 0xC9,
    StartOfFrameProgressiveArithmetic = 0xCA,
    StartOfFrameLosslessArithmetic = 0xCB,

    /// DAC: Define arithmetic coding conditioning(s).
    DefineArithmeticCoding = 0xCC,

    /// SOF13..SOF15: Differential frames, arithmetic coding.
    StartOfFrameDifferentialSequentialArithmetic = 0xCD,
    StartOfFrameDifferentialProgressiveArithmetic = 0xCE,
    StartOfFrameDifferentialLosslessArithmetic = 0xCF,

    /// RST0..RST7: Restart markers inside entropy-coded data.
    Restart0 = 0xD0,
    Restart1 = 0xD1,
    Restart2 = 0xD2,
    Restart3 = 0xD3,
    Restart4 = 0xD4,
    Restart5 = 0xD5,
    Restart6 = 0xD6,
    Restart7 = 0xD7,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DQT: Define quantization table(s).
    DefineQuantizationTable = 0xDB,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// DHP: Define hierarchical progression.
    DefineHierarchicalProgression = 0xDE,

    /// EXP: Expand reference component(s).
    ExpandReferenceComponents = 0xDF,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    ApplicationData3 = 0xE3,
    ApplicationData4 = 0xE4,
    ApplicationData5 = 0xE5,
    ApplicationData6 = 0xE6,
    ApplicationData7 = 0xE7,
    ApplicationData8 = 0xE8,
    ApplicationData9 = 0xE9,
    /// APP10: Application data 10: carries the embedded section payload.
    ApplicationData10 = 0xEA,
    ApplicationData11 = 0xEB,
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13: used by PhotoShop IRB
    ApplicationData13 = 0xED,
    /// APP14: Application data 14: used by Adobe
    ApplicationData14 = 0xEE,
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,
}

impl JpegMarkerCode {
    /// Short mnemonic used by the CLI segment listing.
    pub fn mnemonic(self) -> &'static str {
        use JpegMarkerCode::*;
        match self {
            Temporary => "TEM",
            StartOfFrameBaseline => "SOF0",
            StartOfFrameExtendedSequential => "SOF1",
            StartOfFrameProgressive => "SOF2",
            StartOfFrameLossless => "SOF3",
            DefineHuffmanTable => "DHT",
            StartOfFrameDifferentialSequential => "SOF5",
            StartOfFrameDifferentialProgressive => "SOF6",
            StartOfFrameDifferentialLossless => "SOF7",
            JpegExtension => "JPG",
            StartOfFrameExtendedSequentialArithmetic => "SOF9",
            StartOfFrameProgressiveArithmetic => "SOF10",
            StartOfFrameLosslessArithmetic => "SOF11",
            DefineArithmeticCoding => "DAC",
            StartOfFrameDifferentialSequentialArithmetic => "SOF13",
            StartOfFrameDifferentialProgressiveArithmetic => "SOF14",
            StartOfFrameDifferentialLosslessArithmetic => "SOF15",
            Restart0 | Restart1 | Restart2 | Restart3 | Restart4 | Restart5 | Restart6
            | Restart7 => "RST",
            StartOfImage => "SOI",
            EndOfImage => "EOI",
            StartOfScan => "SOS",
            DefineQuantizationTable => "DQT",
            DefineNumberOfLines => "DNL",
            DefineRestartInterval => "DRI",
            DefineHierarchicalProgression => "DHP",
            ExpandReferenceComponents => "EXP",
            ApplicationData0 | ApplicationData1 | ApplicationData2 | ApplicationData3
            | ApplicationData4 | ApplicationData5 | ApplicationData6 | ApplicationData7
            | ApplicationData8 | ApplicationData9 | ApplicationData10 | ApplicationData11
            | ApplicationData12 | ApplicationData13 | ApplicationData14
            | ApplicationData15 => "APP",
            Comment => "COM",
        }
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;
pub const JPEG_APPLICATION_MARKER_BASE: u8 = 0xE0;

pub fn is_restart_marker(marker: u8) -> bool {
    (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
        .contains(&marker)
}

pub fn is_application_marker(marker: u8) -> bool {
    (JPEG_APPLICATION_MARKER_BASE..=JPEG_APPLICATION_MARKER_BASE + 0x0F).contains(&marker)
}

/// Markers that are not followed by a length field.
pub fn is_standalone_marker(marker: u8) -> bool {
    marker == JpegMarkerCode::StartOfImage as u8
        || marker == JpegMarkerCode::EndOfImage as u8
        || marker == JpegMarkerCode::Temporary as u8
        || is_restart_marker(marker)
}
