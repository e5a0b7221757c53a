// Reader error handling

use bitreader::BitReaderError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    // Structural errors
    BadMagic { expected: u32, found: u32, offset: usize },
    NonZeroPadding { offset: usize, value: u8 },
    ReservedCount(u16),
    UnknownCategory { id: u32, category: u32 },
    BadHeader(String),
    BadSectionSize { offset: usize, size: u32 },
    UnknownSection { offset: usize, magic: u32 },

    // Input exhausted
    UnexpectedEof { offset: usize, wanted: usize },
    TruncatedStream { decoded: usize, expected: usize },

    NoSections,
    BadConfig(String),

    // IO errors
    IOError(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FormatError::BadMagic {
                expected,
                found,
                offset,
            } => write!(
                f,
                "Bad magic number at ${:04x}: expected {:08x}, found {:08x}",
                offset, expected, found
            ),
            FormatError::NonZeroPadding { offset, value } => {
                write!(f, "Non-zero padding byte {:02x} at ${:04x}", value, offset)
            }
            FormatError::ReservedCount(count) => {
                write!(f, "Unsupported reserved debug count {} (must be zero)", count)
            }
            FormatError::UnknownCategory { id, category } => {
                write!(f, "Symbol {:04x} has unknown category {:04x}", id, category)
            }
            FormatError::BadHeader(msg) => write!(f, "Bad section header: {}", msg),
            FormatError::BadSectionSize { offset, size } => {
                write!(f, "Section at ${:04x} declares impossible size {}", offset, size)
            }
            FormatError::UnknownSection { offset, magic } => {
                write!(f, "Unknown section magic {:08x} at ${:04x}", magic, offset)
            }
            FormatError::UnexpectedEof { offset, wanted } => {
                write!(
                    f,
                    "Unexpected end of input at ${:04x} ({} more bytes wanted)",
                    offset, wanted
                )
            }
            FormatError::TruncatedStream { decoded, expected } => write!(
                f,
                "Compressed stream ended after {} of {} words",
                decoded, expected
            ),
            FormatError::NoSections => write!(f, "No blocks read!"),
            FormatError::BadConfig(msg) => write!(f, "Bad configuration: {}", msg),
            FormatError::IOError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<std::io::Error> for FormatError {
    fn from(error: std::io::Error) -> Self {
        FormatError::IOError(error.to_string())
    }
}

impl From<BitReaderError> for FormatError {
    fn from(error: BitReaderError) -> Self {
        match error {
            BitReaderError::NotEnoughData {
                position,
                length,
                requested,
            } => FormatError::UnexpectedEof {
                offset: (position / 8) as usize,
                wanted: ((position + requested).saturating_sub(length) as usize).div_ceil(8),
            },
            other => FormatError::IOError(format!("{:?}", other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
