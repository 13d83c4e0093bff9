//! Error types for jpeg-xmp-io

use std::io;

/// Result type for jpeg-xmp-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing XMP in a JPEG stream
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Invalid segment
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },

    /// The metadata toolkit could not parse or serialize a tree
    #[error("XMP serialization error: {0}")]
    Serialization(String),

    /// File name does not carry a JPEG extension
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
}

impl Error {
    /// True for the "not a JPEG / malformed framing" family of errors
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidFormat(_) | Self::InvalidSegment { .. })
    }

    /// True when a payload did not fit its segment or chunk capacity
    pub fn is_size_error(&self) -> bool {
        matches!(self, Self::DataTooLarge { .. })
    }
}
