//! Test utilities for building synthetic JPEG streams.
//!
//! No binary fixtures are needed: [`JpegBuilder`] assembles SOI, declared
//! segments and an opaque scan tail byte by byte.
//!
//! # Usage
//!
//! ```
//! use jpeg_xmp_io::test_utils::*;
//!
//! let bytes = JpegBuilder::new()
//!     .exif(10)
//!     .segment(0xDB, &[0u8; 4])
//!     .scan(&[0x11, 0x22, 0xFF, 0xD9])
//!     .build();
//! assert_eq!(&bytes[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
//! ```

use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use crate::{
    namespace::{self, DC_NAMESPACE},
    Result, XmpMeta, APP1, MARKER_PREFIX, SOI, SOS,
};

/// Type alias for test stream tuples: (input_cursor, output_cursor)
pub type TestStreams = (Cursor<Vec<u8>>, Cursor<Vec<u8>>);

/// Bytes of the scan tail used by [`JpegBuilder::typical`]
pub const SCAN_DATA: &[u8] = &[0x00, 0x0C, 0x03, 0x01, 0x00, 0x3F, 0x00, 0xD2, 0xCF, 0xFF, 0xD9];

/// Builder for synthetic JPEG byte streams
#[derive(Debug, Clone)]
pub struct JpegBuilder {
    bytes: Vec<u8>,
}

impl Default for JpegBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegBuilder {
    /// Start a stream with the SOI marker
    pub fn new() -> Self {
        Self {
            bytes: vec![MARKER_PREFIX, SOI],
        }
    }

    /// Exif APP1 + DQT + scan, the shape of a typical camera file
    pub fn typical() -> Self {
        Self::new().exif(10).segment(0xDB, &[0u8; 4]).scan(SCAN_DATA)
    }

    /// Append a declared-length segment
    ///
    /// # Panics
    /// If `payload` does not fit a length field.
    pub fn segment(mut self, marker: u8, payload: &[u8]) -> Self {
        let length = u16::try_from(payload.len() + 2).expect("payload fits a segment");
        self.bytes.extend_from_slice(&[MARKER_PREFIX, marker]);
        self.bytes.extend_from_slice(&length.to_be_bytes());
        self.bytes.extend_from_slice(payload);
        self
    }

    /// Append an Exif APP1 segment with a payload of `len` bytes
    pub fn exif(self, len: usize) -> Self {
        self.segment(APP1, &exif_payload(len))
    }

    /// Append an SOS marker followed by `data` (the opaque tail)
    pub fn scan(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[MARKER_PREFIX, SOS]);
        self.bytes.extend_from_slice(data);
        self
    }

    /// Finish the stream
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// An Exif payload of exactly `len` bytes (at least the 6-byte signature)
pub fn exif_payload(len: usize) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.resize(len.max(payload.len()), 0x2A);
    payload
}

/// Create test streams over `bytes`
pub fn create_test_streams(bytes: Vec<u8>) -> TestStreams {
    (Cursor::new(bytes), Cursor::new(Vec::new()))
}

/// A tree with one Dublin Core property
pub fn sample_meta(value: &str) -> XmpMeta {
    namespace::init();
    let mut meta = XmpMeta::new();
    meta.set_property(DC_NAMESPACE, "description", value)
        .expect("dc is a built-in namespace");
    meta
}

/// Write `bytes` to `dir/name` and return the path
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JpegIO, ReadMode};

    #[test]
    fn test_typical_parses() {
        let bytes = JpegBuilder::typical().build();
        let document = JpegIO::new()
            .read(&mut Cursor::new(bytes), ReadMode::Full)
            .unwrap();

        let markers: Vec<u8> = document.iter().map(|s| s.marker()).collect();
        assert_eq!(markers, vec![APP1, 0xDB, SOS]);
        assert_eq!(document.segments()[0].payload().len(), 10);
        assert_eq!(document.segments()[2].payload(), SCAN_DATA);
    }

    #[test]
    fn test_exif_payload_len() {
        assert_eq!(exif_payload(10).len(), 10);
        assert_eq!(exif_payload(0).len(), 6);
        assert!(exif_payload(8).starts_with(b"Exif\0\0"));
    }
}
