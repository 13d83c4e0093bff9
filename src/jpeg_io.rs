//! JPEG marker-segment codec

use crate::{
    document::JpegDocument,
    error::{Error, Result},
    segment::{marker_label, Segment, APP1, MARKER_PREFIX, MAX_MARKER_SIZE, SOI, SOS},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::{
    io::{self, Read, Write},
    path::Path,
};

/// How much of the stream [`JpegIO::read`] materializes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadMode {
    /// Keep every segment, including the image data tail
    #[default]
    Full,
    /// Keep only APP1 segments and stop at the start of scan
    ///
    /// Other payloads are skipped without being buffered.
    MetadataOnly,
}

/// JPEG container I/O implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegIO;

impl JpegIO {
    /// Create a new JPEG I/O implementation
    pub fn new() -> Self {
        Self
    }

    /// File extensions this handler accepts
    pub fn extensions() -> &'static [&'static str] {
        &["jpg", "jpeg"]
    }

    /// Check a path's extension against [`JpegIO::extensions`] (case-insensitive)
    pub fn accepts_path(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                Self::extensions()
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }

    /// Detect if this is a JPEG stream from its header
    pub fn detect(header: &[u8]) -> bool {
        header.len() >= 2 && header[0] == MARKER_PREFIX && header[1] == SOI
    }

    /// Parse a JPEG stream into its segment sequence
    ///
    /// Parsing stops at the start-of-scan marker; in [`ReadMode::Full`] the
    /// rest of the stream becomes a single [`Segment::Opaque`]. A stream that
    /// ends cleanly on a segment boundary before any scan is accepted.
    pub fn read<R: Read>(&self, source: &mut R, mode: ReadMode) -> Result<JpegDocument> {
        let mut document = JpegDocument::new();

        // Check SOI marker
        if next_byte(source)? != Some(MARKER_PREFIX) || next_byte(source)? != Some(SOI) {
            return Err(Error::InvalidFormat("Not a JPEG file".into()));
        }

        let mut offset = 2u64;

        loop {
            let segment_start = offset;

            // Read marker
            let marker_prefix = match next_byte(source)? {
                Some(byte) => byte,
                None => break,
            };
            if marker_prefix != MARKER_PREFIX {
                return Err(Error::InvalidSegment {
                    offset,
                    reason: format!("Expected 0xFF, got 0x{:02X}", marker_prefix),
                });
            }
            offset += 1;

            // Handle padding bytes
            let marker = loop {
                match next_byte(source)? {
                    Some(MARKER_PREFIX) => offset += 1,
                    Some(byte) => break byte,
                    None => {
                        return Err(Error::InvalidSegment {
                            offset,
                            reason: "Stream ended inside marker".into(),
                        })
                    }
                }
            };
            offset += 1;

            if marker == SOS {
                // Image data follows, no metadata after this point
                if mode == ReadMode::Full {
                    let mut payload = Vec::new();
                    source.read_to_end(&mut payload)?;
                    document.push(Segment::opaque(marker, payload));
                }
                break;
            }

            let length = source.read_u16::<BigEndian>().map_err(|e| {
                eof_as_invalid(e, segment_start, "Stream ended inside length field")
            })?;
            offset += 2;
            if length < 2 {
                return Err(Error::InvalidSegment {
                    offset: segment_start,
                    reason: format!("Declared length {} is below 2", length),
                });
            }
            let data_size = (length - 2) as u64;

            if mode == ReadMode::MetadataOnly && marker != APP1 {
                // Exif and XMP only ever live in APP1
                let skipped = io::copy(&mut source.by_ref().take(data_size), &mut io::sink())?;
                if skipped != data_size {
                    return Err(truncated(segment_start, marker, data_size, skipped));
                }
            } else {
                let mut payload = Vec::with_capacity(data_size as usize);
                source.by_ref().take(data_size).read_to_end(&mut payload)?;
                if payload.len() as u64 != data_size {
                    return Err(truncated(
                        segment_start,
                        marker,
                        data_size,
                        payload.len() as u64,
                    ));
                }
                document.push(Segment::Declared { marker, payload });
            }
            offset += data_size;
        }

        log::debug!(
            "Parsed {} JPEG segments ({:?}, {} bytes before scan data)",
            document.len(),
            mode,
            offset
        );
        Ok(document)
    }

    /// Serialize a segment sequence back into a JPEG stream
    ///
    /// Length fields are recomputed from each payload.
    pub fn write<W: Write>(&self, writer: &mut W, document: &JpegDocument) -> Result<()> {
        // Write SOI
        writer.write_u8(MARKER_PREFIX)?;
        writer.write_u8(SOI)?;

        for segment in document {
            match segment {
                Segment::Declared { marker, payload } => {
                    if payload.len() > MAX_MARKER_SIZE {
                        return Err(Error::DataTooLarge {
                            size: payload.len(),
                            max: MAX_MARKER_SIZE,
                        });
                    }
                    writer.write_u8(MARKER_PREFIX)?;
                    writer.write_u8(*marker)?;
                    writer.write_u16::<BigEndian>((payload.len() + 2) as u16)?;
                    writer.write_all(payload)?;
                }
                Segment::Opaque { marker, payload } => {
                    writer.write_u8(MARKER_PREFIX)?;
                    writer.write_u8(*marker)?;
                    writer.write_all(payload)?;
                }
            }
        }

        Ok(())
    }
}

// Helper functions

/// Read one byte, `None` on end of stream
fn next_byte<R: Read>(source: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn eof_as_invalid(err: io::Error, offset: u64, reason: &str) -> Error {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        Error::InvalidSegment {
            offset,
            reason: reason.into(),
        }
    } else {
        Error::Io(err)
    }
}

fn truncated(offset: u64, marker: u8, expected: u64, actual: u64) -> Error {
    Error::InvalidSegment {
        offset,
        reason: format!(
            "Truncated {} segment: declared {} payload bytes, found {}",
            marker_label(marker),
            expected,
            actual
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_full(data: Vec<u8>) -> Result<JpegDocument> {
        JpegIO::new().read(&mut Cursor::new(data), ReadMode::Full)
    }

    #[test]
    fn test_jpeg_parse_minimal() {
        // SOI + empty COM + SOS with two bytes of scan data
        let data = vec![0xFF, 0xD8, 0xFF, 0xFE, 0x00, 0x02, 0xFF, 0xDA, 0x12, 0x34];
        let document = read_full(data).unwrap();

        assert_eq!(document.len(), 2);
        assert_eq!(document.segments()[0].marker(), 0xFE);
        assert_eq!(document.segments()[0].length(), Some(2));
        assert!(document.segments()[0].payload().is_empty());
        assert_eq!(
            document.segments()[1],
            Segment::opaque(SOS, vec![0x12, 0x34])
        );
    }

    #[test]
    fn test_rejects_missing_soi() {
        let err = read_full(vec![0xFF, 0xD9, 0xFF, 0xDA]).unwrap_err();
        assert!(err.is_format_error());

        let err = read_full(Vec::new()).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_rejects_non_marker_byte() {
        let err = read_full(vec![0xFF, 0xD8, 0x00, 0xE1]).unwrap_err();
        assert!(matches!(err, Error::InvalidSegment { offset: 2, .. }));
    }

    #[test]
    fn test_skips_padding_bytes() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xFF, 0xFF, 0xDB, 0x00, 0x03, 0x07];
        let document = read_full(data).unwrap();
        assert_eq!(document.len(), 1);
        assert_eq!(document.segments()[0].marker(), 0xDB);
        assert_eq!(document.segments()[0].payload(), &[0x07]);
    }

    #[test]
    fn test_truncated_payload_is_fatal() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x10, 0x01, 0x02];
        let err = read_full(data).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_length_is_fatal() {
        let err = read_full(vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00]).unwrap_err();
        assert!(err.is_format_error());

        let err = read_full(vec![0xFF, 0xD8, 0xFF, 0xFF]).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_length_below_two_is_rejected() {
        let err = read_full(vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x01]).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_metadata_only_keeps_app1() {
        let data = vec![
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0xAA, 0xBB, // APP0
            0xFF, 0xE1, 0x00, 0x03, 0xCC, // APP1
            0xFF, 0xDB, 0x00, 0x03, 0xDD, // DQT
            0xFF, 0xDA, 0x01, 0x02, 0x03, // SOS + data
        ];
        let document = JpegIO::new()
            .read(&mut Cursor::new(data), ReadMode::MetadataOnly)
            .unwrap();

        assert_eq!(document.len(), 1);
        assert_eq!(document.segments()[0].marker(), APP1);
        assert!(document.image_data().is_none());
    }

    #[test]
    fn test_metadata_only_detects_truncated_skip() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x10, 0x00];
        let err = JpegIO::new()
            .read(&mut Cursor::new(data), ReadMode::MetadataOnly)
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_write_reproduces_source_bytes() {
        let data = vec![
            0xFF, 0xD8, 0xFF, 0xE1, 0x00, 0x04, 0x01, 0x02, 0xFF, 0xDB, 0x00, 0x02, 0xFF, 0xDA,
            0x00, 0xFF, 0x00, 0xFF, 0xD9,
        ];
        let document = read_full(data.clone()).unwrap();

        let mut output = Vec::new();
        JpegIO::new().write(&mut output, &document).unwrap();
        assert_eq!(output, data);
    }

    #[test]
    fn test_write_recomputes_length() {
        let document = JpegDocument::from_segments(vec![
            Segment::declared(APP1, vec![9; 300]).unwrap(),
            Segment::opaque(SOS, vec![]),
        ])
        .unwrap();

        let mut output = Vec::new();
        JpegIO::new().write(&mut output, &document).unwrap();
        assert_eq!(&output[..6], &[0xFF, 0xD8, 0xFF, 0xE1, 0x01, 0x2E]);

        let reread = read_full(output).unwrap();
        assert_eq!(reread.segments()[0].payload().len(), 300);
        assert_eq!(reread, document);
    }

    #[test]
    fn test_write_rejects_oversized_declared() {
        let document = JpegDocument::from_segments(vec![Segment::Declared {
            marker: APP1,
            payload: vec![0; MAX_MARKER_SIZE + 1],
        }])
        .unwrap();
        let err = JpegIO::new().write(&mut Vec::new(), &document).unwrap_err();
        assert!(err.is_size_error());
    }

    #[test]
    fn test_accepts_path() {
        assert!(JpegIO::accepts_path(Path::new("photo.jpg")));
        assert!(JpegIO::accepts_path(Path::new("dir/PHOTO.JPEG")));
        assert!(!JpegIO::accepts_path(Path::new("photo.png")));
        assert!(!JpegIO::accepts_path(Path::new("photo")));
        assert!(JpegIO::detect(&[0xFF, 0xD8, 0xFF]));
        assert!(!JpegIO::detect(&[0xFF]));
    }
}
