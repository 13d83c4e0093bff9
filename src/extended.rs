//! JPEG Extended XMP chunking
//!
//! An extended XMP payload too large for one APP1 segment is split into
//! chunks, each stored in its own APP1 segment behind a fixed 75-byte header:
//!
//! | bytes  | field                                        |
//! |--------|----------------------------------------------|
//! | 0..35  | signature `http://ns.adobe.com/xmp/extension/\0` |
//! | 35..67 | GUID, 32 ASCII hex characters                |
//! | 67..71 | full length of the extended payload (u32 BE) |
//! | 71..75 | offset of this chunk in the payload (u32 BE) |
//!
//! The GUID is the MD5 digest of the complete extended payload, which lets a
//! reader both find the chunks of one stream and validate the reassembly.

use crate::{
    document::JpegDocument,
    error::{Error, Result},
    guid::{self, GUID_LEN},
    segment::{Segment, APP1, MAX_MARKER_SIZE},
};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

/// Signature prefixing each extended XMP chunk
pub const XMP_EXTENDED_SIGNATURE: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";

/// Signature + GUID + full length + offset
pub const EXTENDED_HEADER_SIZE: usize = XMP_EXTENDED_SIGNATURE.len() + GUID_LEN + 4 + 4;

/// Max chunk data per segment when splitting
pub const MAX_EXTENDED_CHUNK_SIZE: usize = 65000;

/// Reassembled extended payloads larger than this are rejected (100 MB)
pub const MAX_EXTENDED_XMP_SIZE: u32 = 100 * 1024 * 1024;

const FULL_LENGTH_POS: usize = XMP_EXTENDED_SIGNATURE.len() + GUID_LEN;
const OFFSET_POS: usize = FULL_LENGTH_POS + 4;

/// One piece of an extended XMP payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpChunk<'a> {
    /// GUID of the complete payload
    pub guid: &'a str,
    /// Byte length of the complete payload
    pub full_length: u32,
    /// Position of `data` within the complete payload
    pub offset: u32,
    /// Bytes of this chunk
    pub data: &'a [u8],
}

impl<'a> XmpChunk<'a> {
    /// Decode a chunk from an APP1 payload
    ///
    /// Returns `None` if the payload lacks the signature, is shorter than the
    /// header, or carries a non-ASCII GUID.
    pub fn parse(payload: &'a [u8]) -> Option<Self> {
        if payload.len() < EXTENDED_HEADER_SIZE || !payload.starts_with(XMP_EXTENDED_SIGNATURE) {
            return None;
        }
        let guid = std::str::from_utf8(&payload[XMP_EXTENDED_SIGNATURE.len()..FULL_LENGTH_POS])
            .ok()?;
        Some(Self {
            guid,
            full_length: BigEndian::read_u32(&payload[FULL_LENGTH_POS..OFFSET_POS]),
            offset: BigEndian::read_u32(&payload[OFFSET_POS..EXTENDED_HEADER_SIZE]),
            data: &payload[EXTENDED_HEADER_SIZE..],
        })
    }

    /// Encode this chunk (header + data) as an APP1 segment
    pub fn to_segment(&self) -> Result<Segment> {
        let size = EXTENDED_HEADER_SIZE + self.data.len();
        if size > MAX_MARKER_SIZE {
            return Err(Error::DataTooLarge {
                size,
                max: MAX_MARKER_SIZE,
            });
        }
        if self.guid.len() != GUID_LEN {
            return Err(Error::InvalidFormat(format!(
                "Extended XMP GUID must be {} bytes, got {}",
                GUID_LEN,
                self.guid.len()
            )));
        }

        let mut payload = Vec::with_capacity(size);
        payload.extend_from_slice(XMP_EXTENDED_SIGNATURE);
        payload.extend_from_slice(self.guid.as_bytes());
        payload.write_u32::<BigEndian>(self.full_length)?;
        payload.write_u32::<BigEndian>(self.offset)?;
        payload.extend_from_slice(self.data);

        Segment::declared(APP1, payload)
    }
}

/// Split `payload` into chunks of [`MAX_EXTENDED_CHUNK_SIZE`]
pub fn split<'a>(payload: &'a [u8], guid: &'a str) -> Result<Vec<XmpChunk<'a>>> {
    split_with_capacity(payload, guid, MAX_EXTENDED_CHUNK_SIZE)
}

/// Split `payload` into consecutive chunks of at most `capacity` bytes
///
/// Every chunk but the last holds exactly `capacity` bytes. An empty payload
/// yields no chunks.
pub fn split_with_capacity<'a>(
    payload: &'a [u8],
    guid: &'a str,
    capacity: usize,
) -> Result<Vec<XmpChunk<'a>>> {
    if capacity == 0 {
        return Err(Error::InvalidFormat("Chunk capacity must be non-zero".into()));
    }
    let full_length = u32::try_from(payload.len()).map_err(|_| Error::DataTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;

    let chunks = payload
        .chunks(capacity)
        .enumerate()
        .map(|(index, data)| {
            let size = EXTENDED_HEADER_SIZE + data.len();
            if size > MAX_MARKER_SIZE {
                return Err(Error::DataTooLarge {
                    size,
                    max: MAX_MARKER_SIZE,
                });
            }
            Ok(XmpChunk {
                guid,
                full_length,
                // index * capacity <= payload.len() which fits in u32
                offset: (index * capacity) as u32,
                data,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    log::debug!(
        "Split {} bytes of extended XMP into {} chunks (GUID {})",
        full_length,
        chunks.len(),
        guid
    );
    Ok(chunks)
}

/// Split `payload` and encode each chunk as an APP1 segment
pub fn to_segments(payload: &[u8], guid: &str) -> Result<Vec<Segment>> {
    split(payload, guid)?
        .iter()
        .map(XmpChunk::to_segment)
        .collect()
}

/// Rebuild the extended payload identified by `guid` from a document
///
/// Chunks with another GUID are ignored. Returns `Ok(None)` when no chunk
/// matches; fails if the matching chunks disagree on the full length, leave
/// a gap, or do not hash back to `guid`.
pub fn reassemble(document: &JpegDocument, guid: &str) -> Result<Option<Vec<u8>>> {
    let chunks: Vec<XmpChunk<'_>> = document
        .iter()
        .filter(|segment| segment.is_extended_xmp())
        .filter_map(|segment| XmpChunk::parse(segment.payload()))
        .filter(|chunk| chunk.guid == guid)
        .collect();

    let Some(first) = chunks.first() else {
        return Ok(None);
    };

    // Validate total size to prevent DOS attacks
    let total_size = first.full_length;
    if total_size > MAX_EXTENDED_XMP_SIZE {
        return Err(Error::DataTooLarge {
            size: total_size as usize,
            max: MAX_EXTENDED_XMP_SIZE as usize,
        });
    }

    let mut extended_xmp = vec![0u8; total_size as usize];
    let mut covered = vec![false; total_size as usize];

    for chunk in &chunks {
        if chunk.full_length != total_size {
            return Err(Error::InvalidFormat(format!(
                "Extended XMP chunk at offset {} declares length {}, expected {}",
                chunk.offset, chunk.full_length, total_size
            )));
        }
        let start = chunk.offset as usize;
        let end = start
            .checked_add(chunk.data.len())
            .filter(|end| *end <= extended_xmp.len())
            .ok_or_else(|| {
                Error::InvalidFormat(format!(
                    "Extended XMP chunk at offset {} overruns length {}",
                    chunk.offset, total_size
                ))
            })?;
        extended_xmp[start..end].copy_from_slice(chunk.data);
        covered[start..end].iter_mut().for_each(|c| *c = true);
    }

    if let Some(gap) = covered.iter().position(|c| !c) {
        return Err(Error::InvalidFormat(format!(
            "Extended XMP is missing data at offset {}",
            gap
        )));
    }

    let actual = guid::digest(&extended_xmp);
    if actual != guid {
        log::warn!(
            "Extended XMP GUID mismatch: expected {}, computed {}",
            guid,
            actual
        );
        return Err(Error::InvalidFormat(format!(
            "Extended XMP digest {} does not match GUID {}",
            actual, guid
        )));
    }

    Ok(Some(extended_xmp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SOS;

    const GUID: &str = "0123456789ABCDEF0123456789ABCDEF";

    fn assert_tiles(chunks: &[XmpChunk<'_>], full_length: usize, capacity: usize) {
        let mut expected_offset = 0usize;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.offset as usize, expected_offset);
            assert_eq!(chunk.full_length as usize, full_length);
            if i + 1 < chunks.len() {
                assert_eq!(chunk.data.len(), capacity);
            } else {
                assert!(!chunk.data.is_empty() && chunk.data.len() <= capacity);
            }
            expected_offset += chunk.data.len();
        }
        assert_eq!(expected_offset, full_length);
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(XMP_EXTENDED_SIGNATURE.len(), 35);
        assert_eq!(EXTENDED_HEADER_SIZE, 75);
        assert_eq!(FULL_LENGTH_POS, 67);
        assert_eq!(OFFSET_POS, 71);
        assert!(EXTENDED_HEADER_SIZE + MAX_EXTENDED_CHUNK_SIZE <= MAX_MARKER_SIZE);
    }

    #[test]
    fn test_split_tiles_payload() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        for capacity in [1, 7, 100, 333, 999, 1000, 4096] {
            let chunks = split_with_capacity(&payload, GUID, capacity).unwrap();
            assert_tiles(&chunks, payload.len(), capacity);
            assert_eq!(chunks.len(), payload.len().div_ceil(capacity));
        }
    }

    #[test]
    fn test_split_exact_multiple_has_no_empty_tail() {
        let payload = vec![b'x'; 300];
        let chunks = split_with_capacity(&payload, GUID, 100).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].offset, 200);
        assert_eq!(chunks[2].data.len(), 100);
    }

    #[test]
    fn test_split_empty_and_zero_capacity() {
        assert!(split(&[], GUID).unwrap().is_empty());
        assert!(split_with_capacity(b"abc", GUID, 0).is_err());
    }

    #[test]
    fn test_split_rejects_capacity_over_segment() {
        let payload = vec![0u8; MAX_MARKER_SIZE];
        let err = split_with_capacity(&payload, GUID, MAX_MARKER_SIZE).unwrap_err();
        assert!(err.is_size_error());

        // Largest chunk that still fits beside the header
        let fits = MAX_MARKER_SIZE - EXTENDED_HEADER_SIZE;
        assert!(split_with_capacity(&payload, GUID, fits).is_ok());
    }

    #[test]
    fn test_default_split_uses_fixed_capacity() {
        let payload = vec![b'a'; MAX_EXTENDED_CHUNK_SIZE * 2 + 17];
        let chunks = split(&payload, GUID).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_tiles(&chunks, payload.len(), MAX_EXTENDED_CHUNK_SIZE);
    }

    #[test]
    fn test_chunk_segment_layout() {
        let chunk = XmpChunk {
            guid: GUID,
            full_length: 0x0102_0304,
            offset: 0x0A0B_0C0D,
            data: b"<data>",
        };
        let segment = chunk.to_segment().unwrap();
        let payload = segment.payload();

        assert_eq!(segment.marker(), APP1);
        assert!(segment.is_extended_xmp());
        assert_eq!(payload.len(), EXTENDED_HEADER_SIZE + 6);
        assert_eq!(&payload[35..67], GUID.as_bytes());
        assert_eq!(&payload[67..71], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&payload[71..75], &[0x0A, 0x0B, 0x0C, 0x0D]);
        assert_eq!(&payload[75..], b"<data>");

        assert_eq!(XmpChunk::parse(payload), Some(chunk));
    }

    #[test]
    fn test_parse_rejects_short_or_foreign_payload() {
        assert!(XmpChunk::parse(XMP_EXTENDED_SIGNATURE).is_none());
        assert!(XmpChunk::parse(&[0u8; 100]).is_none());
    }

    #[test]
    fn test_reassemble_out_of_order() {
        let payload: Vec<u8> = (0..250u32).map(|i| i as u8).collect();
        let guid = guid::digest(&payload);
        let mut segments: Vec<Segment> = split_with_capacity(&payload, &guid, 64)
            .unwrap()
            .iter()
            .map(|c| c.to_segment().unwrap())
            .collect();
        segments.reverse();
        segments.push(Segment::opaque(SOS, vec![0xAB]));
        let document = JpegDocument::from_segments(segments).unwrap();

        assert_eq!(reassemble(&document, &guid).unwrap(), Some(payload));
        assert_eq!(reassemble(&document, GUID).unwrap(), None);
    }

    #[test]
    fn test_reassemble_detects_gap() {
        let payload = vec![b'z'; 200];
        let guid = guid::digest(&payload);
        let chunks = split_with_capacity(&payload, &guid, 50).unwrap();
        let segments = chunks
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, c)| c.to_segment().unwrap())
            .collect();
        let document = JpegDocument::from_segments(segments).unwrap();

        assert!(reassemble(&document, &guid).unwrap_err().is_format_error());
    }

    #[test]
    fn test_reassemble_detects_digest_mismatch() {
        let payload = vec![b'q'; 10];
        let chunk = XmpChunk {
            guid: GUID,
            full_length: 10,
            offset: 0,
            data: &payload,
        };
        let document = JpegDocument::from_segments(vec![chunk.to_segment().unwrap()]).unwrap();
        assert!(reassemble(&document, GUID).is_err());
    }
}
