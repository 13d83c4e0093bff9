//! Locating the standard XMP packet in a parsed document

use crate::{document::JpegDocument, segment::XMP_SIGNATURE};

/// Raw content of the first standard XMP packet, without its signature
///
/// The content is cut at [`content_end`], so a trailing packet wrapper end
/// (`<?xpacket end="w"?>`) and any padding after it are dropped.
pub fn locate(document: &JpegDocument) -> Option<&[u8]> {
    let segment = document.iter().find(|segment| segment.is_standard_xmp())?;
    let payload = segment.payload();
    let end = content_end(payload).max(XMP_SIGNATURE.len());
    Some(&payload[XMP_SIGNATURE.len()..end])
}

/// One past the last `>` that does not close a processing instruction
///
/// Falls back to the full length when no such `>` exists.
pub fn content_end(data: &[u8]) -> usize {
    (1..data.len())
        .rev()
        .find(|&i| data[i] == b'>' && data[i - 1] != b'?')
        .map(|i| i + 1)
        .unwrap_or(data.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, APP1, SOS};

    fn xmp_segment(content: &[u8]) -> Segment {
        let mut payload = XMP_SIGNATURE.to_vec();
        payload.extend_from_slice(content);
        Segment::declared(APP1, payload).unwrap()
    }

    #[test]
    fn test_content_end() {
        assert_eq!(content_end(b"<a/>"), 4);
        assert_eq!(content_end(b"<a/>  \n"), 4);
        assert_eq!(content_end(b"<a/><?xpacket end=\"w\"?>"), 4);
        assert_eq!(content_end(b"no markup"), 9);
        assert_eq!(content_end(b">"), 1);
        assert_eq!(content_end(b""), 0);
    }

    #[test]
    fn test_locate_strips_wrapper_end_and_padding() {
        let content = b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>";
        let mut packet = content.to_vec();
        packet.extend_from_slice(b"\n   \n<?xpacket end=\"w\"?>");
        let document = JpegDocument::from_segments(vec![
            Segment::declared(APP1, b"Exif\0\0MM".to_vec()).unwrap(),
            xmp_segment(&packet),
            Segment::opaque(SOS, vec![0x00]),
        ])
        .unwrap();

        assert_eq!(locate(&document), Some(&content[..]));
    }

    #[test]
    fn test_locate_first_match_wins() {
        let document =
            JpegDocument::from_segments(vec![xmp_segment(b"<first/>"), xmp_segment(b"<second/>")])
                .unwrap();
        assert_eq!(locate(&document), Some(&b"<first/>"[..]));
    }

    #[test]
    fn test_locate_without_markup() {
        let document = JpegDocument::from_segments(vec![xmp_segment(b"plain")]).unwrap();
        assert_eq!(locate(&document), Some(&b"plain"[..]));

        let empty = JpegDocument::from_segments(vec![xmp_segment(b"")]).unwrap();
        assert_eq!(locate(&empty), Some(&b""[..]));
    }

    #[test]
    fn test_locate_none() {
        let document = JpegDocument::from_segments(vec![
            Segment::declared(APP1, b"Exif\0\0".to_vec()).unwrap(),
            Segment::declared(0xE2, XMP_SIGNATURE.to_vec()).unwrap(),
        ])
        .unwrap();
        assert_eq!(locate(&document), None);
    }
}
