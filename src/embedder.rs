//! Placing new XMP segments into a parsed document

use crate::{
    document::JpegDocument,
    error::{Error, Result},
    segment::{Segment, APP1, MAX_STANDARD_XMP_SIZE, XMP_SIGNATURE},
};

/// Wrap a serialized packet as a standard XMP APP1 segment
pub fn standard_segment(packet: &[u8]) -> Result<Segment> {
    if packet.len() > MAX_STANDARD_XMP_SIZE {
        return Err(Error::DataTooLarge {
            size: packet.len(),
            max: MAX_STANDARD_XMP_SIZE,
        });
    }
    let mut payload = Vec::with_capacity(XMP_SIGNATURE.len() + packet.len());
    payload.extend_from_slice(XMP_SIGNATURE);
    payload.extend_from_slice(packet);
    Segment::declared(APP1, payload)
}

/// Produce a new document carrying `new_segments` as its XMP
///
/// `new_segments` is a standard XMP segment optionally followed by extended
/// chunks; it is placed as one contiguous block:
/// - in place of the existing standard XMP segment, if there is one;
/// - otherwise right after a leading APP1 (Exif) segment;
/// - otherwise at the start of the document.
///
/// When the block carries extended chunks, extended XMP segments already
/// present are dropped first so that a document never carries chunks from
/// an earlier write. A standard-only block leaves them in place.
pub fn embed(document: JpegDocument, new_segments: Vec<Segment>) -> Result<JpegDocument> {
    if document.len() < 2 {
        return Err(Error::InvalidFormat(format!(
            "Document has {} segments, need at least 2 to embed XMP",
            document.len()
        )));
    }
    if new_segments.iter().any(Segment::is_opaque) {
        return Err(Error::InvalidFormat(
            "XMP segments must carry a declared length".into(),
        ));
    }

    let total = document.len();
    let mut segments = document.into_segments();
    if new_segments.iter().any(Segment::is_extended_xmp) {
        segments.retain(|segment| !segment.is_extended_xmp());
        let purged = total - segments.len();
        if purged > 0 {
            log::debug!("Dropped {} stale extended XMP segments", purged);
        }
    }

    let (position, replace) = match segments.iter().position(Segment::is_standard_xmp) {
        Some(index) => (index, true),
        None if segments.first().is_some_and(Segment::is_app1) => (1, false),
        None => (0, false),
    };
    log::debug!(
        "{} {} XMP segments at position {}",
        if replace { "Replacing with" } else { "Inserting" },
        new_segments.len(),
        position
    );

    let mut head = segments;
    let tail = head.split_off(position);
    let skip = if replace { 1 } else { 0 };
    let merged: Vec<Segment> = head
        .into_iter()
        .chain(new_segments)
        .chain(tail.into_iter().skip(skip))
        .collect();

    JpegDocument::from_segments(merged)
}
