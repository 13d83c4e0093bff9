//! Ordered segment sequence of a parsed JPEG stream

use crate::{
    error::{Error, Result},
    segment::Segment,
};

/// The parsed segments of a JPEG stream, in source byte order
///
/// The leading SOI marker pair is implicit and not stored. At most one
/// [`Segment::Opaque`] may exist and only as the last element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JpegDocument {
    segments: Vec<Segment>,
}

impl JpegDocument {
    /// Create an empty document (SOI only)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from segments, validating the opaque-tail rule
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        if let Some(index) = segments.iter().position(Segment::is_opaque) {
            if index != segments.len() - 1 {
                return Err(Error::InvalidFormat(format!(
                    "Image data segment at index {} is not last ({} segments)",
                    index,
                    segments.len()
                )));
            }
        }
        Ok(Self { segments })
    }

    /// Append a segment while parsing; the caller upholds the tail rule
    pub(crate) fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Get reference to segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Consume the document, yielding its segments
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    /// Number of segments (excluding the implicit SOI)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True when only the implicit SOI is present
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterate over segments in stream order
    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// Index of the first standard XMP segment
    pub fn xmp_index(&self) -> Option<usize> {
        self.segments.iter().position(Segment::is_standard_xmp)
    }

    /// Indices of all extended XMP segments
    pub fn extended_xmp_indices(&self) -> Vec<usize> {
        self.segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_extended_xmp())
            .map(|(i, _)| i)
            .collect()
    }

    /// The image data tail, if the document was read in full mode
    pub fn image_data(&self) -> Option<&Segment> {
        self.segments.last().filter(|s| s.is_opaque())
    }
}

impl<'a> IntoIterator for &'a JpegDocument {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
