//! Read and write XMP metadata embedded in JPEG files.
//!
//! This crate parses a JPEG stream into its marker segments, finds or places
//! the standard XMP packet (APP1, `http://ns.adobe.com/xap/1.0/\0`), and
//! supports JPEG Extended XMP: a payload too large for one segment is split
//! into GUID-linked chunks and reassembled exactly on read.
//!
//! # Design Principles
//!
//! - **Single pass**: the codec reads a stream once, front to back
//! - **Fidelity**: segments that are not rewritten are copied byte for byte
//! - **No partial output**: a new document is fully built before writing
//! - **Bounded reads**: metadata-only reads skip everything but APP1
//!
//! # Quick Start
//!
//! ```no_run
//! use jpeg_xmp_io::namespace;
//!
//! // Read existing XMP, or start from an empty tree
//! let mut meta = jpeg_xmp_io::extract_or_create("image.jpg");
//!
//! namespace::init();
//! meta.set_property(namespace::GPANO_NAMESPACE, "ProjectionType", "equirectangular")
//!     .expect("GPano is registered by init");
//!
//! // Replace (or insert) the standard packet in place
//! assert!(jpeg_xmp_io::write_standard("image.jpg", &meta));
//! ```
//!
//! # Extended XMP
//!
//! ```no_run
//! use jpeg_xmp_io::{XmpMeta, write_standard_plus_extended};
//! use std::fs::File;
//!
//! # fn main() -> jpeg_xmp_io::Result<()> {
//! let standard = XmpMeta::new();
//! let extended = XmpMeta::new(); // e.g. a large depth map
//!
//! let input = File::open("input.jpg")?;
//! let output = File::create("output.jpg")?;
//! assert!(write_standard_plus_extended(input, output, &standard, &extended));
//!
//! let extended = jpeg_xmp_io::extract_extended("output.jpg");
//! # Ok(())
//! # }
//! ```
//!
//! # Segment-Level API
//!
//! ```no_run
//! use jpeg_xmp_io::{embedder, locator, JpegIO, ReadMode};
//! use std::fs::File;
//!
//! # fn main() -> jpeg_xmp_io::Result<()> {
//! let codec = JpegIO::new();
//! let document = codec.read(&mut File::open("image.jpg")?, ReadMode::Full)?;
//!
//! if let Some(packet) = locator::locate(&document) {
//!     println!("Found XMP: {} bytes", packet.len());
//! }
//!
//! let segment = embedder::standard_segment(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>")?;
//! let document = embedder::embed(document, vec![segment])?;
//! codec.write(&mut File::create("output.jpg")?, &document)?;
//! # Ok(())
//! # }
//! ```

mod asset;
mod document;
pub mod embedder;
mod error;
pub mod extended;
pub mod guid;
mod jpeg_io;
pub mod locator;
pub mod namespace;
mod segment;
pub mod xmp;

pub use asset::{
    embed_extended_xmp, embed_xmp, extract, extract_extended, extract_extended_from,
    extract_from, extract_or_create, read_extended_xmp, read_xmp, write_standard,
    write_standard_plus_extended, write_standard_to,
};
pub use document::JpegDocument;
pub use error::{Error, Result};
pub use extended::XmpChunk;
pub use jpeg_io::{JpegIO, ReadMode};
pub use segment::{
    marker_label, Segment, APP1, MARKER_PREFIX, MAX_MARKER_SIZE, MAX_STANDARD_XMP_SIZE, SOI, SOS,
    XMP_SIGNATURE,
};
pub use xmp::{SerializeOptions, XmpMeta};

// Test utilities - only compiled for tests or when explicitly enabled
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
