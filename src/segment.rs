//! Segment types and JPEG wire constants

use crate::error::{Error, Result};

/// Marker prefix byte preceding every marker code
pub const MARKER_PREFIX: u8 = 0xFF;
/// Start of Image
pub const SOI: u8 = 0xD8;
/// APP1: carries Exif, standard XMP and extended XMP
pub const APP1: u8 = 0xE1;
/// Start of Scan (image data follows)
pub const SOS: u8 = 0xDA;

/// Signature prefixing a standard XMP packet inside an APP1 payload
pub const XMP_SIGNATURE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// Max payload size of one marker segment (65535 minus the 2 length bytes)
pub const MAX_MARKER_SIZE: usize = 65533;

/// Max size of a serialized standard XMP packet
///
/// Signature plus packet plus length field must stay within `MAX_MARKER_SIZE`.
pub const MAX_STANDARD_XMP_SIZE: usize = MAX_MARKER_SIZE - XMP_SIGNATURE.len() - 2;

/// Get human-readable label for a JPEG marker
pub fn marker_label(marker: u8) -> &'static str {
    match marker {
        0xD8 => "SOI",
        0xD9 => "EOI",
        0xDA => "SOS",
        0xDB => "DQT",
        0xC0 => "SOF0",
        0xC2 => "SOF2",
        0xC4 => "DHT",
        0xDD => "DRI",
        0xFE => "COM",
        0xE0 => "APP0",
        0xE1 => "APP1",
        0xE2 => "APP2",
        0xEB => "APP11",
        0xED => "APP13",
        0xEE => "APP14",
        _ => "OTHER",
    }
}

/// One JPEG marker segment
///
/// The two-byte length field is never stored: for `Declared` segments it is
/// always derived from the payload (`payload.len() + 2`), so a segment can
/// not drift out of sync with its encoded length after being rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A segment carrying a two-byte big-endian length field
    Declared {
        /// Marker code (the byte after 0xFF)
        marker: u8,
        /// Segment payload, at most `MAX_MARKER_SIZE` bytes
        payload: Vec<u8>,
    },
    /// Length-less tail of the stream (scan header plus entropy-coded data)
    ///
    /// Only valid as the last segment of a document.
    Opaque {
        /// Marker code (normally SOS)
        marker: u8,
        /// Every remaining byte of the stream
        payload: Vec<u8>,
    },
}

impl Segment {
    /// Create a declared-length segment, validating the payload fits
    pub fn declared(marker: u8, payload: Vec<u8>) -> Result<Self> {
        if payload.len() > MAX_MARKER_SIZE {
            return Err(Error::DataTooLarge {
                size: payload.len(),
                max: MAX_MARKER_SIZE,
            });
        }
        Ok(Self::Declared { marker, payload })
    }

    /// Create the opaque image-data tail
    pub fn opaque(marker: u8, payload: Vec<u8>) -> Self {
        Self::Opaque { marker, payload }
    }

    /// Marker code
    pub fn marker(&self) -> u8 {
        match self {
            Self::Declared { marker, .. } | Self::Opaque { marker, .. } => *marker,
        }
    }

    /// Payload bytes (excluding marker and length field)
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Declared { payload, .. } | Self::Opaque { payload, .. } => payload,
        }
    }

    /// Encoded length field value, or `None` for the opaque tail
    pub fn length(&self) -> Option<u16> {
        match self {
            // Payload is bounded by MAX_MARKER_SIZE so this cannot truncate
            Self::Declared { payload, .. } => Some((payload.len() + 2) as u16),
            Self::Opaque { .. } => None,
        }
    }

    /// Check if this is the length-less tail
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque { .. })
    }

    /// Check if this is an APP1 segment (Exif or XMP carrier)
    pub fn is_app1(&self) -> bool {
        !self.is_opaque() && self.marker() == APP1
    }

    /// Check if this is an APP1 segment holding a standard XMP packet
    pub fn is_standard_xmp(&self) -> bool {
        self.is_app1() && self.payload().starts_with(XMP_SIGNATURE)
    }

    /// Check if this is an APP1 segment holding an extended XMP chunk
    pub fn is_extended_xmp(&self) -> bool {
        self.is_app1() && self.payload().starts_with(crate::extended::XMP_EXTENDED_SIGNATURE)
    }

    /// Human-readable label for the marker
    pub fn label(&self) -> &'static str {
        marker_label(self.marker())
    }
}
