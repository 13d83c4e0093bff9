//! Content GUID linking extended XMP chunks to their packet

/// Length of a GUID string in bytes
pub const GUID_LEN: usize = 32;

/// MD5 digest of `payload` as 32 uppercase hex characters
///
/// Identifies one extended XMP serialization; not a security boundary.
pub fn digest(payload: &[u8]) -> String {
    format!("{:X}", md5::compute(payload))
}

/// Check that `guid` has the shape produced by [`digest`]
pub fn is_valid(guid: &str) -> bool {
    guid.len() == GUID_LEN
        && guid
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(digest(b""), "D41D8CD98F00B204E9800998ECF8427E");
        assert_eq!(digest(b"abc"), "900150983CD24FB0D6963F7D28E17F72");
    }

    #[test]
    fn test_digest_shape() {
        let guid = digest(b"<x:xmpmeta/>");
        assert_eq!(guid.len(), GUID_LEN);
        assert!(is_valid(&guid));
        assert!(!is_valid(&guid.to_lowercase()));
        assert!(!is_valid("ABC"));
    }
}
