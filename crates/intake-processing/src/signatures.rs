//! Magic-byte signatures for the declared types we can corroborate.
//!
//! Types without an entry get no opinion: the declared type is trusted.

/// A fixed byte pattern expected at `offset`, optionally followed by a second marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicSignature {
    pub mime_type: &'static str,
    pub offset: usize,
    pub pattern: &'static [u8],
    /// Extra `(offset, pattern)` that must also match (WebP's `WEBP` tag inside RIFF)
    pub secondary: Option<(usize, &'static [u8])>,
}

pub const SIGNATURE_TABLE: &[MagicSignature] = &[
    MagicSignature {
        mime_type: "image/jpeg",
        offset: 0,
        pattern: &[0xFF, 0xD8, 0xFF],
        secondary: None,
    },
    MagicSignature {
        mime_type: "image/png",
        offset: 0,
        pattern: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        secondary: None,
    },
    MagicSignature {
        mime_type: "image/gif",
        offset: 0,
        pattern: b"GIF8",
        secondary: None,
    },
    MagicSignature {
        mime_type: "image/webp",
        offset: 0,
        pattern: b"RIFF",
        secondary: Some((8, b"WEBP")),
    },
    MagicSignature {
        mime_type: "application/pdf",
        offset: 0,
        pattern: b"%PDF",
        secondary: None,
    },
];

/// Result of comparing a buffer against the declared type's signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// No signature is registered for the declared type
    NoOpinion,
    Match,
    Mismatch,
}

impl MagicSignature {
    pub fn matches(&self, buffer: &[u8]) -> bool {
        let secondary_ok = match self.secondary {
            Some((offset, pattern)) => bytes_at(buffer, offset, pattern),
            None => true,
        };
        bytes_at(buffer, self.offset, self.pattern) && secondary_ok
    }
}

/// A buffer too short to hold the pattern does not match.
fn bytes_at(buffer: &[u8], offset: usize, pattern: &[u8]) -> bool {
    buffer
        .get(offset..offset + pattern.len())
        .is_some_and(|window| window == pattern)
}

/// Find the signature registered for an already-normalised MIME type
pub fn lookup_signature(mime_type: &str) -> Option<&'static MagicSignature> {
    SIGNATURE_TABLE.iter().find(|sig| sig.mime_type == mime_type)
}

pub fn check_signature(buffer: &[u8], mime_type: &str) -> SignatureCheck {
    match lookup_signature(mime_type) {
        None => SignatureCheck::NoOpinion,
        Some(sig) if sig.matches(buffer) => SignatureCheck::Match,
        Some(_) => SignatureCheck::Mismatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    fn webp() -> Vec<u8> {
        let mut data = b"RIFF".to_vec();
        data.extend_from_slice(&[0x24, 0, 0, 0]);
        data.extend_from_slice(b"WEBPVP8 ");
        data
    }

    #[test]
    fn test_declared_type_relative() {
        assert_eq!(check_signature(PNG, "image/png"), SignatureCheck::Match);
        assert_eq!(check_signature(PNG, "image/jpeg"), SignatureCheck::Mismatch);
    }

    #[test]
    fn test_webp_needs_both_markers() {
        assert_eq!(check_signature(&webp(), "image/webp"), SignatureCheck::Match);

        let mut no_riff = webp();
        no_riff[0..4].copy_from_slice(b"RIFX");
        assert_eq!(check_signature(&no_riff, "image/webp"), SignatureCheck::Mismatch);

        let mut no_tag = webp();
        no_tag[8..12].copy_from_slice(b"WAVE");
        assert_eq!(check_signature(&no_tag, "image/webp"), SignatureCheck::Mismatch);
    }

    #[test]
    fn test_short_buffer_is_mismatch() {
        assert_eq!(check_signature(b"RIFF", "image/webp"), SignatureCheck::Mismatch);
        assert_eq!(check_signature(&[0xFF, 0xD8], "image/jpeg"), SignatureCheck::Mismatch);
        assert_eq!(check_signature(b"", "application/pdf"), SignatureCheck::Mismatch);
    }

    #[test]
    fn test_unknown_type_has_no_opinion() {
        assert_eq!(check_signature(b"anything", "image/svg+xml"), SignatureCheck::NoOpinion);
        assert_eq!(check_signature(b"", "text/plain"), SignatureCheck::NoOpinion);
    }

    #[test]
    fn test_gif_variants() {
        assert_eq!(check_signature(b"GIF89a....", "image/gif"), SignatureCheck::Match);
        assert_eq!(check_signature(b"GIF87a....", "image/gif"), SignatureCheck::Match);
    }
}
