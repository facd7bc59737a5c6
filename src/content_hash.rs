//! Content fingerprints using BLAKE3
//!
//! A fingerprint identifies one exact source text. It is the first 128 bits
//! of the BLAKE3 digest, hex encoded, so identical input always yields the
//! same 32-character string across runs and platforms.
//!
//! # Example
//!
//! ```
//! use markdown_format_converter::content_hash::ContentHasher;
//!
//! let hasher = ContentHasher::new();
//! let fingerprint = hasher.fingerprint("# Hello World\n\nThis is a test.");
//!
//! assert_eq!(fingerprint.len(), 32);
//! assert_eq!(fingerprint, hasher.fingerprint("# Hello World\n\nThis is a test."));
//! ```

/// Number of digest bytes kept in a fingerprint
const FINGERPRINT_BYTES: usize = 16;

/// Fingerprint generator using BLAKE3
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentHasher;

impl ContentHasher {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint raw bytes
    pub fn fingerprint_bytes(&self, content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hex::encode(&hash.as_bytes()[..FINGERPRINT_BYTES])
    }

    /// Fingerprint source text
    pub fn fingerprint(&self, text: &str) -> String {
        self.fingerprint_bytes(text.as_bytes())
    }
}
