//! Encoding-robust feed decoding
//!
//! Supplier files arrive in whatever encoding the supplier's export tool
//! produced. Tries a fixed priority list of encodings over the whole buffer;
//! the first one that decodes without error wins. When everything fails the
//! buffer is decoded as UTF-8 with replacement characters and the result is
//! flagged as degraded so the import can count an encoding error. This
//! boundary never returns an error.

use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};

/// Encodings tried in order. The whole buffer is tested, not a prefix:
/// accents past an arbitrary cutoff must not slip through corrupted.
const CANDIDATES: &[&Encoding] = &[UTF_8, WINDOWS_1252, ISO_8859_15];

/// A decoded supplier feed
#[derive(Debug, Clone)]
pub struct DecodedFeed {
    pub text: String,
    /// Label of the encoding that won (e.g. "UTF-8", "windows-1252")
    pub encoding_label: &'static str,
    /// True when no candidate decoded cleanly and replacement characters
    /// were substituted
    pub degraded: bool,
}

impl DecodedFeed {
    /// Lines with trailing \r\n stripped, blank lines kept (callers skip
    /// them where relevant so row numbers stay aligned with the file)
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

/// Decode raw feed bytes, trying encodings in priority order.
pub fn decode_feed(bytes: &[u8]) -> DecodedFeed {
    decode_feed_with_hint(bytes, None)
}

/// Like [`decode_feed`], but tries the provider's configured encoding
/// first when one is set. An unknown label is ignored, not an error.
pub fn decode_feed_with_hint(bytes: &[u8], hint: Option<&str>) -> DecodedFeed {
    // A UTF-8 BOM decides immediately
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);

    if let Some(encoding) = hint.and_then(|label| Encoding::for_label(label.as_bytes())) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return DecodedFeed {
                text: text.into_owned(),
                encoding_label: encoding.name(),
                degraded: false,
            };
        }
    }

    for encoding in CANDIDATES {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return DecodedFeed {
                text: text.into_owned(),
                encoding_label: encoding.name(),
                degraded: false,
            };
        }
    }

    let (text, _, _) = UTF_8.decode(bytes);
    tracing::warn!(
        "feed decoding degraded: no candidate encoding decoded cleanly ({} bytes)",
        bytes.len()
    );
    DecodedFeed {
        text: text.into_owned(),
        encoding_label: "utf-8 (lossy)",
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let feed = decode_feed("Cafetière;12,50\n".as_bytes());
        assert_eq!(feed.encoding_label, "UTF-8");
        assert!(!feed.degraded);
        assert!(feed.text.contains("Cafetière"));
    }

    #[test]
    fn test_decode_utf8_bom_stripped() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice(b"EAN;Name\n");
        let feed = decode_feed(&bytes);
        assert!(feed.text.starts_with("EAN"));
        assert!(!feed.degraded);
    }

    #[test]
    fn test_decode_windows_1252_accents() {
        // "Cafetière" in windows-1252: è = 0xE8
        let bytes = b"Cafeti\xe8re;12,50\n";
        let feed = decode_feed(bytes);
        assert_eq!(feed.encoding_label, "windows-1252");
        assert!(feed.text.contains("Cafetière"));
        assert!(!feed.degraded);
    }

    #[test]
    fn test_decode_invalid_utf8_falls_through() {
        // Invalid UTF-8 sequence; windows-1252 accepts any byte, so the
        // feed decodes without degradation on the second candidate
        let bytes = b"abc\xc3\x28def";
        let feed = decode_feed(bytes);
        assert_eq!(feed.encoding_label, "windows-1252");
        assert!(!feed.degraded);
    }

    #[test]
    fn test_decode_never_fails_on_empty() {
        let feed = decode_feed(b"");
        assert_eq!(feed.text, "");
        assert!(!feed.degraded);
    }

    #[test]
    fn test_decode_hint_wins_when_it_decodes() {
        let bytes = b"Cafeti\xe8re\n";
        let feed = decode_feed_with_hint(bytes, Some("iso-8859-15"));
        assert_eq!(feed.encoding_label, "ISO-8859-15");
        assert!(feed.text.contains("Cafetière"));
    }

    #[test]
    fn test_decode_unknown_hint_ignored() {
        let feed = decode_feed_with_hint(b"plain\n", Some("no-such-encoding"));
        assert_eq!(feed.encoding_label, "UTF-8");
    }
}
