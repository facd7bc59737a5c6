//! Character decoding for file input
//!
//! Source files reach the converter as bytes. They are decoded with the
//! following cascade:
//!
//! 1. **Declared charset**: a label such as `latin1` or a Content-Type style
//!    value such as `text/markdown; charset=ISO-8859-1`
//! 2. **Byte order mark**: UTF-8, UTF-16LE, or UTF-16BE
//! 3. **Strict UTF-8**
//! 4. **windows-1252**, which maps every byte and therefore never fails
//!
//! A declared charset is trusted: bytes that are invalid for it are an
//! error rather than a reason to guess.
//!
//! # Examples
//!
//! ```rust
//! use markdown_format_converter::charset::decode_text;
//!
//! let decoded = decode_text("# Café".as_bytes(), None).unwrap();
//! assert_eq!(decoded.text, "# Café");
//! assert_eq!(decoded.encoding, "UTF-8");
//!
//! let decoded = decode_text(b"# Caf\xe9", Some("iso-8859-1")).unwrap();
//! assert_eq!(decoded.text, "# Café");
//! ```

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::ConversionError;

/// Text decoded from bytes together with the encoding that was used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static str,
}

/// Decode source bytes to UTF-8 text
pub fn decode_text(bytes: &[u8], declared: Option<&str>) -> Result<DecodedText, ConversionError> {
    if let Some(declared) = declared {
        let label = extract_charset_from_content_type(declared)
            .unwrap_or_else(|| declared.trim().to_string());
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            ConversionError::Encoding(format!("Unsupported charset '{}'", label))
        })?;
        return decode_strict(bytes, encoding);
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        debug!(encoding = encoding.name(), "decoding by byte order mark");
        return decode_strict(&bytes[bom_len..], encoding);
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(DecodedText {
            text: text.to_string(),
            encoding: UTF_8.name(),
        });
    }

    debug!("input is not valid UTF-8, falling back to windows-1252");
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: WINDOWS_1252.name(),
    })
}

fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedText, ConversionError> {
    if encoding == UTF_8 {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ConversionError::Encoding(format!(
                "Invalid UTF-8 at byte position {}: {}",
                e.valid_up_to(),
                e
            ))
        })?;
        return Ok(DecodedText {
            text: text.to_string(),
            encoding: UTF_8.name(),
        });
    }

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or_else(|| {
            ConversionError::Encoding(format!(
                "Invalid byte sequence for charset '{}'",
                encoding.name()
            ))
        })?;
    Ok(DecodedText {
        text: text.into_owned(),
        encoding: encoding.name(),
    })
}

/// Extract the `charset` parameter from a Content-Type style value
///
/// # Examples
///
/// ```rust
/// use markdown_format_converter::charset::extract_charset_from_content_type;
///
/// assert_eq!(
///     extract_charset_from_content_type("text/markdown; charset=\"ISO-8859-1\""),
///     Some("ISO-8859-1".to_string())
/// );
/// assert_eq!(extract_charset_from_content_type("text/markdown"), None);
/// ```
pub fn extract_charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex =
        CHARSET_REGEX.get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok());
    let regex = regex.as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
