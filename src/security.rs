//! Input validation and sanitization for untrusted Markdown sources
//!
//! This module implements the guards that sit at the edges of the
//! conversion pipeline:
//!
//! - File metadata checks (size and extension) before a file is read
//! - Content length checks on decoded text
//! - Download filename sanitization
//! - A heuristic detector for script, executable-URL, and event-handler
//!   signatures in the *source* text
//! - URL scheme allow-listing for every link and image the renderer emits
//!
//! # Defense Layers
//!
//! 1. **Input Validation**: size, type, and length guards evaluated by the caller
//! 2. **Signature Detection**: fail-fast refusal of obviously hostile source text
//! 3. **URL Sanitization**: only `http`, `https`, and `mailto` survive rendering
//! 4. **Allow-list Pass**: rendered markup is re-parsed and rebuilt from a fixed
//!    tag/attribute set (see [`crate::html_sanitizer`]); this layer is authoritative
//!
//! The signature detector is trivially incomplete (obfuscated payloads bypass
//! it) and must never be relied on alone.

use regex::RegexSet;
use std::sync::OnceLock;
use url::Url;

use crate::error::ValidationError;

/// Default maximum file size accepted by [`validate_file`] (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Default maximum decoded content length in characters (1 Mi chars)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 1024 * 1024;

/// Extensions accepted by default
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".md", ".markdown", ".txt"];

/// Maximum length of a sanitized filename
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Replacement for URLs that fail the scheme allow-list
pub const URL_PLACEHOLDER: &str = "#";

/// Maximum allowed nesting depth for rendered HTML elements
const MAX_NESTING_DEPTH: usize = 1000;

/// URL schemes that survive sanitization
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Tags kept by the allow-list pass
pub const ALLOWED_TAGS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "p",
    "br",
    "hr",
    "strong",
    "em",
    "u",
    "s",
    "ul",
    "ol",
    "li",
    "blockquote",
    "code",
    "pre",
    "a",
    "img",
    "table",
    "thead",
    "tbody",
    "tr",
    "td",
    "th",
];

/// Attributes kept by the allow-list pass
pub const ALLOWED_ATTRIBUTES: &[&str] = &["href", "src", "alt", "title", "target", "rel"];

/// Elements removed together with everything inside them
const FORBIDDEN_ELEMENTS: &[&str] = &[
    "script",   // JavaScript execution
    "style",    // CSS injection
    "object",   // Can execute plugins
    "embed",    // Can execute plugins
    "applet",   // Legacy Java applets
    "form",     // Credential phishing
    "input",    // Credential phishing
    "button",   // Form submission
    "textarea", // Form submission
    "select",   // Form submission
    "iframe",   // Can load external content
    "noscript", // Alternative content
    "template", // Inert content that can be re-activated
    "link",     // External stylesheets
    "meta",     // Refresh redirects
    "base",     // Changes base URL for relative URLs
    "svg",      // Script-capable foreign content
    "math",     // Foreign content parsing differentials
];

/// Signatures checked by [`detect_malicious_content`]
const MALICIOUS_SIGNATURES: &[&str] = &[
    r"(?i)<script",
    r"(?i)javascript\s*:",
    r"(?i)data\s*:\s*text/html",
    r"(?i)vbscript\s*:",
    r"(?i)<[^>]*\bon[a-z]+\s*=",
    r"(?i)\beval\s*\(",
    r"(?i)document\s*\.\s*write",
];

fn malicious_signature_set() -> &'static RegexSet {
    static SIGNATURES: OnceLock<RegexSet> = OnceLock::new();
    SIGNATURES.get_or_init(|| {
        RegexSet::new(MALICIOUS_SIGNATURES).expect("malicious signature patterns are valid")
    })
}

/// Outcome of a guard function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    /// A passing result
    pub fn ok() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    /// A failing result carrying a user-facing message
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

impl From<Result<(), ValidationError>> for ValidationResult {
    fn from(result: Result<(), ValidationError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::invalid(err.to_string()),
        }
    }
}

/// Limits applied by the file guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Maximum file size in bytes
    pub max_size: u64,
    /// Accepted extensions, including the leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Check file size and extension
///
/// The size check runs first; the extension comparison is case-insensitive.
pub fn check_file(size: u64, name: &str, options: &ValidationOptions) -> Result<(), ValidationError> {
    if size > options.max_size {
        return Err(ValidationError::SizeExceeded {
            size,
            max: options.max_size,
        });
    }

    let lowered = name.to_lowercase();
    let allowed = options
        .allowed_extensions
        .iter()
        .any(|ext| lowered.ends_with(&ext.to_lowercase()));

    if !allowed {
        return Err(ValidationError::InvalidType {
            name: name.to_string(),
            allowed: options.allowed_extensions.join(", "),
        });
    }

    Ok(())
}

/// Validate file metadata before reading it
///
/// # Examples
///
/// ```
/// use markdown_format_converter::security::{validate_file, ValidationOptions};
///
/// let options = ValidationOptions::default();
/// assert!(validate_file(1024, "notes.MD", &options).is_valid);
/// assert!(!validate_file(1024, "payload.exe", &options).is_valid);
/// ```
pub fn validate_file(size: u64, name: &str, options: &ValidationOptions) -> ValidationResult {
    check_file(size, name, options).into()
}

/// Check decoded text length, counted in characters
pub fn check_content(text: &str, max_length: usize) -> Result<(), ValidationError> {
    let length = text.chars().count();
    if length > max_length {
        return Err(ValidationError::ContentTooLarge {
            length,
            max: max_length,
        });
    }
    Ok(())
}

/// Validate decoded text length
pub fn validate_content(text: &str, max_length: usize) -> ValidationResult {
    check_content(text, max_length).into()
}

/// Make a filename safe for use as a download name
///
/// Every character outside `[A-Za-z0-9._-]` becomes `_`, leading and
/// trailing dots are stripped, and the result is truncated to
/// [`MAX_FILENAME_LENGTH`]. The result may be empty; callers substitute
/// their own fallback name in that case.
///
/// # Examples
///
/// ```
/// use markdown_format_converter::security::sanitize_filename;
///
/// let name = sanitize_filename("../../etc/passwd.md");
/// assert!(!name.contains('/'));
/// assert!(!name.starts_with('.'));
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Only ASCII remains, so byte truncation is char-safe
    let mut trimmed = replaced.trim_matches('.').to_string();
    trimmed.truncate(MAX_FILENAME_LENGTH);
    trimmed.trim_end_matches('.').to_string()
}

/// Heuristic check of source text for script and handler signatures
///
/// # Examples
///
/// ```
/// use markdown_format_converter::security::detect_malicious_content;
///
/// assert!(detect_malicious_content("click <a onclick=\"evil()\">here</a>"));
/// assert!(!detect_malicious_content("# Plain heading"));
/// ```
pub fn detect_malicious_content(text: &str) -> bool {
    malicious_signature_set().is_match(text)
}

/// Signatures matched by `text`, for logging
pub fn malicious_signatures(text: &str) -> Vec<&'static str> {
    malicious_signature_set()
        .matches(text)
        .into_iter()
        .map(|idx| MALICIOUS_SIGNATURES[idx])
        .collect()
}

/// Return `url` unchanged when it parses as an absolute URL with an
/// allow-listed scheme, else [`URL_PLACEHOLDER`]
///
/// Surrounding whitespace is ignored for the check but kept in the result.
/// Relative references do not parse on their own and are replaced.
///
/// # Examples
///
/// ```
/// use markdown_format_converter::security::sanitize_url;
///
/// assert_eq!(sanitize_url("https://example.com"), "https://example.com");
/// assert_eq!(sanitize_url("javascript:alert(1)"), "#");
/// assert_eq!(sanitize_url("/relative/path"), "#");
/// assert_eq!(sanitize_url("https://exa mple.com"), "#");
/// ```
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.chars().any(|c| c.is_control()) {
        return URL_PLACEHOLDER.to_string();
    }
    match Url::parse(trimmed) {
        Ok(parsed) if ALLOWED_URL_SCHEMES.contains(&parsed.scheme()) => url.to_string(),
        _ => URL_PLACEHOLDER.to_string(),
    }
}

/// Escape `& < > " '` for embedding in markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Action to take when sanitizing an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeAction {
    /// Keep the element
    Allow,
    /// Drop the element but keep its children
    Unwrap,
    /// Remove the element and all its children
    Remove,
}

/// Allow-list policy for rendered HTML
///
/// Provides the per-element and per-attribute decisions used by the
/// allow-list pass.
pub struct SecurityValidator {
    /// Maximum allowed nesting depth
    max_depth: usize,
}

impl SecurityValidator {
    /// Create a new security validator with default settings
    pub fn new() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
        }
    }

    /// Create a security validator with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Decide what happens to an element
    ///
    /// # Examples
    ///
    /// ```
    /// use markdown_format_converter::security::{SecurityValidator, SanitizeAction};
    ///
    /// let validator = SecurityValidator::new();
    /// assert_eq!(validator.check_element("script"), SanitizeAction::Remove);
    /// assert_eq!(validator.check_element("div"), SanitizeAction::Unwrap);
    /// assert_eq!(validator.check_element("em"), SanitizeAction::Allow);
    /// ```
    pub fn check_element(&self, tag_name: &str) -> SanitizeAction {
        let tag = tag_name.to_ascii_lowercase();
        if FORBIDDEN_ELEMENTS.contains(&tag.as_str()) {
            SanitizeAction::Remove
        } else if ALLOWED_TAGS.contains(&tag.as_str()) {
            SanitizeAction::Allow
        } else {
            SanitizeAction::Unwrap
        }
    }

    /// Check if an attribute is an inline event handler (`on*`)
    pub fn is_event_handler(&self, attr_name: &str) -> bool {
        attr_name.len() > 2
            && attr_name
                .get(..2)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("on"))
    }

    /// Check if an attribute survives the allow-list pass
    ///
    /// Event handlers and `style` are refused even if they were ever added
    /// to the allow-list.
    pub fn is_allowed_attribute(&self, attr_name: &str) -> bool {
        let name = attr_name.to_ascii_lowercase();
        if self.is_event_handler(&name) || name == "style" {
            return false;
        }
        ALLOWED_ATTRIBUTES.contains(&name.as_str())
    }

    /// Check if an attribute carries a URL that must be re-sanitized
    pub fn is_url_attribute(&self, attr_name: &str) -> bool {
        attr_name.eq_ignore_ascii_case("href") || attr_name.eq_ignore_ascii_case("src")
    }

    /// Validate nesting depth to prevent stack overflow
    ///
    /// # Examples
    ///
    /// ```
    /// use markdown_format_converter::security::SecurityValidator;
    ///
    /// let validator = SecurityValidator::with_max_depth(100);
    /// assert!(validator.validate_depth(50).is_ok());
    /// assert!(validator.validate_depth(150).is_err());
    /// ```
    pub fn validate_depth(&self, depth: usize) -> Result<(), String> {
        if depth > self.max_depth {
            Err(format!(
                "HTML nesting depth {} exceeds maximum allowed depth {}",
                depth, self.max_depth
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_file_accepts_allowed_extensions() {
        let options = ValidationOptions::default();
        assert!(validate_file(10, "readme.md", &options).is_valid);
        assert!(validate_file(10, "README.MARKDOWN", &options).is_valid);
        assert!(validate_file(10, "notes.txt", &options).is_valid);
    }

    #[test]
    fn test_validate_file_rejects_size_before_type() {
        let options = ValidationOptions {
            max_size: 100,
            ..Default::default()
        };
        let result = check_file(101, "payload.exe", &options);
        assert_eq!(
            result,
            Err(ValidationError::SizeExceeded { size: 101, max: 100 })
        );
        assert!(check_file(100, "ok.md", &options).is_ok());
    }

    #[test]
    fn test_validate_file_rejects_other_types() {
        let options = ValidationOptions::default();
        let result = validate_file(10, "image.png", &options);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("Invalid file type"));
        assert!(!validate_file(10, "md", &options).is_valid);
    }

    #[test]
    fn test_validate_content_counts_characters() {
        // Four characters, twelve bytes
        let text = "世界世界";
        assert!(validate_content(text, 4).is_valid);
        let result = validate_content(text, 3);
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("exceeds maximum"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my notes (1).md"), "my_notes__1_.md");
        assert_eq!(sanitize_filename("...hidden..."), "hidden");
        assert_eq!(sanitize_filename("résumé.md"), "r_sum_.md");
        assert_eq!(sanitize_filename(""), "");

        let traversal = sanitize_filename("../../etc/passwd.md");
        assert!(!traversal.contains('/'));
        assert!(!traversal.starts_with('.'));
    }

    #[test]
    fn test_sanitize_filename_truncates() {
        let long = "a".repeat(400);
        assert_eq!(sanitize_filename(&long).len(), MAX_FILENAME_LENGTH);
    }

    #[test]
    fn test_detect_malicious_content() {
        assert!(detect_malicious_content("<script>alert(1)</script>"));
        assert!(detect_malicious_content("<SCRIPT src=x>"));
        assert!(detect_malicious_content("[x](javascript:alert(1))"));
        assert!(detect_malicious_content("data:text/html,<b>"));
        assert!(detect_malicious_content("vbscript:msgbox"));
        assert!(detect_malicious_content("<img src=x onerror=alert(1)>"));
        assert!(detect_malicious_content("eval(atob('x'))"));
        assert!(detect_malicious_content("document.write('x')"));

        assert!(!detect_malicious_content("# Title\n\nSome *text*"));
        assert!(!detect_malicious_content("let one = 1;"));
        assert!(!detect_malicious_content("Evaluation (draft) notes"));
    }

    #[test]
    fn test_malicious_signatures_reports_matches() {
        let matched = malicious_signatures("<script>eval(x)</script>");
        assert_eq!(matched.len(), 2);
        assert!(malicious_signatures("plain").is_empty());
    }

    #[test]
    fn test_sanitize_url() {
        assert_eq!(sanitize_url("http://example.com"), "http://example.com");
        assert_eq!(sanitize_url(" HTTPS://example.com "), " HTTPS://example.com ");
        assert_eq!(sanitize_url("mailto:me@example.com"), "mailto:me@example.com");
        assert_eq!(
            sanitize_url("https://example.com/a_(b)?q=1#frag"),
            "https://example.com/a_(b)?q=1#frag"
        );

        assert_eq!(sanitize_url("javascript:alert(1)"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("JaVaScRiPt:alert(1)"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("java\tscript:alert(1)"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("data:text/html,<script>"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("file:///etc/passwd"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("relative/path"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url(""), URL_PLACEHOLDER);
    }

    #[test]
    fn test_sanitize_url_rejects_malformed() {
        assert_eq!(sanitize_url("http://"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("https:"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("https://exa mple.com"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("http://[::1"), URL_PLACEHOLDER);
        assert_eq!(sanitize_url("https://[::1]:8080/ok"), "https://[::1]:8080/ok");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_element_actions() {
        let validator = SecurityValidator::new();
        for tag in ["script", "object", "embed", "form", "input", "iframe", "style"] {
            assert_eq!(validator.check_element(tag), SanitizeAction::Remove, "{tag}");
        }
        for tag in ["h1", "p", "a", "img", "table", "td", "pre", "code", "hr"] {
            assert_eq!(validator.check_element(tag), SanitizeAction::Allow, "{tag}");
        }
        assert_eq!(validator.check_element("div"), SanitizeAction::Unwrap);
        assert_eq!(validator.check_element("span"), SanitizeAction::Unwrap);
        assert_eq!(validator.check_element("SCRIPT"), SanitizeAction::Remove);
    }

    #[test]
    fn test_attribute_policy() {
        let validator = SecurityValidator::new();
        assert!(validator.is_allowed_attribute("href"));
        assert!(validator.is_allowed_attribute("ALT"));
        assert!(!validator.is_allowed_attribute("onclick"));
        assert!(!validator.is_allowed_attribute("style"));
        assert!(!validator.is_allowed_attribute("class"));
        assert!(validator.is_event_handler("onMouseOver"));
        assert!(!validator.is_event_handler("on"));
        assert!(validator.is_url_attribute("SRC"));
    }

    #[test]
    fn test_depth_validation() {
        let validator = SecurityValidator::with_max_depth(100);

        assert!(validator.validate_depth(50).is_ok());
        assert!(validator.validate_depth(100).is_ok());
        assert!(validator.validate_depth(101).is_err());
    }

    proptest! {
        #[test]
        fn prop_non_allowlisted_schemes_are_replaced(
            leading_ws in "[ \\t\\n\\r]{0,3}",
            payload in "[A-Za-z0-9_/?=&:%#.-]{0,64}",
            uppercase in any::<bool>(),
        ) {
            let schemes = ["javascript:", "data:", "vbscript:", "file:", "about:", "ftp:"];

            for scheme in schemes {
                let scheme_variant = if uppercase {
                    scheme.to_uppercase()
                } else {
                    scheme.to_string()
                };
                let candidate = format!("{leading_ws}{scheme_variant}{payload}");

                prop_assert_eq!(
                    sanitize_url(&candidate),
                    URL_PLACEHOLDER,
                    "Scheme should be replaced regardless of case/leading whitespace: {}",
                    candidate
                );
            }
        }

        #[test]
        fn prop_sanitized_filenames_are_safe(name in "\\PC{0,300}") {
            let safe = sanitize_filename(&name);
            prop_assert!(safe.len() <= MAX_FILENAME_LENGTH);
            prop_assert!(!safe.starts_with('.'));
            prop_assert!(!safe.ends_with('.'));
            prop_assert!(safe
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
        }
    }
}
