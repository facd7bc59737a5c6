//! Format converter - turns Markdown source into a packaged output file
//!
//! The converter parses the source once, dispatches to the renderer for the
//! requested [`OutputFormat`], and wraps the rendered content:
//!
//! - **HTML**: a complete document with an embedded stylesheet, optionally
//!   carrying metadata `<meta>` tags and optionally prettified
//! - **JSON**: `{metadata, content: {structure, html, plainText}}`
//! - **Plain text**: the rendition, optionally behind a metadata header
//!
//! # Failure policy
//!
//! [`FormatConverter::convert`] never returns an error and never panics
//! outward. Every failure, including a refused source, a timeout, or a panic
//! inside a renderer, comes back as a [`ConversionResult`] with
//! `success == false` and empty content, filename, and MIME type. [`FormatConverter::try_convert`]
//! exposes the same pipeline with typed errors.
//!
//! # Examples
//!
//! ```rust
//! use markdown_format_converter::converter::{ConversionOptions, FormatConverter, OutputFormat};
//!
//! let options = ConversionOptions {
//!     original_filename: Some("notes.md".to_string()),
//!     ..Default::default()
//! };
//! let result = FormatConverter::new().convert("# Notes\n\n- one", OutputFormat::Txt, &options);
//!
//! assert!(result.success);
//! assert_eq!(result.filename, "notes.txt");
//! assert_eq!(result.mime_type, "text/plain");
//! assert_eq!(result.content, "# Notes\n\n• one");
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::content_hash::ContentHasher;
use crate::document::DocumentNode;
use crate::error::ConversionError;
use crate::html_renderer::HtmlRenderer;
use crate::parser::parse_document;
use crate::security::{detect_malicious_content, escape_html, sanitize_filename};
use crate::stats::DocumentStats;
use crate::text_renderer::TextRenderer;
use crate::tree_renderer::TreeRenderer;

/// Value of the generator metadata field
pub const GENERATOR: &str = env!("CARGO_PKG_NAME");

/// Crate version reported in metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width of the separator under the plain-text header
const HEADER_SEPARATOR_WIDTH: usize = 50;

/// Stylesheet embedded in every HTML document
const HTML_STYLE: &str = "\
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; max-width: 800px; margin: 0 auto; padding: 2rem; color: #333; }
h1, h2, h3, h4, h5, h6 { margin-top: 1.5em; margin-bottom: 0.5em; line-height: 1.25; }
h1 { font-size: 2em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
h2 { font-size: 1.5em; border-bottom: 1px solid #eee; padding-bottom: 0.3em; }
h3 { font-size: 1.25em; }
code { background: #f6f8fa; padding: 0.2em 0.4em; border-radius: 3px; font-family: 'SFMono-Regular', Consolas, monospace; font-size: 85%; }
pre { background: #f6f8fa; padding: 1rem; border-radius: 6px; overflow-x: auto; }
pre code { background: none; padding: 0; }
blockquote { margin: 0; padding: 0 1em; color: #6a737d; border-left: 4px solid #dfe2e5; }
table { border-collapse: collapse; width: 100%; margin: 1em 0; }
th, td { border: 1px solid #dfe2e5; padding: 6px 13px; }
th { background: #f6f8fa; font-weight: 600; }
img { max-width: 100%; height: auto; }
hr { border: none; border-top: 1px solid #eee; margin: 2em 0; }";

/// Target representation of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Html,
    Json,
    Txt,
}

impl OutputFormat {
    /// Every format, in presentation order
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Html, OutputFormat::Json, OutputFormat::Txt];

    /// Short name, also the file extension
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Txt => "txt",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html",
            OutputFormat::Json => "application/json",
            OutputFormat::Txt => "text/plain",
        }
    }

    /// Human-readable name used in the plain-text header
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Html => "HTML",
            OutputFormat::Json => "JSON",
            OutputFormat::Txt => "Plain Text",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            "txt" | "text" | "plain" => Ok(OutputFormat::Txt),
            other => Err(format!(
                "unknown format '{}', expected one of: html, json, txt",
                other
            )),
        }
    }
}

/// Conversion options
#[derive(Debug, Clone, Default)]
pub struct ConversionOptions {
    /// Name of the source file, used to derive the output name
    pub original_filename: Option<String>,
    /// Reformat HTML with one tag per line, indent JSON
    pub prettify: bool,
    /// Add metadata to the packaged output
    pub include_metadata: bool,
    /// Maximum conversion time; zero means no limit
    pub timeout: Duration,
    /// Conversion timestamp; the current time when unset
    pub converted_at: Option<DateTime<Utc>>,
}

/// Outcome of one conversion
///
/// On failure `content`, `filename`, and `mime_type` are empty and `error`
/// carries the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub content: String,
    pub filename: String,
    pub mime_type: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Numeric code of the failure, see [`ConversionError::code`]
    #[serde(skip)]
    pub error_code: Option<u8>,
}

impl ConversionResult {
    pub fn success(content: String, filename: String, format: OutputFormat) -> Self {
        Self {
            content,
            filename,
            mime_type: format.mime_type().to_string(),
            success: true,
            error: None,
            error_code: None,
        }
    }

    pub fn failure(error: &ConversionError) -> Self {
        Self {
            content: String::new(),
            filename: String::new(),
            mime_type: String::new(),
            success: false,
            error: Some(error.to_string()),
            error_code: Some(error.code()),
        }
    }
}

/// Conversion context for timeout tracking
///
/// Tracks elapsed time and the number of processed nodes so renderers can
/// check the deadline cooperatively.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use markdown_format_converter::converter::ConversionContext;
///
/// let mut ctx = ConversionContext::new(Duration::from_secs(5));
/// for _ in 0..1000 {
///     ctx.increment_and_check()?;
/// }
/// assert_eq!(ctx.node_count(), 1000);
/// # Ok::<(), markdown_format_converter::error::ConversionError>(())
/// ```
#[derive(Debug)]
pub struct ConversionContext {
    start_time: Instant,
    /// Zero means no timeout
    timeout: Duration,
    node_count: u32,
}

impl ConversionContext {
    /// Node interval between deadline checks
    pub const CHECK_INTERVAL: u32 = 100;

    pub fn new(timeout: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            timeout,
            node_count: 0,
        }
    }

    /// Fail with [`ConversionError::Timeout`] once the deadline has passed
    pub fn check_timeout(&self) -> Result<(), ConversionError> {
        if self.timeout.is_zero() {
            return Ok(());
        }
        if self.start_time.elapsed() > self.timeout {
            return Err(ConversionError::Timeout);
        }
        Ok(())
    }

    /// Count one node and check the deadline every [`Self::CHECK_INTERVAL`] nodes
    pub fn increment_and_check(&mut self) -> Result<(), ConversionError> {
        self.node_count = self.node_count.saturating_add(1);
        if self.node_count.is_multiple_of(Self::CHECK_INTERVAL) {
            self.check_timeout()?;
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    filename: &'a str,
    converted_at: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<DocumentStats>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonContent {
    structure: serde_json::Value,
    html: String,
    plain_text: String,
}

#[derive(Serialize)]
struct JsonPackage<'a> {
    metadata: JsonMetadata<'a>,
    content: JsonContent,
}

/// Per-call values shared by the packaging steps
struct Packaging<'a> {
    source: &'a str,
    filename: &'a str,
    base_name: &'a str,
    converted_at: String,
    options: &'a ConversionOptions,
}

/// Markdown to HTML/JSON/plain-text converter
///
/// Stateless apart from its renderers; one instance can serve any number of
/// conversions.
pub struct FormatConverter {
    html_renderer: HtmlRenderer,
    text_renderer: TextRenderer,
    tree_renderer: TreeRenderer,
    hasher: ContentHasher,
}

impl FormatConverter {
    pub fn new() -> Self {
        Self::with_html_renderer(HtmlRenderer::new())
    }

    /// Create a converter with a custom HTML rendering policy
    pub fn with_html_renderer(html_renderer: HtmlRenderer) -> Self {
        Self {
            html_renderer,
            text_renderer: TextRenderer::new(),
            tree_renderer: TreeRenderer::new(),
            hasher: ContentHasher::new(),
        }
    }

    /// Convert `text` to `format`, reporting every failure in the result
    pub fn convert(
        &self,
        text: &str,
        format: OutputFormat,
        options: &ConversionOptions,
    ) -> ConversionResult {
        let converted_at = options.converted_at.unwrap_or_else(Utc::now);
        let filename = output_filename(options.original_filename.as_deref(), format, converted_at);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.convert_at(text, format, options, converted_at)
        }))
        .unwrap_or_else(|payload| {
            Err(ConversionError::Internal(format!(
                "conversion panicked: {}",
                panic_message(payload.as_ref())
            )))
        });

        match outcome {
            Ok(content) => ConversionResult::success(content, filename, format),
            Err(err) => {
                if matches!(err, ConversionError::MaliciousContent) {
                    warn!(format = %format, filename = %filename, "conversion refused: {}", err);
                } else {
                    error!(format = %format, filename = %filename, code = err.code(), "conversion failed: {}", err);
                }
                ConversionResult::failure(&err)
            }
        }
    }

    /// Convert `text` to `format`, returning the packaged content
    pub fn try_convert(
        &self,
        text: &str,
        format: OutputFormat,
        options: &ConversionOptions,
    ) -> Result<String, ConversionError> {
        let converted_at = options.converted_at.unwrap_or_else(Utc::now);
        self.convert_at(text, format, options, converted_at)
    }

    fn convert_at(
        &self,
        text: &str,
        format: OutputFormat,
        options: &ConversionOptions,
        converted_at: DateTime<Utc>,
    ) -> Result<String, ConversionError> {
        let mut ctx = ConversionContext::new(options.timeout);

        if detect_malicious_content(text) {
            return Err(ConversionError::MaliciousContent);
        }

        let base_name = base_filename(options.original_filename.as_deref(), converted_at);
        let filename = format!("{}.{}", base_name, format.extension());
        let packaging = Packaging {
            source: text,
            filename: &filename,
            base_name: &base_name,
            converted_at: converted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            options,
        };

        let nodes = parse_document(text);
        ctx.check_timeout()?;
        debug!(format = %format, nodes = nodes.len(), "parsed source");

        let content = match format {
            OutputFormat::Html => self.package_html(&nodes, &packaging, &mut ctx)?,
            OutputFormat::Json => self.package_json(&nodes, &packaging, &mut ctx)?,
            OutputFormat::Txt => self.package_text(&nodes, &packaging, &mut ctx)?,
        };
        ctx.check_timeout()?;

        info!(
            format = %format,
            filename = %filename,
            bytes = content.len(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "conversion complete"
        );
        Ok(content)
    }

    fn package_html(
        &self,
        nodes: &[DocumentNode],
        packaging: &Packaging<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let body = self.html_renderer.render_with_context(nodes, ctx)?;

        let mut meta = String::new();
        if packaging.options.include_metadata {
            let source_file = packaging
                .options
                .original_filename
                .as_deref()
                .unwrap_or(packaging.filename);
            for (name, value) in [
                ("generator", format!("{} {}", GENERATOR, VERSION)),
                ("source-file", source_file.to_string()),
                ("converted-at", packaging.converted_at.clone()),
                ("content-hash", self.hasher.fingerprint(packaging.source)),
            ] {
                meta.push_str(&format!(
                    "<meta name=\"{}\" content=\"{}\">\n",
                    name,
                    escape_html(&value)
                ));
            }
        }

        let document = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             {meta}<title>{title}</title>\n<style>\n{style}\n</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
            meta = meta,
            title = escape_html(packaging.base_name),
            style = HTML_STYLE,
            body = body,
        );

        Ok(if packaging.options.prettify {
            prettify_html(&document)
        } else {
            document
        })
    }

    fn package_json(
        &self,
        nodes: &[DocumentNode],
        packaging: &Packaging<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let structure = self.tree_renderer.to_value_with_context(nodes, ctx)?;
        let html = self.html_renderer.render_with_context(nodes, ctx)?;
        let plain_text = self.text_renderer.render_with_context(nodes, ctx)?;

        let with_metadata = packaging.options.include_metadata;
        let package = JsonPackage {
            metadata: JsonMetadata {
                filename: packaging.filename,
                converted_at: &packaging.converted_at,
                format: OutputFormat::Json.as_str(),
                generator: with_metadata.then_some(GENERATOR),
                version: with_metadata.then_some(VERSION),
                source_file: packaging
                    .options
                    .original_filename
                    .as_deref()
                    .filter(|_| with_metadata),
                content_hash: with_metadata.then(|| self.hasher.fingerprint(packaging.source)),
                stats: with_metadata.then(|| DocumentStats::from_text(packaging.source)),
            },
            content: JsonContent {
                structure,
                html,
                plain_text,
            },
        };

        let json = if packaging.options.prettify {
            serde_json::to_string_pretty(&package)?
        } else {
            serde_json::to_string(&package)?
        };
        Ok(json)
    }

    fn package_text(
        &self,
        nodes: &[DocumentNode],
        packaging: &Packaging<'_>,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let plain_text = self.text_renderer.render_with_context(nodes, ctx)?;
        if !packaging.options.include_metadata {
            return Ok(plain_text);
        }

        let source_file = packaging
            .options
            .original_filename
            .as_deref()
            .unwrap_or(packaging.filename);
        let stats = DocumentStats::from_text(packaging.source);
        Ok(format!(
            "File: {}\nConverted: {}\nFormat: {}\nWords: {}\n{}\n\n{}",
            source_file,
            packaging.converted_at,
            OutputFormat::Txt.label(),
            stats.words,
            "=".repeat(HEADER_SEPARATOR_WIDTH),
            plain_text
        ))
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert with a default [`FormatConverter`]
pub fn convert(text: &str, format: OutputFormat, options: &ConversionOptions) -> ConversionResult {
    FormatConverter::new().convert(text, format, options)
}

/// Derive the output base name from the source file name
///
/// The last extension is stripped and the rest sanitized. Without a usable
/// name the base is `converted_<unix millis>`.
///
/// # Examples
///
/// ```rust
/// use chrono::Utc;
/// use markdown_format_converter::converter::base_filename;
///
/// assert_eq!(base_filename(Some("My Notes.md"), Utc::now()), "My_Notes");
/// assert!(base_filename(None, Utc::now()).starts_with("converted_"));
/// ```
pub fn base_filename(original: Option<&str>, now: DateTime<Utc>) -> String {
    let stem = original.map(strip_extension).map(sanitize_filename);
    match stem {
        Some(stem) if !stem.is_empty() => stem,
        _ => format!("converted_{}", now.timestamp_millis()),
    }
}

fn output_filename(original: Option<&str>, format: OutputFormat, now: DateTime<Utc>) -> String {
    format!("{}.{}", base_filename(original, now), format.extension())
}

fn strip_extension(name: &str) -> &str {
    let file_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &name[..file_start + dot],
        _ => name,
    }
}

fn tag_boundary_regex() -> &'static Regex {
    static TAG_BOUNDARY: OnceLock<Regex> = OnceLock::new();
    TAG_BOUNDARY.get_or_init(|| Regex::new(r">\s*<").expect("tag boundary pattern is valid"))
}

fn blank_lines_regex() -> &'static Regex {
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();
    BLANK_LINES.get_or_init(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"))
}

fn preformatted_regex() -> &'static Regex {
    static PREFORMATTED: OnceLock<Regex> = OnceLock::new();
    PREFORMATTED
        .get_or_init(|| Regex::new(r"(?s)<pre>.*?</pre>").expect("preformatted pattern is valid"))
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"<pre>(\d+)</pre>").expect("placeholder pattern is valid"))
}

/// Put adjacent tags on separate lines and drop blank lines
///
/// `<pre>` elements are masked before reflowing and restored verbatim.
pub fn prettify_html(html: &str) -> String {
    let mut preserved = Vec::new();
    let masked = preformatted_regex().replace_all(html, |caps: &Captures<'_>| {
        preserved.push(caps[0].to_string());
        format!("<pre>{}</pre>", preserved.len() - 1)
    });

    let split = tag_boundary_regex().replace_all(&masked, ">\n<");
    let compact = blank_lines_regex().replace_all(&split, "\n");
    let restored = placeholder_regex().replace_all(&compact, |caps: &Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| preserved.get(index))
            .cloned()
            .unwrap_or_default()
    });

    format!("{}\n", restored.trim())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap()
    }

    fn options(name: &str) -> ConversionOptions {
        ConversionOptions {
            original_filename: Some(name.to_string()),
            converted_at: Some(fixed_time()),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_format_properties() {
        assert_eq!(OutputFormat::Html.mime_type(), "text/html");
        assert_eq!(OutputFormat::Json.mime_type(), "application/json");
        assert_eq!(OutputFormat::Txt.mime_type(), "text/plain");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Txt));
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_base_filename() {
        let now = fixed_time();
        assert_eq!(base_filename(Some("report.md"), now), "report");
        assert_eq!(base_filename(Some("archive.tar.md"), now), "archive.tar");
        assert_eq!(base_filename(Some(".md"), now), "md");
        assert_eq!(base_filename(Some("../../etc/passwd.md"), now), "_.._etc_passwd");
        assert_eq!(base_filename(Some("dir.v2/README"), now), "dir.v2_README");
        assert_eq!(base_filename(None, now), format!("converted_{}", now.timestamp_millis()));
        assert_eq!(base_filename(Some("..."), now), format!("converted_{}", now.timestamp_millis()));
    }

    #[test]
    fn test_html_document_shell() {
        let result = convert("# Hi", OutputFormat::Html, &options("hi.md"));
        assert!(result.success);
        assert_eq!(result.filename, "hi.html");
        assert!(result.content.starts_with("<!DOCTYPE html>"));
        assert!(result.content.contains("<title>hi</title>"));
        assert!(result.content.contains("<style>"));
        assert!(result.content.contains("<h1>Hi</h1>"));
        assert!(!result.content.contains("name=\"generator\""));
    }

    #[test]
    fn test_html_metadata_tags() {
        let opts = ConversionOptions {
            include_metadata: true,
            ..options("hi.md")
        };
        let result = convert("# Hi", OutputFormat::Html, &opts);
        assert!(result.content.contains("<meta name=\"source-file\" content=\"hi.md\">"));
        assert!(result
            .content
            .contains("<meta name=\"converted-at\" content=\"2026-03-14T15:09:26.000Z\">"));
        assert!(result.content.contains(&format!(
            "<meta name=\"content-hash\" content=\"{}\">",
            ContentHasher::new().fingerprint("# Hi")
        )));
    }

    #[test]
    fn test_prettify_html() {
        assert_eq!(prettify_html("<p>a</p>  <p>b</p>"), "<p>a</p>\n<p>b</p>\n");
        assert_eq!(
            prettify_html("<div>\n\n\n<p>x</p></div>"),
            "<div>\n<p>x</p>\n</div>\n"
        );
    }

    #[test]
    fn test_prettify_keeps_preformatted_text() {
        let html = "<p>a</p><pre><code>x\n\n  <b>\n</code></pre><p>b</p>";
        assert_eq!(
            prettify_html(html),
            "<p>a</p>\n<pre><code>x\n\n  <b>\n</code></pre>\n<p>b</p>\n"
        );
    }

    #[test]
    fn test_prettified_code_block_survives() {
        let opts = ConversionOptions {
            prettify: true,
            ..options("c.md")
        };
        let result = convert("```\nline 1\n\n    line 3\n```", OutputFormat::Html, &opts);
        assert!(result.content.contains("<pre><code>line 1\n\n    line 3</code></pre>"));
        assert!(!result.content.contains("\n\n\n"));
    }

    #[test]
    fn test_json_package() {
        let result = convert("# T\n\nbody", OutputFormat::Json, &options("t.md"));
        assert!(result.success);
        assert_eq!(result.filename, "t.json");

        let value: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(value["metadata"]["filename"], "t.json");
        assert_eq!(value["metadata"]["convertedAt"], "2026-03-14T15:09:26.000Z");
        assert_eq!(value["metadata"]["format"], "json");
        assert!(value["metadata"].get("generator").is_none());
        assert_eq!(value["content"]["structure"]["type"], "document");
        assert_eq!(value["content"]["html"], "<h1>T</h1>\n<p>body</p>");
        assert_eq!(value["content"]["plainText"], "# T\n\nbody");
        assert!(!result.content.contains('\n'));
    }

    #[test]
    fn test_json_metadata() {
        let opts = ConversionOptions {
            include_metadata: true,
            ..options("t.md")
        };
        let result = convert("one two three", OutputFormat::Json, &opts);
        let value: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(value["metadata"]["generator"], GENERATOR);
        assert_eq!(value["metadata"]["version"], VERSION);
        assert_eq!(value["metadata"]["sourceFile"], "t.md");
        assert_eq!(value["metadata"]["stats"]["words"], 3);
        assert_eq!(
            value["metadata"]["contentHash"],
            ContentHasher::new().fingerprint("one two three")
        );
    }

    #[test]
    fn test_text_header() {
        let opts = ConversionOptions {
            include_metadata: true,
            ..options("t.md")
        };
        let result = convert("one two", OutputFormat::Txt, &opts);
        assert_eq!(
            result.content,
            format!(
                "File: t.md\nConverted: 2026-03-14T15:09:26.000Z\nFormat: Plain Text\nWords: 2\n{}\n\none two",
                "=".repeat(50)
            )
        );
    }

    #[test]
    fn test_malicious_source_refused() {
        let result = convert(
            "click <a onclick=\"evil()\">here</a>",
            OutputFormat::Html,
            &options("x.md"),
        );
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert_eq!(
            result.error.as_deref(),
            Some("Potentially malicious content detected")
        );
        assert_eq!(result.error_code, Some(3));
        assert!(result.filename.is_empty());
        assert!(result.mime_type.is_empty());
    }

    #[test]
    fn test_try_convert_reports_typed_errors() {
        let err = FormatConverter::new()
            .try_convert("<script>x</script>", OutputFormat::Txt, &options("x.md"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::MaliciousContent));
    }

    #[test]
    fn test_empty_source_converts() {
        for format in OutputFormat::ALL {
            let result = convert("", format, &options("empty.md"));
            assert!(result.success, "{} failed: {:?}", format, result.error);
        }
    }

    #[test]
    fn test_context_checkpoints() {
        let mut ctx = ConversionContext::new(Duration::ZERO);
        for _ in 0..250 {
            ctx.increment_and_check().unwrap();
        }
        assert_eq!(ctx.node_count(), 250);
        assert!(ctx.check_timeout().is_ok());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
