//! HTML renderer
//!
//! Maps document nodes to markup and runs the result through the allow-list
//! pass in [`crate::html_sanitizer`]. Inline text is emitted as-is so inline
//! HTML in the source reaches the sanitizer, which is the component that
//! decides what survives.
//!
//! Link and image URLs go through the transform functions held in
//! [`HtmlRenderConfig`]; by default both are [`sanitize_url`].

use tracing::debug;

use crate::converter::ConversionContext;
use crate::document::{DocumentNode, ListItem};
use crate::error::ConversionError;
use crate::html_sanitizer::HtmlSanitizer;
use crate::inline::{Span, parse_inline};
use crate::security::{escape_html, sanitize_url};

/// Pure URL rewrite applied to link and image destinations
pub type UrlTransform = fn(&str) -> String;

/// Rendering policy for links, images, and line breaks
#[derive(Debug, Clone, Copy)]
pub struct HtmlRenderConfig {
    /// Applied to every `href`
    pub link_url: UrlTransform,
    /// Applied to every `src`
    pub image_url: UrlTransform,
    /// Emit `<br>` for line breaks inside a block instead of a newline
    pub line_breaks: bool,
}

impl Default for HtmlRenderConfig {
    fn default() -> Self {
        Self {
            link_url: sanitize_url,
            image_url: sanitize_url,
            line_breaks: true,
        }
    }
}

/// Renders document nodes to sanitized HTML
pub struct HtmlRenderer {
    config: HtmlRenderConfig,
    sanitizer: HtmlSanitizer,
}

impl HtmlRenderer {
    pub fn new() -> Self {
        Self::with_config(HtmlRenderConfig::default())
    }

    pub fn with_config(config: HtmlRenderConfig) -> Self {
        Self {
            config,
            sanitizer: HtmlSanitizer::new(),
        }
    }

    /// Render nodes to sanitized markup
    ///
    /// # Examples
    ///
    /// ```rust
    /// use markdown_format_converter::html_renderer::HtmlRenderer;
    /// use markdown_format_converter::parser::parse_document;
    ///
    /// let nodes = parse_document("# Hi\n\n[site](https://example.com)");
    /// let html = HtmlRenderer::new().render(&nodes);
    /// assert!(html.contains("<h1>Hi</h1>"));
    /// assert!(html.contains("rel=\"noopener noreferrer\""));
    /// ```
    pub fn render(&self, nodes: &[DocumentNode]) -> String {
        let mut markup = String::new();
        for node in nodes {
            self.write_block(node, &mut markup);
        }
        self.sanitizer.sanitize(&markup)
    }

    /// Render with cooperative timeout checks
    pub fn render_with_context(
        &self,
        nodes: &[DocumentNode],
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let mut markup = String::new();
        for node in nodes {
            ctx.increment_and_check()?;
            self.write_block(node, &mut markup);
        }
        debug!(nodes = nodes.len(), bytes = markup.len(), "sanitizing rendered markup");
        self.sanitizer.sanitize_with_context(&markup, ctx)
    }

    fn write_block(&self, node: &DocumentNode, output: &mut String) {
        if !output.is_empty() {
            output.push('\n');
        }

        match node {
            DocumentNode::Heading { level, text } => {
                let level = (*level).clamp(1, 6);
                output.push_str(&format!("<h{}>", level));
                self.write_inline(text, output);
                output.push_str(&format!("</h{}>", level));
            }
            DocumentNode::Paragraph { text } => {
                output.push_str("<p>");
                self.write_inline(text, output);
                output.push_str("</p>");
            }
            DocumentNode::List { ordered, items } => self.write_list(*ordered, items, output),
            DocumentNode::CodeBlock { code, .. } => {
                output.push_str("<pre><code>");
                output.push_str(&escape_html(code));
                output.push_str("</code></pre>");
            }
            DocumentNode::Blockquote { text } => {
                output.push_str("<blockquote>");
                for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
                    output.push_str("<p>");
                    self.write_inline(paragraph, output);
                    output.push_str("</p>");
                }
                output.push_str("</blockquote>");
            }
            DocumentNode::Rule => output.push_str("<hr>"),
            DocumentNode::Table { headers, rows } => self.write_table(headers, rows, output),
            DocumentNode::RawFallback { raw } => output.push_str(raw),
        }
    }

    fn write_list(&self, ordered: bool, items: &[ListItem], output: &mut String) {
        let tag = if ordered { "ol" } else { "ul" };
        output.push_str(&format!("<{}>", tag));
        for item in items {
            output.push_str("<li>");
            self.write_inline(&item.text, output);
            output.push_str("</li>");
        }
        output.push_str(&format!("</{}>", tag));
    }

    fn write_table(&self, headers: &[String], rows: &[Vec<String>], output: &mut String) {
        output.push_str("<table><thead><tr>");
        for header in headers {
            output.push_str("<th>");
            self.write_inline(header, output);
            output.push_str("</th>");
        }
        output.push_str("</tr></thead>");

        if !rows.is_empty() {
            output.push_str("<tbody>");
            for row in rows {
                output.push_str("<tr>");
                for cell in row {
                    output.push_str("<td>");
                    self.write_inline(cell, output);
                    output.push_str("</td>");
                }
                output.push_str("</tr>");
            }
            output.push_str("</tbody>");
        }
        output.push_str("</table>");
    }

    fn write_inline(&self, text: &str, output: &mut String) {
        self.write_spans(&parse_inline(text), output);
    }

    fn write_spans(&self, spans: &[Span], output: &mut String) {
        for span in spans {
            match span {
                Span::Text(text) => output.push_str(text),
                Span::Escaped(ch) => output.push_str(&escape_html(ch.encode_utf8(&mut [0; 4]))),
                Span::Strong(children) => self.write_wrapped("strong", children, output),
                Span::Emphasis(children) => self.write_wrapped("em", children, output),
                Span::Strikethrough(children) => self.write_wrapped("s", children, output),
                Span::Code(code) => {
                    output.push_str("<code>");
                    output.push_str(&escape_html(code));
                    output.push_str("</code>");
                }
                Span::Link {
                    children,
                    url,
                    title,
                } => {
                    output.push_str("<a href=\"");
                    output.push_str(&escape_html(&(self.config.link_url)(url)));
                    output.push('"');
                    write_title(title.as_deref(), output);
                    output.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
                    self.write_spans(children, output);
                    output.push_str("</a>");
                }
                Span::Image { alt, url, title } => {
                    output.push_str("<img src=\"");
                    output.push_str(&escape_html(&(self.config.image_url)(url)));
                    output.push_str("\" alt=\"");
                    output.push_str(&escape_html(alt));
                    output.push('"');
                    write_title(title.as_deref(), output);
                    output.push('>');
                }
                Span::LineBreak if self.config.line_breaks => output.push_str("<br>"),
                Span::LineBreak => output.push('\n'),
            }
        }
    }

    fn write_wrapped(&self, tag: &str, children: &[Span], output: &mut String) {
        output.push('<');
        output.push_str(tag);
        output.push('>');
        self.write_spans(children, output);
        output.push_str("</");
        output.push_str(tag);
        output.push('>');
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn write_title(title: Option<&str>, output: &mut String) {
    if let Some(title) = title {
        output.push_str(" title=\"");
        output.push_str(&escape_html(title));
        output.push('"');
    }
}
