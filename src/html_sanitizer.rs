//! Allow-list pass over rendered HTML
//!
//! The renderer output is re-parsed with html5ever and re-serialized from the
//! DOM, keeping only allow-listed elements and attributes. Working on the
//! parsed tree rather than on strings means the browser's view of the markup
//! and the sanitizer's view cannot disagree.
//!
//! # Element handling
//!
//! - Allowed tags are kept with their allowed attributes
//! - Forbidden tags (`script`, `iframe`, `form`, ...) are removed with their content
//! - Any other tag is unwrapped: the tag goes, its children stay
//! - Elements nested deeper than the validator's limit are dropped
//!
//! Comments, doctypes, and processing instructions are never emitted.
//! Surviving `href`/`src` values are passed through [`sanitize_url`] again and
//! every link is forced to open in a new tab with `rel="noopener noreferrer"`.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use crate::converter::ConversionContext;
use crate::error::ConversionError;
use crate::security::{SanitizeAction, SecurityValidator, escape_html, sanitize_url};

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

/// Attributes forced onto every `a` element
const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer";

/// Re-serializes HTML through the allow-list
pub struct HtmlSanitizer {
    validator: SecurityValidator,
}

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self {
            validator: SecurityValidator::new(),
        }
    }

    /// Create a sanitizer with a custom element policy
    pub fn with_validator(validator: SecurityValidator) -> Self {
        Self { validator }
    }

    /// Sanitize an HTML fragment
    ///
    /// # Examples
    ///
    /// ```rust
    /// use markdown_format_converter::html_sanitizer::HtmlSanitizer;
    ///
    /// let clean = HtmlSanitizer::new().sanitize("<p onclick=\"x()\">Hi<script>bad()</script></p>");
    /// assert_eq!(clean, "<p>Hi</p>");
    /// ```
    pub fn sanitize(&self, html: &str) -> String {
        let dom = parse_fragment(html);
        let mut output = String::with_capacity(html.len());
        if let Some(body) = find_body(&dom.document) {
            for child in body.children.borrow().iter() {
                self.write_node(child, &mut output, 0);
            }
        }
        output
    }

    /// Sanitize with cooperative timeout checks
    pub fn sanitize_with_context(
        &self,
        html: &str,
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let dom = parse_fragment(html);
        ctx.check_timeout()?;
        let mut output = String::with_capacity(html.len());
        if let Some(body) = find_body(&dom.document) {
            for child in body.children.borrow().iter() {
                self.write_node_with_context(child, &mut output, 0, ctx)?;
            }
        }
        Ok(output)
    }

    fn write_node(&self, node: &Handle, output: &mut String, depth: usize) {
        match node.data {
            NodeData::Element { .. } => {
                if let Some(tag) = self.open_element(node, output, depth) {
                    for child in node.children.borrow().iter() {
                        self.write_node(child, output, depth + 1);
                    }
                    close_element(&tag, output);
                } else if self.should_unwrap(node, depth) {
                    for child in node.children.borrow().iter() {
                        self.write_node(child, output, depth + 1);
                    }
                }
            }
            NodeData::Text { ref contents } => write_text(&contents.borrow(), output),
            _ => {}
        }
    }

    fn write_node_with_context(
        &self,
        node: &Handle,
        output: &mut String,
        depth: usize,
        ctx: &mut ConversionContext,
    ) -> Result<(), ConversionError> {
        ctx.increment_and_check()?;

        match node.data {
            NodeData::Element { .. } => {
                if let Some(tag) = self.open_element(node, output, depth) {
                    for child in node.children.borrow().iter() {
                        self.write_node_with_context(child, output, depth + 1, ctx)?;
                    }
                    close_element(&tag, output);
                } else if self.should_unwrap(node, depth) {
                    for child in node.children.borrow().iter() {
                        self.write_node_with_context(child, output, depth + 1, ctx)?;
                    }
                }
            }
            NodeData::Text { ref contents } => write_text(&contents.borrow(), output),
            _ => {}
        }

        Ok(())
    }

    /// Write the opening tag of an allowed element and return its name
    fn open_element(&self, node: &Handle, output: &mut String, depth: usize) -> Option<String> {
        let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = node.data
        else {
            return None;
        };

        let tag = name.local.as_ref().to_ascii_lowercase();
        if self.validator.check_element(&tag) != SanitizeAction::Allow {
            return None;
        }
        if let Err(reason) = self.validator.validate_depth(depth) {
            debug!(tag = %tag, "dropping element: {}", reason);
            return None;
        }

        output.push('<');
        output.push_str(&tag);

        let is_link = tag == "a";
        for attr in attrs.borrow().iter() {
            let attr_name = attr.name.local.as_ref().to_ascii_lowercase();
            if !self.validator.is_allowed_attribute(&attr_name) {
                continue;
            }
            // target/rel on links are always rewritten below
            if is_link && (attr_name == "target" || attr_name == "rel") {
                continue;
            }

            let value = if self.validator.is_url_attribute(&attr_name) {
                sanitize_url(&attr.value)
            } else {
                attr.value.to_string()
            };
            push_attribute(output, &attr_name, &value);
        }

        if is_link {
            push_attribute(output, "target", LINK_TARGET);
            push_attribute(output, "rel", LINK_REL);
        }

        output.push('>');
        Some(tag)
    }

    /// Whether a non-allowed element should still contribute its children
    fn should_unwrap(&self, node: &Handle, depth: usize) -> bool {
        let NodeData::Element { ref name, .. } = node.data else {
            return false;
        };
        self.validator.check_element(name.local.as_ref()) == SanitizeAction::Unwrap
            && self.validator.validate_depth(depth).is_ok()
    }
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_fragment(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// Locate `<body>` under the document root
fn find_body(document: &Handle) -> Option<Handle> {
    for child in document.children.borrow().iter() {
        if let NodeData::Element { ref name, .. } = child.data {
            if name.local.as_ref() == "body" {
                return Some(child.clone());
            }
            if let Some(body) = find_body(child) {
                return Some(body);
            }
        }
    }
    None
}

fn close_element(tag: &str, output: &mut String) {
    if VOID_ELEMENTS.contains(&tag) {
        return;
    }
    output.push_str("</");
    output.push_str(tag);
    output.push('>');
}

fn push_attribute(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&escape_html(value));
    output.push('"');
}

fn write_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
}

/// Sanitize an HTML fragment with the default policy
pub fn sanitize_html(html: &str) -> String {
    HtmlSanitizer::new().sanitize(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_allowed_markup_survives() {
        let html = "<h1>T</h1><p><strong>a</strong> <em>b</em> <s>c</s> <code>d</code></p>";
        assert_eq!(sanitize_html(html), html);
    }

    #[test]
    fn test_forbidden_elements_removed_with_content() {
        assert_eq!(
            sanitize_html("<p>a</p><script>alert(1)</script><p>b</p>"),
            "<p>a</p><p>b</p>"
        );
        assert_eq!(sanitize_html("<iframe src=\"x\">inner</iframe>ok"), "ok");
        assert_eq!(sanitize_html("<form><input value=\"x\">text</form>"), "");
        assert_eq!(sanitize_html("<svg><circle/></svg><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_unknown_elements_unwrapped() {
        assert_eq!(sanitize_html("<div><span>kept</span></div>"), "kept");
        assert_eq!(
            sanitize_html("<section><p>para</p></section>"),
            "<p>para</p>"
        );
    }

    #[test]
    fn test_disallowed_attributes_stripped() {
        assert_eq!(
            sanitize_html("<p class=\"c\" style=\"color:red\" onclick=\"x()\" id=\"i\">t</p>"),
            "<p>t</p>"
        );
        assert_eq!(
            sanitize_html("<img src=\"https://x.io/a.png\" alt=\"A\" onerror=\"x()\">"),
            "<img src=\"https://x.io/a.png\" alt=\"A\">"
        );
    }

    #[test]
    fn test_links_are_rewritten() {
        assert_eq!(
            sanitize_html("<a href=\"https://x.io\" target=\"_self\" rel=\"opener\">x</a>"),
            "<a href=\"https://x.io\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"
        );
        assert_eq!(
            sanitize_html("<a href=\"javascript:alert(1)\">x</a>"),
            "<a href=\"#\" target=\"_blank\" rel=\"noopener noreferrer\">x</a>"
        );
        assert_eq!(
            sanitize_html("<a>bare</a>"),
            "<a target=\"_blank\" rel=\"noopener noreferrer\">bare</a>"
        );
    }

    #[test]
    fn test_entity_decoded_schemes_are_caught() {
        let html = "<a href=\"&#106;avascript:alert(1)\">x</a>";
        assert!(sanitize_html(html).contains("href=\"#\""));
    }

    #[test]
    fn test_comments_dropped() {
        assert_eq!(sanitize_html("<p>a<!-- secret -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn test_text_is_reescaped() {
        assert_eq!(
            sanitize_html("<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"),
            "<p>1 &lt; 2 &amp;&amp; 3 &gt; 2</p>"
        );
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(sanitize_html("a<br>b<hr>"), "a<br>b<hr>");
    }

    #[test]
    fn test_depth_limit_drops_deep_elements() {
        let sanitizer = HtmlSanitizer::with_validator(SecurityValidator::with_max_depth(2));
        let html = "<blockquote><blockquote><blockquote><blockquote>deep</blockquote></blockquote></blockquote></blockquote>";
        let clean = sanitizer.sanitize(html);
        assert_eq!(clean.matches("<blockquote>").count(), 3);
        assert!(!clean.contains("deep"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_html(""), "");
    }

    #[test]
    fn test_sanitize_with_context_matches_plain() {
        let html = "<p>x <a href=\"https://a.io\">y</a></p><script>z</script>";
        let mut ctx = ConversionContext::new(Duration::from_secs(5));
        let with_ctx = HtmlSanitizer::new()
            .sanitize_with_context(html, &mut ctx)
            .unwrap();
        assert_eq!(with_ctx, sanitize_html(html));
    }

    proptest! {
        #[test]
        fn prop_output_has_no_forbidden_markup(text in "\\PC{0,200}") {
            let html = format!("<p>{}</p><script>{}</script><div onclick=\"a\">{}</div>", text, text, text);
            let clean = sanitize_html(&html).to_lowercase();
            prop_assert!(!clean.contains("<script"));
            prop_assert!(!clean.contains("onclick"));
            prop_assert!(!clean.contains("<div"));
        }

        #[test]
        fn prop_sanitize_is_idempotent(text in "[a-z <>&]{0,120}") {
            let once = sanitize_html(&text);
            prop_assert_eq!(sanitize_html(&once), once.clone());
        }
    }
}
