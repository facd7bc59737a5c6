//! Document model produced by the block parser
//!
//! A document is an ordered sequence of [`DocumentNode`] values. Nodes own
//! their text, never alias each other, and are not mutated after parsing.
//! The serde representation is the per-node shape of the JSON document tree:
//! each node carries its discriminant under `type` next to its typed fields.

use serde::{Deserialize, Serialize};

use crate::html_renderer::HtmlRenderer;
use crate::parser::parse_document;
use crate::text_renderer::TextRenderer;

/// One item of a list block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub text: String,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A block-level unit of a Markdown document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentNode {
    /// ATX or setext heading, level 1..=6
    Heading { level: u8, text: String },
    /// Run of non-blank lines joined with `\n`
    Paragraph { text: String },
    /// Ordered or unordered list
    List { ordered: bool, items: Vec<ListItem> },
    /// Fenced code block, content kept verbatim
    #[serde(rename = "code")]
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    /// `>`-prefixed lines with the marker stripped
    Blockquote { text: String },
    /// Horizontal rule
    #[serde(rename = "hr")]
    Rule,
    /// Pipe table; every row has as many cells as `headers`
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Construct without a dedicated variant, preserved verbatim
    #[serde(rename = "raw")]
    RawFallback { raw: String },
}

impl DocumentNode {
    /// Discriminant used in the JSON tree
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentNode::Heading { .. } => "heading",
            DocumentNode::Paragraph { .. } => "paragraph",
            DocumentNode::List { .. } => "list",
            DocumentNode::CodeBlock { .. } => "code",
            DocumentNode::Blockquote { .. } => "blockquote",
            DocumentNode::Rule => "hr",
            DocumentNode::Table { .. } => "table",
            DocumentNode::RawFallback { .. } => "raw",
        }
    }
}

/// The three derived views of one source text
///
/// Every field is a deterministic function of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub rendered_html: String,
    pub nodes: Vec<DocumentNode>,
    pub plain_text: String,
}

impl ParsedDocument {
    /// Parse `text` once and derive sanitized HTML and plain text from the nodes
    pub fn parse(text: &str) -> Self {
        let nodes = parse_document(text);
        let rendered_html = HtmlRenderer::new().render(&nodes);
        let plain_text = TextRenderer::new().render(&nodes);
        Self {
            rendered_html,
            nodes,
            plain_text,
        }
    }
}
