//! Plain-text renderer
//!
//! Reconstructs a readable rendition of the document: headings keep their
//! `#` prefix, list items get `•` or `N.`, code is re-fenced, quotes get `> `,
//! and rules become `---`. Inline markup is flattened. Blocks are separated
//! by a blank line.

use crate::converter::ConversionContext;
use crate::document::{DocumentNode, ListItem};
use crate::error::ConversionError;
use crate::inline::{parse_inline, to_plain_text};

const BULLET: &str = "•";
const RULE: &str = "---";
const CODE_FENCE: &str = "```";
const BLOCK_SEPARATOR: &str = "\n\n";

/// Renders document nodes to plain text
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render nodes to plain text
    ///
    /// # Examples
    ///
    /// ```rust
    /// use markdown_format_converter::parser::parse_document;
    /// use markdown_format_converter::text_renderer::TextRenderer;
    ///
    /// let text = TextRenderer::new().render(&parse_document("## Tasks\n\n1. *one*\n2. two"));
    /// assert_eq!(text, "## Tasks\n\n1. one\n2. two");
    /// ```
    pub fn render(&self, nodes: &[DocumentNode]) -> String {
        nodes
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR)
    }

    /// Render with cooperative timeout checks
    pub fn render_with_context(
        &self,
        nodes: &[DocumentNode],
        ctx: &mut ConversionContext,
    ) -> Result<String, ConversionError> {
        let mut blocks = Vec::with_capacity(nodes.len());
        for node in nodes {
            ctx.increment_and_check()?;
            blocks.push(render_block(node));
        }
        Ok(blocks.join(BLOCK_SEPARATOR))
    }
}

fn render_block(node: &DocumentNode) -> String {
    match node {
        DocumentNode::Heading { level, text } => {
            format!("{} {}", "#".repeat(usize::from(*level)), flatten(text))
        }
        DocumentNode::Paragraph { text } => flatten(text),
        DocumentNode::List { ordered, items } => render_list(*ordered, items),
        DocumentNode::CodeBlock { language, code } => format!(
            "{}{}\n{}\n{}",
            CODE_FENCE,
            language.as_deref().unwrap_or(""),
            code,
            CODE_FENCE
        ),
        DocumentNode::Blockquote { text } => flatten(text)
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        DocumentNode::Rule => RULE.to_string(),
        DocumentNode::Table { headers, rows } => std::iter::once(headers)
            .chain(rows)
            .map(|row| row.iter().map(|cell| flatten(cell)).collect::<Vec<_>>().join(" | "))
            .collect::<Vec<_>>()
            .join("\n"),
        DocumentNode::RawFallback { raw } => raw.clone(),
    }
}

fn render_list(ordered: bool, items: &[ListItem]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let text = flatten(&item.text);
            if ordered {
                format!("{}. {}", index + 1, text)
            } else {
                format!("{} {}", BULLET, text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn flatten(text: &str) -> String {
    to_plain_text(&parse_inline(text))
}
