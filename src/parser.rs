//! Block-level Markdown parser
//!
//! Converts raw Markdown text into an ordered sequence of [`DocumentNode`]s.
//!
//! # Overview
//!
//! The parser is a line scanner. At each block boundary it classifies the
//! current line with leading-character rules, in priority order:
//!
//! 1. Fenced code block (three or more backticks or tildes)
//! 2. ATX heading (`#` to `######` followed by whitespace)
//! 3. Horizontal rule (three or more `-`, `*`, or `_`, optionally spaced)
//! 4. Blockquote (leading `>`)
//! 5. List item (`-`, `*`, `+`, or `<digits>.` / `<digits>)`)
//! 6. Raw HTML block (line starting with a tag), kept verbatim
//! 7. Pipe table (header row followed by a delimiter row)
//! 8. Paragraph (any other run of non-blank lines, setext underline aware)
//!
//! Rules are tested before list items so `* * *` is a rule, not a list.
//!
//! # Failure Policy
//!
//! Parsing never fails. Unterminated fences close at end of input and
//! anything unrecognized degrades to a paragraph or a raw block, so every
//! non-blank input line lands in some node.
//!
//! # Examples
//!
//! ```rust
//! use markdown_format_converter::document::DocumentNode;
//! use markdown_format_converter::parser::parse_document;
//!
//! let nodes = parse_document("# Title\n\n- a\n- b");
//! assert_eq!(nodes.len(), 2);
//! assert!(matches!(nodes[0], DocumentNode::Heading { level: 1, .. }));
//! assert!(matches!(nodes[1], DocumentNode::List { ordered: false, .. }));
//! ```

use std::borrow::Cow;
use tracing::debug;

use crate::document::{DocumentNode, ListItem};

/// Deepest ATX heading level
const MAX_HEADING_LEVEL: usize = 6;

/// Maximum indentation (in spaces) before a line stops opening blocks
const MAX_BLOCK_INDENT: usize = 3;

/// Maximum digits in an ordered list marker
const MAX_ORDERED_MARKER_DIGITS: usize = 9;

/// Parse Markdown text into document nodes
///
/// Line endings are normalized to `\n` first. Empty and whitespace-only
/// input yields an empty sequence.
pub fn parse_document(text: &str) -> Vec<DocumentNode> {
    let normalized = normalize_line_endings(text);
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut scanner = BlockScanner {
        lines: &lines,
        pos: 0,
        nodes: Vec::new(),
    };
    scanner.run();

    debug!(
        lines = lines.len(),
        nodes = scanner.nodes.len(),
        "parsed markdown document"
    );
    scanner.nodes
}

fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Marker style of a list; a change of style closes the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStyle {
    Bullet(char),
    Ordered(char),
}

impl ListStyle {
    fn is_ordered(self) -> bool {
        matches!(self, ListStyle::Ordered(_))
    }
}

/// Opening fence of a code block
#[derive(Debug)]
struct Fence {
    marker: char,
    len: usize,
    indent: usize,
    language: Option<String>,
}

struct BlockScanner<'a> {
    lines: &'a [&'a str],
    pos: usize,
    nodes: Vec<DocumentNode>,
}

impl BlockScanner<'_> {
    fn run(&mut self) {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];

            if is_blank(line) {
                self.pos += 1;
            } else if let Some(fence) = fence_open(line) {
                self.code_block(fence);
            } else if let Some((level, text)) = atx_heading(line) {
                self.nodes.push(DocumentNode::Heading { level, text });
                self.pos += 1;
            } else if is_rule(line) {
                self.nodes.push(DocumentNode::Rule);
                self.pos += 1;
            } else if blockquote_content(line).is_some() {
                self.blockquote();
            } else if let Some((style, content)) = list_marker(line) {
                self.list(style, content);
            } else if is_html_block_start(line) {
                self.raw_block();
            } else if self.is_table_start() {
                self.table();
            } else {
                self.paragraph();
            }
        }
    }

    fn code_block(&mut self, fence: Fence) {
        self.pos += 1;
        let mut body = Vec::new();

        // Unterminated fences run to end of input
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if is_fence_close(line, &fence) {
                break;
            }
            body.push(strip_indent(line, fence.indent));
        }

        self.nodes.push(DocumentNode::CodeBlock {
            language: fence.language,
            code: body.join("\n"),
        });
    }

    fn blockquote(&mut self) {
        let mut parts = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                break;
            }
            match blockquote_content(line) {
                Some(content) => parts.push(content),
                None => break,
            }
            self.pos += 1;
        }

        self.nodes.push(DocumentNode::Blockquote {
            text: parts.join("\n").trim().to_string(),
        });
    }

    fn list(&mut self, style: ListStyle, first: &str) {
        let mut items = vec![first.to_string()];
        self.pos += 1;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) || is_rule(line) {
                break;
            }

            if let Some((next_style, content)) = list_marker(line) {
                if next_style != style {
                    break;
                }
                items.push(content.to_string());
            } else if line.starts_with([' ', '\t']) {
                // Indented continuation of the current item
                if let Some(last) = items.last_mut() {
                    if !last.is_empty() {
                        last.push('\n');
                    }
                    last.push_str(line.trim());
                }
            } else {
                break;
            }
            self.pos += 1;
        }

        self.nodes.push(DocumentNode::List {
            ordered: style.is_ordered(),
            items: items.into_iter().map(ListItem::new).collect(),
        });
    }

    fn raw_block(&mut self) {
        let start = self.pos;
        while self.pos < self.lines.len() && !is_blank(self.lines[self.pos]) {
            self.pos += 1;
        }
        self.nodes.push(DocumentNode::RawFallback {
            raw: self.lines[start..self.pos].join("\n"),
        });
    }

    fn is_table_start(&self) -> bool {
        let line = self.lines[self.pos];
        if !line.contains('|') {
            return false;
        }
        let Some(next) = self.lines.get(self.pos + 1).filter(|next| next.contains('|')) else {
            return false;
        };
        let delimiter = split_table_row(next);
        !delimiter.is_empty()
            && delimiter.iter().all(|cell| is_delimiter_cell(cell))
            && split_table_row(line).len() == delimiter.len()
    }

    fn table(&mut self) {
        let headers = split_table_row(self.lines[self.pos]);
        let width = headers.len();
        self.pos += 2;

        let mut rows = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) || !line.contains('|') {
                break;
            }
            let mut row = split_table_row(line);
            row.resize(width, String::new());
            rows.push(row);
            self.pos += 1;
        }

        self.nodes.push(DocumentNode::Table { headers, rows });
    }

    fn paragraph(&mut self) {
        let mut parts = vec![self.lines[self.pos].trim()];
        self.pos += 1;

        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if is_blank(line) {
                break;
            }
            if let Some(level) = setext_level(line) {
                self.pos += 1;
                self.nodes.push(DocumentNode::Heading {
                    level,
                    text: parts.join(" "),
                });
                return;
            }
            if interrupts_paragraph(line) {
                break;
            }
            parts.push(line.trim());
            self.pos += 1;
        }

        self.nodes.push(DocumentNode::Paragraph {
            text: parts.join("\n"),
        });
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Strip up to three leading spaces; `None` when the line is indented further
fn block_indent(line: &str) -> Option<(usize, &str)> {
    let rest = line.trim_start_matches(' ');
    let indent = line.len() - rest.len();
    (indent <= MAX_BLOCK_INDENT).then_some((indent, rest))
}

fn strip_indent(line: &str, max: usize) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(max)..]
}

fn leading_run(text: &str, marker: char) -> usize {
    text.chars().take_while(|&c| c == marker).count()
}

fn fence_open(line: &str) -> Option<Fence> {
    let (indent, rest) = block_indent(line)?;
    let marker = rest.chars().next().filter(|&c| matches!(c, '`' | '~'))?;
    let len = leading_run(rest, marker);
    if len < 3 {
        return None;
    }

    let info = rest[len..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }

    Some(Fence {
        marker,
        len,
        indent,
        language: info.split_whitespace().next().map(str::to_string),
    })
}

fn is_fence_close(line: &str, fence: &Fence) -> bool {
    let Some((_, rest)) = block_indent(line) else {
        return false;
    };
    let len = leading_run(rest, fence.marker);
    len >= fence.len && rest[len..].trim().is_empty()
}

fn atx_heading(line: &str) -> Option<(u8, String)> {
    let (_, rest) = block_indent(line)?;
    let level = leading_run(rest, '#');
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }

    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }

    // Optional closing sequence: "## Title ##"
    let text = after.trim();
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        ""
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };

    Some((level as u8, text.to_string()))
}

fn is_rule(line: &str) -> bool {
    let Some((_, rest)) = block_indent(line) else {
        return false;
    };
    let Some(marker) = rest.chars().next().filter(|&c| matches!(c, '-' | '*' | '_')) else {
        return false;
    };

    let mut count = 0;
    for ch in rest.chars() {
        if ch == marker {
            count += 1;
        } else if ch != ' ' && ch != '\t' {
            return false;
        }
    }
    count >= 3
}

fn setext_level(line: &str) -> Option<u8> {
    let (_, rest) = block_indent(line)?;
    let underline = rest.trim_end();
    if underline.is_empty() {
        None
    } else if underline.chars().all(|c| c == '=') {
        Some(1)
    } else if underline.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn blockquote_content(line: &str) -> Option<&str> {
    let (_, rest) = block_indent(line)?;
    let content = rest.strip_prefix('>')?;
    Some(content.strip_prefix(' ').unwrap_or(content))
}

fn list_marker(line: &str) -> Option<(ListStyle, &str)> {
    let (_, rest) = block_indent(line)?;
    let first = rest.chars().next()?;

    let (style, after) = if matches!(first, '-' | '*' | '+') {
        (ListStyle::Bullet(first), &rest[1..])
    } else {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || digits > MAX_ORDERED_MARKER_DIGITS {
            return None;
        }
        let delimiter = rest[digits..].chars().next().filter(|&c| matches!(c, '.' | ')'))?;
        (ListStyle::Ordered(delimiter), &rest[digits + 1..])
    };

    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    Some((style, after.trim()))
}

fn is_html_block_start(line: &str) -> bool {
    let Some((_, rest)) = block_indent(line) else {
        return false;
    };
    let mut chars = rest.chars();
    chars.next() == Some('<')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn interrupts_paragraph(line: &str) -> bool {
    fence_open(line).is_some()
        || atx_heading(line).is_some()
        || is_rule(line)
        || blockquote_content(line).is_some()
        || list_marker(line).is_some_and(|(_, content)| !content.is_empty())
        || is_html_block_start(line)
}

fn is_delimiter_cell(cell: &str) -> bool {
    let inner = cell.strip_prefix(':').unwrap_or(cell);
    let inner = inner.strip_suffix(':').unwrap_or(inner);
    !inner.is_empty() && inner.chars().all(|c| c == '-')
}

/// Split a pipe-table row into trimmed cells, honoring `\|` escapes
fn split_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = match trimmed.strip_suffix('|') {
        Some(inner) if !inner.ends_with('\\') => inner,
        _ => trimmed,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = trimmed.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(ch),
        }
    }
    cells.push(current.trim().to_string());
    cells
}
