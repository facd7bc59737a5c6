//! Inline span tokenizer
//!
//! Recognizes emphasis, strong emphasis, strikethrough, code spans, links,
//! images, autolinks, and backslash escapes inside block text. Spans are a
//! rendering-time layer: the document model keeps block text verbatim and
//! each renderer tokenizes it as needed.
//!
//! Delimiter matching is deliberately simpler than CommonMark's delimiter
//! stack. An opener must not be followed by whitespace, a closer must not be
//! preceded by whitespace, and `_` never opens or closes inside a word.
//! Unmatched delimiters stay literal text.
//!
//! Brackets are paired once per text and every failed closer search is
//! remembered, so unmatched delimiters cost linear time overall.

use std::collections::HashMap;
use std::hash::Hash;

/// Nesting limit for recursive span parsing
const MAX_INLINE_DEPTH: usize = 32;

/// Nesting limit for parentheses inside a link destination
const MAX_DESTINATION_PARENS: usize = 32;

/// Schemes recognized in `<scheme:...>` autolinks
const AUTOLINK_PREFIXES: &[&str] = &["http://", "https://", "mailto:"];

/// An inline element of block text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(Vec<Span>),
    Emphasis(Vec<Span>),
    Strikethrough(Vec<Span>),
    Code(String),
    /// Backslash-escaped punctuation, always literal
    Escaped(char),
    Link {
        children: Vec<Span>,
        url: String,
        title: Option<String>,
    },
    Image {
        alt: String,
        url: String,
        title: Option<String>,
    },
    LineBreak,
}

/// Tokenize block text into spans
///
/// # Examples
///
/// ```rust
/// use markdown_format_converter::inline::{parse_inline, Span};
///
/// let spans = parse_inline("Some *text*");
/// assert_eq!(
///     spans,
///     vec![
///         Span::Text("Some ".to_string()),
///         Span::Emphasis(vec![Span::Text("text".to_string())]),
///     ]
/// );
/// ```
pub fn parse_inline(text: &str) -> Vec<Span> {
    parse_spans(text, 0)
}

/// Flatten spans to readable text
///
/// Emphasis markers disappear, code spans keep their content, links become
/// `text (url)`, and images become `[alt]`.
pub fn to_plain_text(spans: &[Span]) -> String {
    let mut output = String::new();
    write_plain(spans, &mut output, true);
    output
}

fn write_plain(spans: &[Span], output: &mut String, with_urls: bool) {
    for span in spans {
        match span {
            Span::Text(text) | Span::Code(text) => output.push_str(text),
            Span::Escaped(ch) => output.push(*ch),
            Span::Strong(children) | Span::Emphasis(children) | Span::Strikethrough(children) => {
                write_plain(children, output, with_urls)
            }
            Span::Link { children, url, .. } => {
                let mut label = String::new();
                write_plain(children, &mut label, false);
                output.push_str(&label);
                if with_urls && label != *url {
                    output.push_str(" (");
                    output.push_str(url);
                    output.push(')');
                }
            }
            Span::Image { alt, .. } => {
                if with_urls {
                    output.push('[');
                    output.push_str(alt);
                    output.push(']');
                } else {
                    output.push_str(alt);
                }
            }
            Span::LineBreak => output.push('\n'),
        }
    }
}

fn parse_spans(src: &str, depth: usize) -> Vec<Span> {
    InlineScanner::new(src, depth).run()
}

/// Earliest offsets from which a forward search found nothing
///
/// A closer that cannot be found from offset `p` cannot be found from any
/// later offset either, so each kind of search fails at most once per text.
#[derive(Default)]
struct FailedSearches {
    /// Keyed by delimiter byte and width
    closers: HashMap<(u8, usize), usize>,
    /// Keyed by backtick run length
    code_spans: HashMap<usize, usize>,
    /// Keyed by the closing byte of the title
    titles: HashMap<u8, usize>,
    /// Range without a `>` before the next newline
    angle_destination: Option<(usize, usize)>,
}

fn known_failure<K: Eq + Hash>(failures: &HashMap<K, usize>, key: K, from: usize) -> bool {
    failures.get(&key).is_some_and(|&failed| from >= failed)
}

fn record_failure<K: Eq + Hash>(failures: &mut HashMap<K, usize>, key: K, from: usize) {
    failures
        .entry(key)
        .and_modify(|failed| *failed = (*failed).min(from))
        .or_insert(from);
}

struct LinkParts<'a> {
    label: &'a str,
    url: String,
    title: Option<String>,
    end: usize,
}

/// Single pass over one block's text at one nesting level
struct InlineScanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    depth: usize,
    /// Offset of each `[` mapped to its matching `]`, built on first use
    brackets: Option<HashMap<usize, usize>>,
    failed: FailedSearches,
}

impl<'a> InlineScanner<'a> {
    fn new(src: &'a str, depth: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            depth,
            brackets: None,
            failed: FailedSearches::default(),
        }
    }

    fn run(mut self) -> Vec<Span> {
        let src = self.src;
        let bytes = self.bytes;
        let nested = self.depth < MAX_INLINE_DEPTH;
        let mut spans = Vec::new();
        let mut text = String::new();
        let mut pos = 0;

        while pos < bytes.len() {
            match bytes[pos] {
                b'\\' if bytes.get(pos + 1).is_some_and(u8::is_ascii_punctuation) => {
                    flush_text(&mut text, &mut spans);
                    spans.push(Span::Escaped(bytes[pos + 1] as char));
                    pos += 2;
                    continue;
                }
                b'\n' => {
                    flush_text(&mut text, &mut spans);
                    spans.push(Span::LineBreak);
                    pos += 1;
                    continue;
                }
                b'`' => {
                    let run = delimiter_run(bytes, pos, b'`');
                    if let Some((code, end)) = self.code_span(pos) {
                        flush_text(&mut text, &mut spans);
                        spans.push(Span::Code(code));
                        pos = end;
                    } else {
                        // An unmatched run is literal as a whole
                        text.push_str(&src[pos..pos + run]);
                        pos += run;
                    }
                    continue;
                }
                b'!' if nested && bytes.get(pos + 1) == Some(&b'[') => {
                    if let Some(link) = self.link_at(pos + 1) {
                        flush_text(&mut text, &mut spans);
                        let mut alt = String::new();
                        write_plain(&parse_spans(link.label, self.depth + 1), &mut alt, false);
                        spans.push(Span::Image {
                            alt,
                            url: link.url,
                            title: link.title,
                        });
                        pos = link.end;
                        continue;
                    }
                }
                b'[' if nested => {
                    if let Some(link) = self.link_at(pos) {
                        flush_text(&mut text, &mut spans);
                        spans.push(Span::Link {
                            children: parse_spans(link.label, self.depth + 1),
                            url: link.url,
                            title: link.title,
                        });
                        pos = link.end;
                        continue;
                    }
                }
                b'<' => {
                    if let Some((url, end)) = autolink_at(src, pos) {
                        flush_text(&mut text, &mut spans);
                        spans.push(Span::Link {
                            children: vec![Span::Text(url.clone())],
                            url,
                            title: None,
                        });
                        pos = end;
                        continue;
                    }
                }
                b'*' | b'_' | b'~' if nested => {
                    if let Some((span, end)) = self.delimited_at(pos) {
                        flush_text(&mut text, &mut spans);
                        spans.push(span);
                        pos = end;
                        continue;
                    }
                    // Keep the whole run literal so a later delimiter cannot pair with half of it
                    let run = delimiter_run(bytes, pos, bytes[pos]);
                    text.push_str(&src[pos..pos + run]);
                    pos += run;
                    continue;
                }
                _ => {}
            }

            match src[pos..].chars().next() {
                Some(ch) => {
                    text.push(ch);
                    pos += ch.len_utf8();
                }
                None => break,
            }
        }

        flush_text(&mut text, &mut spans);
        spans
    }

    /// Match a code span opening at `pos`; returns its content and end offset
    fn code_span(&mut self, pos: usize) -> Option<(String, usize)> {
        let bytes = self.bytes;
        let run = delimiter_run(bytes, pos, b'`');
        let content_start = pos + run;
        if known_failure(&self.failed.code_spans, run, content_start) {
            return None;
        }

        let mut i = content_start;
        while i < bytes.len() {
            if bytes[i] == b'`' {
                let closing = delimiter_run(bytes, i, b'`');
                if closing == run {
                    let raw = self.src[content_start..i].replace('\n', " ");
                    let content = if raw.len() >= 2
                        && raw.starts_with(' ')
                        && raw.ends_with(' ')
                        && !raw.trim().is_empty()
                    {
                        raw[1..raw.len() - 1].to_string()
                    } else {
                        raw
                    };
                    return Some((content, i + closing));
                }
                i += closing;
            } else {
                i += 1;
            }
        }

        record_failure(&mut self.failed.code_spans, run, content_start);
        None
    }

    /// Match `[label](destination "title")` with `[` at `open`
    fn link_at(&mut self, open: usize) -> Option<LinkParts<'a>> {
        let src = self.src;
        let bytes = self.bytes;
        let close = *self
            .brackets
            .get_or_insert_with(|| matching_brackets(bytes))
            .get(&open)?;

        if bytes.get(close + 1) != Some(&b'(') {
            return None;
        }

        let mut i = skip_spaces(bytes, close + 2);
        let url = if bytes.get(i) == Some(&b'<') {
            let start = i + 1;
            if self
                .failed
                .angle_destination
                .is_some_and(|(from, stop)| start >= from && start < stop)
            {
                return None;
            }
            let Some(len) = src[start..].find(['>', '\n']).filter(|&len| bytes[start + len] == b'>')
            else {
                let stop = src[start..].find('\n').map_or(src.len(), |len| start + len);
                self.failed.angle_destination = Some((start, stop));
                return None;
            };
            i = start + len + 1;
            &src[start..start + len]
        } else {
            let start = i;
            let mut parens = 0usize;
            while let Some(&b) = bytes.get(i) {
                match b {
                    b'\\' => i += 1,
                    b'(' if parens == MAX_DESTINATION_PARENS => return None,
                    b'(' => parens += 1,
                    b')' if parens == 0 => break,
                    b')' => parens -= 1,
                    b if b.is_ascii_whitespace() => break,
                    _ => {}
                }
                i += 1;
            }
            src.get(start..i)?
        };

        i = skip_spaces(bytes, i);
        let mut title = None;
        if let Some(&quote) = bytes.get(i).filter(|&&b| matches!(b, b'"' | b'\'' | b'(')) {
            let closing = if quote == b'(' { b')' } else { quote };
            let start = i + 1;
            if known_failure(&self.failed.titles, closing, start) {
                return None;
            }
            let Some(len) = src[start..].find(closing as char) else {
                record_failure(&mut self.failed.titles, closing, start);
                return None;
            };
            title = Some(src[start..start + len].to_string());
            i = skip_spaces(bytes, start + len + 1);
        }

        if bytes.get(i) != Some(&b')') {
            return None;
        }

        Some(LinkParts {
            label: &src[open + 1..close],
            url: url.to_string(),
            title,
            end: i + 1,
        })
    }

    /// Match an emphasis, strong, or strikethrough span opening at `pos`
    fn delimited_at(&mut self, pos: usize) -> Option<(Span, usize)> {
        let bytes = self.bytes;
        let delimiter = bytes[pos];
        let run = delimiter_run(bytes, pos, delimiter);

        if delimiter == b'_' && pos > 0 && bytes[pos - 1].is_ascii_alphanumeric() {
            return None;
        }

        let widths: &[usize] = match (delimiter, run) {
            (b'~', 2) => &[2],
            (b'~', _) => &[],
            (_, 1) => &[1],
            (_, 2) => &[2],
            _ => &[2, 1],
        };

        for &width in widths {
            let content_start = pos + width;
            if bytes
                .get(content_start)
                .is_none_or(|b| b.is_ascii_whitespace())
            {
                continue;
            }
            let Some(close) = self.find_closer(content_start, delimiter, width) else {
                continue;
            };

            let children = parse_spans(&self.src[content_start..close], self.depth + 1);
            let span = match (delimiter, width) {
                (b'~', _) => Span::Strikethrough(children),
                (_, 2) => Span::Strong(children),
                _ => Span::Emphasis(children),
            };
            return Some((span, close + width));
        }
        None
    }

    /// Find the offset of a closing delimiter of `width` at or after `from`
    fn find_closer(&mut self, from: usize, delimiter: u8, width: usize) -> Option<usize> {
        if known_failure(&self.failed.closers, (delimiter, width), from) {
            return None;
        }

        let bytes = self.bytes;
        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'`' => {
                    match self.code_span(i) {
                        Some((_, end)) => i = end,
                        None => i += delimiter_run(bytes, i, b'`'),
                    }
                    continue;
                }
                b if b == delimiter => {
                    let run = delimiter_run(bytes, i, delimiter);
                    let after = bytes.get(i + run);
                    let preceded_by_space = bytes[i - 1].is_ascii_whitespace();
                    let intraword =
                        delimiter == b'_' && after.is_some_and(u8::is_ascii_alphanumeric);

                    // Odd runs can close a single delimiter, runs of two or more a double
                    let fits = match width {
                        1 => run % 2 == 1,
                        _ => run >= width && (delimiter != b'~' || run == width),
                    };

                    if i > from && fits && !preceded_by_space && !intraword {
                        return Some(i + run - width);
                    }
                    i += run;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        record_failure(&mut self.failed.closers, (delimiter, width), from);
        None
    }
}

fn flush_text(text: &mut String, spans: &mut Vec<Span>) {
    if !text.is_empty() {
        spans.push(Span::Text(std::mem::take(text)));
    }
}

fn delimiter_run(bytes: &[u8], pos: usize, delimiter: u8) -> usize {
    bytes[pos..].iter().take_while(|&&b| b == delimiter).count()
}

/// Pair every `[` with its `]`, skipping backslash-escaped brackets
fn matching_brackets(bytes: &[u8]) -> HashMap<usize, usize> {
    let mut pairs = HashMap::new();
    let mut open = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => open.push(i),
            b']' => {
                if let Some(start) = open.pop() {
                    pairs.insert(start, i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    pairs
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|&b| b == b' ' || b == b'\t' || b == b'\n') {
        i += 1;
    }
    i
}

/// Match `<https://...>` style autolinks
fn autolink_at(src: &str, pos: usize) -> Option<(String, usize)> {
    let rest = &src[pos + 1..];
    let prefix_matches = |prefix: &&str| {
        rest.as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
    };
    if !AUTOLINK_PREFIXES.iter().any(prefix_matches) {
        return None;
    }
    let len = rest.find(|c: char| c == '>' || c == '<' || c.is_whitespace())?;
    if rest.as_bytes()[len] != b'>' {
        return None;
    }
    Some((rest[..len].to_string(), pos + 1 + len + 1))
}
