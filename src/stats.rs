//! Document statistics
//!
//! Counts are taken from the source text, so every output format of one
//! conversion reports the same numbers.

use serde::Serialize;

/// Default characters-per-token ratio for English text
const DEFAULT_CHARS_PER_TOKEN: f32 = 4.0;

/// Token estimator using a character-count heuristic
#[derive(Debug, Clone, Copy)]
pub struct TokenEstimator {
    chars_per_token: f32,
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }

    pub fn with_chars_per_token(chars_per_token: f32) -> Self {
        Self { chars_per_token }
    }

    /// Estimate tokens as `ceil(chars / chars_per_token)`
    ///
    /// Approximate only; not a replacement for a real tokenizer.
    pub fn estimate(&self, text: &str) -> u32 {
        let char_count = text.chars().count();
        (char_count as f32 / self.chars_per_token).ceil() as u32
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Size figures of one source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
    pub lines: usize,
    pub estimated_tokens: u32,
}

impl DocumentStats {
    /// Compute statistics for `text`
    ///
    /// # Examples
    ///
    /// ```
    /// use markdown_format_converter::stats::DocumentStats;
    ///
    /// let stats = DocumentStats::from_text("# Title\n\nTwo words");
    /// assert_eq!(stats.words, 4);
    /// assert_eq!(stats.lines, 3);
    /// ```
    pub fn from_text(text: &str) -> Self {
        Self::with_estimator(text, &TokenEstimator::new())
    }

    pub fn with_estimator(text: &str, estimator: &TokenEstimator) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            lines: text.lines().count(),
            estimated_tokens: estimator.estimate(text),
        }
    }
}
