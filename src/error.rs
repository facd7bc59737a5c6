//! Error types for validation and conversion operations

use thiserror::Error;

/// Guard failures reported before a conversion is attempted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// File is larger than the configured maximum
    #[error("File size {size} bytes exceeds maximum allowed size of {max} bytes")]
    SizeExceeded { size: u64, max: u64 },
    /// File name does not carry one of the allowed extensions
    #[error("Invalid file type '{name}'. Allowed types: {allowed}")]
    InvalidType { name: String, allowed: String },
    /// Decoded text is longer than the configured maximum
    #[error("Content length {length} exceeds maximum of {max} characters")]
    ContentTooLarge { length: usize, max: usize },
}

/// Errors that can occur during Markdown conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Input rejected by a size/type/length guard
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Source text matched a forbidden signature
    #[error("Potentially malicious content detected")]
    MaliciousContent,
    /// Character encoding error
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Rendering or packaging failed
    #[error("Render error: {0}")]
    Render(String),
    /// Conversion timeout exceeded
    #[error("Conversion timeout exceeded")]
    Timeout,
    /// Caller-side request gate refused the request
    #[error("Rate limit exceeded, try again later")]
    RateLimitExceeded,
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    /// Numeric error code, used as the CLI exit status
    pub fn code(&self) -> u8 {
        match self {
            ConversionError::Validation(_) => 2,
            ConversionError::MaliciousContent => 3,
            ConversionError::Encoding(_) => 4,
            ConversionError::Render(_) => 5,
            ConversionError::Timeout => 6,
            ConversionError::RateLimitExceeded => 7,
            ConversionError::Internal(_) => 99,
        }
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        ConversionError::Render(err.to_string())
    }
}
