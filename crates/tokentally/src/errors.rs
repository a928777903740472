//! # Error Types

/// Errors from tokentally operations.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    /// Encode input contains a special token outside the allowed set.
    #[error("text contains disallowed special token {token:?}")]
    DisallowedSpecial {
        /// The offending special token literal.
        token: String,
    },

    /// A model config references an encoding with no loaded table.
    #[error("unknown encoding {name:?}")]
    UnknownEncoding {
        /// The encoding name that failed to resolve.
        name: String,
    },

    /// A schema node violates the expected shape.
    #[error("invalid schema node: {0}")]
    InvalidSchemaNode(String),

    /// Encoding table data is inconsistent.
    #[error("{0}")]
    EncodingConflict(String),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Parse error (base64, integer, JSON, etc.)
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for tokentally operations.
pub type TallyResult<T> = std::result::Result<T, TallyError>;
