//! Error types module
//!
//! All fallible nanograph utilities return [`GraphError`]. Errors raised by a
//! callable wrapped in a [`ConcurrencyGate`](crate::ConcurrencyGate) are never
//! converted: the gate hands back whatever the callable returned.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Warning level - for recoverable or caller-side issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    EmbeddingDimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for GraphError {
    fn from(err: anyhow::Error) -> Self {
        GraphError::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Result alias used across the crate
pub type GraphResult<T> = Result<T, GraphError>;

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn graph_error_static_metadata(err: &GraphError) -> (&'static str, bool, LogLevel) {
    match err {
        GraphError::Configuration(_) => ("CONFIGURATION_ERROR", false, LogLevel::Error),
        GraphError::Tokenizer(_) => ("TOKENIZER_ERROR", false, LogLevel::Warn),
        GraphError::Embedding(_) => ("EMBEDDING_ERROR", true, LogLevel::Warn),
        GraphError::EmbeddingDimensionMismatch { .. } => {
            ("EMBEDDING_DIMENSION_MISMATCH", false, LogLevel::Error)
        }
        GraphError::Io(_) => ("IO_ERROR", true, LogLevel::Error),
        GraphError::Json(_) => ("JSON_ERROR", false, LogLevel::Warn),
        GraphError::Internal { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl GraphError {
    /// Machine-readable error code (e.g., "CONFIGURATION_ERROR")
    pub fn error_code(&self) -> &'static str {
        graph_error_static_metadata(self).0
    }

    /// Whether retrying the failed operation may succeed
    pub fn is_recoverable(&self) -> bool {
        graph_error_static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        graph_error_static_metadata(self).2
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}
