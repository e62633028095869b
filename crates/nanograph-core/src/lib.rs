//! Nanograph Core Library
//!
//! This crate provides the runtime utilities shared by nanograph indexing
//! components: a bounded-concurrency gate for provider calls, the embedding
//! function wrapper, an explicitly constructed tokenizer, ID generation, JSON
//! file helpers, configuration and error types.

pub mod concurrency_gate;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ids;
pub mod json;
pub mod tokenizer;

// Re-export commonly used types
pub use concurrency_gate::{make_gate, ConcurrencyGate, Gated, DEFAULT_MAX_CONCURRENCY};
pub use config::{GraphConfig, TelemetryConfig};
pub use embedding::{Embedder, EmbeddingFunc};
pub use error::{GraphError, GraphResult, LogLevel};
pub use ids::{generate_id, DEFAULT_ID_SIZE};
pub use json::{load_json, write_json};
pub use tokenizer::{Tokenizer, DEFAULT_TOKENIZER_MODEL};
