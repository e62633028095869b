//! Token encoding and decoding using tiktoken.
//!
//! A [`Tokenizer`] is built once for a model name and passed to whatever needs
//! token counts or chunk boundaries. Clones share the loaded encoder.

use std::fmt;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::{GraphError, GraphResult};

/// Model whose encoding is used when none is configured.
pub const DEFAULT_TOKENIZER_MODEL: &str = "gpt-4o";

#[derive(Clone)]
pub struct Tokenizer {
    model_name: String,
    encoder: Arc<CoreBPE>,
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("model_name", &self.model_name)
            .field("encoder", &"<CoreBPE>")
            .finish()
    }
}

impl Tokenizer {
    /// Load the encoding tiktoken associates with `model_name`.
    pub fn for_model(model_name: &str) -> GraphResult<Self> {
        let encoder = tiktoken_rs::get_bpe_from_model(model_name).map_err(|e| {
            GraphError::Tokenizer(format!(
                "No tiktoken encoding for model '{}': {}",
                model_name, e
            ))
        })?;

        tracing::debug!(model = model_name, "Tokenizer encoder loaded");

        Ok(Self {
            model_name: model_name.to_string(),
            encoder: Arc::new(encoder),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Encode `content`, treating special-token markup as plain text.
    pub fn encode(&self, content: &str) -> Vec<u32> {
        self.encoder.encode_ordinary(content)
    }

    pub fn decode(&self, tokens: &[u32]) -> GraphResult<String> {
        self.encoder
            .decode(tokens.to_vec())
            .map_err(|e| GraphError::Tokenizer(format!("Failed to decode tokens: {}", e)))
    }

    pub fn count(&self, content: &str) -> usize {
        self.encode(content).len()
    }
}
