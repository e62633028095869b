//! Configuration module
//!
//! Runtime settings are read from the environment (after loading a `.env` file
//! when one exists). Every setting has a default, so an empty environment
//! yields a working configuration.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::concurrency_gate::{ConcurrencyGate, DEFAULT_MAX_CONCURRENCY};
use crate::error::{GraphError, GraphResult};
use crate::ids::DEFAULT_ID_SIZE;
use crate::tokenizer::{Tokenizer, DEFAULT_TOKENIZER_MODEL};

const WORKING_DIR: &str = "./nano_graphrag_cache";
const LOG_FILTER: &str = "nanograph=info";

/// Logging settings consumed by the telemetry initialiser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: LOG_FILTER.to_string(),
            json: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GraphConfig {
    pub working_dir: PathBuf,
    /// Slots for concurrent model calls
    pub llm_max_concurrency: usize,
    /// Slots for concurrent embedding calls
    pub embedding_max_concurrency: usize,
    pub tiktoken_model_name: String,
    pub id_size: usize,
    pub environment: String,
    pub telemetry: TelemetryConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            working_dir: PathBuf::from(WORKING_DIR),
            llm_max_concurrency: DEFAULT_MAX_CONCURRENCY,
            embedding_max_concurrency: DEFAULT_MAX_CONCURRENCY,
            tiktoken_model_name: DEFAULT_TOKENIZER_MODEL.to_string(),
            id_size: DEFAULT_ID_SIZE,
            environment: "development".to_string(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> GraphResult<T> {
    match raw {
        Some(value) => value.trim().parse().map_err(|_| {
            GraphError::Configuration(format!("{} must be a valid number, got '{}'", name, value))
        }),
        None => Ok(default),
    }
}

impl GraphConfig {
    pub fn from_env() -> GraphResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key/value source, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> GraphResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let json = match lookup("LOG_FORMAT")
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            None | Some("text") => false,
            Some("json") => true,
            Some(other) => {
                return Err(GraphError::Configuration(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        let config = Self {
            working_dir: lookup("NANOGRAPH_WORKING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(WORKING_DIR)),
            llm_max_concurrency: parse_var(
                "LLM_MAX_ASYNC",
                lookup("LLM_MAX_ASYNC"),
                DEFAULT_MAX_CONCURRENCY,
            )?,
            embedding_max_concurrency: parse_var(
                "EMBEDDING_MAX_ASYNC",
                lookup("EMBEDDING_MAX_ASYNC"),
                DEFAULT_MAX_CONCURRENCY,
            )?,
            tiktoken_model_name: lookup("TIKTOKEN_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_TOKENIZER_MODEL.to_string()),
            id_size: parse_var("ID_SIZE", lookup("ID_SIZE"), DEFAULT_ID_SIZE)?,
            environment,
            telemetry: TelemetryConfig {
                filter: lookup("LOG_FILTER").unwrap_or_else(|| LOG_FILTER.to_string()),
                json,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.llm_max_concurrency == 0 {
            return Err(GraphError::Configuration(
                "LLM_MAX_ASYNC must be at least 1".to_string(),
            ));
        }

        if self.embedding_max_concurrency == 0 {
            return Err(GraphError::Configuration(
                "EMBEDDING_MAX_ASYNC must be at least 1".to_string(),
            ));
        }

        if self.id_size == 0 {
            return Err(GraphError::Configuration(
                "ID_SIZE must be at least 1".to_string(),
            ));
        }

        if self.tiktoken_model_name.trim().is_empty() {
            return Err(GraphError::Configuration(
                "TIKTOKEN_MODEL_NAME must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    /// Gate sized for model provider calls.
    pub fn llm_gate(&self) -> GraphResult<ConcurrencyGate> {
        ConcurrencyGate::new(self.llm_max_concurrency)
    }

    /// Gate sized for embedding provider calls.
    pub fn embedding_gate(&self) -> GraphResult<ConcurrencyGate> {
        ConcurrencyGate::new(self.embedding_max_concurrency)
    }

    pub fn tokenizer(&self) -> GraphResult<Tokenizer> {
        Tokenizer::for_model(&self.tiktoken_model_name)
    }
}
