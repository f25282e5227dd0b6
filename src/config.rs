use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use uuid::Uuid;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Strategy used to turn document-like uploads into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMethod {
    /// Remote parse API performs extraction and per-chunk enrichment.
    ParseApi,
    /// Bytes are decoded locally as UTF-8 text before enrichment.
    PlainText,
}

impl ProcessingMethod {
    /// Stable identifier recorded in summaries and wire payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseApi => "parse-api",
            Self::PlainText => "plain-text",
        }
    }
}

impl std::str::FromStr for ProcessingMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parse-api" | "parse_api" => Ok(Self::ParseApi),
            "plain-text" | "plain_text" => Ok(Self::PlainText),
            _ => Err(()),
        }
    }
}

/// Immutable per-run configuration for the ingestion pipeline.
///
/// Constructed once per run and passed by reference through every call; the
/// crate keeps no process-global configuration state. All fields are read-only
/// after construction, so the struct is safe to share across concurrent tasks.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Optional API key sent to the parse/agent/store endpoints.
    pub api_key: Option<String>,
    /// Base URL of the document parse backend.
    pub parse_api_url: String,
    /// Base URL of the metadata/summary agent service.
    pub agent_url: String,
    /// Base URL of the unified-store sink.
    pub store_url: String,
    /// Embedding model identifier forwarded to the unified store.
    pub embedding_model: String,
    /// Extraction strategy for document-like uploads.
    pub processing_method: ProcessingMethod,
    /// Identifier grouping every record produced by this run.
    pub session_id: String,
}

impl ProcessingConfig {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Reads a `.env` file when present. `DOCSIFT_PROCESSING_METHOD` defaults
    /// to `parse-api` and `DOCSIFT_SESSION_ID` defaults to a fresh UUID, so a
    /// minimal environment only needs the three endpoint URLs and the
    /// embedding model.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config = Self {
            api_key: load_env_optional("DOCSIFT_API_KEY"),
            parse_api_url: load_env("DOCSIFT_PARSE_API_URL")?,
            agent_url: load_env("DOCSIFT_AGENT_URL")?,
            store_url: load_env("DOCSIFT_STORE_URL")?,
            embedding_model: load_env("DOCSIFT_EMBEDDING_MODEL")?,
            processing_method: load_env_optional("DOCSIFT_PROCESSING_METHOD")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("DOCSIFT_PROCESSING_METHOD".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(ProcessingMethod::ParseApi),
            session_id: load_env_optional("DOCSIFT_SESSION_ID")
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        };
        tracing::debug!(
            parse_api_url = %config.parse_api_url,
            agent_url = %config.agent_url,
            store_url = %config.store_url,
            method = ?config.processing_method,
            session = %config.session_id,
            "Loaded configuration"
        );
        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .map_err(|_| ConfigError::MissingVariable(key.to_string()))
        .and_then(|value| {
            if value.trim().is_empty() {
                Err(ConfigError::MissingVariable(key.to_string()))
            } else {
                Ok(value)
            }
        })
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processing_method_parses_known_values() {
        assert_eq!(
            "parse-api".parse::<ProcessingMethod>(),
            Ok(ProcessingMethod::ParseApi)
        );
        assert_eq!(
            "PLAIN_TEXT".parse::<ProcessingMethod>(),
            Ok(ProcessingMethod::PlainText)
        );
        assert!("docling".parse::<ProcessingMethod>().is_err());
    }

    #[test]
    fn processing_method_round_trips_through_identifier() {
        for method in [ProcessingMethod::ParseApi, ProcessingMethod::PlainText] {
            assert_eq!(method.as_str().parse::<ProcessingMethod>(), Ok(method));
        }
    }
}
