// src/error.rs
// Error taxonomy for the digest pipeline. Stage-local source errors are
// swallowed by the collector and recorded as failures; pipeline-level
// errors propagate to the entry point.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    Timeout,
    HttpError,
    ParseError,
}

#[derive(Debug, thiserror::Error)]
#[error("{source_name}: {kind:?}: {message}")]
pub struct SourceError {
    pub source_name: &'static str,
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    pub fn timeout(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            kind: SourceErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn http(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            kind: SourceErrorKind::HttpError,
            message: message.into(),
        }
    }

    pub fn parse(source_name: &'static str, message: impl Into<String>) -> Self {
        Self {
            source_name,
            kind: SourceErrorKind::ParseError,
            message: message.into(),
        }
    }

    /// Map a reqwest error to the right kind (timeouts are their own bucket).
    pub fn from_reqwest(source_name: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(source_name, e.to_string())
        } else {
            Self::http(source_name, e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    Timeout,
    QuotaExceeded,
    InvalidResponse,
}

#[derive(Debug, thiserror::Error)]
#[error("{provider}: {kind:?}: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &'static str, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }
}

/// Fatal pipeline outcomes. Everything else degrades in place.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("all sources failed ({failed} adapters)")]
    AllSourcesFailed { failed: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no LLM provider key configured (set GOOGLE_API_KEY or MISTRAL_API_KEY)")]
    NoLlmProvider,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}
