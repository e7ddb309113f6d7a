// src/config.rs
// Runtime configuration. Everything comes from the environment, with an
// optional TOML file restricting the source registry.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigError;

const ENV_SOURCES_PATH: &str = "SOURCES_CONFIG_PATH";
const DEFAULT_SOURCES_PATH: &str = "config/sources.toml";

/// Absent or blank values fall back to the default; anything present but
/// non-numeric is a hard configuration error rather than a silent default.
fn parse_u64(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
}

fn parse_usize(
    name: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(default);
    }
    trimmed
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value: raw })
}

fn env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    parse_u64(name, std::env::var(name).ok(), default)
}

fn env_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    parse_usize(name, std::env::var(name).ok(), default)
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Optional restriction of the source registry. Empty list means "all
/// sources the focus maps to".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub sources: Vec<String>,
}

impl SourcesConfig {
    pub fn only(sources: Vec<String>) -> Self {
        Self { sources }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.sources.is_empty() || self.sources.iter().any(|s| s == name)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources config from {}", path.display()))?;
        let mut cfg: SourcesConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        cfg.sources = cfg
            .sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(cfg)
    }

    /// $SOURCES_CONFIG_PATH first, then config/sources.toml, else no
    /// restriction.
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("SOURCES_CONFIG_PATH points to non-existent path");
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_SOURCES_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub source_timeout: Duration,
    pub collect_budget: Duration,
    pub llm_timeout: Duration,
    pub max_items_per_source: usize,
    pub recency_window_days: u64,
    pub history_path: PathBuf,
    pub port: u16,
    pub sources: SourcesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            mistral_api_key: None,
            source_timeout: Duration::from_secs(10),
            collect_budget: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(60),
            max_items_per_source: 10,
            recency_window_days: 14,
            history_path: PathBuf::from(crate::history::DEFAULT_HISTORY_PATH),
            port: 8080,
            sources: SourcesConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            google_api_key: env_nonempty("GOOGLE_API_KEY"),
            mistral_api_key: env_nonempty("MISTRAL_API_KEY"),
            source_timeout: Duration::from_secs(env_u64("SOURCE_TIMEOUT_SECS", 10)?),
            collect_budget: Duration::from_secs(env_u64("COLLECT_BUDGET_SECS", 30)?),
            llm_timeout: Duration::from_secs(env_u64("LLM_TIMEOUT_SECS", 60)?),
            max_items_per_source: env_usize("MAX_ITEMS_PER_SOURCE", 10)?,
            recency_window_days: env_u64("RECENCY_WINDOW_DAYS", 14)?,
            history_path: env_nonempty("HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            port: env_u64("PORT", 8080)? as u16,
            sources: SourcesConfig::load_default()?,
        })
    }

    /// At least one LLM key must be present for non-degraded synthesis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.google_api_key.is_none() && self.mistral_api_key.is_none() {
            return Err(ConfigError::NoLlmProvider);
        }
        Ok(())
    }

    /// Human-readable one-screen summary, keys redacted to presence only.
    pub fn status(&self) -> String {
        let key = |k: &Option<String>| if k.is_some() { "présente" } else { "absente" };
        let restriction = if self.sources.sources.is_empty() {
            "toutes".to_string()
        } else {
            self.sources.sources.join(", ")
        };
        format!(
            "Configuration:\n\
             - Clé Gemini: {}\n\
             - Clé Mistral: {}\n\
             - Timeout source: {}s | budget collecte: {}s | timeout LLM: {}s\n\
             - Items max par source: {}\n\
             - Fenêtre de récence: {} jours\n\
             - Historique: {}\n\
             - Sources actives: {}\n",
            key(&self.google_api_key),
            key(&self.mistral_api_key),
            self.source_timeout.as_secs(),
            self.collect_budget.as_secs(),
            self.llm_timeout.as_secs(),
            self.max_items_per_source,
            self.recency_window_days,
            self.history_path.display(),
            restriction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_restriction_enables_everything() {
        let cfg = SourcesConfig::default();
        assert!(cfg.is_enabled("hackernews"));
        assert!(cfg.is_enabled("arxiv"));
    }

    #[test]
    fn restriction_filters_by_name() {
        let cfg = SourcesConfig::only(vec!["hackernews".to_string()]);
        assert!(cfg.is_enabled("hackernews"));
        assert!(!cfg.is_enabled("lobsters"));
    }

    #[test]
    fn toml_file_trims_and_drops_empty_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sources.toml");
        fs::write(&path, "sources = [\" hackernews \", \"\", \"lobsters\"]").unwrap();
        let cfg = SourcesConfig::load_from(&path).unwrap();
        assert_eq!(cfg.sources, vec!["hackernews", "lobsters"]);
    }

    #[test]
    fn numeric_values_fall_back_only_when_absent_or_blank() {
        assert_eq!(parse_u64("SOURCE_TIMEOUT_SECS", None, 10).unwrap(), 10);
        assert_eq!(
            parse_u64("SOURCE_TIMEOUT_SECS", Some("  ".to_string()), 10).unwrap(),
            10
        );
        assert_eq!(
            parse_u64("SOURCE_TIMEOUT_SECS", Some(" 25 ".to_string()), 10).unwrap(),
            25
        );
        assert_eq!(
            parse_usize("MAX_ITEMS_PER_SOURCE", Some("7".to_string()), 10).unwrap(),
            7
        );
    }

    #[test]
    fn malformed_numeric_values_are_rejected() {
        let err = parse_u64("SOURCE_TIMEOUT_SECS", Some("ten".to_string()), 10).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "SOURCE_TIMEOUT_SECS",
                ..
            }
        ));
        assert!(parse_usize("MAX_ITEMS_PER_SOURCE", Some("-3".to_string()), 10).is_err());
    }

    #[test]
    fn validate_requires_a_provider_key() {
        let mut cfg = AppConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoLlmProvider)));
        cfg.mistral_api_key = Some("key".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn status_never_leaks_key_material() {
        let cfg = AppConfig {
            google_api_key: Some("secret-value".to_string()),
            ..AppConfig::default()
        };
        let status = cfg.status();
        assert!(status.contains("présente"));
        assert!(!status.contains("secret-value"));
    }
}
