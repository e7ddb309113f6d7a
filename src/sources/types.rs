// src/sources/types.rs
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceErrorKind};

/// Thematic filter narrowing which sources and categories are emphasized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Focus {
    #[default]
    General,
    Ai,
    Devops,
    Web,
    Security,
    Tools,
    All,
}

impl Focus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Some(Self::General),
            "ai" => Some(Self::Ai),
            "devops" => Some(Self::Devops),
            "web" => Some(Self::Web),
            "security" => Some(Self::Security),
            "tools" => Some(Self::Tools),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Ai => "ai",
            Self::Devops => "devops",
            Self::Web => "web",
            Self::Security => "security",
            Self::Tools => "tools",
            Self::All => "all",
        }
    }
}

/// Coarse category a canonical item lands in. `Reminder` is assigned at
/// render time to recurring items, never by the source heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Tool,
    Article,
    AiDataInfra,
    Startup,
    Reminder,
}

/// Source-specific payload as returned by one adapter call.
/// Field names are already normalized; the deduplicator only looks at them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawItem {
    pub source: &'static str,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    /// Unix seconds, when the source exposes one.
    pub published_at: Option<u64>,
    /// Engagement signal (upvotes, stars) used for relevance ranking.
    pub score: Option<i64>,
    pub comments: Option<i64>,
    pub category_hint: Option<Category>,
}

/// Everything an adapter needs to know about the current run.
#[derive(Debug, Clone)]
pub struct FetchHint {
    pub topic: String,
    pub focus: Focus,
    pub limit: usize,
}

#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError>;
    fn name(&self) -> &'static str;
}

/// Recorded when an adapter fails; collection itself carries on.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    pub source: &'static str,
    pub kind: SourceErrorKind,
    pub reason: String,
}

impl From<SourceError> for SourceFailure {
    fn from(e: SourceError) -> Self {
        Self {
            source: e.source_name,
            kind: e.kind,
            reason: e.message,
        }
    }
}
