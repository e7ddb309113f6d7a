// src/sources/lobsters.rs
use metrics::{counter, histogram};
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::SourceError;
use crate::sources::normalize_text;
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};

const NAME: &str = "lobsters";
const HOTTEST_URL: &str = "https://lobste.rs/hottest.json";

#[derive(Debug, Deserialize)]
struct LobstersPost {
    title: Option<String>,
    url: Option<String>,
    short_id_url: Option<String>,
    score: Option<i64>,
    comment_count: Option<i64>,
    created_at: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc3339)
        .ok()
        .and_then(|dt| u64::try_from(dt.unix_timestamp()).ok())
}

pub struct LobstersAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl LobstersAdapter {
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_http(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    fn parse_items(s: &str, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let posts: Vec<LobstersPost> =
            serde_json::from_str(s).map_err(|e| SourceError::parse(NAME, e.to_string()))?;

        let mut out = Vec::with_capacity(posts.len().min(limit));
        for p in posts.into_iter().take(limit) {
            let title = normalize_text(p.title.as_deref().unwrap_or_default());
            let url = p
                .url
                .filter(|u| !u.is_empty())
                .or(p.short_id_url)
                .unwrap_or_default();
            if title.is_empty() || url.is_empty() {
                continue;
            }
            let summary = if p.tags.is_empty() {
                None
            } else {
                Some(p.tags.join(", "))
            };
            out.push(RawItem {
                source: NAME,
                title,
                url,
                summary,
                published_at: p.created_at.as_deref().and_then(parse_rfc3339_to_unix),
                score: p.score,
                comments: p.comment_count,
                category_hint: Some(Category::Article),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        counter!("collect_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for LobstersAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items(s, hint.limit),
            Mode::Http { client } => {
                let body = client
                    .get(HOTTEST_URL)
                    .send()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .error_for_status()
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .text()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?;
                Self::parse_items(&body, hint.limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
