// src/sources/hackernews.rs
use metrics::{counter, histogram};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::error::SourceError;
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};
use crate::sources::normalize_text;

const NAME: &str = "hackernews";
const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    descendants: Option<i64>,
    time: Option<u64>,
    text: Option<String>,
}

pub struct HackerNewsAdapter {
    mode: Mode,
}

enum Mode {
    /// JSON array of item objects, as stored under tests/fixtures.
    Fixture(String),
    Http { client: reqwest::Client },
}

impl HackerNewsAdapter {
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

    fn items_from_json(items: Vec<HnItem>, limit: usize) -> Vec<RawItem> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::with_capacity(items.len().min(limit));
        for it in items {
            if it.kind.as_deref() != Some("story") {
                continue;
            }
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            // Ask/Show HN stories carry no external url; point at the thread.
            let url = it
                .url
                .clone()
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", it.id));
            out.push(RawItem {
                source: NAME,
                title,
                url,
                summary: it.text.as_deref().map(normalize_text).filter(|s| !s.is_empty()),
                published_at: it.time,
                score: it.score,
                comments: it.descendants,
                category_hint: Some(Category::Article),
            });
            if out.len() >= limit {
                break;
            }
        }
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        counter!("collect_items_total").increment(out.len() as u64);
        out
    }

    async fn fetch_http(client: &reqwest::Client, limit: usize) -> Result<Vec<HnItem>, SourceError> {
        let ids: Vec<u64> = client
            .get(format!("{API_BASE}/topstories.json"))
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(NAME, e))?
            .error_for_status()
            .map_err(|e| SourceError::from_reqwest(NAME, e))?
            .json()
            .await
            .map_err(|e| SourceError::parse(NAME, e.to_string()))?;

        let mut set = JoinSet::new();
        for id in ids.into_iter().take(limit) {
            let client = client.clone();
            set.spawn(async move {
                client
                    .get(format!("{API_BASE}/item/{id}.json"))
                    .send()
                    .await
                    .ok()?
                    .json::<HnItem>()
                    .await
                    .ok()
            });
        }

        let mut items = Vec::new();
        while let Some(res) = set.join_next().await {
            if let Ok(Some(item)) = res {
                items.push(item);
            }
        }
        // Item detail calls complete out of order; restore rank order by score.
        items.sort_by_key(|it| std::cmp::Reverse(it.score.unwrap_or(0)));
        Ok(items)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for HackerNewsAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => {
                let items: Vec<HnItem> = serde_json::from_str(s)
                    .map_err(|e| SourceError::parse(NAME, e.to_string()))?;
                Ok(Self::items_from_json(items, hint.limit))
            }
            Mode::Http { client } => {
                let items = Self::fetch_http(client, hint.limit.saturating_mul(2)).await?;
                Ok(Self::items_from_json(items, hint.limit))
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
