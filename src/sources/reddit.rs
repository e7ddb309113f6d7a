// src/sources/reddit.rs
// Public subreddit listing JSON, no API key. One adapter instance per
// subreddit so the registry can weight them per focus.

use metrics::{counter, histogram};
use serde::Deserialize;

use crate::error::SourceError;
use crate::sources::normalize_text;
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};

/// Known aliases: registry name suffix -> (full adapter name, subreddit).
const SUBREDDITS: &[(&str, &str, &str, Category)] = &[
    ("programming", "reddit_programming", "programming", Category::Article),
    ("webdev", "reddit_webdev", "webdev", Category::Article),
    ("devops", "reddit_devops", "devops", Category::Article),
    ("selfhosted", "reddit_selfhosted", "selfhosted", Category::Article),
    ("netsec", "reddit_netsec", "netsec", Category::Article),
    ("ml", "reddit_ml", "MachineLearning", Category::AiDataInfra),
    ("llm", "reddit_llm", "LocalLLaMA", Category::AiDataInfra),
];

pub fn subreddit_for_alias(alias: &str) -> Option<(&'static str, &'static str)> {
    SUBREDDITS
        .iter()
        .find(|(suffix, _, _, _)| *suffix == alias)
        .map(|(_, name, sub, _)| (*name, *sub))
}

fn category_for(name: &str) -> Category {
    SUBREDDITS
        .iter()
        .find(|(_, n, _, _)| *n == name)
        .map(|(_, _, _, c)| *c)
        .unwrap_or(Category::Article)
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}
#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}
#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}
#[derive(Debug, Deserialize)]
struct Post {
    title: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    score: Option<i64>,
    num_comments: Option<i64>,
    created_utc: Option<f64>,
    selftext: Option<String>,
}

pub struct RedditAdapter {
    name: &'static str,
    subreddit: &'static str,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RedditAdapter {
    pub fn from_fixture_str(s: &str, name: &'static str, subreddit: &'static str) -> Self {
        Self {
            name,
            subreddit,
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_http(client: reqwest::Client, name: &'static str, subreddit: &'static str) -> Self {
        Self {
            name,
            subreddit,
            mode: Mode::Http { client },
        }
    }

    fn parse_items(&self, s: &str, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let listing: Listing =
            serde_json::from_str(s).map_err(|e| SourceError::parse(self.name, e.to_string()))?;

        let category = category_for(self.name);
        let mut out = Vec::with_capacity(listing.data.children.len().min(limit));
        for child in listing.data.children.into_iter().take(limit) {
            let p = child.data;
            let title = normalize_text(p.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            // Self posts link back to reddit; external posts keep their url.
            let url = match p.url.filter(|u| u.starts_with("http")) {
                Some(u) => u,
                None => match p.permalink.as_deref() {
                    Some(pl) => format!("https://reddit.com{pl}"),
                    None => continue,
                },
            };
            let summary = p
                .selftext
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty())
                .map(|mut s| {
                    s.truncate(s.char_indices().nth(500).map_or(s.len(), |(i, _)| i));
                    s
                });
            out.push(RawItem {
                source: self.name,
                title,
                url,
                summary,
                published_at: p.created_utc.map(|t| t as u64),
                score: p.score,
                comments: p.num_comments,
                category_hint: Some(category),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        counter!("collect_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for RedditAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s, hint.limit),
            Mode::Http { client } => {
                let url = format!(
                    "https://www.reddit.com/r/{}/hot.json?limit={}",
                    self.subreddit,
                    hint.limit.min(25)
                );
                let body = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| SourceError::from_reqwest(self.name, e))?
                    .error_for_status()
                    .map_err(|e| SourceError::from_reqwest(self.name, e))?
                    .text()
                    .await
                    .map_err(|e| SourceError::from_reqwest(self.name, e))?;
                self.parse_items(&body, hint.limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
