// src/sources/arxiv.rs
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::SourceError;
use crate::sources::normalize_text;
use crate::sources::tech_news::{parse_rfc2822_to_unix, scrub_html_entities_for_xml};
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};

const NAME: &str = "arxiv_ai";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

pub struct ArxivAdapter {
    category: &'static str,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl ArxivAdapter {
    pub fn from_fixture_str(s: &str, category: &'static str) -> Self {
        Self {
            category,
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_http(client: reqwest::Client, category: &'static str) -> Self {
        Self {
            category,
            mode: Mode::Http { client },
        }
    }

    fn parse_items(&self, xml: &str, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss =
            from_str(&xml_clean).map_err(|e| SourceError::parse(NAME, e.to_string()))?;

        let mut out = Vec::with_capacity(rss.channel.item.len().min(limit));
        for it in rss.channel.item.into_iter().take(limit) {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let Some(url) = it.link.filter(|l| !l.is_empty()) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }
            let summary = it
                .description
                .as_deref()
                .map(normalize_text)
                .filter(|s| !s.is_empty())
                .map(|mut s| {
                    s.truncate(s.char_indices().nth(400).map_or(s.len(), |(i, _)| i));
                    s
                });
            out.push(RawItem {
                source: NAME,
                title,
                url,
                summary,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                score: None,
                comments: None,
                category_hint: Some(Category::AiDataInfra),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        counter!("collect_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait::async_trait]
impl SourceAdapter for ArxivAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items(s, hint.limit),
            Mode::Http { client } => {
                let url = format!("https://rss.arxiv.org/rss/{}", self.category);
                let body = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .error_for_status()
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .text()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?;
                self.parse_items(&body, hint.limit)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
