// src/sources/tech_news.rs
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::error::SourceError;
use crate::sources::normalize_text;
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};

const NAME: &str = "tech_news";

/// Default feed set; each run pulls `limit` entries per feed.
const FEEDS: &[(&str, &str)] = &[
    ("TechCrunch", "https://techcrunch.com/feed/"),
    (
        "Ars Technica",
        "https://feeds.arstechnica.com/arstechnica/technology-lab",
    ),
    ("The Verge", "https://www.theverge.com/rss/index.xml"),
    ("Wired", "https://www.wired.com/feed/rss"),
    ("ZDNet", "https://www.zdnet.com/news/rss.xml"),
];

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
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

pub(crate) fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

pub struct TechNewsAdapter {
    mode: Mode,
}

enum Mode {
    /// One RSS document standing in for every feed.
    Fixture(String),
    Http { client: reqwest::Client },
}

impl TechNewsAdapter {
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

    fn parse_feed(
        feed_name: &str,
        xml: &str,
        limit: usize,
    ) -> Result<Vec<RawItem>, SourceError> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .map_err(|e| SourceError::parse(NAME, format!("{feed_name}: {e}")))?;

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
                    s.truncate(s.char_indices().nth(300).map_or(s.len(), |(i, _)| i));
                    s
                });
            out.push(RawItem {
                source: NAME,
                title: format!("{title} ({feed_name})"),
                url,
                summary,
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                score: None,
                comments: None,
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
impl SourceAdapter for TechNewsAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_feed("fixture", s, hint.limit),
            Mode::Http { client } => {
                // One slow feed must not sink the rest; parse failures are
                // logged and skipped, only a fully empty harvest is an error.
                let mut out = Vec::new();
                let mut last_err: Option<SourceError> = None;
                for (feed_name, url) in FEEDS {
                    let body = match client.get(*url).send().await {
                        Ok(resp) => match resp.error_for_status() {
                            Ok(resp) => match resp.text().await {
                                Ok(b) => b,
                                Err(e) => {
                                    last_err = Some(SourceError::from_reqwest(NAME, e));
                                    continue;
                                }
                            },
                            Err(e) => {
                                last_err = Some(SourceError::from_reqwest(NAME, e));
                                continue;
                            }
                        },
                        Err(e) => {
                            last_err = Some(SourceError::from_reqwest(NAME, e));
                            continue;
                        }
                    };
                    match Self::parse_feed(feed_name, &body, hint.limit) {
                        Ok(mut items) => out.append(&mut items),
                        Err(e) => {
                            tracing::warn!(feed = feed_name, error = %e, "rss feed skipped");
                            last_err = Some(e);
                        }
                    }
                }
                if out.is_empty() {
                    return Err(last_err
                        .unwrap_or_else(|| SourceError::parse(NAME, "all feeds empty")));
                }
                Ok(out)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
