// src/sources/github_trending.rs
// GitHub has no trending API; this scrapes the public page. The markup is
// stable enough for regex extraction of the repo link and description.

use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::SourceError;
use crate::sources::normalize_text;
use crate::sources::types::{Category, FetchHint, RawItem, SourceAdapter};

const NAME: &str = "github_trending";
const TRENDING_URL: &str = "https://github.com/trending?since=weekly";

pub struct GithubTrendingAdapter {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

fn re_article() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<article class="Box-row".*?</article>"#).unwrap())
}

fn re_repo_link() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<h2[^>]*>\s*<a[^>]*href="/([^"/]+/[^"/]+)""#).unwrap()
    })
}

fn re_description() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?is)<p[^>]*>(.*?)</p>"#).unwrap())
}

fn re_language() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)itemprop="programmingLanguage"[^>]*>([^<]+)<"#).unwrap()
    })
}

impl GithubTrendingAdapter {
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

    fn parse_items(html: &str, limit: usize) -> Vec<RawItem> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();
        for block in re_article().find_iter(html).take(limit) {
            let block = block.as_str();
            let Some(caps) = re_repo_link().captures(block) else {
                continue;
            };
            let repo_path = caps[1].trim().to_string();
            let description = re_description()
                .captures(block)
                .map(|c| normalize_text(&c[1]))
                .filter(|s| !s.is_empty());
            let language = re_language()
                .captures(block)
                .map(|c| c[1].trim().to_string());

            let summary = match (description, language) {
                (Some(d), Some(l)) => Some(format!("{d} ({l})")),
                (Some(d), None) => Some(d),
                (None, Some(l)) => Some(format!("({l})")),
                (None, None) => None,
            };

            out.push(RawItem {
                source: NAME,
                title: repo_path.clone(),
                url: format!("https://github.com/{repo_path}"),
                summary,
                published_at: None,
                score: None,
                comments: None,
                category_hint: Some(Category::Tool),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms").record(ms);
        counter!("collect_items_total").increment(out.len() as u64);
        out
    }
}

#[async_trait::async_trait]
impl SourceAdapter for GithubTrendingAdapter {
    async fn fetch(&self, hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        match &self.mode {
            Mode::Fixture(s) => Ok(Self::parse_items(s, hint.limit)),
            Mode::Http { client } => {
                let body = client
                    .get(TRENDING_URL)
                    .send()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .error_for_status()
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?
                    .text()
                    .await
                    .map_err(|e| SourceError::from_reqwest(NAME, e))?;
                let items = Self::parse_items(&body, hint.limit);
                if items.is_empty() {
                    // Page layout changed or we got an interstitial.
                    return Err(SourceError::parse(NAME, "no trending rows found"));
                }
                Ok(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
