// src/sources/mod.rs
pub mod arxiv;
pub mod github_trending;
pub mod hackernews;
pub mod lobsters;
pub mod reddit;
pub mod tech_news;
pub mod types;

use std::time::Duration;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::config::SourcesConfig;
use crate::sources::types::{Focus, SourceAdapter};

pub const USER_AGENT: &str = "tech-watch-agent/0.1 (educational purpose)";

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collect_items_total", "Raw items returned by source adapters.");
        describe_counter!("collect_source_errors_total", "Adapter fetch/parse errors.");
        describe_counter!("normalize_kept_total", "Items kept after dedup + filtering.");
        describe_counter!("normalize_dropped_total", "Items dropped (missing url, stale, promo).");
        describe_counter!("normalize_dedup_total", "Items removed as duplicates.");
        describe_counter!("synth_provider_calls_total", "LLM provider call attempts.");
        describe_histogram!("source_parse_ms", "Adapter parse time in milliseconds.");
        describe_gauge!("digest_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Shared reqwest client for source adapters. Connect/total timeouts here are
/// a floor; the collector enforces its own per-source deadline on top.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client")
}

/// Normalize text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // Length cap keeps prompt lines bounded.
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Static focus -> source-name mapping. Selection is a pure lookup; an empty
/// result is valid (the run then fails in the collector, not here).
fn source_names_for(focus: Focus) -> &'static [&'static str] {
    match focus {
        Focus::General => &[
            "github_trending",
            "hackernews",
            "reddit_programming",
            "tech_news",
            "lobsters",
        ],
        Focus::Ai => &[
            "github_trending",
            "hackernews",
            "reddit_ml",
            "reddit_llm",
            "arxiv_ai",
        ],
        Focus::Devops => &[
            "github_trending",
            "reddit_devops",
            "reddit_selfhosted",
            "hackernews",
        ],
        Focus::Web => &[
            "github_trending",
            "reddit_programming",
            "reddit_webdev",
            "hackernews",
        ],
        Focus::Security => &["github_trending", "reddit_netsec", "hackernews"],
        Focus::Tools => &["github_trending", "hackernews", "reddit_selfhosted"],
        Focus::All => &[
            "github_trending",
            "hackernews",
            "reddit_programming",
            "reddit_ml",
            "reddit_devops",
            "lobsters",
            "tech_news",
            "arxiv_ai",
        ],
    }
}

fn build_adapter(name: &str) -> Option<Box<dyn SourceAdapter>> {
    let client = http_client();
    match name {
        "hackernews" => Some(Box::new(hackernews::HackerNewsAdapter::from_http(client))),
        "lobsters" => Some(Box::new(lobsters::LobstersAdapter::from_http(client))),
        "github_trending" => Some(Box::new(
            github_trending::GithubTrendingAdapter::from_http(client),
        )),
        "tech_news" => Some(Box::new(tech_news::TechNewsAdapter::from_http(client))),
        "arxiv_ai" => Some(Box::new(arxiv::ArxivAdapter::from_http(client, "cs.AI"))),
        _ => name
            .strip_prefix("reddit_")
            .and_then(reddit::subreddit_for_alias)
            .map(|(alias, sub)| {
                Box::new(reddit::RedditAdapter::from_http(http_client(), alias, sub))
                    as Box<dyn SourceAdapter>
            }),
    }
}

/// Enumerate the adapters enabled for a focus. `SourcesConfig` can narrow the
/// static mapping but never widen it.
pub fn adapters_for(focus: Focus, cfg: &SourcesConfig) -> Vec<Box<dyn SourceAdapter>> {
    source_names_for(focus)
        .iter()
        .filter(|name| cfg.is_enabled(name))
        .filter_map(|name| build_adapter(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Hello&nbsp;&nbsp;world</b> &ldquo;ok&rdquo;  ";
        assert_eq!(normalize_text(s), "Hello world \"ok\"");
    }

    #[test]
    fn every_focus_maps_to_at_least_one_source() {
        for focus in [
            Focus::General,
            Focus::Ai,
            Focus::Devops,
            Focus::Web,
            Focus::Security,
            Focus::Tools,
            Focus::All,
        ] {
            assert!(!source_names_for(focus).is_empty(), "{focus:?}");
        }
    }

    #[test]
    fn registry_honors_enabled_list() {
        let cfg = SourcesConfig::only(vec!["hackernews".into(), "lobsters".into()]);
        let adapters = adapters_for(Focus::General, &cfg);
        let names: Vec<_> = adapters.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["hackernews", "lobsters"]);
    }

    #[test]
    fn registry_builds_all_mapped_adapters() {
        let cfg = SourcesConfig::default();
        for focus in [Focus::General, Focus::Ai, Focus::All] {
            let adapters = adapters_for(focus, &cfg);
            assert_eq!(adapters.len(), source_names_for(focus).len(), "{focus:?}");
        }
    }
}
