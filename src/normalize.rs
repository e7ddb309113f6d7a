// src/normalize.rs
// Maps raw adapter output into the canonical item shape: category heuristic,
// url dedup (first occurrence wins), near-duplicate title collapse, recency
// and promo filters, relevance ranking, cap, and recurrence tagging.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::history::RunHistory;
use crate::sources::types::{Category, RawItem};

/// Near-duplicate titles above this Jaro-Winkler similarity collapse into
/// the first occurrence, even when their urls differ.
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.92;

const PROMO_KEYWORDS: &[&str] = &[
    "sponsored", "ad:", "[ad]", "promotion", "buy now", "discount", "coupon", "deal:", "sale:",
];

const STARTUP_KEYWORDS: &[&str] = &[
    "startup", "funding", "raises", "seed round", "series a", "series b", "levée de fonds",
    "acquisition", "acquires", "yc w", "yc s",
];

const AI_KEYWORDS: &[&str] = &[
    "llm", " ai ", "gpt", "machine learning", "deep learning", "neural", "transformer",
    "inference", "rag ",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalItem {
    pub title: String,
    /// Deduplication identity key.
    pub url: String,
    pub source: &'static str,
    pub summary: Option<String>,
    pub category: Category,
    pub published_at: Option<u64>,
    pub relevance: f64,
    /// Set when the url was already present in a prior run's history.
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Items older than this are dropped when they carry a timestamp.
    pub recency_window_days: u32,
    /// Hard cap on the surviving set (max_items_per_source x source count).
    pub max_total: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            recency_window_days: 14,
            max_total: 50,
        }
    }
}

#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub items: Vec<CanonicalItem>,
    pub dropped_missing_url: usize,
    pub dropped_stale: usize,
    pub dropped_promo: usize,
    pub duplicates: usize,
}

fn is_promotional(title: &str) -> bool {
    let t = title.to_lowercase();
    PROMO_KEYWORDS.iter().any(|kw| t.contains(kw))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|kw| haystack.contains(kw))
}

/// Category: adapter hint first, keyword heuristic second.
/// Startup/funding wording overrides an Article hint.
pub fn categorize(item: &RawItem) -> Category {
    let text = format!(
        " {} {} ",
        item.title.to_lowercase(),
        item.summary.as_deref().unwrap_or_default().to_lowercase()
    );
    if contains_any(&text, STARTUP_KEYWORDS) {
        return Category::Startup;
    }
    if let Some(hint) = item.category_hint {
        if hint != Category::Article {
            return hint;
        }
    }
    if contains_any(&text, AI_KEYWORDS) {
        return Category::AiDataInfra;
    }
    item.category_hint.unwrap_or(Category::Article)
}

/// Engagement + source-quality score used only for ranking before the cap.
fn relevance_score(item: &RawItem) -> f64 {
    let mut score = 0.0;
    score += (item.score.unwrap_or(0) as f64 / 100.0).min(10.0);
    score += (item.comments.unwrap_or(0) as f64 / 50.0).min(5.0);
    score += match item.source {
        "github_trending" => 4.0,
        "hackernews" | "lobsters" => 3.0,
        s if s.starts_with("reddit") => 2.0,
        _ => 0.0,
    };
    if item.summary.is_none() {
        score -= 1.0;
    }
    score
}

pub fn normalize(
    raw_items: Vec<RawItem>,
    history: &mut RunHistory,
    opts: &NormalizeOptions,
    now: DateTime<Utc>,
) -> NormalizeOutcome {
    let mut out = NormalizeOutcome::default();
    let cutoff = now.timestamp().max(0) as u64;
    let window_secs = u64::from(opts.recency_window_days) * 86_400;

    let mut seen_urls: Vec<String> = Vec::new();
    let mut seen_titles: Vec<String> = Vec::new();
    let mut kept: Vec<(RawItem, Category, f64)> = Vec::new();

    for item in raw_items {
        let url = item.url.trim().to_string();
        if url.is_empty() || !url.starts_with("http") {
            out.dropped_missing_url += 1;
            continue;
        }
        if is_promotional(&item.title) {
            out.dropped_promo += 1;
            continue;
        }
        if let Some(ts) = item.published_at {
            if ts < cutoff.saturating_sub(window_secs) {
                out.dropped_stale += 1;
                continue;
            }
        }

        // First occurrence in input order wins; later duplicates are
        // discarded silently.
        let url_lower = url.to_lowercase();
        if seen_urls.iter().any(|u| *u == url_lower) {
            out.duplicates += 1;
            continue;
        }
        let title_lower = item.title.to_lowercase();
        if seen_titles
            .iter()
            .any(|t| strsim::jaro_winkler(t, &title_lower) >= TITLE_SIMILARITY_THRESHOLD)
        {
            out.duplicates += 1;
            continue;
        }
        seen_urls.push(url_lower);
        seen_titles.push(title_lower);

        let category = categorize(&item);
        let relevance = relevance_score(&item);
        kept.push((item, category, relevance));
    }

    // Rank by relevance, stable so equal scores keep arrival order.
    kept.sort_by(|a, b| b.2.total_cmp(&a.2));
    if kept.len() > opts.max_total {
        debug!(
            kept = opts.max_total,
            dropped = kept.len() - opts.max_total,
            "capping normalized set"
        );
        kept.truncate(opts.max_total);
    }

    for (item, category, relevance) in kept {
        let is_recurring = history.is_recurring(&item.url);
        history.observe(&item.title, &item.url, now);
        out.items.push(CanonicalItem {
            title: item.title,
            url: item.url,
            source: item.source,
            summary: item.summary,
            category,
            published_at: item.published_at,
            relevance,
            is_recurring,
        });
    }

    counter!("normalize_kept_total").increment(out.items.len() as u64);
    counter!("normalize_dedup_total").increment(out.duplicates as u64);
    counter!("normalize_dropped_total")
        .increment((out.dropped_missing_url + out.dropped_stale + out.dropped_promo) as u64);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(source: &'static str, title: &str, url: &str) -> RawItem {
        RawItem {
            source,
            title: title.to_string(),
            url: url.to_string(),
            summary: None,
            published_at: None,
            score: None,
            comments: None,
            category_hint: Some(Category::Article),
        }
    }

    #[test]
    fn duplicate_urls_collapse_to_first() {
        let mut history = RunHistory::ephemeral();
        let items = vec![
            raw("hackernews", "Original", "https://a.test/x"),
            raw("lobsters", "Copy of a totally different headline", "https://A.test/x"),
        ];
        let out = normalize(items, &mut history, &NormalizeOptions::default(), Utc::now());
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].title, "Original");
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn near_duplicate_titles_collapse() {
        let mut history = RunHistory::ephemeral();
        let items = vec![
            raw("hackernews", "Rust 1.80 released with new features", "https://a.test/1"),
            raw("lobsters", "Rust 1.80 released with new features!", "https://b.test/2"),
        ];
        let out = normalize(items, &mut history, &NormalizeOptions::default(), Utc::now());
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn missing_url_is_dropped_and_counted() {
        let mut history = RunHistory::ephemeral();
        let items = vec![
            raw("hackernews", "No url", ""),
            raw("hackernews", "Fine", "https://a.test/ok"),
        ];
        let out = normalize(items, &mut history, &NormalizeOptions::default(), Utc::now());
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.dropped_missing_url, 1);
    }

    #[test]
    fn stale_items_filtered_when_timestamped() {
        let mut history = RunHistory::ephemeral();
        let now = Utc::now();
        let old = (now.timestamp() as u64) - 20 * 86_400;
        let mut stale = raw("tech_news", "Old news is so exciting", "https://a.test/old");
        stale.published_at = Some(old);
        let mut fresh = raw("tech_news", "Completely unrelated fresh item", "https://a.test/new");
        fresh.published_at = Some(now.timestamp() as u64 - 3600);
        let out = normalize(
            vec![stale, fresh],
            &mut history,
            &NormalizeOptions::default(),
            now,
        );
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.dropped_stale, 1);
        assert_eq!(out.items[0].url, "https://a.test/new");
    }

    #[test]
    fn startup_keywords_override_hint() {
        let item = raw(
            "tech_news",
            "Acme raises $20M Series A for database tooling",
            "https://a.test/acme",
        );
        assert_eq!(categorize(&item), Category::Startup);
    }

    #[test]
    fn github_hint_maps_to_tool() {
        let mut item = raw("github_trending", "owner/repo", "https://github.com/owner/repo");
        item.category_hint = Some(Category::Tool);
        assert_eq!(categorize(&item), Category::Tool);
    }

    #[test]
    fn cap_keeps_highest_relevance() {
        let mut history = RunHistory::ephemeral();
        // Titles differ enough that the near-duplicate collapse stays out
        // of the way; only the cap should trim this set.
        let titles = [
            "Kernel scheduler rewrite lands",
            "Postgres turns on async io",
            "WebGPU ships everywhere",
            "Zig package manager overhaul",
            "SQLite gains vector search",
            "Cloudflare outage postmortem",
            "Nix flakes finally stable",
            "Terraform fork merges upstream",
            "eBPF beyond networking",
            "Wasm components in production",
        ];
        let mut items = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            let mut it = raw("hackernews", title, &format!("https://a.test/{i}"));
            it.score = Some(i as i64 * 100);
            items.push(it);
        }
        let opts = NormalizeOptions {
            max_total: 3,
            ..Default::default()
        };
        let out = normalize(items, &mut history, &opts, Utc::now());
        assert_eq!(out.items.len(), 3);
        // Highest engagement survives the cap.
        assert!(out.items.iter().any(|i| i.url.ends_with("/9")));
        assert!(!out.items.iter().any(|i| i.url.ends_with("/0")));
    }

    #[test]
    fn dedup_is_idempotent_on_reapplication() {
        let mut history = RunHistory::ephemeral();
        let items = vec![
            raw("hackernews", "First headline entirely on its own", "https://a.test/1"),
            raw("hackernews", "First headline entirely on its own", "https://a.test/1"),
            raw("lobsters", "Second story with different words", "https://a.test/2"),
        ];
        let once = normalize(items, &mut history, &NormalizeOptions::default(), Utc::now());

        let again_input: Vec<RawItem> = once
            .items
            .iter()
            .map(|c| RawItem {
                source: c.source,
                title: c.title.clone(),
                url: c.url.clone(),
                summary: c.summary.clone(),
                published_at: c.published_at,
                score: None,
                comments: None,
                category_hint: Some(c.category),
            })
            .collect();
        let mut fresh_history = RunHistory::ephemeral();
        let twice = normalize(
            again_input,
            &mut fresh_history,
            &NormalizeOptions::default(),
            Utc::now(),
        );

        let urls_once: Vec<_> = once.items.iter().map(|i| i.url.clone()).collect();
        let urls_twice: Vec<_> = twice.items.iter().map(|i| i.url.clone()).collect();
        assert_eq!(urls_once, urls_twice);
        assert_eq!(twice.duplicates, 0);
    }

    #[test]
    fn recurrence_tagging_consults_history() {
        let mut history = RunHistory::ephemeral();
        history.observe("Seen before", "https://a.test/seen", Utc::now());

        let items = vec![
            raw("hackernews", "Seen before", "https://a.test/seen"),
            raw("hackernews", "Brand new story title here", "https://a.test/new"),
        ];
        let out = normalize(items, &mut history, &NormalizeOptions::default(), Utc::now());
        let seen = out.items.iter().find(|i| i.url.ends_with("/seen")).unwrap();
        let fresh = out.items.iter().find(|i| i.url.ends_with("/new")).unwrap();
        assert!(seen.is_recurring);
        assert!(!fresh.is_recurring);
        assert!(history.is_recurring("https://a.test/new"));
    }
}
