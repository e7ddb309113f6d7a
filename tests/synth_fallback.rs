// tests/synth_fallback.rs
//
// Provider chain behaviour: the primary gets one retry, then fallbacks take
// over one attempt each; when everyone is down the draft degrades instead
// of failing the run.

use std::sync::Arc;

use tech_watch_agent::error::ProviderErrorKind;
use tech_watch_agent::normalize::CanonicalItem;
use tech_watch_agent::pipeline::DigestRequest;
use tech_watch_agent::sources::types::{Category, Focus};
use tech_watch_agent::synth::providers::MockProvider;
use tech_watch_agent::synth::Synthesizer;

const GOOD_RESPONSE: &str = "\
## 🎯 Vue d'ensemble
- Une semaine chargée côté bases de données

### 🛠️ Outils & Projets
- **fastdb** - KV store embarqué 🔗 https://github.com/fastdb/fastdb

### 📰 Articles & Discussions
- **Postgres 18** - async I/O arrive 🔗 https://example.test/pg18

### 🤖 IA / Data / Infra
- Rien de notable cette semaine

## 📚 À creuser
- Postgres 18 release notes → https://example.test/pg18
";

fn items() -> Vec<CanonicalItem> {
    vec![
        CanonicalItem {
            title: "Postgres 18 released".to_string(),
            url: "https://example.test/pg18".to_string(),
            source: "hackernews",
            summary: Some("async I/O lands".to_string()),
            category: Category::Article,
            published_at: None,
            relevance: 8.0,
            is_recurring: false,
        },
        CanonicalItem {
            title: "fastdb/fastdb".to_string(),
            url: "https://github.com/fastdb/fastdb".to_string(),
            source: "github_trending",
            summary: None,
            category: Category::Tool,
            published_at: None,
            relevance: 4.0,
            is_recurring: true,
        },
    ]
}

fn request() -> DigestRequest {
    DigestRequest::new("Quoi de neuf ?", Focus::General, 10)
}

#[tokio::test]
async fn primary_success_needs_one_call() {
    let primary = Arc::new(MockProvider::always_ok("gemini", GOOD_RESPONSE));
    let fallback = Arc::new(MockProvider::always_ok("mistral", GOOD_RESPONSE));
    let synth = Synthesizer::new(vec![primary.clone(), fallback.clone()]);

    let draft = synth
        .synthesize(&items(), &request(), chrono::Utc::now())
        .await;

    assert!(!draft.degraded);
    assert_eq!(draft.api_call_count, 1);
    assert_eq!(draft.provider_used, Some("gemini"));
    assert_eq!(fallback.call_count(), 0);
    assert_eq!(draft.parsed.tools.len(), 1);
}

#[tokio::test]
async fn fallback_takes_over_after_primary_retry() {
    let primary = Arc::new(MockProvider::always_failing(
        "gemini",
        ProviderErrorKind::QuotaExceeded,
    ));
    let fallback = Arc::new(MockProvider::always_ok("mistral", GOOD_RESPONSE));
    let synth = Synthesizer::new(vec![primary.clone(), fallback.clone()]);

    let draft = synth
        .synthesize(&items(), &request(), chrono::Utc::now())
        .await;

    assert!(!draft.degraded);
    // Two primary attempts plus one fallback attempt.
    assert_eq!(draft.api_call_count, 3);
    assert_eq!(primary.call_count(), 2);
    assert_eq!(fallback.call_count(), 1);
    assert_eq!(draft.provider_used, Some("mistral"));
}

#[tokio::test]
async fn transient_primary_failure_is_retried_in_place() {
    let primary = Arc::new(MockProvider::scripted(
        "gemini",
        vec![
            Err(ProviderErrorKind::Timeout),
            Ok(GOOD_RESPONSE.to_string()),
        ],
    ));
    let synth = Synthesizer::new(vec![primary.clone()]);

    let draft = synth
        .synthesize(&items(), &request(), chrono::Utc::now())
        .await;

    assert!(!draft.degraded);
    assert_eq!(draft.api_call_count, 2);
    assert_eq!(draft.provider_used, Some("gemini"));
}

#[tokio::test]
async fn all_providers_down_degrades_with_raw_sections() {
    let primary = Arc::new(MockProvider::always_failing(
        "gemini",
        ProviderErrorKind::Timeout,
    ));
    let fallback = Arc::new(MockProvider::always_failing(
        "mistral",
        ProviderErrorKind::InvalidResponse,
    ));
    let synth = Synthesizer::new(vec![primary, fallback]);

    let draft = synth
        .synthesize(&items(), &request(), chrono::Utc::now())
        .await;

    assert!(draft.degraded);
    assert_eq!(draft.api_call_count, 3);
    assert!(draft.provider_used.is_none());
    // Non-recurring items show up grouped by category, recurring ones as
    // reminders, and the top relevance picks fill the deep-dive list.
    assert_eq!(draft.parsed.articles.len(), 1);
    assert_eq!(draft.parsed.reminders.len(), 1);
    assert!(!draft.parsed.deep_dive.is_empty());
}

#[tokio::test]
async fn no_items_means_no_provider_calls() {
    let primary = Arc::new(MockProvider::always_ok("gemini", GOOD_RESPONSE));
    let synth = Synthesizer::new(vec![primary.clone()]);

    let draft = synth.synthesize(&[], &request(), chrono::Utc::now()).await;

    assert!(draft.degraded);
    assert_eq!(draft.api_call_count, 0);
    assert_eq!(primary.call_count(), 0);
}
