// src/synth/mod.rs
pub mod parse;
pub mod prompt;
pub mod providers;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{info, warn};

use crate::normalize::CanonicalItem;
use crate::pipeline::DigestRequest;
use crate::sources::types::Category;
use crate::synth::parse::{parse_synthesis, DeepDiveRef, ParsedSynthesis};
use crate::synth::providers::LlmProvider;

pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Synthesis output before stats are finalized by the formatter.
#[derive(Debug, Default)]
pub struct SynthesisDraft {
    pub parsed: ParsedSynthesis,
    /// True when no provider produced a usable response and the sections
    /// were built from the raw item list instead.
    pub degraded: bool,
    /// Every provider call attempt, retries and fallback included.
    pub api_call_count: u32,
    pub provider_used: Option<&'static str>,
}

pub struct Synthesizer {
    /// Primary first; the rest are fallbacks in order.
    providers: Vec<Arc<dyn LlmProvider>>,
    max_tokens: u32,
}

impl Synthesizer {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// One LLM call with retry-once-then-fallback. Never fails: when every
    /// provider is down the draft degrades to a grouped raw listing.
    pub async fn synthesize(
        &self,
        items: &[CanonicalItem],
        request: &DigestRequest,
        now: DateTime<Utc>,
    ) -> SynthesisDraft {
        let mut draft = SynthesisDraft::default();

        if items.is_empty() {
            draft.degraded = true;
            draft.parsed = degraded_sections(items);
            return draft;
        }

        let prompt = prompt::build_prompt(items, request, now);

        for (idx, provider) in self.providers.iter().enumerate() {
            // The primary gets one retry; fallbacks a single attempt.
            let attempts = if idx == 0 { 2 } else { 1 };
            for attempt in 1..=attempts {
                draft.api_call_count += 1;
                counter!("synth_provider_calls_total").increment(1);
                match provider.complete(&prompt, self.max_tokens).await {
                    Ok(text) => {
                        let parsed = parse_synthesis(&text);
                        for w in &parsed.warnings {
                            warn!(provider = provider.name(), warning = w, "synthesis parse");
                        }
                        info!(provider = provider.name(), attempt, "synthesis generated");
                        draft.parsed = parsed;
                        draft.provider_used = Some(provider.name());
                        return draft;
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), attempt, error = %e, "provider failed");
                    }
                }
            }
        }

        warn!(
            calls = draft.api_call_count,
            "all providers failed, degraded synthesis"
        );
        draft.degraded = true;
        draft.parsed = degraded_sections(items);
        draft
    }
}

fn bullet(item: &CanonicalItem) -> String {
    match &item.summary {
        Some(s) => {
            let mut s = s.clone();
            s.truncate(s.char_indices().nth(120).map_or(s.len(), |(i, _)| i));
            format!("**{}** - {} 🔗 {}", item.title, s, item.url)
        }
        None => format!("**{}** 🔗 {}", item.title, item.url),
    }
}

/// Raw grouped listing used when no LLM narrative is available.
fn degraded_sections(items: &[CanonicalItem]) -> ParsedSynthesis {
    let mut parsed = ParsedSynthesis::default();
    for item in items.iter().filter(|i| !i.is_recurring) {
        let line = bullet(item);
        match item.category {
            Category::Tool => parsed.tools.push(line),
            Category::AiDataInfra => parsed.ai_data.push(line),
            Category::Startup => parsed.startups.push(line),
            Category::Article | Category::Reminder => parsed.articles.push(line),
        }
    }
    parsed.reminders = items
        .iter()
        .filter(|i| i.is_recurring)
        .take(prompt::MAX_REMINDERS)
        .map(bullet)
        .collect();

    // Top picks by relevance stand in for the LLM's deep-dive choices.
    let mut ranked: Vec<&CanonicalItem> = items.iter().collect();
    ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    parsed.deep_dive = ranked
        .into_iter()
        .take(3)
        .map(|i| DeepDiveRef {
            title: i.title.clone(),
            url: i.url.clone(),
        })
        .collect();
    parsed
}
