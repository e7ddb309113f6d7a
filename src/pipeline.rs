// src/pipeline.rs
// One digest run end to end: collect, normalize against history, synthesize,
// format. `run` wires the pieces from config; `run_with` takes them injected
// so adapters and providers can be swapped in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::gauge;
use tracing::{info, warn};

use crate::collect::{collect, CollectLimits};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::history::RunHistory;
use crate::normalize::{normalize, NormalizeOptions};
use crate::report::{finalize, render, DigestReport};
use crate::sources::adapters_for;
use crate::sources::types::{FetchHint, Focus, SourceAdapter};
use crate::synth::providers::{GeminiProvider, LlmProvider, MistralProvider};
use crate::synth::Synthesizer;

#[derive(Debug, Clone)]
pub struct DigestRequest {
    pub query: String,
    pub focus: Focus,
    pub max_items_per_source: usize,
    pub requested_at: DateTime<Utc>,
}

impl DigestRequest {
    pub fn new(query: &str, focus: Focus, max_items_per_source: usize) -> Self {
        Self {
            query: query.to_string(),
            focus,
            max_items_per_source,
            requested_at: Utc::now(),
        }
    }
}

pub struct RunOutput {
    pub report: DigestReport,
    pub markdown: String,
}

/// Cap on the normalized set: every selected source may contribute up to
/// the per-source limit.
fn normalize_cap(max_items_per_source: usize, source_count: usize) -> usize {
    max_items_per_source.saturating_mul(source_count).max(1)
}

fn providers_from(cfg: &AppConfig) -> Vec<Arc<dyn LlmProvider>> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
    if let Some(key) = &cfg.google_api_key {
        providers.push(Arc::new(GeminiProvider::new(key.clone(), cfg.llm_timeout)));
    }
    if let Some(key) = &cfg.mistral_api_key {
        providers.push(Arc::new(MistralProvider::new(key.clone(), cfg.llm_timeout)));
    }
    providers
}

/// Full run from configuration. History is loaded from and saved back to
/// the configured path.
pub async fn run(cfg: &AppConfig, request: &DigestRequest) -> Result<RunOutput, PipelineError> {
    cfg.validate()?;

    let adapters = adapters_for(request.focus, &cfg.sources);
    let limits = CollectLimits {
        source_timeout: cfg.source_timeout,
        budget: cfg.collect_budget,
        ..CollectLimits::default()
    };
    let opts = NormalizeOptions {
        recency_window_days: cfg.recency_window_days as u32,
        max_total: normalize_cap(request.max_items_per_source, adapters.len()),
    };
    let mut history = RunHistory::load(&cfg.history_path);
    let synthesizer = Synthesizer::new(providers_from(cfg));

    let out = run_with(adapters, &limits, &opts, &mut history, &synthesizer, request).await?;

    if let Err(e) = history.save() {
        warn!(error = %e, "history save failed, recurrence will reset next run");
    }
    Ok(out)
}

/// Same pipeline with every dependency injected.
pub async fn run_with(
    adapters: Vec<Box<dyn SourceAdapter>>,
    limits: &CollectLimits,
    opts: &NormalizeOptions,
    history: &mut RunHistory,
    synthesizer: &Synthesizer,
    request: &DigestRequest,
) -> Result<RunOutput, PipelineError> {
    let now = request.requested_at;
    let hint = FetchHint {
        topic: request.query.clone(),
        focus: request.focus,
        limit: request.max_items_per_source,
    };

    let collected = collect(adapters, &hint, limits).await?;
    info!(
        items = collected.items.len(),
        sources_ok = collected.succeeded_sources,
        sources_failed = collected.failures.len(),
        "collection done"
    );

    let normalized = normalize(collected.items, history, opts, now);
    info!(
        kept = normalized.items.len(),
        duplicates = normalized.duplicates,
        promo = normalized.dropped_promo,
        stale = normalized.dropped_stale,
        "normalization done"
    );

    let draft = synthesizer.synthesize(&normalized.items, request, now).await;

    let report = finalize(
        draft,
        &normalized.items,
        &collected.failures,
        &request.query,
        request.focus,
        now,
    );
    let markdown = render(&report);
    gauge!("digest_last_run_ts").set(now.timestamp() as f64);

    Ok(RunOutput { report, markdown })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_scales_with_sources_and_per_source_limit() {
        assert_eq!(normalize_cap(10, 8), 80);
        assert_eq!(normalize_cap(20, 5), 100);
        assert_eq!(normalize_cap(5, 3), 15);
    }

    #[test]
    fn cap_never_collapses_to_zero() {
        assert_eq!(normalize_cap(10, 0), 1);
        assert_eq!(normalize_cap(0, 4), 1);
        assert_eq!(normalize_cap(usize::MAX, 2), usize::MAX);
    }
}
