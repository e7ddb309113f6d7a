// src/collect.rs
// Concurrent fan-out over source adapters. Each fetch gets its own timeout
// and the whole phase runs under a global wall-clock budget; whatever has
// arrived when the budget expires is kept, the rest is cancelled.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::error::{PipelineError, SourceError, SourceErrorKind};
use crate::sources::ensure_metrics_described;
use crate::sources::types::{FetchHint, RawItem, SourceAdapter, SourceFailure};

#[derive(Debug, Clone, Copy)]
pub struct CollectLimits {
    /// Independent deadline for each adapter fetch.
    pub source_timeout: Duration,
    /// Wall-clock budget for the whole collection phase.
    pub budget: Duration,
    /// Adapters fetching at once.
    pub max_concurrency: usize,
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(10),
            budget: Duration::from_secs(30),
            max_concurrency: 6,
        }
    }
}

#[derive(Debug, Default)]
pub struct CollectOutcome {
    pub items: Vec<RawItem>,
    pub failures: Vec<SourceFailure>,
    pub succeeded_sources: usize,
}

/// Invoke every adapter concurrently and merge whatever survives.
/// Output order is task-completion order and carries no meaning downstream.
pub async fn collect(
    adapters: Vec<Box<dyn SourceAdapter>>,
    hint: &FetchHint,
    limits: &CollectLimits,
) -> Result<CollectOutcome, PipelineError> {
    ensure_metrics_described();

    if adapters.is_empty() {
        return Err(PipelineError::AllSourcesFailed { failed: 0 });
    }

    let all_names: Vec<&'static str> = adapters.iter().map(|a| a.name()).collect();
    let semaphore = Arc::new(Semaphore::new(limits.max_concurrency.max(1)));
    let deadline = tokio::time::Instant::now() + limits.budget;

    let mut set: JoinSet<(&'static str, Result<Vec<RawItem>, SourceError>)> = JoinSet::new();
    let mut names_by_task: HashMap<tokio::task::Id, &'static str> = HashMap::new();
    for adapter in adapters {
        let name = adapter.name();
        let hint = hint.clone();
        let semaphore = Arc::clone(&semaphore);
        let source_timeout = limits.source_timeout;
        let handle = set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let res = match tokio::time::timeout(source_timeout, adapter.fetch(&hint)).await {
                Ok(res) => res,
                Err(_) => Err(SourceError::timeout(
                    name,
                    format!("fetch exceeded {}s", source_timeout.as_secs()),
                )),
            };
            (name, res)
        });
        names_by_task.insert(handle.id(), name);
    }

    let mut outcome = CollectOutcome::default();
    let mut completed: HashSet<&'static str> = HashSet::new();

    loop {
        let joined = match tokio::time::timeout_at(deadline, set.join_next()).await {
            Ok(Some(joined)) => joined,
            Ok(None) => break,
            Err(_) => {
                // Budget spent. Cancel stragglers, keep what we have.
                set.abort_all();
                for name in all_names.iter().filter(|n| !completed.contains(*n)) {
                    warn!(source = name, "collection budget exceeded, adapter cancelled");
                    counter!("collect_source_errors_total").increment(1);
                    outcome.failures.push(
                        SourceError::timeout(name, "global collection budget exceeded").into(),
                    );
                }
                break;
            }
        };

        match joined {
            Ok((name, Ok(mut items))) => {
                completed.insert(name);
                info!(source = name, items = items.len(), "source fetched");
                outcome.succeeded_sources += 1;
                outcome.items.append(&mut items);
            }
            Ok((name, Err(e))) => {
                completed.insert(name);
                warn!(source = name, error = %e, "source failed");
                counter!("collect_source_errors_total").increment(1);
                outcome.failures.push(e.into());
            }
            Err(join_err) => {
                // A panicked adapter counts as a failure, not a crash.
                let name = names_by_task
                    .get(&join_err.id())
                    .copied()
                    .unwrap_or("unknown");
                completed.insert(name);
                warn!(source = name, error = %join_err, "adapter task panicked");
                counter!("collect_source_errors_total").increment(1);
                outcome.failures.push(SourceFailure {
                    source: name,
                    kind: SourceErrorKind::ParseError,
                    reason: format!("adapter task panicked: {join_err}"),
                });
            }
        }
    }

    if outcome.succeeded_sources == 0 {
        return Err(PipelineError::AllSourcesFailed {
            failed: outcome.failures.len(),
        });
    }
    Ok(outcome)
}
