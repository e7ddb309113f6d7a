// tests/collect_partial.rs
//
// Partial-failure behaviour of the collection phase: one slow or broken
// source never sinks a run, only a fully empty harvest does.

use std::time::Duration;

use tech_watch_agent::collect::{collect, CollectLimits};
use tech_watch_agent::error::{PipelineError, SourceError, SourceErrorKind};
use tech_watch_agent::sources::types::{FetchHint, Focus, RawItem, SourceAdapter};

fn hint() -> FetchHint {
    FetchHint {
        topic: "tech".to_string(),
        focus: Focus::General,
        limit: 10,
    }
}

fn item(source: &'static str, n: usize) -> RawItem {
    RawItem {
        source,
        title: format!("{source} item {n}"),
        url: format!("https://{source}.test/{n}"),
        summary: None,
        published_at: None,
        score: None,
        comments: None,
        category_hint: None,
    }
}

struct OkAdapter {
    name: &'static str,
    count: usize,
}

#[async_trait::async_trait]
impl SourceAdapter for OkAdapter {
    async fn fetch(&self, _hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        Ok((0..self.count).map(|n| item(self.name, n)).collect())
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

struct FailAdapter {
    name: &'static str,
}

#[async_trait::async_trait]
impl SourceAdapter for FailAdapter {
    async fn fetch(&self, _hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        Err(SourceError::http(self.name, "503 from upstream"))
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

struct HangAdapter {
    name: &'static str,
}

#[async_trait::async_trait]
impl SourceAdapter for HangAdapter {
    async fn fetch(&self, _hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

struct PanicAdapter {
    name: &'static str,
}

#[async_trait::async_trait]
impl SourceAdapter for PanicAdapter {
    async fn fetch(&self, _hint: &FetchHint) -> Result<Vec<RawItem>, SourceError> {
        panic!("upstream schema change blew up the parser");
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

fn fast_limits() -> CollectLimits {
    CollectLimits {
        source_timeout: Duration::from_millis(200),
        budget: Duration::from_millis(500),
        max_concurrency: 4,
    }
}

#[tokio::test]
async fn failed_sources_degrade_gracefully() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(OkAdapter { name: "alpha", count: 3 }),
        Box::new(FailAdapter { name: "beta" }),
        Box::new(OkAdapter { name: "gamma", count: 2 }),
    ];

    let out = collect(adapters, &hint(), &fast_limits())
        .await
        .expect("two sources succeeded");

    assert_eq!(out.items.len(), 5);
    assert_eq!(out.succeeded_sources, 2);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].source, "beta");
    assert_eq!(out.failures[0].kind, SourceErrorKind::HttpError);
}

#[tokio::test]
async fn hanging_source_is_cut_at_its_timeout() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(OkAdapter { name: "alpha", count: 1 }),
        Box::new(HangAdapter { name: "sloth" }),
    ];

    let start = std::time::Instant::now();
    let out = collect(adapters, &hint(), &fast_limits())
        .await
        .expect("fast source succeeded");

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(out.items.len(), 1);
    let failure = out
        .failures
        .iter()
        .find(|f| f.source == "sloth")
        .expect("hanging source reported");
    assert_eq!(failure.kind, SourceErrorKind::Timeout);
}

#[tokio::test]
async fn global_budget_bounds_the_whole_phase() {
    // Per-source timeout far above the budget, so only the global deadline
    // can cut the hanging adapters.
    let limits = CollectLimits {
        source_timeout: Duration::from_secs(30),
        budget: Duration::from_millis(400),
        max_concurrency: 4,
    };
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(OkAdapter { name: "alpha", count: 2 }),
        Box::new(HangAdapter { name: "sloth1" }),
        Box::new(HangAdapter { name: "sloth2" }),
    ];

    let start = std::time::Instant::now();
    let out = collect(adapters, &hint(), &limits)
        .await
        .expect("fast source succeeded");
    let elapsed = start.elapsed();

    // The phase lasts roughly the budget: long enough for the deadline to
    // fire, never source_timeout long.
    assert!(elapsed >= Duration::from_millis(350), "ended early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "budget not enforced: {elapsed:?}");

    assert_eq!(out.items.len(), 2);
    assert_eq!(out.succeeded_sources, 1);
    assert_eq!(out.failures.len(), 2);
    for name in ["sloth1", "sloth2"] {
        let failure = out
            .failures
            .iter()
            .find(|f| f.source == name)
            .expect("cancelled source reported");
        assert_eq!(failure.kind, SourceErrorKind::Timeout);
        assert!(failure.reason.contains("budget"));
    }
}

#[tokio::test]
async fn panicking_adapter_is_recorded_as_a_failure() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(OkAdapter { name: "alpha", count: 1 }),
        Box::new(PanicAdapter { name: "kaput" }),
    ];

    let out = collect(adapters, &hint(), &fast_limits())
        .await
        .expect("healthy source succeeded");

    assert_eq!(out.items.len(), 1);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].source, "kaput");
    assert_eq!(out.failures[0].kind, SourceErrorKind::ParseError);
    assert!(out.failures[0].reason.contains("panicked"));
}

#[tokio::test]
async fn all_adapters_panicking_is_fatal_with_the_right_count() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(PanicAdapter { name: "kaput1" }),
        Box::new(PanicAdapter { name: "kaput2" }),
    ];

    let err = collect(adapters, &hint(), &fast_limits())
        .await
        .expect_err("nothing succeeded");
    assert!(matches!(err, PipelineError::AllSourcesFailed { failed: 2 }));
}

#[tokio::test]
async fn all_sources_failing_is_fatal() {
    let adapters: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(FailAdapter { name: "beta" }),
        Box::new(HangAdapter { name: "sloth" }),
    ];

    let err = collect(adapters, &hint(), &fast_limits())
        .await
        .expect_err("nothing succeeded");
    assert!(matches!(
        err,
        PipelineError::AllSourcesFailed { failed: 2 }
    ));
}

#[tokio::test]
async fn empty_registry_is_fatal_too() {
    let err = collect(vec![], &hint(), &fast_limits())
        .await
        .expect_err("no adapters configured");
    assert!(matches!(err, PipelineError::AllSourcesFailed { failed: 0 }));
}
