// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod collect;
pub mod config;
pub mod error;
pub mod history;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod synth;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::config::AppConfig;
pub use crate::error::{PipelineError, ProviderError, SourceError};
pub use crate::pipeline::{run, run_with, DigestRequest, RunOutput};
pub use crate::report::{render, DigestReport, DigestStats};
pub use crate::sources::types::{Category, Focus, RawItem};
