// mod.rs - Core logic module

pub mod ingest;
pub mod nucmer;
pub mod orchestrator;
pub mod recovery;

// Re-export main types for convenience
pub use ingest::{derive_metrics, IngestOutcome, IngestReport, ResultIngester};
pub use nucmer::{parse_delta, NucmerTool};
pub use orchestrator::{AnalysisConfig, Orchestrator, RunSummary};
pub use recovery::{Reconciliation, RecoveryReconciler};
