// lib.rs - anicore library root

//! # anicore - Memoized pairwise ANIm genome comparisons
//!
//! This library orchestrates all-vs-all NUCmer comparisons of a genome set,
//! storing every result in a SQLite database keyed by the genome pair and the
//! exact tool version and parameters. Repeated runs over overlapping genome
//! sets only compute the pairs the database has never seen.
//!
//! ## Features
//!
//! - **Memoization**: comparisons are content-addressed and shared across runs
//! - **Two schedulers**: a bounded local worker pool or SGE array submissions
//! - **Recovery**: outputs left by an interrupted run are reused, not recomputed
//! - **Partial success**: failed pairs never discard results of the others
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use anicore::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let store = Store::create(Path::new("anicore.db"), false).map_err(|e| e.to_string())?;
//! let version = NucmerTool::detect_version("nucmer")?;
//! let tool = NucmerTool::new("nucmer", "delta-filter", false, false, &version);
//! let scheduler = Scheduler::WorkerPool(WorkerPoolScheduler::new(None, Arc::new(ShellExecutor::new())));
//!
//! let genomes = discover_genomes(Path::new("genomes"))?;
//! let orchestrator = Orchestrator::new(&store, tool, scheduler, AnalysisConfig::default());
//! let summary = orchestrator.run(&genomes).map_err(|e| e.to_string())?;
//! println!("{} pairs, {} new", summary.pairs, summary.ingest.committed);
//! # Ok::<(), String>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod jobs;
pub mod scheduler;
pub mod store;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, validate_index_args, Args, ValidationResult};
    pub use crate::core::{AnalysisConfig, NucmerTool, Orchestrator, RunSummary};
    pub use crate::core::{IngestReport, ResultIngester, RecoveryReconciler};
    pub use crate::data::{discover_genomes, index_genomes, GenomeInfo, IndexReport};
    pub use crate::error::{ComputationError, OrchestratorError, SchedulerError, StoreError};
    pub use crate::jobs::{ComparisonUnit, Job, JobGraph, JobState, Stage};
    pub use crate::scheduler::{ClusterScheduler, Scheduler, SchedulerKind, WorkerPoolScheduler};
    pub use crate::scheduler::{JobExecutor, QueueSubmitter, SgeSubmitter, ShellExecutor};
    pub use crate::store::{Comparison, ComparisonKey, ComparisonStore, ItemCatalog};
    pub use crate::store::{MetadataKind, RunRegistry, RunStatus, Store};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, ValidationResult};
pub use core::{AnalysisConfig, Orchestrator, RunSummary};
pub use scheduler::Scheduler;
pub use store::Store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "anicore v{} - Memoized pairwise ANIm genome comparisons",
        VERSION
    )
}
