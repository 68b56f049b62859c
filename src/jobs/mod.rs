// mod.rs - Job graph module

pub mod graph;
pub mod job;

// Re-export main types for convenience
pub use graph::JobGraph;
pub use job::{ComparisonUnit, Job, JobState, Stage};
