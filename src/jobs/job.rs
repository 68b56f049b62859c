// job.rs - Compute units and their lifecycle states

use std::fmt;
use std::path::PathBuf;
use crate::store::ComparisonKey;

/// Pipeline stage of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Align,
    Filter,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Align => "align",
            Stage::Filter => "filter",
        }
    }
}

/// Explicit lifecycle of a job or planned unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Not yet dispatched
    Pending,
    /// Output already on disk from an earlier invocation
    Satisfied,
    Running,
    Done,
    Failed,
    /// Never run because a dependency failed
    Skipped,
}

impl JobState {
    /// Dependents may run once a dependency reaches one of these states
    pub fn is_complete(&self) -> bool {
        matches!(self, JobState::Done | JobState::Satisfied)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Done | JobState::Satisfied | JobState::Failed | JobState::Skipped
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Satisfied => "satisfied",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Failed => "failed",
            JobState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// One external command invocation (or a short chain of them)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub stage: Stage,
    pub commands: Vec<String>,
    pub dependencies: Vec<String>,
    pub artifact: PathBuf,
}

impl Job {
    pub fn new(id: impl Into<String>, stage: Stage, command: impl Into<String>, artifact: PathBuf) -> Self {
        Self {
            id: id.into(),
            stage,
            commands: vec![command.into()],
            dependencies: Vec::new(),
            artifact,
        }
    }

    pub fn add_dependency(&mut self, job_id: &str) {
        if !self.dependencies.iter().any(|d| d == job_id) {
            self.dependencies.push(job_id.to_string());
        }
    }

    /// All commands joined into a single shell line
    pub fn script(&self) -> String {
        self.commands.join(" && ")
    }
}

/// A planned pairwise comparison: align job, filter job, and the artifact to ingest
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonUnit {
    pub key: ComparisonKey,
    pub align: Job,
    pub filter: Job,
    /// File the ingester parses (the filter output, or the raw delta in no-filter mode)
    pub artifact: PathBuf,
    pub state: JobState,
}

impl ComparisonUnit {
    pub fn artifact_name(&self) -> String {
        self.artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}
