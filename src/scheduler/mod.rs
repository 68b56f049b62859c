// mod.rs - Scheduler backends

pub mod cluster;
pub mod executor;
pub mod pool;

use std::str::FromStr;
use crate::error::SchedulerError;
use crate::jobs::JobGraph;

// Re-export main types for convenience
pub use cluster::{ArrayBatch, ClusterScheduler, QueueSubmitter, SgeSubmitter};
pub use executor::{JobExecutor, ShellExecutor};
pub use pool::WorkerPoolScheduler;

/// Which backend to build, as selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Multiprocessing,
    Sge,
}

impl FromStr for SchedulerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiprocessing" | "local" | "pool" => Ok(SchedulerKind::Multiprocessing),
            "sge" | "oge" | "cluster" => Ok(SchedulerKind::Sge),
            _ => Err(format!("Invalid scheduler: {}. Use: multiprocessing, sge", s)),
        }
    }
}

/// Execution backend, chosen once when the orchestrator is built
#[derive(Debug, Clone)]
pub enum Scheduler {
    WorkerPool(WorkerPoolScheduler),
    Cluster(ClusterScheduler),
}

impl Scheduler {
    /// Run every pending job in `graph`, respecting dependencies.
    ///
    /// Returns the number of jobs that failed or were skipped because a
    /// dependency failed.
    pub fn execute(&self, graph: &mut JobGraph) -> Result<usize, SchedulerError> {
        match self {
            Scheduler::WorkerPool(pool) => pool.execute(graph),
            Scheduler::Cluster(cluster) => cluster.execute(graph),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Scheduler::WorkerPool(pool) => format!("local worker pool ({} workers)", pool.workers()),
            Scheduler::Cluster(cluster) => {
                format!("cluster queue (array groups of {})", cluster.group_size())
            }
        }
    }
}
