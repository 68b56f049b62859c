// pool.rs - Bounded local worker pool backend

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use indicatif::{ProgressBar, ProgressStyle};
use crate::error::SchedulerError;
use crate::jobs::{JobGraph, JobState};
use super::executor::JobExecutor;

/// Runs ready jobs on a fixed-size rayon pool, unblocking dependents as jobs finish.
///
/// At most `workers` jobs are in flight at once. Raising the abort flag stops
/// further dispatch; jobs already running are allowed to finish.
#[derive(Debug, Clone)]
pub struct WorkerPoolScheduler {
    workers: usize,
    executor: Arc<dyn JobExecutor>,
    abort: Arc<AtomicBool>,
    fail_fast: bool,
}

impl WorkerPoolScheduler {
    /// `workers = None` uses the available parallelism
    pub fn new(workers: Option<usize>, executor: Arc<dyn JobExecutor>) -> Self {
        let workers = workers
            .filter(|n| *n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        Self {
            workers,
            executor,
            abort: Arc::new(AtomicBool::new(false)),
            fail_fast: false,
        }
    }

    /// Stop dispatching new jobs after the first failure
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Flag that, once set, prevents any further job from being dispatched
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::SeqCst)
    }

    /// Execute the graph; returns the number of failed or skipped jobs
    pub fn execute(&self, graph: &mut JobGraph) -> Result<usize, SchedulerError> {
        graph.validate()?;
        let dependents = graph.dependents()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("anicore-worker-{}", i))
            .build()
            .map_err(|e| SchedulerError::Pool(e.to_string()))?;

        // Outstanding dependency count per job; a job enters the ready queue at zero
        let mut waiting_on: Vec<usize> = Vec::with_capacity(graph.len());
        for idx in 0..graph.len() {
            let unmet = graph
                .dependencies_of(idx)?
                .iter()
                .filter(|dep| !graph.state(**dep).is_complete())
                .count();
            waiting_on.push(unmet);
        }
        let mut ready: VecDeque<usize> = graph.ready_jobs()?.into_iter().collect();

        let pb = ProgressBar::new(graph.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs ({percent}%) ETA: {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let (tx, rx) = mpsc::channel::<(usize, Result<(), String>)>();
        let mut in_flight = 0usize;

        loop {
            while in_flight < self.workers && !self.is_aborted() {
                let Some(idx) = ready.pop_front() else { break };
                if graph.state(idx) != JobState::Pending {
                    continue;
                }
                graph.set_state(idx, JobState::Running);
                in_flight += 1;

                let job = graph.job(idx).clone();
                let executor = Arc::clone(&self.executor);
                let tx = tx.clone();
                pool.spawn(move || {
                    let result = executor.execute(&job);
                    let _ = tx.send((idx, result));
                });
            }

            if in_flight == 0 {
                break;
            }

            let Ok((idx, result)) = rx.recv() else { break };
            in_flight -= 1;
            pb.inc(1);

            match result {
                Ok(()) => {
                    graph.set_state(idx, JobState::Done);
                    for &next in &dependents[idx] {
                        waiting_on[next] = waiting_on[next].saturating_sub(1);
                        if waiting_on[next] == 0 && graph.state(next) == JobState::Pending {
                            ready.push_back(next);
                        }
                    }
                }
                Err(reason) => {
                    pb.println(format!("❌ Job {} failed: {}", graph.job(idx).id, reason));
                    graph.set_state(idx, JobState::Failed);
                    let skipped = graph.skip_dependents(idx, &dependents);
                    pb.inc(skipped as u64);
                    if self.fail_fast {
                        self.abort.store(true, Ordering::SeqCst);
                    }
                }
            }
        }

        if self.is_aborted() {
            let mut cancelled = 0;
            for idx in 0..graph.len() {
                if graph.state(idx) == JobState::Pending {
                    graph.set_state(idx, JobState::Skipped);
                    cancelled += 1;
                }
            }
            if cancelled > 0 {
                pb.println(format!("⚠️  Aborted: {} jobs were never dispatched", cancelled));
            }
        }

        pb.finish_and_clear();
        Ok(graph.failure_count())
    }
}
