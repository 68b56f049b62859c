// cluster.rs - Array-job submission backend for an external batch queue (SGE/OGE)

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use rayon::prelude::*;
use crate::error::SchedulerError;
use crate::jobs::{JobGraph, JobState, Stage};

/// One array submission: `task_count` tasks, task N runs line N of `commands_file`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBatch {
    pub name: String,
    pub script: PathBuf,
    pub commands_file: PathBuf,
    pub task_count: usize,
    /// Job-name pattern this batch must wait for in the queue
    pub hold: Option<String>,
    pub job_indices: Vec<usize>,
}

/// Hands a batch to the external queue and blocks until it has drained
pub trait QueueSubmitter: Send + Sync + Debug {
    fn submit(&self, batch: &ArrayBatch) -> Result<(), String>;
}

/// `qsub -sync y` submitter for Grid Engine queues
#[derive(Debug, Clone)]
pub struct SgeSubmitter {
    program: String,
    extra_args: Vec<String>,
}

impl SgeSubmitter {
    pub fn new(program: &str, extra_args: &str) -> Self {
        Self {
            program: program.to_string(),
            extra_args: extra_args.split_whitespace().map(String::from).collect(),
        }
    }

    pub fn command_args(&self, batch: &ArrayBatch) -> Vec<String> {
        let mut args = vec![
            "-N".to_string(),
            batch.name.clone(),
            "-t".to_string(),
            format!("1-{}", batch.task_count),
            "-sync".to_string(),
            "y".to_string(),
        ];
        if let Some(hold) = &batch.hold {
            args.push("-hold_jid".to_string());
            args.push(hold.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push(batch.script.to_string_lossy().to_string());
        args
    }
}

impl QueueSubmitter for SgeSubmitter {
    fn submit(&self, batch: &ArrayBatch) -> Result<(), String> {
        let status = Command::new(&self.program)
            .args(self.command_args(batch))
            .status()
            .map_err(|e| format!("Failed to launch {}: {}", self.program, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} reported failure for {} ({})", self.program, batch.name, status))
        }
    }
}

/// Submits the align stage as array batches, then the filter stage as
/// dependent batches, and waits on the queue for each stage to drain.
///
/// Dependencies are tracked per stage: a filter job is submitted only when
/// the batch containing its align job drained successfully. Retries are left
/// to the queue.
#[derive(Debug, Clone)]
pub struct ClusterScheduler {
    group_size: usize,
    job_prefix: String,
    script_dir: PathBuf,
    submitter: Arc<dyn QueueSubmitter>,
}

impl ClusterScheduler {
    pub fn new(
        group_size: usize,
        job_prefix: &str,
        script_dir: &Path,
        submitter: Arc<dyn QueueSubmitter>,
    ) -> Self {
        Self {
            group_size: group_size.max(1),
            job_prefix: job_prefix.to_string(),
            script_dir: script_dir.to_path_buf(),
            submitter,
        }
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    fn stage_name(&self, stage: Stage) -> String {
        format!("{}_{}", self.job_prefix, stage.as_str())
    }

    /// Execute the graph; returns the number of failed or skipped jobs
    pub fn execute(&self, graph: &mut JobGraph) -> Result<usize, SchedulerError> {
        graph.validate()?;
        let dependents = graph.dependents()?;
        std::fs::create_dir_all(&self.script_dir).map_err(|source| SchedulerError::Script {
            path: self.script_dir.clone(),
            source,
        })?;

        for (stage, hold) in [
            (Stage::Align, None),
            (Stage::Filter, Some(format!("{}*", self.stage_name(Stage::Align)))),
        ] {
            let ready: Vec<usize> = graph
                .ready_jobs()?
                .into_iter()
                .filter(|idx| graph.job(*idx).stage == stage)
                .collect();
            if ready.is_empty() {
                continue;
            }

            let batches = self.write_batches(graph, stage, &ready, hold)?;
            println!(
                "📤 Submitting {} {} jobs as {} array batch(es) of up to {}",
                ready.len(),
                stage.as_str(),
                batches.len(),
                self.group_size
            );
            for idx in &ready {
                graph.set_state(*idx, JobState::Running);
            }

            let outcomes: Vec<(&ArrayBatch, Result<(), String>)> = batches
                .par_iter()
                .map(|batch| (batch, self.submitter.submit(batch)))
                .collect();

            for (batch, outcome) in outcomes {
                let state = match outcome {
                    Ok(()) => JobState::Done,
                    Err(reason) => {
                        eprintln!("❌ Batch {} failed: {}", batch.name, reason);
                        JobState::Failed
                    }
                };
                for idx in &batch.job_indices {
                    graph.set_state(*idx, state);
                }
                if state == JobState::Failed {
                    for idx in &batch.job_indices {
                        graph.skip_dependents(*idx, &dependents);
                    }
                }
            }
        }

        // Anything still pending could not be placed in either stage
        for idx in 0..graph.len() {
            if graph.state(idx) == JobState::Pending {
                graph.set_state(idx, JobState::Skipped);
            }
        }
        Ok(graph.failure_count())
    }

    /// Write one commands file and one array script per group of jobs
    fn write_batches(
        &self,
        graph: &JobGraph,
        stage: Stage,
        jobs: &[usize],
        hold: Option<String>,
    ) -> Result<Vec<ArrayBatch>, SchedulerError> {
        let stage_name = self.stage_name(stage);
        let mut batches = Vec::new();

        for (n, chunk) in jobs.chunks(self.group_size).enumerate() {
            let name = format!("{}_{:04}", stage_name, n + 1);
            let commands_file = self.script_dir.join(format!("{}.cmds", name));
            let script = self.script_dir.join(format!("{}.sh", name));

            let mut commands = String::new();
            for idx in chunk {
                commands.push_str(&graph.job(*idx).script());
                commands.push('\n');
            }
            write_file(&commands_file, &commands)?;

            let body = format!(
                "#!/bin/sh\n#$ -S /bin/sh\n#$ -cwd\nCMD=$(sed -n \"${{SGE_TASK_ID}}p\" {})\neval \"$CMD\"\n",
                commands_file.display()
            );
            write_file(&script, &body)?;

            batches.push(ArrayBatch {
                name,
                script,
                commands_file,
                task_count: chunk.len(),
                hold: hold.clone(),
                job_indices: chunk.to_vec(),
            });
        }
        Ok(batches)
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), SchedulerError> {
    std::fs::write(path, content).map_err(|source| SchedulerError::Script {
        path: path.to_path_buf(),
        source,
    })
}
