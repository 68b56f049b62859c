// executor.rs - Running a job's commands as external processes

use std::fmt::Debug;
use std::process::Command;
use crate::jobs::Job;

/// Strategy for executing a single job on the local machine
pub trait JobExecutor: Send + Sync + Debug {
    /// Run the job to completion; `Err` carries a human-readable failure reason
    fn execute(&self, job: &Job) -> Result<(), String>;
}

/// Runs each command through `sh -c`, stopping at the first non-zero exit
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl JobExecutor for ShellExecutor {
    fn execute(&self, job: &Job) -> Result<(), String> {
        for command in &job.commands {
            let status = Command::new(&self.shell)
                .arg("-c")
                .arg(command)
                .status()
                .map_err(|e| format!("Failed to launch '{}': {}", command, e))?;
            if !status.success() {
                return Err(match status.code() {
                    Some(code) => format!("'{}' exited with status {}", command, code),
                    None => format!("'{}' terminated by signal", command),
                });
            }
        }
        Ok(())
    }
}
