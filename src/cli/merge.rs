// merge.rs - Merge configuration file with CLI arguments

use crate::cli::args::DEFAULT_DBPATH;
use crate::cli::{Args, Config};

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output (only override defaults, not explicit CLI values)
        if self.dbpath == DEFAULT_DBPATH {
            if let Some(dbpath) = config.dbpath {
                self.dbpath = dbpath;
            }
        }
        if self.indir.is_none() {
            self.indir = config.indir;
        }
        if self.outdir.is_none() {
            self.outdir = config.outdir;
        }
        if self.name.is_none() {
            self.name = config.name;
        }
        if self.classes.is_none() {
            self.classes = config.classes;
        }
        if self.labels.is_none() {
            self.labels = config.labels;
        }

        // Scheduling
        if self.scheduler == "multiprocessing" {
            if let Some(scheduler) = config.scheduler {
                self.scheduler = scheduler;
            }
        }
        if self.workers.is_none() {
            self.workers = config.workers;
        }
        if self.sge_group_size == 10000 {
            if let Some(size) = config.sge_group_size {
                self.sge_group_size = size;
            }
        }
        if self.sge_args.is_none() {
            self.sge_args = config.sge_args;
        }
        if self.qsub_exe == "qsub" {
            if let Some(qsub) = config.qsub_exe {
                self.qsub_exe = qsub;
            }
        }
        if self.job_prefix == "ANIm" {
            if let Some(prefix) = config.job_prefix {
                self.job_prefix = prefix;
            }
        }

        // Tools
        if self.nucmer_exe == "nucmer" {
            if let Some(exe) = config.nucmer_exe {
                self.nucmer_exe = exe;
            }
        }
        if self.filter_exe == "delta-filter" {
            if let Some(exe) = config.filter_exe {
                self.filter_exe = exe;
            }
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.maxmatch && config.maxmatch.unwrap_or(false) {
            self.maxmatch = true;
        }
        if !self.nofilter && config.nofilter.unwrap_or(false) {
            self.nofilter = true;
        }
        if !self.recovery && config.recovery.unwrap_or(false) {
            self.recovery = true;
        }
        if !self.fail_fast && config.fail_fast.unwrap_or(false) {
            self.fail_fast = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}
