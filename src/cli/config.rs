// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub dbpath: Option<String>,
    pub indir: Option<String>,
    pub outdir: Option<String>,
    pub name: Option<String>,
    pub classes: Option<String>,
    pub labels: Option<String>,

    // Scheduling
    pub scheduler: Option<String>,
    pub workers: Option<usize>,
    pub sge_group_size: Option<usize>,
    pub sge_args: Option<String>,
    pub qsub_exe: Option<String>,
    pub job_prefix: Option<String>,

    // Tools
    pub nucmer_exe: Option<String>,
    pub filter_exe: Option<String>,
    pub maxmatch: Option<bool>,
    pub nofilter: Option<bool>,

    // Flags
    pub recovery: Option<bool>,
    pub fail_fast: Option<bool>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config = Self::from_toml(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# anicore.toml - Configuration file for anicore
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Comparison database (create it once with --create-db)
dbpath = ".anicore/anicore.db"

# Directory of genome FASTA files (.fna, .fa, .fas, .fasta)
# An optional <genome>.md5 file next to each FASTA supplies its hash
indir = "/path/to/genomes"

# Directory for nucmer_output/ and cluster batch scripts
outdir = "anim_output"

# Run name (omit for ANIm_<timestamp>)
# name = "my comparison run"

# Per-run genome metadata, <hash><TAB><stem><TAB><value> per line
# (anicore --index --indir <dir> writes both files with FASTA descriptions)
# classes = "/path/to/genomes/classes.txt"
# labels = "/path/to/genomes/labels.txt"

# =============================================================================
# SCHEDULING
# =============================================================================

# Job scheduler: multiprocessing, sge
scheduler = "multiprocessing"

# Local workers (omit for auto-detection)
workers = 8

# SGE array job size and extra qsub arguments
sge_group_size = 10000
# sge_args = "-q long.q -V"
qsub_exe = "qsub"

# Prefix for cluster job names
job_prefix = "ANIm"

# =============================================================================
# TOOLS
# =============================================================================

nucmer_exe = "nucmer"
filter_exe = "delta-filter"

# Use --maxmatch instead of --mum
maxmatch = false

# Ingest raw .delta files instead of delta-filter output
nofilter = false

# =============================================================================
# FLAGS
# =============================================================================

# Reuse outputs already present in outdir/nucmer_output
recovery = false

# Stop dispatching local jobs after the first failure
fail_fast = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_toml(&Config::generate_sample()).unwrap();
        assert_eq!(config.scheduler.as_deref(), Some("multiprocessing"));
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.sge_args, None);
        assert_eq!(config.nofilter, Some(false));
        assert_eq!(config.classes, None);
    }

    #[test]
    fn test_unknown_types_are_rejected() {
        assert!(Config::from_toml("workers = \"many\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anicore.toml");
        std::fs::write(&path, "indir = \"g\"\nrecovery = true\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.indir.as_deref(), Some("g"));
        assert_eq!(config.recovery, Some(true));
        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }
}
