// validation.rs - Input validation utilities

use std::path::{Path, PathBuf};
use std::str::FromStr;
use regex::Regex;
use crate::cli::args::Args;
use crate::scheduler::SchedulerKind;

pub struct ValidationResult {
    pub scheduler: SchedulerKind,
    pub dbpath: PathBuf,
    pub indir: PathBuf,
    pub outdir: PathBuf,
    pub classes: Option<PathBuf>,
    pub labels: Option<PathBuf>,
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    let indir = PathBuf::from(args.indir.as_ref().ok_or("--indir is required")?);
    let outdir = PathBuf::from(args.outdir.as_ref().ok_or("--outdir is required")?);

    if !indir.is_dir() {
        return Err(format!("Input directory '{}' does not exist", indir.display()));
    }
    if outdir.is_file() {
        return Err(format!("Output path '{}' is a file, not a directory", outdir.display()));
    }

    let dbpath = PathBuf::from(&args.dbpath);
    if !args.create_db && !dbpath.is_file() {
        return Err(format!(
            "Database '{}' does not exist (use --create-db to create it)",
            dbpath.display()
        ));
    }
    if args.force && !args.create_db {
        return Err("--force only applies together with --create-db".to_string());
    }

    let classes = metadata_file(args.classes.as_deref(), "--classes")?;
    let labels = metadata_file(args.labels.as_deref(), "--labels")?;

    let scheduler = SchedulerKind::from_str(&args.scheduler)?;

    if args.workers == Some(0) {
        return Err("--workers must be at least 1".to_string());
    }
    if args.sge_group_size == 0 {
        return Err("--sge-group-size must be at least 1".to_string());
    }
    if scheduler == SchedulerKind::Multiprocessing && args.sge_args.is_some() {
        eprintln!("⚠️  --sge-args is ignored by the multiprocessing scheduler");
    }

    // Job names end up in qsub -N and in script file names
    let prefix_re = Regex::new(r"^[A-Za-z][A-Za-z0-9_.-]*$")
        .map_err(|e| format!("Invalid job prefix pattern: {}", e))?;
    if !prefix_re.is_match(&args.job_prefix) {
        return Err(format!(
            "Invalid job prefix '{}': use letters, digits, '_', '.', '-' and start with a letter",
            args.job_prefix
        ));
    }

    Ok(ValidationResult {
        scheduler,
        dbpath,
        indir,
        outdir,
        classes,
        labels,
    })
}

/// Validate arguments for `--index`; returns the directory to index
pub fn validate_index_args(args: &Args) -> Result<PathBuf, String> {
    let indir = PathBuf::from(args.indir.as_ref().ok_or("--indir is required")?);
    if !indir.is_dir() {
        return Err(format!("Input directory '{}' does not exist", indir.display()));
    }
    Ok(indir)
}

fn metadata_file(path: Option<&str>, flag: &str) -> Result<Option<PathBuf>, String> {
    match path {
        Some(path) if !Path::new(path).is_file() => {
            Err(format!("{} file '{}' does not exist", flag, path))
        }
        Some(path) => Ok(Some(PathBuf::from(path))),
        None => Ok(None),
    }
}
