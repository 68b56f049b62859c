// nucmer.rs - NUCmer/delta-filter command construction and delta parsing

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use regex::Regex;
use crate::data::genome::file_stem;
use crate::error::ComputationError;
use crate::jobs::{ComparisonUnit, Job, JobState, Stage};
use crate::store::{ComparisonKey, Item};

/// Program name recorded in the comparison key
pub const PROGRAM: &str = "nucmer";

/// Subdirectory of the output directory holding alignment artifacts
pub const ALIGN_DIR: &str = "nucmer_output";

/// How NUCmer is invoked, and which version produced the results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NucmerTool {
    pub nucmer_exe: String,
    pub filter_exe: String,
    pub maxmatch: bool,
    pub nofilter: bool,
    pub version: String,
}

impl NucmerTool {
    pub fn new(nucmer_exe: &str, filter_exe: &str, maxmatch: bool, nofilter: bool, version: &str) -> Self {
        Self {
            nucmer_exe: nucmer_exe.to_string(),
            filter_exe: filter_exe.to_string(),
            maxmatch,
            nofilter,
            version: version.to_string(),
        }
    }

    /// Ask the executable for its version (`nucmer -V`)
    pub fn detect_version(nucmer_exe: &str) -> Result<String, String> {
        let output = Command::new(nucmer_exe)
            .arg("-V")
            .output()
            .map_err(|e| format!("Failed to run '{} -V': {}", nucmer_exe, e))?;
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        parse_version(&text)
            .ok_or_else(|| format!("Could not find a version number in output of '{} -V'", nucmer_exe))
    }

    /// Parameter signature stored with every comparison
    pub fn params(&self) -> String {
        let mode = if self.maxmatch { "maxmatch" } else { "mum" };
        if self.nofilter {
            format!("{};nofilter", mode)
        } else {
            mode.to_string()
        }
    }

    pub fn key(&self, item_a: i64, item_b: i64) -> ComparisonKey {
        ComparisonKey::new(item_a, item_b, PROGRAM, &self.version, &self.params())
    }

    /// Subdirectory name for one tool version and parameter signature
    pub fn signature(&self) -> String {
        format!("{}_{}", self.version, self.params())
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect()
    }

    /// Directory holding every artifact computed under this signature
    pub fn output_dir(&self, align_dir: &Path) -> PathBuf {
        align_dir.join(self.signature())
    }

    /// Output prefix `<align_dir>/<signature>/<idA>_<stemA>_vs_<idB>_<stemB>`.
    ///
    /// Item ids keep inputs that share a stem (`a.fna`, `a.fa`) apart.
    pub fn output_prefix(&self, align_dir: &Path, a: &Item, b: &Item) -> PathBuf {
        self.output_dir(align_dir).join(format!(
            "{}_{}_vs_{}_{}",
            a.id,
            file_stem(&a.path),
            b.id,
            file_stem(&b.path)
        ))
    }

    /// Align and filter command lines for one pair
    pub fn command_lines(&self, align_dir: &Path, a: &Item, b: &Item) -> (String, String) {
        let prefix = self.output_prefix(align_dir, a, b);
        let mode = if self.maxmatch { "--maxmatch" } else { "--mum" };
        let align = format!(
            "{} {} -p {} {} {}",
            self.nucmer_exe,
            mode,
            prefix.display(),
            a.path.display(),
            b.path.display()
        );
        let filter = format!(
            "{} -1 {}.delta > {}.filter",
            self.filter_exe,
            prefix.display(),
            prefix.display()
        );
        (align, filter)
    }

    /// Plan the align → filter job pair for items `a` and `b`
    pub fn plan_unit(&self, job_prefix: &str, idx: usize, align_dir: &Path, a: &Item, b: &Item) -> ComparisonUnit {
        let prefix = self.output_prefix(align_dir, a, b);
        // Stems may contain dots, so extensions are appended
        let delta = PathBuf::from(format!("{}.delta", prefix.display()));
        let filtered = PathBuf::from(format!("{}.filter", prefix.display()));
        let (align_cmd, filter_cmd) = self.command_lines(align_dir, a, b);

        let align = Job::new(format!("{}_{:06}-n", job_prefix, idx), Stage::Align, align_cmd, delta.clone());
        let mut filter = Job::new(format!("{}_{:06}-f", job_prefix, idx), Stage::Filter, filter_cmd, filtered.clone());
        filter.add_dependency(&align.id);

        ComparisonUnit {
            key: self.key(a.id, b.id),
            align,
            filter,
            artifact: if self.nofilter { delta } else { filtered },
            state: JobState::Pending,
        }
    }
}

fn parse_version(text: &str) -> Option<String> {
    let re = Regex::new(r"(?i)version\s+v?([0-9][0-9A-Za-z._-]*)").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Sum aligned length and similarity errors over all alignments in a delta file.
///
/// Alignment header lines have seven integer fields:
/// `start1 end1 start2 end2 errors sim_errors stops`; the aligned length of
/// each is `|end1 - start1|`. Other lines are ignored.
pub fn parse_delta(path: &Path) -> Result<(u64, u64), ComputationError> {
    let file = File::open(path).map_err(|source| ComputationError::Artifact {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut aligned_length = 0u64;
    let mut sim_errors = 0u64;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ComputationError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 || fields[0] == "NUCMER" || fields[0].starts_with('>') {
            continue;
        }

        let parse = |field: &str| -> Result<i64, ComputationError> {
            field.parse::<i64>().map_err(|e| ComputationError::Malformed {
                path: path.to_path_buf(),
                line: line_num + 1,
                reason: format!("'{}': {}", field, e),
            })
        };
        let start = parse(fields[0])?;
        let end = parse(fields[1])?;
        aligned_length += (end - start).unsigned_abs();
        sim_errors += parse(fields[4])?.unsigned_abs();
    }

    Ok((aligned_length, sim_errors))
}
