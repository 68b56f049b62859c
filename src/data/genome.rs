// genome.rs - Genome discovery, hashing and length calculation

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use bio::io::fasta;

/// FASTA extensions accepted as genome inputs
const FASTA_EXTENSIONS: &[&str] = &["fna", "fa", "fas", "fasta"];

/// Everything the item catalog needs to know about one input genome
#[derive(Debug, Clone, PartialEq)]
pub struct GenomeInfo {
    pub hash: String,
    pub path: PathBuf,
    pub description: String,
    pub length: u64,
}

impl GenomeInfo {
    /// Read a FASTA file, using a `<stem>.md5` sidecar for the hash when present
    pub fn from_fasta(path: &Path) -> Result<Self, String> {
        let path = path
            .canonicalize()
            .map_err(|e| format!("Failed to resolve genome path '{}': {}", path.display(), e))?;

        let (description, length) = read_fasta_summary(&path)?;
        let hash = match read_hash_sidecar(&path)? {
            Some(hash) => hash,
            None => compute_file_md5(&path)?,
        };

        Ok(Self {
            hash,
            path,
            description,
            length,
        })
    }

    /// File stem used to name comparison outputs
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Find all FASTA genomes in a directory, sorted by path
pub fn discover_genomes(indir: &Path) -> Result<Vec<GenomeInfo>, String> {
    fasta_paths(indir)?
        .iter()
        .map(|path| GenomeInfo::from_fasta(path))
        .collect()
}

/// Paths of FASTA files in `indir`, sorted; an error when there are none
pub(crate) fn fasta_paths(indir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(indir)
        .map_err(|e| format!("Failed to read input directory '{}': {}", indir.display(), e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && FASTA_EXTENSIONS
                    .contains(&path.extension().and_then(|s| s.to_str()).unwrap_or(""))
        })
        .collect();

    if paths.is_empty() {
        return Err(format!("No FASTA files found in '{}'", indir.display()));
    }
    paths.sort();
    Ok(paths)
}

/// First record description and total sequence length
pub(crate) fn read_fasta_summary(path: &Path) -> Result<(String, u64), String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open FASTA file {}: {}", path.display(), e))?;
    let reader = fasta::Reader::new(BufReader::new(file));

    let mut description = None;
    let mut length = 0u64;
    for record_result in reader.records() {
        let record = record_result
            .map_err(|e| format!("Invalid FASTA record in {}: {}", path.display(), e))?;
        if description.is_none() {
            description = Some(match record.desc() {
                Some(desc) => format!("{} {}", record.id(), desc),
                None => record.id().to_string(),
            });
        }
        length += record.seq().len() as u64;
    }

    let description =
        description.ok_or_else(|| format!("No FASTA records in {}", path.display()))?;
    Ok((description, length))
}

/// Hash from `<stem>.md5` (format: `<hash>\t<path>`), if that file exists
pub(crate) fn read_hash_sidecar(path: &Path) -> Result<Option<String>, String> {
    let sidecar = sidecar_path(path);
    if !sidecar.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&sidecar)
        .map_err(|e| format!("Failed to read hash file {}: {}", sidecar.display(), e))?;
    let hash = content
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("Empty hash file {}", sidecar.display()))?;
    Ok(Some(hash.to_string()))
}

/// `<stem>.md5` next to the FASTA file
pub(crate) fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension("md5")
}

pub(crate) fn compute_file_md5(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read {} for hashing: {}", path.display(), e))?;
    Ok(format!("{:x}", md5::compute(bytes)))
}
