// index.rs - Hash sidecars and class/label metadata files for an input directory

use std::fs;
use std::path::{Path, PathBuf};
use super::genome::{
    compute_file_md5, fasta_paths, file_stem, read_fasta_summary, read_hash_sidecar, sidecar_path,
};

/// Default metadata file names written next to the genomes
pub const CLASSES_FILE: &str = "classes.txt";
pub const LABELS_FILE: &str = "labels.txt";

/// One `<hash>\t<stem>\t<value>` line of a classes or labels file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEntry {
    pub hash: String,
    pub stem: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    /// Sidecars written by this call
    pub hashed: usize,
    /// Sidecars already present and kept
    pub existing: usize,
    pub classes: Option<PathBuf>,
    pub labels: Option<PathBuf>,
}

/// Write a `<stem>.md5` sidecar for every FASTA file in `indir`, then the
/// classes and labels files.
///
/// Existing sidecars and metadata files are kept unless `force` is set. Both
/// metadata files default each genome's value to its first record description.
pub fn index_genomes(indir: &Path, force: bool) -> Result<IndexReport, String> {
    let paths = fasta_paths(indir)?;
    println!("🔍 Indexing {} FASTA files in {}", paths.len(), indir.display());

    let mut report = IndexReport::default();
    let mut lines = Vec::with_capacity(paths.len());
    for path in &paths {
        let existing = if force { None } else { read_hash_sidecar(path)? };
        let hash = match existing {
            Some(hash) => {
                report.existing += 1;
                hash
            }
            None => {
                let hash = compute_file_md5(path)?;
                let sidecar = sidecar_path(path);
                fs::write(&sidecar, format!("{}\t{}\n", hash, path.display()))
                    .map_err(|e| format!("Failed to write hash file {}: {}", sidecar.display(), e))?;
                report.hashed += 1;
                hash
            }
        };
        let (description, _) = read_fasta_summary(path)?;
        lines.push(format!("{}\t{}\t{}", hash, file_stem(path), description));
    }

    let content = lines.join("\n") + "\n";
    report.classes = write_metadata(&indir.join(CLASSES_FILE), &content, force)?;
    report.labels = write_metadata(&indir.join(LABELS_FILE), &content, force)?;
    Ok(report)
}

fn write_metadata(path: &Path, content: &str, force: bool) -> Result<Option<PathBuf>, String> {
    if path.exists() && !force {
        println!("⚠️  {} exists, not overwriting (use --force)", path.display());
        return Ok(None);
    }
    fs::write(path, content)
        .map_err(|e| format!("Failed to write metadata file {}: {}", path.display(), e))?;
    Ok(Some(path.to_path_buf()))
}

/// Parse a classes or labels file; blank lines and `#` comments are skipped
pub fn read_metadata(path: &Path) -> Result<Vec<MetadataEntry>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read metadata file '{}': {}", path.display(), e))?;

    let mut entries = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.splitn(3, '\t').collect();
        if fields.len() != 3 {
            return Err(format!(
                "Invalid line {} in '{}': expected <hash>\\t<stem>\\t<value>",
                line_num + 1,
                path.display()
            ));
        }
        entries.push(MetadataEntry {
            hash: fields[0].trim().to_string(),
            stem: fields[1].trim().to_string(),
            value: fields[2].trim().to_string(),
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GenomeInfo;

    fn genomes_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.fna"), ">a1 Escherichia coli\nACGT\n").unwrap();
        fs::write(dir.path().join("b.fasta"), ">b1 Salmonella enterica\nAC\n").unwrap();
        dir
    }

    #[test]
    fn test_index_writes_sidecars_and_metadata() {
        let dir = genomes_dir();
        let report = index_genomes(dir.path(), false).unwrap();
        assert_eq!(report.hashed, 2);
        assert_eq!(report.existing, 0);
        assert!(dir.path().join("a.md5").is_file());

        // Discovery now reads the sidecar, which matches the file's own md5
        let a = GenomeInfo::from_fasta(&dir.path().join("a.fna")).unwrap();
        let expected = format!("{:x}", md5::compute(fs::read(dir.path().join("a.fna")).unwrap()));
        assert_eq!(a.hash, expected);

        let classes = read_metadata(&report.classes.unwrap()).unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].hash, expected);
        assert_eq!(classes[0].stem, "a");
        assert_eq!(classes[0].value, "a1 Escherichia coli");
        assert_eq!(read_metadata(&report.labels.unwrap()).unwrap(), classes);
    }

    #[test]
    fn test_second_index_keeps_existing_files() {
        let dir = genomes_dir();
        index_genomes(dir.path(), false).unwrap();
        fs::write(dir.path().join(CLASSES_FILE), "edited\tby\thand\n").unwrap();

        let report = index_genomes(dir.path(), false).unwrap();
        assert_eq!(report.existing, 2);
        assert!(report.classes.is_none());
        assert_eq!(read_metadata(&dir.path().join(CLASSES_FILE)).unwrap()[0].value, "hand");

        let forced = index_genomes(dir.path(), true).unwrap();
        assert_eq!(forced.hashed, 2);
        assert!(forced.classes.is_some());
    }

    #[test]
    fn test_read_metadata_rejects_short_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "# hash\tstem\tlabel\nabc\ta\tStrain A\n\nabd\tb\n").unwrap();
        let err = read_metadata(&path).unwrap_err();
        assert!(err.contains("line 4"));
    }
}
