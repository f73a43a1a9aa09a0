use crate::error::{Result, WriteError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Matches what follows `<Label>` in a part file name.
static PART_SUFFIX_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-part(\d+)\.csv$").unwrap());

pub fn header_path(dir: &Path, pascal_label: &str) -> PathBuf {
    dir.join(format!("{pascal_label}-header.csv"))
}

pub fn part_path(dir: &Path, pascal_label: &str, index: u32) -> PathBuf {
    dir.join(format!("{pascal_label}-part{index:03}.csv"))
}

/// Pattern handed to the loader for all of a label's part files.
pub fn part_pattern(dir: &Path, pascal_label: &str) -> PathBuf {
    dir.join(format!("{pascal_label}-part.*"))
}

/// Part file indices already present for `pascal_label`, ascending.
pub fn existing_part_indices(dir: &Path, pascal_label: &str) -> Result<Vec<u32>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WriteError::io(dir, e)),
    };

    let mut indices = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WriteError::io(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(rest) = name.strip_prefix(pascal_label) else {
            continue;
        };
        if let Some(caps) = PART_SUFFIX_REGEX.captures(rest) {
            if let Ok(idx) = caps[1].parse::<u32>() {
                indices.push(idx);
            }
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

/// Writes each batch to a fresh part file, never appending to an existing one.
///
/// The next index is the highest index on disk plus one, so a directory can
/// be extended by a later run. Two writers on the same directory and label
/// can pick the same index; callers must serialize runs per directory.
#[derive(Debug, Clone)]
pub struct PartFileWriter {
    dir: PathBuf,
}

impl PartFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next_part_index(&self, pascal_label: &str) -> Result<u32> {
        Ok(existing_part_indices(&self.dir, pascal_label)?
            .last()
            .map_or(0, |max| max + 1))
    }

    /// Writes `lines` to the next part file and returns its path, or `None`
    /// for an empty batch (no file is created).
    pub fn append_batch(&self, pascal_label: &str, lines: &[String]) -> Result<Option<PathBuf>> {
        if lines.is_empty() {
            return Ok(None);
        }

        let index = self.next_part_index(pascal_label)?;
        let path = part_path(&self.dir, pascal_label, index);
        info!(entries = lines.len(), path = %path.display(), "Writing part file");

        let file = File::create_new(&path).map_err(|e| WriteError::io(&path, e))?;
        let mut writer = BufWriter::with_capacity(128 * 1024, file);
        for line in lines {
            writer
                .write_all(line.as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| WriteError::io(&path, e))?;
        }
        writer.flush().map_err(|e| WriteError::io(&path, e))?;

        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn paths_are_padded() {
        let dir = Path::new("/out");
        assert_eq!(part_path(dir, "Protein", 7), PathBuf::from("/out/Protein-part007.csv"));
        assert_eq!(header_path(dir, "Protein"), PathBuf::from("/out/Protein-header.csv"));
        assert_eq!(part_pattern(dir, "Protein"), PathBuf::from("/out/Protein-part.*"));
    }

    #[test]
    fn first_index_is_zero() {
        let dir = TempDir::new().unwrap();
        let writer = PartFileWriter::new(dir.path());
        assert_eq!(writer.next_part_index("Protein").unwrap(), 0);
    }

    #[test]
    fn each_batch_gets_a_new_file() {
        let dir = TempDir::new().unwrap();
        let writer = PartFileWriter::new(dir.path());

        let first = writer.append_batch("Protein", &lines(&["a", "b"])).unwrap().unwrap();
        let second = writer.append_batch("Protein", &lines(&["c"])).unwrap().unwrap();

        assert!(first.ends_with("Protein-part000.csv"));
        assert!(second.ends_with("Protein-part001.csv"));
        assert_eq!(fs::read_to_string(first).unwrap(), "a\nb\n");
        assert_eq!(fs::read_to_string(second).unwrap(), "c\n");
    }

    #[test]
    fn empty_batch_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = PartFileWriter::new(dir.path());
        assert!(writer.append_batch("Protein", &[]).unwrap().is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn index_continues_after_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Protein-part000.csv"), "x\n").unwrap();
        fs::write(dir.path().join("Protein-part004.csv"), "x\n").unwrap();
        // Different label sharing the prefix must not count.
        fs::write(dir.path().join("ProteinComplex-part009.csv"), "x\n").unwrap();
        fs::write(dir.path().join("Protein-header.csv"), ":ID\n").unwrap();

        let writer = PartFileWriter::new(dir.path());
        assert_eq!(writer.next_part_index("Protein").unwrap(), 5);
        assert_eq!(
            existing_part_indices(dir.path(), "Protein").unwrap(),
            vec![0, 4]
        );
    }

    #[test]
    fn missing_directory_has_no_parts() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(existing_part_indices(&missing, "Protein").unwrap().is_empty());
    }
}
