//! Retrospective check of an output directory: every part file line must
//! have as many fields as its label's header has columns.

use crate::config::CsvFormat;
use crate::error::{Result, WriteError};
use crate::parts::{existing_part_indices, part_path};
use csv::ReaderBuilder;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Misaligned {
    pub file: PathBuf,
    pub line: u64,
    pub fields: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelReport {
    pub label: String,
    pub columns: usize,
    pub part_files: usize,
    pub rows: u64,
    pub misaligned: Vec<Misaligned>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub labels: Vec<LabelReport>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.labels.iter().all(|l| l.misaligned.is_empty())
    }

    pub fn rows(&self) -> u64 {
        self.labels.iter().map(|l| l.rows).sum()
    }
}

fn single_byte(value: &str, what: &str) -> Result<u8> {
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(WriteError::config(format!(
            "{what} {value:?} must be a single byte to verify output"
        ))),
    }
}

fn reader_builder(format: &CsvFormat) -> Result<ReaderBuilder> {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(single_byte(&format.delimiter, "delimiter")?)
        .quote(single_byte(&format.quote, "quote")?)
        .double_quote(true)
        .has_headers(false)
        .flexible(true);
    Ok(builder)
}

fn header_labels(dir: &Path) -> Result<Vec<String>> {
    let mut labels: Vec<String> = fs::read_dir(dir)
        .map_err(|e| WriteError::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|n| n.strip_suffix("-header.csv"))
                .map(str::to_string)
        })
        .collect();
    labels.sort();
    Ok(labels)
}

fn verify_label(dir: &Path, label: &str, builder: &ReaderBuilder) -> Result<LabelReport> {
    let hdr_path = dir.join(format!("{label}-header.csv"));
    let file = File::open(&hdr_path).map_err(|e| WriteError::io(&hdr_path, e))?;
    let columns = builder
        .from_reader(BufReader::new(file))
        .records()
        .next()
        .transpose()?
        .map_or(0, |r| r.len());

    let indices = existing_part_indices(dir, label)?;
    let mut rows = 0u64;
    let mut misaligned = Vec::new();

    for idx in &indices {
        let path = part_path(dir, label, *idx);
        let file = File::open(&path).map_err(|e| WriteError::io(&path, e))?;
        for (i, record) in builder.from_reader(BufReader::new(file)).records().enumerate() {
            let record = record?;
            rows += 1;
            if record.len() != columns {
                warn!(
                    file = %path.display(),
                    line = i + 1,
                    fields = record.len(),
                    expected = columns,
                    "Part file line does not match header"
                );
                misaligned.push(Misaligned {
                    file: path.clone(),
                    line: i as u64 + 1,
                    fields: record.len(),
                });
            }
        }
    }

    Ok(LabelReport {
        label: label.to_string(),
        columns,
        part_files: indices.len(),
        rows,
        misaligned,
    })
}

/// Checks every `<Label>-header.csv` in `dir` against its part files.
pub fn verify_output(dir: &Path, format: &CsvFormat) -> Result<VerifyReport> {
    let builder = reader_builder(format)?;
    let mut report = VerifyReport::default();

    for label in header_labels(dir)? {
        let label_report = verify_label(dir, &label, &builder)?;
        info!(
            label = %label_report.label,
            parts = label_report.part_files,
            rows = label_report.rows,
            "Verified label"
        );
        report.labels.push(label_report);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn aligned_output_passes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Protein-header.csv"), ":ID;name:string;:LABEL").unwrap();
        fs::write(
            dir.path().join("Protein-part000.csv"),
            "P1;'BRCA1';Protein\nP2;'semi;colon';Protein\n",
        )
        .unwrap();

        let report = verify_output(dir.path(), &CsvFormat::default()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.rows(), 2);
        assert_eq!(report.labels[0].columns, 3);
        assert_eq!(report.labels[0].part_files, 1);
    }

    #[test]
    fn extra_field_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Gene-header.csv"), ":ID;:LABEL").unwrap();
        fs::write(dir.path().join("Gene-part000.csv"), "G1;Gene\n").unwrap();
        fs::write(dir.path().join("Gene-part001.csv"), "G2;x;Gene\n").unwrap();

        let report = verify_output(dir.path(), &CsvFormat::default()).unwrap();
        assert!(!report.is_ok());
        let bad = &report.labels[0].misaligned;
        assert_eq!(bad.len(), 1);
        assert!(bad[0].file.ends_with("Gene-part001.csv"));
        assert_eq!(bad[0].line, 1);
        assert_eq!(bad[0].fields, 3);
    }

    #[test]
    fn multibyte_delimiter_rejected() {
        let dir = TempDir::new().unwrap();
        let format = CsvFormat {
            delimiter: "::".to_string(),
            ..CsvFormat::default()
        };
        assert!(matches!(
            verify_output(dir.path(), &format),
            Err(WriteError::Config { .. })
        ));
    }
}
