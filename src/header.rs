use crate::call::ImportCall;
use crate::error::{Result, WriteError};
use crate::models::EntityKind;
use crate::parts::{header_path, part_pattern};
use crate::schema::{column, PropertyTypes};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header columns for a label: ID marker, one column per property in name
/// order, then the trailing markers.
pub fn header_columns(kind: EntityKind, types: &PropertyTypes) -> Vec<String> {
    let mut columns = Vec::with_capacity(types.len() + 3);
    columns.push(match kind {
        EntityKind::Node => ":ID".to_string(),
        EntityKind::Edge => ":START_ID".to_string(),
    });
    columns.extend(types.iter().map(|(name, semantic)| column(name, semantic)));
    match kind {
        EntityKind::Node => columns.push(":LABEL".to_string()),
        EntityKind::Edge => {
            columns.push(":END_ID".to_string());
            columns.push(":TYPE".to_string());
        }
    }
    columns
}

#[derive(Debug, Clone)]
pub struct HeaderWriter {
    dir: PathBuf,
    delimiter: String,
}

impl HeaderWriter {
    pub fn new(dir: impl Into<PathBuf>, delimiter: &str) -> Self {
        Self {
            dir: dir.into(),
            delimiter: delimiter.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<PascalLabel>-header.csv` unless it already exists, and
    /// registers the label with the import call either way.
    ///
    /// Returns `true` when a new header file was written.
    pub fn write_header(
        &self,
        pascal_label: &str,
        kind: EntityKind,
        types: &PropertyTypes,
        call: &mut ImportCall,
    ) -> Result<bool> {
        let hdr_path = header_path(&self.dir, pascal_label);
        call.register(
            kind,
            pascal_label,
            &hdr_path,
            &part_pattern(&self.dir, pascal_label),
        );

        if hdr_path.exists() {
            debug!(path = %hdr_path.display(), "Header already present, keeping it");
            return Ok(false);
        }

        let line = header_columns(kind, types).join(&self.delimiter);
        info!(path = %hdr_path.display(), "Writing header");
        fs::write(&hdr_path, line).map_err(|e| WriteError::io(&hdr_path, e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn types(pairs: &[(&str, &str)]) -> PropertyTypes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn node_header_columns() {
        let cols = header_columns(EntityKind::Node, &types(&[("name", "string")]));
        assert_eq!(cols.join(";"), ":ID;name:string;:LABEL");
    }

    #[test]
    fn edge_header_columns_sorted_and_typed() {
        let cols = header_columns(
            EntityKind::Edge,
            &types(&[("score", "float"), ("evidence", "str"), ("raw", "null")]),
        );
        assert_eq!(
            cols.join(";"),
            ":START_ID;evidence:string;raw;score:double;:END_ID;:TYPE"
        );
    }

    #[test]
    fn header_is_written_once() {
        let dir = TempDir::new().unwrap();
        let writer = HeaderWriter::new(dir.path(), ";");
        let mut call = ImportCall::new();

        assert!(writer
            .write_header("Protein", EntityKind::Node, &types(&[("name", "str")]), &mut call)
            .unwrap());
        // A different schema on the second call must not overwrite the first.
        assert!(!writer
            .write_header("Protein", EntityKind::Node, &types(&[("other", "int")]), &mut call)
            .unwrap());

        let content = fs::read_to_string(dir.path().join("Protein-header.csv")).unwrap();
        assert_eq!(content, ":ID;name:string;:LABEL");
        assert_eq!(call.fragments().len(), 1);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn existing_header_still_registers_call() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Gene-header.csv"), ":ID;:LABEL").unwrap();

        let writer = HeaderWriter::new(dir.path(), ";");
        let mut call = ImportCall::new();
        let written = writer
            .write_header("Gene", EntityKind::Node, &PropertyTypes::new(), &mut call)
            .unwrap();

        assert!(!written);
        assert_eq!(call.fragments().len(), 1);
        assert!(call.fragments()[0].starts_with("--nodes="));
    }
}
