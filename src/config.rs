use crate::error::{Result, WriteError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DELIMITER: &str = ";";
pub const DEFAULT_ARRAY_DELIMITER: &str = "|";
pub const DEFAULT_QUOTE: &str = "'";

/// Used when neither the config nor the caller sets a batch size
pub const BATCH_SIZE_FALLBACK: usize = 1_000_000;

pub const DEFAULT_DB_NAME: &str = "neo4j";
pub const DEFAULT_IMPORT_COMMAND: &str = "neo4j-admin import";

/// Parent of the timestamped run directory when no output directory is configured
pub const DEFAULT_OUTPUT_ROOT: &str = "neobatch-out";

pub const IMPORT_CALL_FILE: &str = "neo4j-admin-import-call.sh";

/// Progress update interval for the CLI (tick every N entities)
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Field formatting shared by the batch compiler, header writer and verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    pub delimiter: String,
    pub array_delimiter: String,
    pub quote: String,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            array_delimiter: DEFAULT_ARRAY_DELIMITER.to_string(),
            quote: DEFAULT_QUOTE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    pub delimiter: String,
    pub array_delimiter: String,
    pub quote: String,
    pub batch_size: usize,
    pub output_dir: Option<PathBuf>,
    pub db_name: String,
    pub skip_bad_relationships: bool,
    pub skip_duplicate_nodes: bool,
    pub wipe: bool,
    pub import_command: String,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            array_delimiter: DEFAULT_ARRAY_DELIMITER.to_string(),
            quote: DEFAULT_QUOTE.to_string(),
            batch_size: 0,
            output_dir: None,
            db_name: DEFAULT_DB_NAME.to_string(),
            skip_bad_relationships: false,
            skip_duplicate_nodes: false,
            wipe: false,
            import_command: DEFAULT_IMPORT_COMMAND.to_string(),
        }
    }
}

impl WriterConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| WriteError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            WriteError::config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    pub fn format(&self) -> CsvFormat {
        CsvFormat {
            delimiter: self.delimiter.clone(),
            array_delimiter: self.array_delimiter.clone(),
            quote: self.quote.clone(),
        }
    }

    /// Batch size with `0` meaning "use the fallback".
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size == 0 {
            BATCH_SIZE_FALLBACK
        } else {
            self.batch_size
        }
    }

    /// The configured directory, or a fresh `<DEFAULT_OUTPUT_ROOT>/<YYYYmmddHHMM>`.
    pub fn resolved_output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => {
                let stamp = chrono::Local::now().format("%Y%m%d%H%M").to_string();
                Path::new(DEFAULT_OUTPUT_ROOT).join(stamp)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(WriteError::config("delimiter must not be empty"));
        }
        if self.array_delimiter.is_empty() {
            return Err(WriteError::config("array delimiter must not be empty"));
        }
        if self.delimiter == self.array_delimiter {
            return Err(WriteError::config(format!(
                "delimiter and array delimiter are both {:?}",
                self.delimiter
            )));
        }
        if self.quote.chars().count() != 1 {
            return Err(WriteError::config(format!(
                "quote must be a single character, got {:?}",
                self.quote
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_admin_import_conventions() {
        let config = WriterConfig::default();
        assert_eq!(config.delimiter, ";");
        assert_eq!(config.array_delimiter, "|");
        assert_eq!(config.quote, "'");
        assert_eq!(config.effective_batch_size(), BATCH_SIZE_FALLBACK);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("writer.json");
        fs::write(&path, r#"{"delimiter": "\t", "batch_size": 500, "wipe": true}"#).unwrap();

        let config = WriterConfig::from_file(&path).unwrap();
        assert_eq!(config.delimiter, "\t");
        assert_eq!(config.effective_batch_size(), 500);
        assert!(config.wipe);
        assert_eq!(config.db_name, "neo4j");
        assert_eq!(config.array_delimiter, "|");
    }

    #[test]
    fn unparsable_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("writer.json");
        fs::write(&path, "{ not json").unwrap();
        let err = WriterConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, WriteError::Config { .. }));
    }

    #[test]
    fn validate_rejects_clashing_delimiters() {
        let config = WriterConfig {
            array_delimiter: ";".to_string(),
            ..WriterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_multichar_quote() {
        let config = WriterConfig {
            quote: "''".to_string(),
            ..WriterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_dir_defaults_to_timestamped_subdir() {
        let dir = WriterConfig::default().resolved_output_dir();
        assert!(dir.starts_with(DEFAULT_OUTPUT_ROOT));
        let stamp = dir.file_name().unwrap().to_str().unwrap();
        assert_eq!(stamp.len(), 12);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
