use crate::config::{WriterConfig, IMPORT_CALL_FILE};
use crate::error::{Result, WriteError};
use crate::models::EntityKind;
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// `--nodes=` / `--relationships=` arguments collected while headers are written.
#[derive(Debug, Default, Clone)]
pub struct ImportCall {
    fragments: Vec<String>,
    registered: FxHashSet<(EntityKind, String)>,
}

fn double_backslash(value: &str) -> String {
    value.replace('\\', "\\\\")
}

impl ImportCall {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the loader argument for a label. Returns `false` if the label
    /// was already registered.
    pub fn register(
        &mut self,
        kind: EntityKind,
        pascal_label: &str,
        header: &Path,
        parts: &Path,
    ) -> bool {
        if !self.registered.insert((kind, pascal_label.to_string())) {
            return false;
        }
        let switch = match kind {
            EntityKind::Node => "nodes",
            EntityKind::Edge => "relationships",
        };
        self.fragments.push(format!(
            "--{switch}=\"{},{}\"",
            header.display(),
            parts.display()
        ));
        true
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Renders the loader invocation as one shell command with line continuations.
    pub fn compile(&self, config: &WriterConfig) -> String {
        // Wrap the quote flag in whichever quote it is not.
        let q = if config.quote == "\"" { "'" } else { "\"" };

        let mut args = vec![
            config.import_command.clone(),
            format!("--database={}", config.db_name),
            format!("--delimiter=\"{}\"", double_backslash(&config.delimiter)),
            format!(
                "--array-delimiter=\"{}\"",
                double_backslash(&config.array_delimiter)
            ),
            format!("--quote={q}{}{q}", config.quote),
            format!("--skip-bad-relationships={}", config.skip_bad_relationships),
            format!("--skip-duplicate-nodes={}", config.skip_duplicate_nodes),
        ];
        if config.wipe {
            args.push("--force=true".to_string());
        }
        args.extend(self.fragments.iter().cloned());

        let mut call = args.join(" \\\n    ");
        call.push('\n');
        call
    }

    /// Writes the compiled call to `neo4j-admin-import-call.sh` in `dir`.
    pub fn write_script(&self, dir: &Path, config: &WriterConfig) -> Result<PathBuf> {
        let path = dir.join(IMPORT_CALL_FILE);
        info!(path = %path.display(), "Writing neo4j-admin import call");
        fs::write(&path, self.compile(config)).map_err(|e| WriteError::io(&path, e))?;
        Ok(path)
    }
}
