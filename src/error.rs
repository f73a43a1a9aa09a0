use crate::models::EntityKind;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WriteError>;

/// How an entity's property names deviate from its label's resolved schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// Declared in the schema but absent on the entity.
    Missing(Vec<String>),
    /// Present on the entity but not declared in the schema.
    Unexpected(Vec<String>),
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Missing(props) => {
                write!(f, "is missing the following properties: {}", props.join(", "))
            }
            Mismatch::Unexpected(props) => {
                write!(f, "has the following unexpected properties: {}", props.join(", "))
            }
        }
    }
}

/// Fatal conditions of a write run. Recoverable ones (malformed edges,
/// duplicates, empty output) are logged and counted instead.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("invalid input at record {index}: {reason}")]
    InvalidInputShape { index: u64, reason: String },

    #[error("one `{label}` {kind} with {entity} {mismatch}")]
    SchemaMismatch {
        kind: EntityKind,
        label: String,
        entity: String,
        mismatch: Mismatch,
    },

    #[error(
        "`{label}` {kind} and `{other_label}` {other_kind} would share the file prefix `{file_stem}`"
    )]
    LabelCollision {
        kind: EntityKind,
        label: String,
        other_kind: EntityKind,
        other_label: String,
        file_stem: String,
    },

    #[error("batch for `{label}` mixes nodes and edges")]
    MixedBatch { label: String },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl WriteError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        WriteError::Config {
            reason: reason.into(),
        }
    }

    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, WriteError::SchemaMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_message_names_entity_and_properties() {
        let err = WriteError::SchemaMismatch {
            kind: EntityKind::Node,
            label: "protein".to_string(),
            entity: "ID `P1`".to_string(),
            mismatch: Mismatch::Missing(vec!["name".to_string(), "taxon".to_string()]),
        };
        assert!(err.is_schema_mismatch());
        assert_eq!(
            err.to_string(),
            "one `protein` node with ID `P1` is missing the following properties: name, taxon"
        );
    }

    #[test]
    fn label_collision_message_names_both_labels() {
        let err = WriteError::LabelCollision {
            kind: EntityKind::Edge,
            label: "binds".to_string(),
            other_kind: EntityKind::Node,
            other_label: "binds".to_string(),
            file_stem: "Binds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`binds` edge and `binds` node would share the file prefix `Binds`"
        );
    }

    #[test]
    fn io_error_mentions_path() {
        let err = WriteError::io(
            "/tmp/out/Protein-part000.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("Protein-part000.csv"));
        assert!(!err.is_schema_mismatch());
    }
}
