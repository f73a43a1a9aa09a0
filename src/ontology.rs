//! Collaborators the writer consults but does not own: the ontology that
//! declares property types and label ancestry, and the label translator
//! that turns internal labels into file-name-safe PascalCase.

use crate::error::{Result, WriteError};
use crate::schema::PropertyTypes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub trait OntologyAdapter {
    /// Property types declared for `label`, if any.
    fn declared_properties(&self, label: &str) -> Option<PropertyTypes>;

    /// Property types of the declaration that is represented as an edge named `label`.
    fn edge_properties(&self, label: &str) -> Option<PropertyTypes>;

    /// Ancestor labels of `label`, including itself, most specific first.
    fn ancestors(&self, label: &str) -> Option<Vec<String>>;
}

/// One entry of a schema file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SchemaEntry {
    pub properties: Option<PropertyTypes>,
    pub label_as_edge: Option<String>,
    pub ancestors: Option<Vec<String>>,
}

/// An ontology backed by an in-memory label → entry map, usually loaded from JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticOntology {
    entries: BTreeMap<String, SchemaEntry>,
}

impl StaticOntology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| WriteError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            WriteError::config(format!("cannot parse schema {}: {e}", path.display()))
        })
    }

    pub fn insert(&mut self, label: &str, entry: SchemaEntry) {
        self.entries.insert(label.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// An empty declared property map counts as no declaration.
fn non_empty(props: Option<&PropertyTypes>) -> Option<PropertyTypes> {
    props.filter(|p| !p.is_empty()).cloned()
}

impl OntologyAdapter for StaticOntology {
    fn declared_properties(&self, label: &str) -> Option<PropertyTypes> {
        non_empty(self.entries.get(label).and_then(|e| e.properties.as_ref()))
    }

    fn edge_properties(&self, label: &str) -> Option<PropertyTypes> {
        self.entries
            .values()
            .find(|e| e.label_as_edge.as_deref() == Some(label))
            .and_then(|e| non_empty(e.properties.as_ref()))
    }

    fn ancestors(&self, label: &str) -> Option<Vec<String>> {
        self.entries
            .get(label)
            .and_then(|e| e.ancestors.clone())
            .filter(|a| !a.is_empty())
    }
}

pub trait LabelTranslator {
    fn to_pascal(&self, label: &str) -> String;
}

/// `"protein complex"`, `"protein_complex"` and `"protein-complex"` all become
/// `"ProteinComplex"`. Already-PascalCase input is left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct PascalCase;

impl LabelTranslator for PascalCase {
    fn to_pascal(&self, label: &str) -> String {
        label
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-' || c == '.')
            .filter(|w| !w.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }
}
