use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Properties = BTreeMap<String, PropValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Node,
    Edge,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property value as it arrives on the entity stream.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `3` stays an `Int`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PropValue>),
}

impl PropValue {
    /// Name of the runtime representation, used when a label has no declared schema.
    pub fn type_name(&self) -> String {
        match self {
            PropValue::Null => "null".to_string(),
            PropValue::Bool(_) => "bool".to_string(),
            PropValue::Int(_) => "int".to_string(),
            PropValue::Float(_) => "float".to_string(),
            PropValue::Str(_) => "str".to_string(),
            PropValue::List(items) => match items.iter().find(|v| !v.is_null()) {
                Some(first) => format!("{}[]", first.type_name()),
                None => "list".to_string(),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Renders the value as a bare field; list items are joined with `array_delimiter`.
    pub fn render(&self, array_delimiter: &str) -> String {
        match self {
            PropValue::Null => String::new(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Int(i) => itoa::Buffer::new().format(*i).to_string(),
            PropValue::Float(f) => f.to_string(),
            PropValue::Str(s) => s.clone(),
            PropValue::List(items) => items
                .iter()
                .map(|v| v.render(array_delimiter))
                .collect::<Vec<_>>()
                .join(array_delimiter),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    /// Namespace of the identifier, written to the `preferred_id` column of
    /// labels whose properties come from the ontology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_id: Option<String>,
    #[serde(default)]
    pub properties: Properties,
}

/// A relationship. Endpoints are optional on the wire so that malformed
/// edges can be reported and skipped instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Both endpoints, if present and non-empty.
    pub fn endpoints(&self) -> Option<(&str, &str)> {
        match (self.source.as_deref(), self.target.as_deref()) {
            (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => Some((s, t)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entity {
    Node(Node),
    Edge(Edge),
}

impl Entity {
    pub fn node(id: &str, label: &str, properties: Properties) -> Self {
        Entity::Node(Node {
            id: id.to_string(),
            label: label.to_string(),
            preferred_id: None,
            properties,
        })
    }

    /// Sets a node's `preferred_id`; edges are returned unchanged.
    pub fn with_preferred_id(mut self, preferred_id: &str) -> Self {
        if let Entity::Node(n) = &mut self {
            n.preferred_id = Some(preferred_id.to_string());
        }
        self
    }

    pub fn edge(source: &str, target: &str, label: &str, properties: Properties) -> Self {
        Entity::Edge(Edge {
            source: Some(source.to_string()),
            target: Some(target.to_string()),
            label: label.to_string(),
            properties,
        })
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Node(_) => EntityKind::Node,
            Entity::Edge(_) => EntityKind::Edge,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Entity::Node(n) => &n.label,
            Entity::Edge(e) => &e.label,
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Entity::Node(n) => &n.properties,
            Entity::Edge(e) => &e.properties,
        }
    }

    /// Deduplication key: the node id, or `source -> target` for edges.
    /// `None` for an edge lacking an endpoint.
    pub fn identity(&self) -> Option<String> {
        match self {
            Entity::Node(n) => Some(n.id.clone()),
            Entity::Edge(e) => e.endpoints().map(|(s, t)| format!("{s} -> {t}")),
        }
    }

    /// Human-readable reference used in error messages.
    pub fn display_id(&self) -> String {
        match self {
            Entity::Node(n) => format!("ID `{}`", n.id),
            Entity::Edge(e) => format!(
                "endpoint IDs `{}-{}`",
                e.source.as_deref().unwrap_or(""),
                e.target.as_deref().unwrap_or("")
            ),
        }
    }
}
