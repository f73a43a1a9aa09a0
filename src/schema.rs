use crate::models::{Entity, EntityKind};
use crate::ontology::OntologyAdapter;
use std::collections::BTreeMap;
use tracing::debug;

/// Property name → semantic type name. Ordered by property name, which is
/// the column order of both header and part files.
pub type PropertyTypes = BTreeMap<String, String>;

/// Columns added to every ontology-declared node schema. The writer fills
/// them from the node's own `id` and `preferred_id`.
pub const SYNTHETIC_NODE_PROPERTIES: [&str; 2] = ["id", "preferred_id"];

/// Every type name neo4j-admin accepts in a header column.
const NEO4J_TYPES: &[&str] = &[
    "int",
    "long",
    "float",
    "double",
    "boolean",
    "byte",
    "short",
    "char",
    "string",
    "point",
    "date",
    "localtime",
    "time",
    "localdatetime",
    "datetime",
    "duration",
];

/// Aliases from runtime/ontology type names to neo4j header types.
const TYPE_ALIASES: &[(&str, &str)] = &[
    ("int", "long"),
    ("long", "long"),
    ("double", "double"),
    ("float", "double"),
    ("dbl", "double"),
    ("bool", "boolean"),
    ("boolean", "boolean"),
    ("str", "string"),
];

/// Maps a semantic type to the neo4j header type, or `None` when there is no
/// matching primitive. A `[]` suffix is carried through for array columns.
pub fn neo4j_type(semantic: &str) -> Option<String> {
    let (base, array) = match semantic.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (semantic, false),
    };
    let mapped = TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == base)
        .map(|(_, n4)| *n4)
        .or_else(|| NEO4J_TYPES.iter().copied().find(|t| *t == base))?;
    Some(if array {
        format!("{mapped}[]")
    } else {
        mapped.to_string()
    })
}

/// Header column for one property: `name:type`, or bare `name` when the type is unknown.
pub fn column(name: &str, semantic: &str) -> String {
    match neo4j_type(semantic) {
        Some(n4) => format!("{name}:{n4}"),
        None => name.to_string(),
    }
}

/// Whether values of this type are wrapped in the quote character.
pub fn is_quoted(semantic: &str) -> bool {
    matches!(neo4j_type(semantic).as_deref(), Some("string") | Some("string[]"))
}

/// Property types for a label seen for the first time.
///
/// Ontology declarations win over the sample. Nodes with a declared schema
/// always get the synthetic `id` and `preferred_id` string properties. An
/// empty map means no properties are expected.
pub fn resolve_property_types(
    ontology: &dyn OntologyAdapter,
    label: &str,
    kind: EntityKind,
    sample: Option<&Entity>,
) -> PropertyTypes {
    let declared = match kind {
        EntityKind::Node => ontology.declared_properties(label),
        EntityKind::Edge => ontology
            .declared_properties(label)
            .or_else(|| ontology.edge_properties(label)),
    };

    if let Some(mut types) = declared {
        if kind == EntityKind::Node {
            for name in SYNTHETIC_NODE_PROPERTIES {
                types.insert(name.to_string(), "str".to_string());
            }
        }
        debug!(label, %kind, properties = types.len(), "Property types from ontology");
        return types;
    }

    match sample {
        Some(entity) => {
            let types: PropertyTypes = entity
                .properties()
                .iter()
                .map(|(name, value)| (name.clone(), value.type_name()))
                .collect();
            debug!(label, %kind, properties = types.len(), "Property types inferred from first instance");
            types
        }
        None => PropertyTypes::new(),
    }
}
