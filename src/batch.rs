use crate::config::CsvFormat;
use crate::error::{Mismatch, Result, WriteError};
use crate::models::{Entity, PropValue};
use crate::schema::{is_quoted, PropertyTypes, SYNTHETIC_NODE_PROPERTIES};
use tracing::error;

/// Formats one field. Strings are wrapped in the quote character with any
/// embedded quote doubled; nulls and absent values become an empty field.
pub fn format_value(value: Option<&PropValue>, semantic: &str, format: &CsvFormat) -> String {
    let value = match value {
        None | Some(PropValue::Null) => return String::new(),
        Some(v) => v.render(&format.array_delimiter),
    };

    if is_quoted(semantic) {
        let q = &format.quote;
        let escaped = value.replace(q.as_str(), &format!("{q}{q}"));
        format!("{q}{escaped}{q}")
    } else {
        value
    }
}

/// Value of a synthetic node column the entity does not carry as a
/// property. An absent `preferred_id` is written as an empty field.
fn synthetic_value(entity: &Entity, name: &str) -> Option<PropValue> {
    let Entity::Node(n) = entity else {
        return None;
    };
    match name {
        "id" => Some(PropValue::Str(n.id.clone())),
        "preferred_id" => Some(n.preferred_id.clone().map_or(PropValue::Null, PropValue::Str)),
        _ => None,
    }
}

fn check_properties(entity: &Entity, types: &PropertyTypes) -> Result<()> {
    let props = entity.properties();
    let is_node = matches!(entity, Entity::Node(_));

    let missing: Vec<String> = types
        .keys()
        .filter(|k| !props.contains_key(*k))
        .filter(|k| !(is_node && SYNTHETIC_NODE_PROPERTIES.contains(&k.as_str())))
        .cloned()
        .collect();
    let unexpected: Vec<String> = props
        .keys()
        .filter(|k| !types.contains_key(*k))
        .cloned()
        .collect();

    let mismatch = if !missing.is_empty() {
        Mismatch::Missing(missing)
    } else if !unexpected.is_empty() {
        Mismatch::Unexpected(unexpected)
    } else {
        return Ok(());
    };

    let err = WriteError::SchemaMismatch {
        kind: entity.kind(),
        label: entity.label().to_string(),
        entity: entity.display_id(),
        mismatch,
    };
    error!("{err}");
    Err(err)
}

/// Turns one same-label, same-kind batch into part-file lines.
///
/// Every entity must carry exactly the schema's property names, otherwise
/// the whole batch fails and nothing is returned. Lines are
/// `id, props..., labels` for nodes and `source, props..., target, label`
/// for edges, with properties in schema (name) order. A node's synthetic
/// `id` and `preferred_id` columns are filled from the node itself unless it
/// carries them as properties. `labels` is the node's `:LABEL` value; the
/// entity's own label is used when absent.
pub fn compile_batch(
    entities: &[Entity],
    types: &PropertyTypes,
    labels: Option<&str>,
    format: &CsvFormat,
) -> Result<Vec<String>> {
    let Some(first) = entities.first() else {
        return Ok(Vec::new());
    };
    let kind = first.kind();
    if entities.iter().any(|e| e.kind() != kind) {
        let err = WriteError::MixedBatch {
            label: first.label().to_string(),
        };
        error!("{err}");
        return Err(err);
    }

    let mut lines = Vec::with_capacity(entities.len());

    for entity in entities {
        check_properties(entity, types)?;

        let props = entity.properties();
        let mut fields = Vec::with_capacity(types.len() + 3);

        match entity {
            Entity::Node(n) => fields.push(n.id.clone()),
            Entity::Edge(e) => fields.push(e.source.clone().unwrap_or_default()),
        }

        fields.extend(types.iter().map(|(name, semantic)| match props.get(name) {
            Some(value) => format_value(Some(value), semantic, format),
            None => format_value(synthetic_value(entity, name).as_ref(), semantic, format),
        }));

        match entity {
            Entity::Node(n) => fields.push(labels.unwrap_or(n.label.as_str()).to_string()),
            Entity::Edge(e) => {
                fields.push(e.target.clone().unwrap_or_default());
                fields.push(e.label.clone());
            }
        }

        lines.push(fields.join(&format.delimiter));
    }

    Ok(lines)
}
