//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Canonical child-key computation (`spec.md` §3, "Child key"). The key is
//! the engine's sole identifier for a child inside its parent branch, used
//! both as an API input (§6) and embedded in node paths (§4.3).

use crate::error::{Error, ErrorKind, Result};
use crate::schema::SchemaNode;
use crate::value::{self, Value};

/// The canonical key for a non-keyed child (container, single leaf,
/// anydata): just its schema local name.
pub fn container_key(local_name: &str) -> String {
    local_name.to_owned()
}

/// Builds the canonical key for a list entry from already-typed key
/// values, in schema-declared key order. Requires exact coverage: every
/// declared key leaf must be present and no extras are tolerated, so that
/// two predicate orderings of the same entry always yield the same string
/// (`spec.md` §8 invariant 3).
pub fn list_key(schema: &SchemaNode, values: &[(&str, &Value)]) -> Result<String> {
    let key_names = schema.key_names();
    if key_names.is_empty() {
        return Err(Error::new(
            ErrorKind::BadElement,
            "list schema has no declared keys; use a positional key instead",
        )
        .with_path(schema.qualified_name().to_owned()));
    }
    if values.len() != key_names.len() {
        return Err(Error::new(
            ErrorKind::BadElement,
            format!(
                "expected {} key value(s), got {}",
                key_names.len(),
                values.len()
            ),
        )
        .with_path(schema.qualified_name().to_owned()));
    }
    let mut out = String::from(schema.local_name());
    for name in key_names {
        let (_, val) = values
            .iter()
            .find(|(n, _)| n == name)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::MissingElement,
                    format!("missing key leaf '{name}'"),
                )
                .with_path(schema.qualified_name().to_owned())
            })?;
        out.push('[');
        out.push_str(name);
        out.push('=');
        out.push_str(&value::canonicalise(val));
        out.push(']');
    }
    Ok(out)
}

/// Same as [`list_key`], but takes raw lexical predicate strings (as
/// produced by the path tokenizer) and parses each against its key leaf's
/// declared type before canonicalising. Used by the Path Engine to
/// evaluate `[k=v]` predicates and by `Lookup` to synthesise missing list
/// entries.
pub fn list_key_from_raw(schema: &SchemaNode, predicates: &[(String, String)]) -> Result<String> {
    let key_schemas = schema.key_schemas()?;
    let mut values = Vec::with_capacity(key_schemas.len());
    for key_schema in &key_schemas {
        let (_, raw) = predicates
            .iter()
            .find(|(name, _)| name == key_schema.local_name())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::MissingElement,
                    format!("missing key predicate '{}'", key_schema.local_name()),
                )
                .with_path(schema.qualified_name().to_owned())
            })?;
        let type_descriptor = key_schema.type_descriptor().ok_or_else(|| {
            Error::new(
                ErrorKind::SchemaMissing,
                "key leaf has no type descriptor",
            )
        })?;
        values.push((key_schema.local_name().to_owned(), value::parse(type_descriptor, raw)?));
    }
    let values_ref: Vec<(&str, &Value)> =
        values.iter().map(|(n, v)| (n.as_str(), v)).collect();
    list_key(schema, &values_ref)
}

/// Returns true iff every declared key of `schema` is present (by name)
/// in `predicates`, independent of ordering — the basis of `spec.md` §8
/// invariant 3 (key canonicalisation is order-independent).
pub fn has_full_key_coverage(schema: &SchemaNode, predicates: &[(String, String)]) -> bool {
    schema
        .key_names()
        .iter()
        .all(|name| predicates.iter().any(|(n, _)| n == name))
        && predicates.len() == schema.key_names().len()
}

/// Canonical key for a leaf-list entry. `value_as_key` selects between
/// `name=value` and `name[.=value]` per the `LeafListValueAsKey` option
/// (`spec.md` §6).
pub fn leaf_list_key(local_name: &str, value: &Value, value_as_key: bool) -> String {
    let canon = value::canonicalise(value);
    if value_as_key {
        format!("{local_name}={canon}")
    } else {
        format!("{local_name}[.={canon}]")
    }
}

/// Positional key for an unkeyed, duplicate-allowing list/leaf-list entry.
pub fn positional_key(local_name: &str, index: usize) -> String {
    format!("{local_name}#{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaBuilder, SchemaNodeKind};
    use crate::value::{TypeDescriptor, TypeKind};

    fn sample_list() -> SchemaNode {
        let country = SchemaBuilder::new("sample", "list-key", SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build();
        let other = SchemaBuilder::new("sample", "other-key", SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build();
        SchemaBuilder::new("sample", "single-key-list", SchemaNodeKind::List)
            .keys(&["list-key", "other-key"])
            .child(country)
            .child(other)
            .build()
    }

    #[test]
    fn key_is_independent_of_predicate_ordering() {
        let schema = sample_list();
        let forward = list_key_from_raw(
            &schema,
            &[
                ("list-key".to_owned(), "A".to_owned()),
                ("other-key".to_owned(), "B".to_owned()),
            ],
        )
        .unwrap();
        let reversed = list_key_from_raw(
            &schema,
            &[
                ("other-key".to_owned(), "B".to_owned()),
                ("list-key".to_owned(), "A".to_owned()),
            ],
        )
        .unwrap();
        assert_eq!(forward, reversed);
        assert_eq!(forward, "single-key-list[list-key=A][other-key=B]");
    }

    #[test]
    fn missing_key_is_rejected() {
        let schema = sample_list();
        assert!(list_key_from_raw(&schema, &[("list-key".to_owned(), "A".to_owned())]).is_err());
    }

    #[test]
    fn leaf_list_key_modes() {
        let v = Value::String("first".to_owned());
        assert_eq!(leaf_list_key("items", &v, false), "items[.=first]");
        assert_eq!(leaf_list_key("items", &v, true), "items=first");
    }
}
