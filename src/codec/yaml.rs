//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! YAML marshalling/unmarshalling (`spec.md` §4.6). Parsing goes through
//! `serde_yaml`'s generic `Value`, bridged into [`GenericValue`] and
//! decoded by the same schema-directed logic JSON unmarshalling uses.
//! Marshalling is hand-rolled rather than routed back through
//! `serde_yaml::Value`'s own serializer: that serializer has no way to
//! request flow style for some nodes and block style for others, which is
//! exactly the mix this format requires (flow-style scalars and
//! leaf-lists, block-style containers and lists).

use tracing::debug;

use super::{member_key, should_skip, CodecFlags, CodecOptions, GenericValue};
use crate::edit::{self, EditOp};
use crate::error::{Error, ErrorKind, Result};
use crate::node::DataNode;
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value::{self, Value};

impl From<serde_yaml::Value> for GenericValue {
    fn from(v: serde_yaml::Value) -> Self {
        match v {
            serde_yaml::Value::Null => GenericValue::Null,
            serde_yaml::Value::Bool(b) => GenericValue::Bool(b),
            serde_yaml::Value::Number(n) => GenericValue::Number(n.to_string()),
            serde_yaml::Value::String(s) => GenericValue::String(s),
            serde_yaml::Value::Sequence(items) => {
                GenericValue::Array(items.into_iter().map(GenericValue::from).collect())
            }
            serde_yaml::Value::Mapping(map) => GenericValue::Object(
                map.into_iter()
                    .filter_map(|(k, v)| {
                        k.as_str().map(|k| (k.to_owned(), GenericValue::from(v)))
                    })
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => GenericValue::from(tagged.value),
        }
    }
}

/// Quotes a scalar for flow-style emission only when it needs it (contains
/// whitespace, YAML-significant punctuation, or would otherwise be
/// misread, e.g. as a number or boolean).
fn flow_scalar(text: &str) -> String {
    let needs_quoting = text.is_empty()
        || text.contains(|c: char| c.is_whitespace() || matches!(c, ':' | '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`'))
        || matches!(text, "true" | "false" | "null" | "~")
        || text.parse::<f64>().is_ok();
    if needs_quoting {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text.to_owned()
    }
}

fn leaf_scalar(node: &DataNode) -> Result<String> {
    let value = node
        .value()?
        .ok_or_else(|| Error::new(ErrorKind::BadElement, "leaf has no value").with_path(node.path()))?;
    Ok(flow_scalar(&value::canonicalise(&value)))
}

fn key_annotation(node: &DataNode, internal_format: bool) -> Result<String> {
    if !internal_format {
        return Ok(String::new());
    }
    let schema = node.schema();
    if schema.kind() == SchemaNodeKind::List {
        let mut parts = Vec::new();
        for key_name in schema.key_names() {
            if let Some(key_leaf) = node.child(&crate::key::container_key(key_name))? {
                if let Some(v) = key_leaf.value()? {
                    parts.push(format!("{}={}", key_name, value::canonicalise(&v)));
                }
            }
        }
        Ok(format!(" ({})", parts.join(",")))
    } else {
        Ok(String::new())
    }
}

fn emit_branch(
    node: &DataNode,
    options: &CodecOptions,
    indent: usize,
    out: &mut String,
) -> Result<()> {
    let rfc7951 = options.flags.contains(CodecFlags::RFC7951);
    let owner_module = node.schema().module_name().to_owned();
    let internal_format = options.flags.contains(CodecFlags::INTERNAL_FORMAT);
    let children = node.children()?;
    let pad = " ".repeat(indent * options.indent_width.max(1));
    let mut i = 0;
    while i < children.len() {
        let schema = children[i].schema();
        if should_skip(&schema, options.flags) {
            i += 1;
            continue;
        }
        let key = member_key(&schema, &owner_module, rfc7951);
        match schema.kind() {
            SchemaNodeKind::Leaf => {
                out.push_str(&pad);
                out.push_str(&key);
                out.push_str(": ");
                out.push_str(&leaf_scalar(&children[i])?);
                out.push('\n');
                i += 1;
            }
            SchemaNodeKind::LeafList => {
                let mut j = i;
                let mut values = Vec::new();
                while j < children.len() && children[j].schema().qualified_name() == schema.qualified_name()
                {
                    values.push(leaf_scalar(&children[j])?);
                    j += 1;
                }
                out.push_str(&pad);
                out.push_str(&key);
                out.push_str(": [");
                out.push_str(&values.join(", "));
                out.push_str("]\n");
                i = j;
            }
            SchemaNodeKind::List => {
                let mut j = i;
                out.push_str(&pad);
                out.push_str(&key);
                out.push_str(":\n");
                while j < children.len() && children[j].schema().qualified_name() == schema.qualified_name()
                {
                    if !should_skip(&children[j].schema(), options.flags) {
                        let annotation = key_annotation(&children[j], internal_format)?;
                        let entry_pad = " ".repeat((indent + 1) * options.indent_width.max(1));
                        out.push_str(&entry_pad);
                        out.push_str("-");
                        out.push_str(&annotation);
                        out.push('\n');
                        emit_branch(&children[j], options, indent + 2, out)?;
                    }
                    j += 1;
                }
                i = j;
            }
            _ => {
                out.push_str(&pad);
                out.push_str(&key);
                out.push_str(":\n");
                emit_branch(&children[i], options, indent + 1, out)?;
                i += 1;
            }
        }
    }
    Ok(())
}

/// Marshals `node` to a YAML document, rooted at a single top-level key,
/// qualified the same way JSON's outermost key is (see `json::marshal`).
pub fn marshal(node: &DataNode, options: &CodecOptions) -> Result<String> {
    debug!(path = %node.path(), "marshalling to YAML");
    let schema = node.schema();
    let key = member_key(&schema, "", options.flags.contains(CodecFlags::RFC7951));
    let mut out = format!("{}{}{}:\n", options.indent_prefix, "", key);
    emit_branch(node, options, 1, &mut out)?;
    Ok(out)
}

/// Parses `input` and merges it onto `parent`, per the same schema-directed
/// decoding JSON unmarshalling uses (see `json::unmarshal` for the
/// root-key-names-`parent`-itself convention).
pub fn unmarshal(
    parent: &DataNode,
    schema_root: &SchemaNode,
    input: &str,
    flags: CodecFlags,
) -> Result<()> {
    debug!(path = %parent.path(), "unmarshalling YAML");
    let parsed: serde_yaml::Value = serde_yaml::from_str(input)
        .map_err(|e| Error::new(ErrorKind::BadElement, format!("invalid YAML: {e}")))?;
    let mapping = match parsed {
        serde_yaml::Value::Mapping(m) => m,
        _ => {
            return Err(Error::new(
                ErrorKind::BadElement,
                "top-level YAML value must be a mapping",
            ))
        }
    };
    let mut members: Vec<(String, GenericValue)> = mapping
        .into_iter()
        .filter_map(|(k, v)| k.as_str().map(|k| (k.to_owned(), GenericValue::from(v))))
        .collect();
    if members.len() != 1 {
        return Err(Error::new(
            ErrorKind::BadElement,
            "top-level YAML mapping must have exactly one member naming the document root",
        ));
    }
    let (root_key, root_value) = members.remove(0);
    if super::strip_module_prefix(&root_key) != schema_root.local_name() {
        return Err(Error::new(
            ErrorKind::UnknownElement,
            format!("expected document root '{}', found '{root_key}'", schema_root.local_name()),
        ));
    }
    let inner_members = match root_value {
        GenericValue::Object(m) => m,
        _ => {
            return Err(Error::new(
                ErrorKind::BadElement,
                "document root value must be a mapping",
            ))
        }
    };
    let edits = super::decode_root_members(schema_root, &inner_members, flags)?;
    for change in edits {
        edit::edit(parent, change, EditOp::Merge)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeOptions};
    use crate::schema::{OrderedBy, SchemaBuilder};
    use crate::value::{TypeDescriptor, TypeKind};

    fn sample_root() -> SchemaNode {
        let items = SchemaBuilder::new("sample", "items", SchemaNodeKind::LeafList)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .ordered_by(OrderedBy::User)
            .build();
        let str_val = SchemaBuilder::new("sample", "str-val", SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build();
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(str_val)
            .child(items)
            .build()
    }

    #[test]
    fn marshal_emits_flow_style_leaf_lists() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        root.new_leaf_child(str_schema, Value::String("hi there".to_owned()))
            .unwrap();
        let items_schema = root.schema().child("items").unwrap().clone();
        for v in ["x", "y"] {
            root.new_leaf_list_entry(items_schema.clone(), Value::String(v.to_owned()), None)
                .unwrap();
        }
        let out = marshal(&root, &CodecOptions::default()).unwrap();
        assert!(out.contains("str-val: \"hi there\"\n"));
        assert!(out.contains("items: [x, y]\n"));
    }

    #[test]
    fn unmarshal_parses_sequence_into_leaf_list() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let input = "sample:sample:\n  items: [a, b]\n";
        unmarshal(&root, &root.schema(), input, CodecFlags::RFC7951).unwrap();
        let entries = root.children().unwrap();
        assert_eq!(entries.len(), 2);
    }
}
