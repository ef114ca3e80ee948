//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Plain JSON and RFC 7951 JSON marshalling/unmarshalling (`spec.md` §4.6).
//! Which dialect is produced is controlled entirely by
//! [`CodecFlags::RFC7951`](super::CodecFlags::RFC7951): module
//! qualification of member keys and the string-vs-number wrapping of
//! 64-bit integers, decimal64, and bits both key off that one flag.

use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use super::{member_key, should_skip, CodecFlags, CodecOptions, GenericValue};
use crate::edit::{self, EditOp};
use crate::error::{Error, ErrorKind, Result};
use crate::key;
use crate::node::DataNode;
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value::{self, Value};

impl From<JsonValue> for GenericValue {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => GenericValue::Null,
            JsonValue::Bool(b) => GenericValue::Bool(b),
            JsonValue::Number(n) => GenericValue::Number(n.to_string()),
            JsonValue::String(s) => GenericValue::String(s),
            JsonValue::Array(items) => {
                GenericValue::Array(items.into_iter().map(GenericValue::from).collect())
            }
            JsonValue::Object(members) => GenericValue::Object(
                members
                    .into_iter()
                    .map(|(k, v)| (k, GenericValue::from(v)))
                    .collect(),
            ),
        }
    }
}

fn encode_scalar(value: &Value, rfc7951: bool) -> JsonValue {
    match value {
        Value::Int8(v) => json!(*v),
        Value::Int16(v) => json!(*v),
        Value::Int32(v) => json!(*v),
        Value::Int64(v) => {
            if rfc7951 {
                json!(v.to_string())
            } else {
                json!(*v)
            }
        }
        Value::Uint8(v) => json!(*v),
        Value::Uint16(v) => json!(*v),
        Value::Uint32(v) => json!(*v),
        Value::Uint64(v) => {
            if rfc7951 {
                json!(v.to_string())
            } else {
                json!(*v)
            }
        }
        Value::Boolean(b) => json!(*b),
        Value::Empty => JsonValue::Null,
        Value::Union(inner) => encode_scalar(inner, rfc7951),
        // Decimal64, string, enumeration, bits, identityref, instance-identifier,
        // and binary are all carried as their canonical string form
        // regardless of dialect.
        other => json!(value::canonicalise(other)),
    }
}

fn encode_leaf_value(node: &DataNode, rfc7951: bool) -> Result<JsonValue> {
    let value = node
        .value()?
        .ok_or_else(|| Error::new(ErrorKind::BadElement, "leaf has no value").with_path(node.path()))?;
    Ok(encode_scalar(&value, rfc7951))
}

fn encode_branch(node: &DataNode, options: &CodecOptions) -> Result<JsonValue> {
    Ok(JsonValue::Object(encode_children(node, options)?))
}

/// Builds the RFC 7952 `@name` attribute object for `node`'s own metadata,
/// or `None` if it carries none.
fn metadata_object(node: &DataNode) -> Result<Option<JsonValue>> {
    let items = node.metadata()?;
    if items.is_empty() {
        return Ok(None);
    }
    let mut obj = Map::new();
    for (name, value) in items {
        obj.insert(name, JsonValue::String(value));
    }
    Ok(Some(JsonValue::Object(obj)))
}

fn encode_children(node: &DataNode, options: &CodecOptions) -> Result<Map<String, JsonValue>> {
    let rfc7951 = options.flags.contains(CodecFlags::RFC7951);
    let owner_module = node.schema().module_name().to_owned();
    let children = node.children()?;
    let mut obj = Map::new();
    let mut i = 0;
    while i < children.len() {
        let schema = children[i].schema();
        if should_skip(&schema, options.flags) {
            i += 1;
            continue;
        }
        let key = member_key(&schema, &owner_module, rfc7951);
        match schema.kind() {
            SchemaNodeKind::List => {
                let mut j = i;
                let mut entries = Vec::new();
                let mut attrs = Vec::new();
                let mut any_attrs = false;
                while j < children.len() && children[j].schema().qualified_name() == schema.qualified_name()
                {
                    if !should_skip(&children[j].schema(), options.flags) {
                        entries.push(encode_branch(&children[j], options)?);
                        if rfc7951 {
                            match metadata_object(&children[j])? {
                                Some(m) => {
                                    any_attrs = true;
                                    attrs.push(m);
                                }
                                None => attrs.push(JsonValue::Null),
                            }
                        }
                    }
                    j += 1;
                }
                obj.insert(key.clone(), JsonValue::Array(entries));
                if any_attrs {
                    obj.insert(format!("@{key}"), JsonValue::Array(attrs));
                }
                i = j;
            }
            SchemaNodeKind::LeafList => {
                let mut j = i;
                let mut entries = Vec::new();
                let mut attrs = Vec::new();
                let mut any_attrs = false;
                while j < children.len() && children[j].schema().qualified_name() == schema.qualified_name()
                {
                    entries.push(encode_leaf_value(&children[j], rfc7951)?);
                    if rfc7951 {
                        match metadata_object(&children[j])? {
                            Some(m) => {
                                any_attrs = true;
                                attrs.push(m);
                            }
                            None => attrs.push(JsonValue::Null),
                        }
                    }
                    j += 1;
                }
                obj.insert(key.clone(), JsonValue::Array(entries));
                if any_attrs {
                    obj.insert(format!("@{key}"), JsonValue::Array(attrs));
                }
                i = j;
            }
            SchemaNodeKind::Leaf => {
                obj.insert(key.clone(), encode_leaf_value(&children[i], rfc7951)?);
                if rfc7951 {
                    if let Some(m) = metadata_object(&children[i])? {
                        obj.insert(format!("@{key}"), m);
                    }
                }
                i += 1;
            }
            _ => {
                obj.insert(key.clone(), encode_branch(&children[i], options)?);
                if rfc7951 {
                    if let Some(m) = metadata_object(&children[i])? {
                        obj.insert(format!("@{key}"), m);
                    }
                }
                i += 1;
            }
        }
    }
    Ok(obj)
}

/// Applies RFC 7952 `@name` metadata members onto the tree nodes `unmarshal`
/// just created or merged. Kept as a pass separate from `decode_member`
/// (which only produces structural [`crate::edit::EditNode`]s) because
/// metadata is a presentation-layer concern attached after the fact via
/// [`DataNode::add_metadata`], not part of the edit itself.
fn apply_metadata(
    schema_parent: &SchemaNode,
    node_parent: &DataNode,
    members: &[(String, GenericValue)],
) -> Result<()> {
    for (name, value) in members {
        if name.starts_with('@') {
            continue;
        }
        let local = super::strip_module_prefix(name);
        let schema = match schema_parent.child(local) {
            Some(s) => s.clone(),
            None => continue,
        };
        let attr_key = format!("@{name}");
        let attrs = members.iter().find(|(n, _)| n == &attr_key).map(|(_, v)| v);
        match schema.kind() {
            SchemaNodeKind::Leaf => {
                if let (Some(GenericValue::Object(pairs)), Some(node)) =
                    (attrs, node_parent.child(&key::container_key(local))?)
                {
                    for (attr_name, attr_value) in pairs {
                        node.add_metadata(attr_name.clone(), attr_value.as_scalar_string(&schema)?)?;
                    }
                }
            }
            SchemaNodeKind::LeafList => {
                let attr_items = match attrs {
                    Some(GenericValue::Array(a)) => a.as_slice(),
                    _ => continue,
                };
                let group: Vec<DataNode> = node_parent
                    .children()?
                    .into_iter()
                    .filter(|c| c.schema().qualified_name() == schema.qualified_name())
                    .collect();
                for (entry, attr_value) in group.iter().zip(attr_items.iter()) {
                    if let GenericValue::Object(pairs) = attr_value {
                        for (attr_name, attr_val) in pairs {
                            entry.add_metadata(attr_name.clone(), attr_val.as_scalar_string(&schema)?)?;
                        }
                    }
                }
            }
            SchemaNodeKind::List => {
                let entries = match value {
                    GenericValue::Array(e) => e,
                    _ => continue,
                };
                let attr_items = match attrs {
                    Some(GenericValue::Array(a)) => Some(a.as_slice()),
                    _ => None,
                };
                let group: Vec<DataNode> = node_parent
                    .children()?
                    .into_iter()
                    .filter(|c| c.schema().qualified_name() == schema.qualified_name())
                    .collect();
                for (idx, entry_value) in entries.iter().enumerate() {
                    let node_entry = match group.get(idx) {
                        Some(n) => n,
                        None => continue,
                    };
                    if let Some(GenericValue::Object(pairs)) = attr_items.and_then(|a| a.get(idx)) {
                        for (attr_name, attr_val) in pairs {
                            node_entry.add_metadata(attr_name.clone(), attr_val.as_scalar_string(&schema)?)?;
                        }
                    }
                    if let GenericValue::Object(inner_members) = entry_value {
                        apply_metadata(&schema, node_entry, inner_members)?;
                    }
                }
            }
            _ => {
                if let GenericValue::Object(inner_members) = value {
                    if let Some(node) = node_parent.child(&key::container_key(local))? {
                        if let Some(GenericValue::Object(pairs)) = attrs {
                            for (attr_name, attr_val) in pairs {
                                node.add_metadata(attr_name.clone(), attr_val.as_scalar_string(&schema)?)?;
                            }
                        }
                        apply_metadata(&schema, &node, inner_members)?;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Marshals `node` (typically a tree's root) to a JSON document. The
/// outermost key has no real owning module to compare against, so it is
/// always qualified under RFC 7951 (`spec.md` §4.6, "module-qualification")
/// — `member_key` is given an owner that cannot equal any real module.
pub fn marshal(node: &DataNode, options: &CodecOptions) -> Result<String> {
    debug!(path = %node.path(), "marshalling to JSON");
    let schema = node.schema();
    let key = member_key(&schema, "", options.flags.contains(CodecFlags::RFC7951));
    let mut root = Map::new();
    root.insert(key, encode_branch(node, options)?);
    let root = JsonValue::Object(root);
    if options.indent_width == 0 {
        return serde_json::to_string(&root)
            .map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()));
    }
    let indent = format!("{}{}", options.indent_prefix, " ".repeat(options.indent_width));
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(&root, &mut ser)
        .map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))?;
    String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))
}

/// Parses `input` and merges it onto `parent` (typically a tree's root).
/// The document's single top-level key names `parent` itself (mirroring
/// the module-qualified wrapper `marshal` emits) rather than one of its
/// children; its object value's members are what get resolved against
/// `schema_root`'s children. Unknown keys fail `UnknownElement`;
/// type-mismatched scalars fail `InvalidValue` through the Typed Value
/// Layer (`spec.md` §4.6).
pub fn unmarshal(
    parent: &DataNode,
    schema_root: &SchemaNode,
    input: &str,
    flags: CodecFlags,
) -> Result<()> {
    debug!(path = %parent.path(), "unmarshalling JSON");
    let parsed: JsonValue = serde_json::from_str(input)
        .map_err(|e| Error::new(ErrorKind::BadElement, format!("invalid JSON: {e}")))?;
    let mut members = match parsed {
        JsonValue::Object(m) if m.len() == 1 => m
            .into_iter()
            .map(|(k, v)| (k, GenericValue::from(v)))
            .collect::<Vec<_>>(),
        JsonValue::Object(_) => {
            return Err(Error::new(
                ErrorKind::BadElement,
                "top-level JSON object must have exactly one member naming the document root",
            ))
        }
        _ => {
            return Err(Error::new(
                ErrorKind::BadElement,
                "top-level JSON value must be an object",
            ))
        }
    };
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
                "document root value must be an object",
            ))
        }
    };
    let edits = super::decode_root_members(schema_root, &inner_members, flags)?;
    for change in edits {
        edit::edit(parent, change, EditOp::Merge)?;
    }
    if flags.contains(CodecFlags::RFC7951) {
        apply_metadata(schema_root, parent, &inner_members)?;
    }
    Ok(())
}
