//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Codec Layer: JSON (plain + RFC 7951), YAML, and XML marshalling and
//! unmarshalling (`spec.md` §4.6). Each wire format lives in its own
//! submodule; this module holds the options shared across all of them and
//! the format-agnostic generic-value intermediate representation that
//! JSON and YAML unmarshalling both decode through.

pub mod json;
pub mod xml;
pub mod yaml;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};
use crate::node::InsertHint;
use crate::edit::{EditNode, EditValue};
use crate::schema::{SchemaNode, SchemaNodeKind};

bitflags::bitflags! {
    /// Marshal/unmarshal options recognised across all wire formats
    /// (`spec.md` §4.6, "Options"). Mirrors the teacher workspace's
    /// `DataParserFlags`/`DataPrinterFlags` bitflags pattern for the same
    /// kind of concern.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
    pub struct CodecFlags: u32 {
        /// Skip nodes whose schema is not `is_config`.
        const CONFIG_ONLY = 0b0001;
        /// Skip `is_config` nodes.
        const STATE_ONLY = 0b0010;
        /// Enable module qualification and RFC 7951 value encodings.
        const RFC7951 = 0b0100;
        /// YAML only: annotate list/leaf-list scalars with their key.
        const INTERNAL_FORMAT = 0b1000;
    }
}

/// Pretty-printing and representation choices layered on top of
/// [`CodecFlags`].
#[derive(Clone, Debug)]
pub struct CodecOptions {
    pub flags: CodecFlags,
    pub indent_width: usize,
    pub indent_prefix: String,
    /// Plain JSON only: emit lists as objects keyed by their canonical
    /// child key instead of arrays, for a denser representation.
    pub list_as_object: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            flags: CodecFlags::empty(),
            indent_width: 2,
            indent_prefix: String::new(),
            list_as_object: false,
        }
    }
}

pub(crate) fn should_skip(schema: &SchemaNode, flags: CodecFlags) -> bool {
    (flags.contains(CodecFlags::CONFIG_ONLY) && !schema.is_config())
        || (flags.contains(CodecFlags::STATE_ONLY) && schema.is_config())
}

pub(crate) fn strip_module_prefix(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub(crate) fn member_key(schema: &SchemaNode, owner_module: &str, rfc7951: bool) -> String {
    if rfc7951 && schema.module_name() != owner_module {
        format!("{}:{}", schema.module_name(), schema.local_name())
    } else {
        schema.local_name().to_owned()
    }
}

/// A format-agnostic view of a parsed document, bridging `serde_json::Value`
/// and `serde_yaml::Value` so JSON and YAML unmarshalling share one
/// schema-directed decoder (`decode_member` below).
#[derive(Clone, Debug)]
pub(crate) enum GenericValue {
    Null,
    Bool(bool),
    Number(String),
    String(String),
    Array(Vec<GenericValue>),
    Object(Vec<(String, GenericValue)>),
}

impl GenericValue {
    fn as_scalar_string(&self, schema: &SchemaNode) -> Result<String> {
        match self {
            GenericValue::String(s) => Ok(s.clone()),
            GenericValue::Number(n) => Ok(n.clone()),
            GenericValue::Bool(b) => Ok(b.to_string()),
            // RFC 7951 represents an `empty`-typed leaf as a bare `null`
            // here; a fully literal one-element-array encoding is not
            // implemented (see DESIGN.md).
            GenericValue::Null => Ok(String::new()),
            _ => Err(Error::new(ErrorKind::InvalidValue, "expected a scalar value")
                .with_path(schema.qualified_name().to_owned())),
        }
    }

    fn as_array(&self, schema: &SchemaNode) -> Result<&[GenericValue]> {
        match self {
            GenericValue::Array(items) => Ok(items),
            _ => Err(Error::new(ErrorKind::BadElement, "expected a JSON/YAML array")
                .with_path(schema.qualified_name().to_owned())),
        }
    }

    fn as_object(&self, schema: &SchemaNode) -> Result<&[(String, GenericValue)]> {
        match self {
            GenericValue::Object(members) => Ok(members),
            _ => Err(Error::new(ErrorKind::BadElement, "expected a JSON/YAML object")
                .with_path(schema.qualified_name().to_owned())),
        }
    }
}

/// Decodes one member (`name`, `value`) of an object against the parent's
/// schema into zero or more [`EditNode`]s: a `List`/`LeafList` member
/// expands into one `EditNode` per array entry; everything else yields
/// exactly one.
pub(crate) fn decode_member(
    parent_schema: &SchemaNode,
    name: &str,
    value: &GenericValue,
    flags: CodecFlags,
) -> Result<Vec<EditNode>> {
    // RFC 7952 `@name` metadata members are not structural data; they are
    // applied in a separate pass after the edit (see `json::apply_metadata`).
    if name.starts_with('@') {
        return Ok(Vec::new());
    }
    let local = strip_module_prefix(name);
    let schema = parent_schema.child(local).cloned().ok_or_else(|| {
        Error::new(ErrorKind::UnknownElement, format!("unknown element '{name}'"))
            .with_path(parent_schema.qualified_name().to_owned())
    })?;
    if should_skip(&schema, flags) {
        return Ok(Vec::new());
    }
    match schema.kind() {
        SchemaNodeKind::Leaf => {
            let s = value.as_scalar_string(&schema)?;
            Ok(vec![EditNode::Leaf {
                schema,
                value: EditValue::String(s),
            }])
        }
        SchemaNodeKind::LeafList => {
            let items = value.as_array(&schema)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let s = item.as_scalar_string(&schema)?;
                out.push(EditNode::LeafListEntry {
                    schema: schema.clone(),
                    value: EditValue::String(s),
                    hint: Some(InsertHint::Last),
                });
            }
            Ok(out)
        }
        SchemaNodeKind::List => {
            let entries = value.as_array(&schema)?;
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                let members = entry.as_object(&schema)?;
                let mut key_values = Vec::new();
                let mut children = Vec::new();
                for (member_name, member_value) in members {
                    let member_local = strip_module_prefix(member_name);
                    if schema.key_names().iter().any(|k| k == member_local) {
                        let s = member_value.as_scalar_string(&schema)?;
                        key_values.push((member_local.to_owned(), EditValue::String(s)));
                    } else {
                        children.extend(decode_member(&schema, member_name, member_value, flags)?);
                    }
                }
                out.push(EditNode::ListEntry {
                    schema: schema.clone(),
                    key_values,
                    children,
                    hint: Some(InsertHint::Last),
                });
            }
            Ok(out)
        }
        _ => {
            let members = value.as_object(&schema)?;
            let mut children = Vec::new();
            for (member_name, member_value) in members {
                children.extend(decode_member(&schema, member_name, member_value, flags)?);
            }
            Ok(vec![EditNode::Container { schema, children }])
        }
    }
}

/// Decodes a whole top-level object's members against `schema_root`.
pub(crate) fn decode_root_members(
    schema_root: &SchemaNode,
    members: &[(String, GenericValue)],
    flags: CodecFlags,
) -> Result<Vec<EditNode>> {
    let mut out = Vec::new();
    for (name, value) in members {
        out.extend(decode_member(schema_root, name, value, flags)?);
    }
    Ok(out)
}
