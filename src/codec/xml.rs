//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! XML marshalling/unmarshalling (`spec.md` §4.6). Elements carry their
//! schema's local name; a child is wrapped in an `xmlns` declaration only
//! the first time its module differs from its parent's, mirroring the
//! module-qualification rule the JSON/YAML codecs apply to member keys.
//! Lists and leaf-lists are repeated sibling elements rather than any
//! array-like wrapper, matching NETCONF wire conventions. RFC 7952
//! metadata is carried as ordinary XML attributes.

use std::io::Cursor;

use tracing::debug;
use xml::reader::XmlEvent as ReadEvent;
use xml::writer::XmlEvent as WriteEvent;
use xml::{EmitterConfig, EventReader, ParserConfig};

use super::{should_skip, CodecFlags, CodecOptions};
use crate::edit::{self, EditNode, EditOp, EditValue};
use crate::error::{Error, ErrorKind, Result};
use crate::key;
use crate::node::{DataNode, InsertHint};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value;

fn encode_children(node: &DataNode, options: &CodecOptions, out: &mut Vec<u8>) -> Result<()> {
    use xml::writer::EventWriter;

    let mut config = EmitterConfig::new().perform_indent(options.indent_width > 0);
    config.indent_string = std::borrow::Cow::Owned(" ".repeat(options.indent_width.max(1)));
    let mut writer = config.create_writer(out);
    write_element(node, options, node.schema().module_name(), &mut writer)
}

fn write_element<W: std::io::Write>(
    node: &DataNode,
    options: &CodecOptions,
    owner_module: &str,
    writer: &mut xml::writer::EventWriter<W>,
) -> Result<()> {
    let schema = node.schema();
    let name = schema.local_name().to_owned();
    let metadata = node.metadata()?;
    let mut start = WriteEvent::start_element(name.as_str());
    if schema.module_name() != owner_module {
        start = start.default_ns(schema.module_name());
    }
    for (meta_name, meta_value) in &metadata {
        start = start.attr(meta_name.as_str(), meta_value.as_str());
    }
    writer
        .write(start)
        .map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))?;

    match node.node_kind()? {
        crate::node::NodeKind::Leaf | crate::node::NodeKind::LeafListEntry => {
            let value = node
                .value()?
                .ok_or_else(|| Error::new(ErrorKind::BadElement, "leaf has no value").with_path(node.path()))?;
            let text = value::canonicalise(&value);
            writer
                .write(WriteEvent::characters(&text))
                .map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))?;
        }
        crate::node::NodeKind::Branch => {
            let own_module = schema.module_name().to_owned();
            for child in node.children()? {
                if should_skip(&child.schema(), options.flags) {
                    continue;
                }
                write_element(&child, options, &own_module, writer)?;
            }
        }
    }

    writer
        .write(WriteEvent::end_element())
        .map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))?;
    Ok(())
}

/// Marshals `node` to an XML document, rooted at a single top-level
/// element named after its schema.
pub fn marshal(node: &DataNode, options: &CodecOptions) -> Result<String> {
    debug!(path = %node.path(), "marshalling to XML");
    let mut buf = Vec::new();
    encode_children(node, options, &mut buf)?;
    String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::OperationFailed, e.to_string()))
}

/// One parsed XML element, read eagerly off the streaming reader into a
/// small tree so schema-directed decoding can look ahead across repeated
/// sibling elements before committing to list vs. container handling.
struct ParsedElement {
    local_name: String,
    attributes: Vec<(String, String)>,
    children: Vec<ParsedElement>,
    text: String,
}

fn parse_document(input: &str) -> Result<ParsedElement> {
    let config = ParserConfig::new().trim_whitespace(true);
    let reader = EventReader::new_with_config(Cursor::new(input.as_bytes()), config);
    let mut stack: Vec<ParsedElement> = Vec::new();
    let mut root: Option<ParsedElement> = None;

    for event in reader {
        let event = event.map_err(|e| Error::new(ErrorKind::BadElement, format!("invalid XML: {e}")))?;
        match event {
            ReadEvent::StartElement {
                name, attributes, ..
            } => {
                stack.push(ParsedElement {
                    local_name: name.local_name,
                    attributes: attributes
                        .into_iter()
                        .map(|a| (a.name.local_name, a.value))
                        .collect(),
                    children: Vec::new(),
                    text: String::new(),
                });
            }
            ReadEvent::Characters(text) | ReadEvent::CData(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            ReadEvent::EndElement { .. } => {
                let finished = stack
                    .pop()
                    .ok_or_else(|| Error::new(ErrorKind::BadElement, "unbalanced XML element"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None => root = Some(finished),
                }
            }
            _ => {}
        }
    }

    root.ok_or_else(|| Error::new(ErrorKind::BadElement, "XML document has no root element"))
}

fn decode_element(parent_schema: &SchemaNode, elem: &ParsedElement, flags: CodecFlags) -> Result<EditNode> {
    let schema = parent_schema.child(&elem.local_name).cloned().ok_or_else(|| {
        Error::new(
            ErrorKind::UnknownElement,
            format!("unknown element '{}'", elem.local_name),
        )
        .with_path(parent_schema.qualified_name().to_owned())
    })?;
    if should_skip(&schema, flags) {
        return Ok(EditNode::Container {
            schema,
            children: Vec::new(),
        });
    }
    match schema.kind() {
        SchemaNodeKind::Leaf => Ok(EditNode::Leaf {
            schema,
            value: EditValue::String(elem.text.clone()),
        }),
        SchemaNodeKind::LeafList => Ok(EditNode::LeafListEntry {
            schema,
            value: EditValue::String(elem.text.clone()),
            hint: Some(InsertHint::Last),
        }),
        SchemaNodeKind::List => {
            let mut key_values = Vec::new();
            let mut children = Vec::new();
            for child in &elem.children {
                if schema.key_names().iter().any(|k| k == &child.local_name) {
                    key_values.push((child.local_name.clone(), EditValue::String(child.text.clone())));
                } else {
                    children.push(decode_element(&schema, child, flags)?);
                }
            }
            Ok(EditNode::ListEntry {
                schema,
                key_values,
                children,
                hint: Some(InsertHint::Last),
            })
        }
        _ => {
            let mut children = Vec::new();
            for child in &elem.children {
                children.push(decode_element(&schema, child, flags)?);
            }
            Ok(EditNode::Container { schema, children })
        }
    }
}

/// Applies RFC 7952 attributes onto the tree nodes `unmarshal` just created
/// or merged. `decode_element` builds the structural [`EditNode`] tree
/// without consulting `elem.attributes`; this separate pass walks the
/// parsed element tree alongside the resulting `DataNode` tree (locating
/// each counterpart by the same canonical child key the edit engine used to
/// create it) and attaches attributes via [`DataNode::add_metadata`].
fn apply_metadata(
    schema_parent: &SchemaNode,
    node_parent: &DataNode,
    elems: &[ParsedElement],
    flags: CodecFlags,
) -> Result<()> {
    for elem in elems {
        let schema = match schema_parent.child(&elem.local_name) {
            Some(s) => s.clone(),
            None => continue,
        };
        if should_skip(&schema, flags) {
            continue;
        }
        match schema.kind() {
            SchemaNodeKind::Leaf => {
                if let Some(node) = node_parent.child(&key::container_key(&elem.local_name))? {
                    for (name, value) in &elem.attributes {
                        node.add_metadata(name.clone(), value.clone())?;
                    }
                }
            }
            SchemaNodeKind::LeafList => {
                if elem.attributes.is_empty() {
                    continue;
                }
                let type_descriptor = schema.type_descriptor().ok_or_else(|| {
                    Error::new(ErrorKind::SchemaMissing, "leaf-list has no type descriptor")
                        .with_path(schema.qualified_name().to_owned())
                })?;
                let target = value::parse(type_descriptor, &elem.text)?;
                // Best effort: attaches to the first still-bare entry with a
                // matching value, since repeated leaf-list elements carry no
                // identity beyond their value.
                for entry in node_parent.children()? {
                    if entry.schema().qualified_name() != schema.qualified_name()
                        || !entry.metadata()?.is_empty()
                    {
                        continue;
                    }
                    if let Some(v) = entry.value()? {
                        if value::equal(&v, &target) {
                            for (name, val) in &elem.attributes {
                                entry.add_metadata(name.clone(), val.clone())?;
                            }
                            break;
                        }
                    }
                }
            }
            SchemaNodeKind::List => {
                let mut key_values = Vec::new();
                for child in &elem.children {
                    if schema.key_names().iter().any(|k| k == &child.local_name) {
                        key_values.push((child.local_name.clone(), child.text.clone()));
                    }
                }
                let entry_key = key::list_key_from_raw(&schema, &key_values)?;
                if let Some(entry) = node_parent.child(&entry_key)? {
                    for (name, value) in &elem.attributes {
                        entry.add_metadata(name.clone(), value.clone())?;
                    }
                    apply_metadata(&schema, &entry, &elem.children, flags)?;
                }
            }
            _ => {
                if let Some(node) = node_parent.child(&key::container_key(&elem.local_name))? {
                    for (name, value) in &elem.attributes {
                        node.add_metadata(name.clone(), value.clone())?;
                    }
                    apply_metadata(&schema, &node, &elem.children, flags)?;
                }
            }
        }
    }
    Ok(())
}

/// Parses `input` and merges it onto `parent`. The document's root
/// element's children are decoded against `schema_root`; the root
/// element's own name is not schema-checked (it plays the role the
/// `module:container` wrapper key plays in JSON/YAML).
pub fn unmarshal(
    parent: &DataNode,
    schema_root: &SchemaNode,
    input: &str,
    flags: CodecFlags,
) -> Result<()> {
    debug!(path = %parent.path(), "unmarshalling XML");
    let root_elem = parse_document(input)?;
    for child in &root_elem.children {
        let change = decode_element(schema_root, child, flags)?;
        edit::edit(parent, change, EditOp::Merge)?;
    }
    apply_metadata(schema_root, parent, &root_elem.children, flags)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeOptions};
    use crate::schema::SchemaBuilder;
    use crate::value::{TypeDescriptor, TypeKind, Value};

    fn sample_root() -> SchemaNode {
        let str_val = SchemaBuilder::new("sample", "str-val", SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build();
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(str_val)
            .build()
    }

    #[test]
    fn marshal_emits_leaf_text_content() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        root.new_leaf_child(str_schema, Value::String("hello".to_owned()))
            .unwrap();
        let out = marshal(&root, &CodecOptions::default()).unwrap();
        assert!(out.contains("<sample"));
        assert!(out.contains("<str-val>hello</str-val>"));
    }

    #[test]
    fn unmarshal_reads_leaf_text_content() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let input = "<sample><str-val>hi</str-val></sample>";
        unmarshal(&root, &root.schema(), input, CodecFlags::empty()).unwrap();
        let child = root.child("str-val").unwrap().unwrap();
        assert_eq!(child.value().unwrap(), Some(Value::String("hi".to_owned())));
    }

    #[test]
    fn unmarshal_reads_attribute_as_metadata() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let input = r#"<sample><str-val origin="learned">hi</str-val></sample>"#;
        unmarshal(&root, &root.schema(), input, CodecFlags::empty()).unwrap();
        let child = root.child("str-val").unwrap().unwrap();
        assert_eq!(
            child.metadata().unwrap(),
            vec![("origin".to_owned(), "learned".to_owned())]
        );
    }

    #[test]
    fn metadata_round_trips_through_marshal_and_unmarshal() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        let leaf = root
            .new_leaf_child(str_schema, Value::String("hello".to_owned()))
            .unwrap();
        leaf.add_metadata("origin", "learned").unwrap();

        let out = marshal(&root, &CodecOptions::default()).unwrap();
        assert!(out.contains("origin=\"learned\""));

        let roundtrip_tree = Tree::new(sample_root(), TreeOptions::default());
        let roundtrip_root = roundtrip_tree.root();
        unmarshal(&roundtrip_root, &roundtrip_root.schema(), &out, CodecFlags::empty()).unwrap();
        let roundtrip_leaf = roundtrip_root.child("str-val").unwrap().unwrap();
        assert_eq!(
            roundtrip_leaf.metadata().unwrap(),
            vec![("origin".to_owned(), "learned".to_owned())]
        );
    }

    #[test]
    fn unmarshal_rejects_unknown_element() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let input = "<sample><nope>x</nope></sample>";
        let err = unmarshal(&root, &root.schema(), input, CodecFlags::empty()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownElement);
    }
}
