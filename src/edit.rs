//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Edit Engine: NETCONF-semantic `edit-config` operations with
//! pre-validation and rollback (`spec.md` §4.5).

use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::key;
use crate::node::{DataNode, InsertHint};
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value::{self, Value};

/// The five `edit-config` operations (`spec.md` §4.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EditOp {
    Create,
    Merge,
    Replace,
    Delete,
    Remove,
}

/// A leaf value to set, either already typed or given as lexical input to
/// be parsed against the leaf's declared type.
#[derive(Clone, Debug)]
pub enum EditValue {
    Typed(Value),
    String(String),
}

fn resolve_value(schema: &SchemaNode, value: &EditValue) -> Result<Value> {
    match value {
        EditValue::Typed(v) => Ok(v.clone()),
        EditValue::String(s) => {
            let type_descriptor = schema.type_descriptor().ok_or_else(|| {
                Error::new(ErrorKind::SchemaMissing, "leaf has no type descriptor")
            })?;
            value::parse(type_descriptor, s)
        }
    }
}

/// A single child to apply under a parent node: its schema, the key values
/// identifying it (for list entries), a leaf/leaf-list value, or nested
/// children for a container/list-entry subtree. Built by a caller (e.g. a
/// codec unmarshaller) walking its own input representation.
pub enum EditNode {
    Leaf {
        schema: SchemaNode,
        value: EditValue,
    },
    LeafListEntry {
        schema: SchemaNode,
        value: EditValue,
        hint: Option<InsertHint>,
    },
    Container {
        schema: SchemaNode,
        children: Vec<EditNode>,
    },
    ListEntry {
        schema: SchemaNode,
        key_values: Vec<(String, EditValue)>,
        children: Vec<EditNode>,
        hint: Option<InsertHint>,
    },
}

impl EditNode {
    fn schema(&self) -> &SchemaNode {
        match self {
            EditNode::Leaf { schema, .. }
            | EditNode::LeafListEntry { schema, .. }
            | EditNode::Container { schema, .. }
            | EditNode::ListEntry { schema, .. } => schema,
        }
    }
}

/// Applies `change` under `parent` per the NETCONF-semantic contract table
/// (`spec.md` §4.5). Atomic: any child node this call itself created is
/// rolled back before the error is returned; nodes that already existed
/// before the call are mutated only in ways the same call can undo.
/// Returns the affected node, or `None` for `Delete`/`Remove`, which leave
/// nothing behind to hand back.
pub fn edit(parent: &DataNode, change: EditNode, op: EditOp) -> Result<Option<DataNode>> {
    let schema_name = change.schema().qualified_name().to_owned();
    let mut created: Vec<DataNode> = Vec::new();
    match apply(parent, change, op, &mut created) {
        Ok(node) => {
            debug!(op = ?op, schema = %schema_name, parent = %parent.path(), "edit applied");
            Ok(node)
        }
        Err(e) => {
            // Roll back in reverse so children are removed before their
            // ancestors, though removing an ancestor already takes its
            // subtree with it.
            for node in created.into_iter().rev() {
                if node.is_valid() {
                    let _ = node.remove();
                }
            }
            e.log();
            Err(e)
        }
    }
}

fn apply(
    parent: &DataNode,
    change: EditNode,
    op: EditOp,
    created: &mut Vec<DataNode>,
) -> Result<Option<DataNode>> {
    let schema = change.schema().clone();
    let declared = parent.schema().child(schema.local_name()).cloned();
    match &declared {
        Some(d) if d.qualified_name() == schema.qualified_name() => {}
        _ => {
            return Err(Error::new(
                ErrorKind::UnknownElement,
                format!(
                    "'{}' is not a declared child of '{}'",
                    schema.local_name(),
                    parent.schema().qualified_name()
                ),
            )
            .with_path(parent.path()))
        }
    }
    let existing = find_existing(parent, &schema, &change)?;

    match op {
        EditOp::Delete => {
            let node = existing.ok_or_else(|| {
                Error::new(ErrorKind::DataMissing, "delete target does not exist")
                    .with_path(parent.path())
            })?;
            node.remove()?;
            Ok(None)
        }
        EditOp::Remove => {
            if let Some(node) = existing {
                node.remove()?;
            }
            Ok(None)
        }
        EditOp::Create => {
            if existing.is_some() {
                return Err(Error::new(
                    ErrorKind::DataExists,
                    "create target already exists",
                )
                .with_path(parent.path()));
            }
            create_and_populate(parent, change, created).map(Some)
        }
        EditOp::Replace => {
            if let Some(node) = existing {
                node.remove()?;
            }
            create_and_populate(parent, change, created).map(Some)
        }
        EditOp::Merge => match existing {
            Some(node) => {
                merge_into(&node, change, created)?;
                Ok(Some(node))
            }
            None => create_and_populate(parent, change, created).map(Some),
        },
    }
}

fn find_existing(parent: &DataNode, schema: &SchemaNode, change: &EditNode) -> Result<Option<DataNode>> {
    match change {
        EditNode::Leaf { .. } | EditNode::Container { .. } => {
            parent.child(&key::container_key(schema.local_name()))
        }
        EditNode::ListEntry { key_values, .. } => {
            let mut typed = Vec::with_capacity(key_values.len());
            for (name, v) in key_values {
                typed.push((name.clone(), resolve_value(schema.child(name).ok_or_else(|| {
                    Error::new(ErrorKind::SchemaMissing, format!("no such key leaf: {name}"))
                })?, v)?));
            }
            let refs: Vec<(&str, &Value)> = typed.iter().map(|(n, v)| (n.as_str(), v)).collect();
            let entry_key = key::list_key(schema, &refs)?;
            parent.child(&entry_key)
        }
        EditNode::LeafListEntry { value, .. } => {
            let resolved = resolve_value(schema, value)?;
            for entry in parent.children()? {
                if entry.schema().qualified_name() == schema.qualified_name() {
                    if let Some(v) = entry.value()? {
                        if value::equal(&v, &resolved) {
                            return Ok(Some(entry));
                        }
                    }
                }
            }
            Ok(None)
        }
    }
}

fn create_and_populate(
    parent: &DataNode,
    change: EditNode,
    created: &mut Vec<DataNode>,
) -> Result<DataNode> {
    match change {
        EditNode::Leaf { schema, value } => {
            let resolved = resolve_value(&schema, &value)?;
            let node = parent.new_leaf_child(schema, resolved)?;
            created.push(node.clone());
            Ok(node)
        }
        EditNode::LeafListEntry { schema, value, hint } => {
            check_max_elements(parent, &schema)?;
            let resolved = resolve_value(&schema, &value)?;
            let node = parent.new_leaf_list_entry(schema, resolved, hint)?;
            created.push(node.clone());
            Ok(node)
        }
        EditNode::Container { schema, children } => {
            let node = parent.new_container_child(schema)?;
            created.push(node.clone());
            for child in children {
                apply(&node, child, EditOp::Merge, created)?;
            }
            Ok(node)
        }
        EditNode::ListEntry {
            schema,
            key_values,
            children,
            hint,
        } => {
            check_max_elements(parent, &schema)?;
            let mut typed = Vec::with_capacity(key_values.len());
            for (name, v) in &key_values {
                let key_schema = schema.child(name).ok_or_else(|| {
                    Error::new(ErrorKind::SchemaMissing, format!("no such key leaf: {name}"))
                })?;
                typed.push((name.clone(), resolve_value(key_schema, v)?));
            }
            let node = parent.new_list_entry(schema.clone(), typed, hint)?;
            created.push(node.clone());
            for child in children {
                if is_key_child(&node, &child) {
                    continue;
                }
                apply(&node, child, EditOp::Merge, created)?;
            }
            check_unique(parent, &schema, &node)?;
            Ok(node)
        }
    }
}

/// Enforces `max-elements` (`spec.md` §2/§3): a new list/leaf-list entry
/// cannot push the sibling group past its declared cardinality bound.
fn check_max_elements(parent: &DataNode, schema: &SchemaNode) -> Result<()> {
    if let Some(max) = schema.cardinality().max_elements {
        let count = parent
            .children()?
            .iter()
            .filter(|c| c.schema().qualified_name() == schema.qualified_name())
            .count() as u64;
        if count >= max {
            return Err(Error::new(
                ErrorKind::OperationFailed,
                format!(
                    "'{}' already has {count} entr{} and cannot exceed max-elements {max}",
                    schema.qualified_name(),
                    if count == 1 { "y" } else { "ies" },
                ),
            )
            .with_path(parent.path()));
        }
    }
    Ok(())
}

/// Enforces the list's `unique` statements (`spec.md` §4.5, "Uniqueness")
/// against an already-populated `entry`: for each declared leaf-name group,
/// its combined canonical value must not match that of any other sibling
/// entry already attached under `parent`.
fn check_unique(parent: &DataNode, schema: &SchemaNode, entry: &DataNode) -> Result<()> {
    if schema.unique_statements().is_empty() {
        return Ok(());
    }
    let entry_tuple = |node: &DataNode, names: &[String]| -> Result<Option<Vec<String>>> {
        let mut parts = Vec::with_capacity(names.len());
        for name in names {
            match node.child(&key::container_key(name))? {
                Some(leaf) => match leaf.value()? {
                    Some(v) => parts.push(value::canonicalise(&v)),
                    None => return Ok(None),
                },
                None => return Ok(None),
            }
        }
        Ok(Some(parts))
    };
    for names in schema.unique_statements() {
        let Some(this_tuple) = entry_tuple(entry, names)? else {
            continue;
        };
        for sibling in parent.children()? {
            if sibling.schema().qualified_name() != schema.qualified_name() || sibling.path() == entry.path() {
                continue;
            }
            if entry_tuple(&sibling, names)? == Some(this_tuple.clone()) {
                return Err(Error::new(
                    ErrorKind::DataExists,
                    format!(
                        "unique constraint on [{}] violated by value [{}]",
                        names.join(", "),
                        this_tuple.join(", "),
                    ),
                )
                .with_path(parent.path()));
            }
        }
    }
    Ok(())
}

fn is_key_child(parent: &DataNode, change: &EditNode) -> bool {
    let parent_schema = parent.schema();
    parent_schema.kind() == SchemaNodeKind::List
        && parent_schema
            .key_names()
            .iter()
            .any(|k| k == change.schema().local_name())
}

/// Recursively merges `change` onto an already-existing `node` (the
/// `merge` behaviour of the contract table when the target is present):
/// leaves are overwritten, containers/list-entries merge their children,
/// list/leaf-list members are unioned in rather than replaced wholesale.
fn merge_into(node: &DataNode, change: EditNode, created: &mut Vec<DataNode>) -> Result<()> {
    match change {
        EditNode::Leaf { schema, value } => {
            let resolved = resolve_value(&schema, &value)?;
            node.set_value(resolved)?;
            Ok(())
        }
        EditNode::LeafListEntry { .. } => {
            // find_existing already matched this exact value; nothing to do.
            Ok(())
        }
        EditNode::Container { children, .. } => {
            for child in children {
                apply(node, child, EditOp::Merge, created)?;
            }
            Ok(())
        }
        EditNode::ListEntry { schema, children, .. } => {
            for child in children {
                if is_key_child(node, &child) {
                    continue;
                }
                apply(node, child, EditOp::Merge, created)?;
            }
            if let Some(parent) = node.parent() {
                check_unique(&parent, &schema, node)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeOptions};
    use crate::schema::{OrderedBy, SchemaBuilder};
    use crate::value::{TypeDescriptor, TypeKind};

    fn string_leaf(module: &str, name: &str) -> SchemaNode {
        SchemaBuilder::new(module, name, SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build()
    }

    fn sample_root() -> SchemaNode {
        let list_key = string_leaf("sample", "list-key");
        let payload = string_leaf("sample", "payload");
        let list_entry_schema = SchemaBuilder::new("sample", "single-key-list", SchemaNodeKind::List)
            .keys(&["list-key"])
            .ordered_by(OrderedBy::System)
            .child(list_key)
            .child(payload)
            .build();
        let str_val = string_leaf("sample", "str-val");
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(str_val)
            .child(list_entry_schema)
            .build()
    }

    #[test]
    fn create_then_create_again_fails_data_exists() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        edit(
            &root,
            EditNode::Leaf {
                schema: str_schema.clone(),
                value: EditValue::String("hi".to_owned()),
            },
            EditOp::Create,
        )
        .unwrap();
        let err = edit(
            &root,
            EditNode::Leaf {
                schema: str_schema,
                value: EditValue::String("again".to_owned()),
            },
            EditOp::Create,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataExists);
    }

    #[test]
    fn merge_overwrites_existing_leaf_value() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        edit(
            &root,
            EditNode::Leaf {
                schema: str_schema.clone(),
                value: EditValue::String("hi".to_owned()),
            },
            EditOp::Merge,
        )
        .unwrap();
        let node = edit(
            &root,
            EditNode::Leaf {
                schema: str_schema,
                value: EditValue::String("bye".to_owned()),
            },
            EditOp::Merge,
        )
        .unwrap()
        .unwrap();
        assert_eq!(node.value().unwrap(), Some(Value::String("bye".to_owned())));
        assert_eq!(root.children().unwrap().len(), 1);
    }

    #[test]
    fn invalid_value_leaves_tree_unchanged() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let list_schema = root.schema().child("single-key-list").unwrap().clone();
        let err = edit(
            &root,
            EditNode::ListEntry {
                schema: list_schema,
                key_values: vec![("list-key".to_owned(), EditValue::String("A".to_owned()))],
                children: vec![EditNode::Leaf {
                    schema: string_leaf("sample", "not-a-real-child"),
                    value: EditValue::String("x".to_owned()),
                }],
                hint: None,
            },
            EditOp::Create,
        );
        assert!(err.is_err());
        assert_eq!(root.children().unwrap().len(), 0);
    }

    #[test]
    fn delete_absent_target_fails_data_missing() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        let err = edit(
            &root,
            EditNode::Leaf {
                schema: str_schema,
                value: EditValue::String("x".to_owned()),
            },
            EditOp::Delete,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataMissing);
    }

    #[test]
    fn max_elements_violation_fails_operation_failed() {
        let list_key = string_leaf("sample", "list-key");
        let list_entry_schema = SchemaBuilder::new("sample", "single-key-list", SchemaNodeKind::List)
            .keys(&["list-key"])
            .ordered_by(OrderedBy::System)
            .cardinality(None, Some(1))
            .child(list_key)
            .build();
        let root_schema = SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(list_entry_schema.clone())
            .build();
        let tree = Tree::new(root_schema, TreeOptions::default());
        let root = tree.root();
        edit(
            &root,
            EditNode::ListEntry {
                schema: list_entry_schema.clone(),
                key_values: vec![("list-key".to_owned(), EditValue::String("A".to_owned()))],
                children: vec![],
                hint: None,
            },
            EditOp::Create,
        )
        .unwrap();
        let err = edit(
            &root,
            EditNode::ListEntry {
                schema: list_entry_schema,
                key_values: vec![("list-key".to_owned(), EditValue::String("B".to_owned()))],
                children: vec![],
                hint: None,
            },
            EditOp::Create,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert_eq!(root.children().unwrap().len(), 1);
    }

    #[test]
    fn unique_violation_fails_data_exists_and_rolls_back() {
        let list_key = string_leaf("sample", "list-key");
        let payload = string_leaf("sample", "payload");
        let list_entry_schema = SchemaBuilder::new("sample", "single-key-list", SchemaNodeKind::List)
            .keys(&["list-key"])
            .ordered_by(OrderedBy::System)
            .unique(&["payload"])
            .child(list_key)
            .child(payload)
            .build();
        let root_schema = SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(list_entry_schema.clone())
            .build();
        let tree = Tree::new(root_schema, TreeOptions::default());
        let root = tree.root();
        edit(
            &root,
            EditNode::ListEntry {
                schema: list_entry_schema.clone(),
                key_values: vec![("list-key".to_owned(), EditValue::String("A".to_owned()))],
                children: vec![EditNode::Leaf {
                    schema: list_entry_schema.child("payload").unwrap().clone(),
                    value: EditValue::String("dup".to_owned()),
                }],
                hint: None,
            },
            EditOp::Create,
        )
        .unwrap();
        let err = edit(
            &root,
            EditNode::ListEntry {
                schema: list_entry_schema.clone(),
                key_values: vec![("list-key".to_owned(), EditValue::String("B".to_owned()))],
                children: vec![EditNode::Leaf {
                    schema: list_entry_schema.child("payload").unwrap().clone(),
                    value: EditValue::String("dup".to_owned()),
                }],
                hint: None,
            },
            EditOp::Create,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataExists);
        // rolled back: the second entry must not remain attached.
        assert_eq!(root.children().unwrap().len(), 1);
    }

    #[test]
    fn delete_existing_target_succeeds_and_returns_none() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        edit(
            &root,
            EditNode::Leaf {
                schema: str_schema.clone(),
                value: EditValue::String("hi".to_owned()),
            },
            EditOp::Create,
        )
        .unwrap();
        let result = edit(
            &root,
            EditNode::Leaf {
                schema: str_schema,
                value: EditValue::String("ignored".to_owned()),
            },
            EditOp::Delete,
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(root.children().unwrap().len(), 0);
    }
}
