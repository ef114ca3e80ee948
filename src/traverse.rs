//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Traversal & Query Utilities: depth-bounded subtree walks and
//! `FindAll` (`spec.md` §4.7). `Find`/`Get`/`Lookup` live in [`crate::path`].

use crate::error::Result;
use crate::node::{DataNode, NodeKind};

/// When the visitor fires relative to a branch node's children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum When {
    Enter,
    Exit,
    Both,
}

/// Walks the subtree rooted at `node`. `depth = -1` means unbounded.
/// Leaves and leaf-list entries always receive exactly one visit
/// regardless of `when`. The visitor returning an error terminates the
/// walk immediately and the error propagates to the caller. Children are
/// visited in their stored order (`spec.md` §4.7).
pub fn traverse(
    node: &DataNode,
    when: When,
    depth: i64,
    leaf_only: bool,
    visitor: &mut dyn FnMut(&DataNode) -> Result<()>,
) -> Result<()> {
    walk(node, when, depth, leaf_only, visitor)
}

fn walk(
    node: &DataNode,
    when: When,
    depth: i64,
    leaf_only: bool,
    visitor: &mut dyn FnMut(&DataNode) -> Result<()>,
) -> Result<()> {
    let is_branch = node.node_kind()? == NodeKind::Branch;

    if !is_branch {
        visitor(node)?;
        return Ok(());
    }

    if !leaf_only && matches!(when, When::Enter | When::Both) {
        visitor(node)?;
    }

    if depth != 0 {
        let next_depth = if depth < 0 { depth } else { depth - 1 };
        for child in node.children()? {
            walk(&child, when, next_depth, leaf_only, visitor)?;
        }
    }

    if !leaf_only && matches!(when, When::Exit | When::Both) {
        visitor(node)?;
    }

    Ok(())
}

/// Collects every node in the subtree (including `node` itself) for which
/// `predicate` returns true, walking in stored order.
pub fn find_all(
    node: &DataNode,
    predicate: &dyn Fn(&DataNode) -> bool,
) -> Result<Vec<DataNode>> {
    let mut out = Vec::new();
    traverse(node, When::Enter, -1, false, &mut |n| {
        if predicate(n) {
            out.push(n.clone());
        }
        Ok(())
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeOptions};
    use crate::schema::{SchemaBuilder, SchemaNodeKind};
    use crate::value::{TypeDescriptor, TypeKind, Value};

    fn string_leaf(module: &str, name: &str) -> crate::schema::SchemaNode {
        SchemaBuilder::new(module, name, SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build()
    }

    fn sample_root() -> crate::schema::SchemaNode {
        let a = string_leaf("sample", "a");
        let b = string_leaf("sample", "b");
        let inner = SchemaBuilder::new("sample", "inner", SchemaNodeKind::Container)
            .child(b)
            .build();
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(a)
            .child(inner)
            .build()
    }

    #[test]
    fn traverse_visits_children_in_stored_order() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let a_schema = root.schema().child("a").unwrap().clone();
        root.new_leaf_child(a_schema, Value::String("1".to_owned())).unwrap();
        let inner_schema = root.schema().child("inner").unwrap().clone();
        let inner = root.new_container_child(inner_schema).unwrap();
        let b_schema = inner.schema().child("b").unwrap().clone();
        inner.new_leaf_child(b_schema, Value::String("2".to_owned())).unwrap();

        let mut seen = Vec::new();
        traverse(&root, When::Enter, -1, false, &mut |n| {
            seen.push(n.schema().local_name().to_owned());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec!["sample", "a", "inner", "b"]);
    }

    #[test]
    fn traverse_depth_zero_visits_only_the_root() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let a_schema = root.schema().child("a").unwrap().clone();
        root.new_leaf_child(a_schema, Value::String("1".to_owned())).unwrap();

        let mut count = 0;
        traverse(&root, When::Enter, 0, false, &mut |_| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn find_all_collects_matching_leaves() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let a_schema = root.schema().child("a").unwrap().clone();
        root.new_leaf_child(a_schema, Value::String("1".to_owned())).unwrap();

        let leaves = find_all(&root, &|n| n.node_kind().unwrap() == NodeKind::Leaf).unwrap();
        assert_eq!(leaves.len(), 1);
    }
}
