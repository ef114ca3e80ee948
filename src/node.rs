//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Tree Model: the data-node variants and their lifecycle (`spec.md` §3,
//! §4.3). Nodes live in a single arena per tree (an
//! [`Arc`](std::sync::Arc)-free, single-writer design per `spec.md` §5);
//! parent links are plain arena indices rather than owning references, so a
//! detached node is simply one whose index no longer resolves — matching
//! the "weak back-reference" guidance in `spec.md` §9 Design Notes without
//! reaching for `unsafe` (the workspace this crate is grounded in forbids
//! it outright).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use generational_arena::{Arena, Index as NodeId};

use crate::error::{Error, ErrorKind, Result};
use crate::key;
use crate::schema::{OrderedBy, SchemaNode, SchemaNodeKind};
use crate::value::{self, Value};

/// Loader-facing options that shape how children are keyed (`spec.md` §6).
#[derive(Clone, Copy, Debug)]
pub struct TreeOptions {
    /// Store a leaf-list as one node holding a sequence (true) or as many
    /// sibling nodes (false, the model used throughout this crate: every
    /// leaf-list entry is its own node so the rest of the engine — path
    /// evaluation, edit, traversal — doesn't need a second code path).
    pub single_leaf_list: bool,
    /// Address leaf-list entries as `name=value` (true) instead of
    /// `name[.=value]` (false).
    pub leaf_list_value_as_key: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            single_leaf_list: false,
            leaf_list_value_as_key: false,
        }
    }
}

/// Where to place a new entry in an `ordered-by user` list or leaf-list.
#[derive(Clone, Debug)]
pub enum InsertHint {
    First,
    Last,
    Before(String),
    After(String),
}

/// The three lifecycles a data node can report, per `spec.md` §3's
/// variant table (Branch covers containers, lists, list entries, and
/// anydata subtrees).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Branch,
    Leaf,
    LeafListEntry,
}

/// Opaque `must`/`when` validator, invoked as `(new_node, tree_root)` right
/// after a node is structurally attached and before the attach call
/// returns (`spec.md` §9, "Validation hooks").
pub type ValidatorHook = dyn Fn(&DataNode, &DataNode) -> Result<()>;

enum Content {
    Branch(Branch),
    Leaf(Value),
    LeafListEntry(Value),
}

#[derive(Clone)]
struct OrderEntry {
    local_name: String,
    key: String,
    id: NodeId,
}

#[derive(Default)]
struct Branch {
    order: Vec<OrderEntry>,
    index: HashMap<String, NodeId>,
}

impl Branch {
    fn find_group(&self, local_name: &str) -> Option<(usize, usize)> {
        let mut i = 0;
        while i < self.order.len() {
            let name = self.order[i].local_name.clone();
            let mut j = i + 1;
            while j < self.order.len() && self.order[j].local_name == name {
                j += 1;
            }
            if name == local_name {
                return Some((i, j));
            }
            i = j;
        }
        None
    }

    fn insertion_point_for_new_group(
        &self,
        parent_schema: &SchemaNode,
        local_name: &str,
    ) -> usize {
        let target_idx = parent_schema
            .child_declaration_index(local_name)
            .unwrap_or(usize::MAX);
        let mut i = 0;
        while i < self.order.len() {
            let name = self.order[i].local_name.clone();
            let mut j = i + 1;
            while j < self.order.len() && self.order[j].local_name == name {
                j += 1;
            }
            let this_idx = parent_schema
                .child_declaration_index(&name)
                .unwrap_or(usize::MAX);
            if this_idx > target_idx {
                return i;
            }
            i = j;
        }
        self.order.len()
    }

    fn locate_in_range(&self, start: usize, end: usize, key: &str) -> Result<usize> {
        (start..end)
            .find(|&i| self.order[i].key == key)
            .ok_or_else(|| {
                Error::new(ErrorKind::DataMissing, "insertion reference entry not found")
            })
    }

    fn insert_member(
        &mut self,
        parent_schema: &SchemaNode,
        child_schema: &SchemaNode,
        key: String,
        child_id: NodeId,
        hint: Option<InsertHint>,
    ) -> Result<()> {
        if self.index.contains_key(&key) {
            return Err(Error::new(
                ErrorKind::DataExists,
                format!("child already exists: {key}"),
            ));
        }
        let local_name = child_schema.local_name().to_string();
        let pos = match self.find_group(&local_name) {
            Some((start, end)) => {
                if child_schema.kind().is_list_like() {
                    match child_schema.ordered_by() {
                        OrderedBy::System => {
                            let mut p = start;
                            while p < end && self.order[p].key.as_str() < key.as_str() {
                                p += 1;
                            }
                            p
                        }
                        OrderedBy::User => match hint.unwrap_or(InsertHint::Last) {
                            InsertHint::First => start,
                            InsertHint::Last => end,
                            InsertHint::Before(k) => self.locate_in_range(start, end, &k)?,
                            InsertHint::After(k) => self.locate_in_range(start, end, &k)? + 1,
                        },
                    }
                } else {
                    end
                }
            }
            None => {
                if let Some(hint) = &hint {
                    if matches!(hint, InsertHint::Before(_) | InsertHint::After(_)) {
                        return Err(Error::new(
                            ErrorKind::DataMissing,
                            "insertion reference entry not found",
                        ));
                    }
                }
                self.insertion_point_for_new_group(parent_schema, &local_name)
            }
        };
        self.order.insert(
            pos,
            OrderEntry {
                local_name,
                key: key.clone(),
                id: child_id,
            },
        );
        self.index.insert(key, child_id);
        Ok(())
    }

    fn remove_member(&mut self, key: &str) -> Option<NodeId> {
        let id = self.index.remove(key)?;
        self.order.retain(|e| e.key != key);
        Some(id)
    }
}

struct Slot {
    schema: SchemaNode,
    parent: Option<NodeId>,
    own_key: String,
    content: Content,
    metadata: Vec<(String, String)>,
}

struct Inner {
    arena: Arena<Slot>,
    root: NodeId,
    options: TreeOptions,
    validator: Option<Rc<ValidatorHook>>,
}

/// Owner of an instance tree's arena. Cheap to clone (an `Rc` handle);
/// cloning a `Tree` shares the same underlying tree, unlike
/// [`DataNode::clone_subtree`] which performs a deep structural copy.
#[derive(Clone)]
pub struct Tree {
    inner: Rc<RefCell<Inner>>,
}

impl Tree {
    pub fn new(schema_root: SchemaNode, options: TreeOptions) -> Tree {
        Self::new_with_validator(schema_root, options, None)
    }

    pub fn new_with_validator(
        schema_root: SchemaNode,
        options: TreeOptions,
        validator: Option<Rc<ValidatorHook>>,
    ) -> Tree {
        let mut arena = Arena::new();
        let root_key = format!("{}:{}", schema_root.module_name(), schema_root.local_name());
        let root_id = arena.insert(Slot {
            schema: schema_root,
            parent: None,
            own_key: root_key,
            content: Content::Branch(Branch::default()),
            metadata: Vec::new(),
        });
        Tree {
            inner: Rc::new(RefCell::new(Inner {
                arena,
                root: root_id,
                options,
                validator,
            })),
        }
    }

    pub fn root(&self) -> DataNode {
        let id = self.inner.borrow().root;
        DataNode {
            tree: self.inner.clone(),
            id,
        }
    }

    pub fn options(&self) -> TreeOptions {
        self.inner.borrow().options
    }

    /// Installs the `must`/`when` validator hook used during attach
    /// (`spec.md` §9). Replaces any previously installed hook.
    pub fn set_validator(&self, f: impl Fn(&DataNode, &DataNode) -> Result<()> + 'static) {
        self.inner.borrow_mut().validator = Some(Rc::new(f));
    }
}

/// A handle to a single node in a [`Tree`]. Cheap to clone; all clones
/// observe the same underlying tree. Once the node (or an ancestor) is
/// removed, every method but [`DataNode::is_valid`] fails with
/// `InvalidArg`, per `spec.md` §3's "Detach/Remove" lifecycle.
#[derive(Clone)]
pub struct DataNode {
    tree: Rc<RefCell<Inner>>,
    id: NodeId,
}

impl DataNode {
    pub fn is_valid(&self) -> bool {
        self.tree.borrow().arena.contains(self.id)
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::InvalidArg,
                "node has been removed from its tree",
            ))
        }
    }

    fn ensure_branch(&self) -> Result<()> {
        self.ensure_valid()?;
        match self.tree.borrow().arena[self.id].content {
            Content::Branch(_) => Ok(()),
            _ => Err(Error::new(ErrorKind::InvalidArg, "not a branch node").with_path(self.path())),
        }
    }

    pub fn schema(&self) -> SchemaNode {
        self.tree.borrow().arena[self.id].schema.clone()
    }

    pub fn node_kind(&self) -> Result<NodeKind> {
        self.ensure_valid()?;
        Ok(match self.tree.borrow().arena[self.id].content {
            Content::Branch(_) => NodeKind::Branch,
            Content::Leaf(_) => NodeKind::Leaf,
            Content::LeafListEntry(_) => NodeKind::LeafListEntry,
        })
    }

    pub fn parent(&self) -> Option<DataNode> {
        let inner = self.tree.borrow();
        let slot = inner.arena.get(self.id)?;
        slot.parent.map(|pid| DataNode {
            tree: self.tree.clone(),
            id: pid,
        })
    }

    fn own_key(&self) -> String {
        self.tree.borrow().arena[self.id].own_key.clone()
    }

    /// Composes ancestors' child-keys into an absolute path string
    /// (`spec.md` §4.3).
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(node) = cur {
            segments.push(node.own_key());
            cur = node.parent();
        }
        segments.reverse();
        format!("/{}", segments.join("/"))
    }

    pub fn children(&self) -> Result<Vec<DataNode>> {
        self.ensure_valid()?;
        let inner = self.tree.borrow();
        match &inner.arena[self.id].content {
            Content::Branch(b) => Ok(b
                .order
                .iter()
                .map(|e| DataNode {
                    tree: self.tree.clone(),
                    id: e.id,
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    pub fn child(&self, key: &str) -> Result<Option<DataNode>> {
        self.ensure_valid()?;
        let inner = self.tree.borrow();
        match &inner.arena[self.id].content {
            Content::Branch(b) => Ok(b.index.get(key).map(|&id| DataNode {
                tree: self.tree.clone(),
                id,
            })),
            _ => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.children()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn value(&self) -> Result<Option<Value>> {
        self.ensure_valid()?;
        let inner = self.tree.borrow();
        Ok(match &inner.arena[self.id].content {
            Content::Leaf(v) | Content::LeafListEntry(v) => Some(v.clone()),
            Content::Branch(_) => None,
        })
    }

    /// Re-values a leaf. Invalid on a list entry's key leaves (`spec.md`
    /// §4.3) and on leaf-list entries (whose value is part of their
    /// identity — remove and re-insert instead).
    pub fn set_value(&self, value: Value) -> Result<()> {
        self.ensure_valid()?;
        if let Some(parent) = self.parent() {
            let pschema = parent.schema();
            let schema = self.schema();
            if pschema.kind() == SchemaNodeKind::List
                && pschema
                    .key_names()
                    .iter()
                    .any(|k| k == schema.local_name())
            {
                return Err(Error::new(
                    ErrorKind::InvalidArg,
                    "cannot change the value of a list key leaf",
                )
                .with_path(self.path()));
            }
        }
        let mut inner = self.tree.borrow_mut();
        match &mut inner.arena[self.id].content {
            Content::Leaf(v) => {
                *v = value;
                Ok(())
            }
            Content::LeafListEntry(_) => Err(Error::new(
                ErrorKind::InvalidArg,
                "leaf-list entries are re-keyed by value; remove and re-insert instead",
            )
            .with_path(self.path())),
            Content::Branch(_) => Err(Error::new(
                ErrorKind::InvalidArg,
                "cannot set a value on a branch node",
            )
            .with_path(self.path())),
        }
    }

    /// Sets a leaf's value directly from a lexical string, going through
    /// the Typed Value Layer's `parse`. Convenience used by the Edit
    /// Engine's `SetValueString`.
    pub fn set_value_string(&self, input: &str) -> Result<()> {
        let schema = self.schema();
        let type_descriptor = schema.type_descriptor().ok_or_else(|| {
            Error::new(ErrorKind::SchemaMissing, "leaf has no type descriptor")
                .with_path(self.path())
        })?;
        let value = value::parse(type_descriptor, input).map_err(|e| e.with_path(self.path()))?;
        self.set_value(value)
    }

    pub fn metadata(&self) -> Result<Vec<(String, String)>> {
        self.ensure_valid()?;
        Ok(self.tree.borrow().arena[self.id].metadata.clone())
    }

    pub fn add_metadata(&self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.ensure_valid()?;
        self.tree.borrow_mut().arena[self.id]
            .metadata
            .push((name.into(), value.into()));
        Ok(())
    }

    fn attach_new(
        &self,
        schema: SchemaNode,
        key: String,
        content: Content,
        hint: Option<InsertHint>,
    ) -> Result<DataNode> {
        if hint.is_some()
            && !(schema.kind().is_list_like() && schema.ordered_by() == OrderedBy::User)
        {
            return Err(Error::new(
                ErrorKind::InvalidArg,
                "insertion hint is only valid for ordered-by user lists/leaf-lists",
            )
            .with_path(self.path()));
        }
        self.ensure_branch()?;
        let parent_schema = self.schema();

        let new_id = {
            let mut inner = self.tree.borrow_mut();
            inner.arena.insert(Slot {
                schema: schema.clone(),
                parent: Some(self.id),
                own_key: key.clone(),
                content,
                metadata: Vec::new(),
            })
        };

        let attach = {
            let mut inner = self.tree.borrow_mut();
            match &mut inner.arena[self.id].content {
                Content::Branch(branch) => {
                    branch.insert_member(&parent_schema, &schema, key, new_id, hint)
                }
                _ => Err(Error::new(ErrorKind::InvalidArg, "parent is not a branch")),
            }
        };
        if let Err(e) = attach {
            self.tree.borrow_mut().arena.remove(new_id);
            return Err(e.with_path(self.path()));
        }

        let node = DataNode {
            tree: self.tree.clone(),
            id: new_id,
        };
        let validator = self.tree.borrow().validator.clone();
        if let Some(validator) = validator {
            let root = DataNode {
                tree: self.tree.clone(),
                id: self.tree.borrow().root,
            };
            if let Err(e) = validator(&node, &root) {
                let _ = node.force_remove();
                return Err(e);
            }
        }
        Ok(node)
    }

    /// Creates a container/anydata child (non-keyed, at most one instance).
    pub fn new_container_child(&self, schema: SchemaNode) -> Result<DataNode> {
        let key = key::container_key(schema.local_name());
        self.attach_new(schema.clone(), key, Content::Branch(Branch::default()), None)
    }

    /// Creates a plain (non-key) leaf child.
    pub fn new_leaf_child(&self, schema: SchemaNode, value: Value) -> Result<DataNode> {
        let key = key::container_key(schema.local_name());
        self.attach_new(schema, key, Content::Leaf(value), None)
    }

    /// Creates a fully-keyed list entry. The key leaves are created as its
    /// first children, before the entry becomes reachable through its
    /// parent (`spec.md` §3 invariant 4).
    pub fn new_list_entry(
        &self,
        schema: SchemaNode,
        key_values: Vec<(String, Value)>,
        hint: Option<InsertHint>,
    ) -> Result<DataNode> {
        let key_refs: Vec<(&str, &Value)> =
            key_values.iter().map(|(n, v)| (n.as_str(), v)).collect();
        let entry_key = key::list_key(&schema, &key_refs)?;
        let entry = self.attach_new(
            schema.clone(),
            entry_key,
            Content::Branch(Branch::default()),
            hint,
        )?;
        for (name, value) in key_values {
            let key_schema = schema.child(&name).cloned().ok_or_else(|| {
                Error::new(ErrorKind::SchemaMissing, format!("no such key leaf: {name}"))
            })?;
            entry.new_leaf_child(key_schema, value)?;
        }
        Ok(entry)
    }

    /// Creates a leaf-list entry; its key is derived from the value itself
    /// per the tree's `leaf_list_value_as_key` option.
    pub fn new_leaf_list_entry(
        &self,
        schema: SchemaNode,
        value: Value,
        hint: Option<InsertHint>,
    ) -> Result<DataNode> {
        let options = self.tree.borrow().options;
        let entry_key = key::leaf_list_key(
            schema.local_name(),
            &value,
            options.leaf_list_value_as_key,
        );
        self.attach_new(schema, entry_key, Content::LeafListEntry(value), hint)
    }

    /// Creates an entry of an unkeyed, duplicate-allowing list (`spec.md`
    /// §3, "synthetic positional suffix"). Positions are not stable
    /// identities: removing an earlier sibling shifts later positional
    /// keys, the same limitation RFC 7950 keyless lists inherently have.
    pub fn new_positional_entry(&self, schema: SchemaNode, hint: Option<InsertHint>) -> Result<DataNode> {
        let position = self
            .children()?
            .iter()
            .filter(|c| c.schema().local_name() == schema.local_name())
            .count();
        let entry_key = key::positional_key(schema.local_name(), position);
        self.attach_new(schema, entry_key, Content::Branch(Branch::default()), hint)
    }

    fn force_remove(&self) -> Result<()> {
        let (parent_id, own_key) = {
            let inner = self.tree.borrow();
            let slot = inner
                .arena
                .get(self.id)
                .ok_or_else(|| Error::new(ErrorKind::InvalidArg, "node already removed"))?;
            (slot.parent, slot.own_key.clone())
        };
        if let Some(pid) = parent_id {
            let mut inner = self.tree.borrow_mut();
            if let Some(slot) = inner.arena.get_mut(pid) {
                if let Content::Branch(b) = &mut slot.content {
                    b.remove_member(&own_key);
                }
            }
        }
        let ids = self.collect_subtree_ids()?;
        let mut inner = self.tree.borrow_mut();
        for id in ids {
            inner.arena.remove(id);
        }
        Ok(())
    }

    fn collect_subtree_ids(&self) -> Result<Vec<NodeId>> {
        let mut out = vec![self.id];
        for child in self.children()? {
            out.extend(child.collect_subtree_ids()?);
        }
        Ok(out)
    }

    /// Detaches the node from its parent and invalidates it (`spec.md` §3).
    pub fn remove(&self) -> Result<()> {
        self.ensure_valid()?;
        self.force_remove()
    }

    /// Deep structural copy producing a new, detached tree whose nodes
    /// share no mutable state with the original (`spec.md` §4.3). Since
    /// the engine always keeps a branch's children canonically ordered
    /// (schema order across groups, sorted-by-key or insertion order
    /// within a group), replaying `self`'s children onto a fresh branch in
    /// their existing order — using `Last` as the insertion hint
    /// throughout — reproduces identical ordering without needing to
    /// special-case system- vs user-ordered groups here.
    pub fn clone_subtree(&self) -> Result<Tree> {
        self.ensure_valid()?;
        let (options, validator) = {
            let inner = self.tree.borrow();
            (inner.options, inner.validator.clone())
        };
        let new_tree = Tree::new_with_validator(self.schema(), options, validator);
        copy_into(self, &new_tree.root())?;
        Ok(new_tree)
    }

    /// Schema-aware structural equality (`spec.md` §4.3/§8 invariant 1).
    /// Positional comparison is valid here because both operands, being
    /// produced by this engine, already obey the canonical ordering
    /// invariants (`spec.md` §3 invariants 2–3): equal trees necessarily
    /// line up position-for-position.
    pub fn equal(&self, other: &DataNode) -> Result<bool> {
        self.ensure_valid()?;
        other.ensure_valid()?;
        if self.schema().qualified_name() != other.schema().qualified_name() {
            return Ok(false);
        }
        match (self.node_kind()?, other.node_kind()?) {
            (NodeKind::Leaf, NodeKind::Leaf) | (NodeKind::LeafListEntry, NodeKind::LeafListEntry) => {
                match (self.value()?, other.value()?) {
                    (Some(a), Some(b)) => Ok(value::equal(&a, &b)),
                    _ => Ok(false),
                }
            }
            (NodeKind::Branch, NodeKind::Branch) => {
                let a_children = self.children()?;
                let b_children = other.children()?;
                if a_children.len() != b_children.len() {
                    return Ok(false);
                }
                for (a, b) in a_children.iter().zip(b_children.iter()) {
                    if !a.equal(b)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn copy_into(src: &DataNode, dst: &DataNode) -> Result<()> {
    for (name, value) in src.metadata()? {
        dst.add_metadata(name, value)?;
    }
    if src.node_kind()? == NodeKind::Branch {
        for child in src.children()? {
            match child.node_kind()? {
                NodeKind::Leaf => {
                    let schema = child.schema();
                    let value = child.value()?.expect("leaf always holds a value");
                    let is_key = {
                        let parent_schema = src.schema();
                        parent_schema.kind() == SchemaNodeKind::List
                            && parent_schema
                                .key_names()
                                .iter()
                                .any(|k| k == schema.local_name())
                    };
                    if is_key {
                        // Key leaves are created as part of `new_list_entry`
                        // by the parent (list-entry) copy step, not here.
                        continue;
                    }
                    let copied = dst.new_leaf_child(schema, value)?;
                    for (name, value) in child.metadata()? {
                        copied.add_metadata(name, value)?;
                    }
                }
                NodeKind::LeafListEntry => {
                    let schema = child.schema();
                    let value = child.value()?.expect("leaf-list entry always holds a value");
                    let copied = dst.new_leaf_list_entry(schema, value, Some(InsertHint::Last))?;
                    for (name, value) in child.metadata()? {
                        copied.add_metadata(name, value)?;
                    }
                }
                NodeKind::Branch => {
                    let schema = child.schema();
                    let copied = if schema.kind() == SchemaNodeKind::List
                        && !schema.key_names().is_empty()
                    {
                        let mut key_values = Vec::new();
                        for key_name in schema.key_names() {
                            let key_child = child.child(&key::container_key(key_name))?.ok_or_else(
                                || {
                                    Error::new(
                                        ErrorKind::MissingElement,
                                        format!("list entry missing key leaf '{key_name}'"),
                                    )
                                },
                            )?;
                            let value = key_child.value()?.expect("key leaf always holds a value");
                            key_values.push((key_name.clone(), value));
                        }
                        dst.new_list_entry(schema, key_values, Some(InsertHint::Last))?
                    } else if schema.kind() == SchemaNodeKind::List {
                        dst.new_positional_entry(schema, Some(InsertHint::Last))?
                    } else {
                        dst.new_container_child(schema)?
                    };
                    copy_into(&child, &copied)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;
    use crate::value::TypeDescriptor;
    use crate::value::TypeKind;

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
        let country = string_leaf("sample", "country-code");
        let list_entry_schema = SchemaBuilder::new("sample", "single-key-list", SchemaNodeKind::List)
            .keys(&["list-key"])
            .child(list_key)
            .child(country)
            .build();
        let str_val = string_leaf("sample", "str-val");
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(str_val)
            .child(list_entry_schema)
            .build()
    }

    #[test]
    fn attach_leaf_and_read_back_value() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        let leaf = root
            .new_leaf_child(str_schema, Value::String("hello".to_owned()))
            .unwrap();
        assert_eq!(leaf.path(), "/sample:sample/str-val");
        assert_eq!(leaf.value().unwrap(), Some(Value::String("hello".to_owned())));
    }

    #[test]
    fn list_entry_requires_full_key_before_visible() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let list_schema = root.schema().child("single-key-list").unwrap().clone();
        let entry = root
            .new_list_entry(
                list_schema,
                vec![("list-key".to_owned(), Value::String("A".to_owned()))],
                None,
            )
            .unwrap();
        assert_eq!(entry.path(), "/sample:sample/single-key-list[list-key=A]");
        assert_eq!(root.children().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let list_schema = root.schema().child("single-key-list").unwrap().clone();
        root.new_list_entry(
            list_schema.clone(),
            vec![("list-key".to_owned(), Value::String("A".to_owned()))],
            None,
        )
        .unwrap();
        let err = root
            .new_list_entry(
                list_schema,
                vec![("list-key".to_owned(), Value::String("A".to_owned()))],
                None,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataExists);
    }

    #[test]
    fn remove_invalidates_node() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        let leaf = root
            .new_leaf_child(str_schema, Value::String("hi".to_owned()))
            .unwrap();
        assert!(leaf.is_valid());
        leaf.remove().unwrap();
        assert!(!leaf.is_valid());
        assert!(leaf.value().is_err());
        assert_eq!(root.children().unwrap().len(), 0);
    }

    #[test]
    fn clone_subtree_is_independent_and_structurally_equal() {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let str_schema = root.schema().child("str-val").unwrap().clone();
        root.new_leaf_child(str_schema, Value::String("hi".to_owned()))
            .unwrap();

        let cloned = root.clone_subtree().unwrap();
        let cloned_root = cloned.root();
        assert!(root.equal(&cloned_root).unwrap());

        cloned_root
            .child("str-val")
            .unwrap()
            .unwrap()
            .set_value(Value::String("bye".to_owned()))
            .unwrap();
        assert!(!root.equal(&cloned_root).unwrap());
    }
}
