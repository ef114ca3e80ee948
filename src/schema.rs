//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Schema Facade: a read-only view over pre-loaded YANG schema entries
//! (`spec.md` §4.1). The schema graph itself is produced externally by a
//! YANG module loader (out of scope, per `spec.md` §1/§6); this module only
//! defines the shape that loader output must take and the pure,
//! side-effect-free accessors the rest of the engine consumes.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::value::TypeDescriptor;

/// The kind of a schema node, per `spec.md` §2.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SchemaNodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Anydata,
    Case,
    Choice,
}

impl SchemaNodeKind {
    /// Whether instances of this kind ever appear as their own data node
    /// (choice/case are schema-only structuring constructs, per
    /// `SPEC_FULL.md` §9 / Design Notes).
    pub fn is_data_node_kind(self) -> bool {
        !matches!(self, SchemaNodeKind::Choice | SchemaNodeKind::Case)
    }

    pub fn is_list_like(self) -> bool {
        matches!(self, SchemaNodeKind::List | SchemaNodeKind::LeafList)
    }
}

/// List/leaf-list ordering discipline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderedBy {
    System,
    User,
}

/// Optional cardinality bounds on a list or leaf-list.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cardinality {
    pub min_elements: Option<u64>,
    pub max_elements: Option<u64>,
}

/// A `must`/`when` constraint, left opaque to the core (per `spec.md` §9,
/// "Validation hooks"). The expression text is preserved only so it can be
/// surfaced in diagnostics; evaluation is delegated to the pluggable
/// validator hook installed on the tree.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub expression: String,
}

struct SchemaNodeInner {
    qualified_name: String,
    module_name: String,
    local_name: String,
    kind: SchemaNodeKind,
    type_descriptor: Option<TypeDescriptor>,
    key_names: Vec<String>,
    ordered_by: OrderedBy,
    is_config: bool,
    default_value: Option<String>,
    cardinality: Cardinality,
    /// `unique` statements (`spec.md` §4.5, "Uniqueness"): each entry names
    /// the leaf(s), by local name, whose combined value must be distinct
    /// across all entries of this list.
    unique: Vec<Vec<String>>,
    must: Vec<Constraint>,
    when: Vec<Constraint>,
    // Declaration-ordered children, keyed by local name. Choice/case layers
    // are flattened away at build time so that lookups here always resolve
    // to a data-node-kind schema (see `SchemaNodeKind::is_data_node_kind`).
    children: Vec<(String, SchemaNode)>,
    children_index: HashMap<String, usize>,
}

/// A handle to a schema node. Cheap to clone (reference-counted); schema
/// graphs are immutable once built, so no interior mutability is needed.
#[derive(Clone)]
pub struct SchemaNode(Rc<SchemaNodeInner>);

impl SchemaNode {
    pub fn qualified_name(&self) -> &str {
        &self.0.qualified_name
    }

    pub fn module_name(&self) -> &str {
        &self.0.module_name
    }

    pub fn local_name(&self) -> &str {
        &self.0.local_name
    }

    pub fn kind(&self) -> SchemaNodeKind {
        self.0.kind
    }

    pub fn type_descriptor(&self) -> Option<&TypeDescriptor> {
        self.0.type_descriptor.as_ref()
    }

    pub fn key_names(&self) -> &[String] {
        &self.0.key_names
    }

    pub fn ordered_by(&self) -> OrderedBy {
        self.0.ordered_by
    }

    pub fn is_config(&self) -> bool {
        self.0.is_config
    }

    pub fn default_value(&self) -> Option<&str> {
        self.0.default_value.as_deref()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.0.cardinality
    }

    pub fn must(&self) -> &[Constraint] {
        &self.0.must
    }

    pub fn when(&self) -> &[Constraint] {
        &self.0.when
    }

    /// `unique` statements declared on this list (`spec.md` §4.5), each a
    /// group of leaf local names whose combined value must stay distinct
    /// across sibling entries.
    pub fn unique_statements(&self) -> &[Vec<String>] {
        &self.0.unique
    }

    /// Children in schema declaration order.
    pub fn children(&self) -> impl Iterator<Item = &SchemaNode> {
        self.0.children.iter().map(|(_, s)| s)
    }

    /// Declaration-order index of a child, used to keep a branch's children
    /// ordered across different child-name groups (`spec.md` §3, invariant
    /// 2's "schema declaration order").
    pub fn child_declaration_index(&self, local_name: &str) -> Option<usize> {
        self.0.children_index.get(local_name).copied()
    }

    pub fn child(&self, local_name: &str) -> Option<&SchemaNode> {
        self.0
            .children_index
            .get(local_name)
            .map(|&i| &self.0.children[i].1)
    }

    /// Key leaf schemas, in declared key order.
    pub fn key_schemas(&self) -> Result<Vec<&SchemaNode>> {
        self.0
            .key_names
            .iter()
            .map(|name| {
                self.child(name).ok_or_else(|| {
                    Error::new(
                        ErrorKind::SchemaMissing,
                        format!("key leaf '{name}' not found in schema children"),
                    )
                    .with_path(self.qualified_name().to_owned())
                })
            })
            .collect()
    }

    fn find_descendant(&self, segments: &[&str]) -> Result<SchemaNode> {
        let mut cur = self.clone();
        for seg in segments {
            let local = seg.rsplit(':').next().unwrap_or(seg);
            cur = cur
                .child(local)
                .cloned()
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::SchemaMissing,
                        format!("no such schema child: {seg}"),
                    )
                    .with_path(cur.qualified_name().to_owned())
                })?;
        }
        Ok(cur)
    }
}

impl std::fmt::Debug for SchemaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaNode")
            .field("qualified_name", &self.0.qualified_name)
            .field("kind", &self.0.kind)
            .finish()
    }
}

/// External collaborator contract: a resolved schema graph the engine
/// consumes but never constructs from YANG text itself (`spec.md` §6).
pub trait SchemaProvider {
    fn root(&self) -> SchemaNode;
    fn find_schema(&self, qualified_path: &str) -> Result<SchemaNode>;
    fn all_modules(&self) -> Vec<String>;
}

/// A synthetic, in-memory schema graph, standing in for "a pre-existing
/// schema loader" (`spec.md` §1) at call sites such as tests and doc
/// examples. Mirrors the way `holo_yang`/`holo_northbound` consume an
/// externally populated `yang3::schema::SchemaNode` tree without ever
/// building one from `.yang` text inside those crates.
pub struct SchemaBuilder {
    qualified_name: String,
    module_name: String,
    local_name: String,
    kind: SchemaNodeKind,
    type_descriptor: Option<TypeDescriptor>,
    key_names: Vec<String>,
    ordered_by: OrderedBy,
    is_config: bool,
    default_value: Option<String>,
    cardinality: Cardinality,
    must: Vec<Constraint>,
    when: Vec<Constraint>,
    unique: Vec<Vec<String>>,
    children: Vec<SchemaNode>,
}

impl SchemaBuilder {
    pub fn new(module: &str, local_name: &str, kind: SchemaNodeKind) -> Self {
        SchemaBuilder {
            qualified_name: format!("{module}:{local_name}"),
            module_name: module.to_owned(),
            local_name: local_name.to_owned(),
            kind,
            type_descriptor: None,
            key_names: Vec::new(),
            ordered_by: OrderedBy::System,
            is_config: true,
            default_value: None,
            cardinality: Cardinality::default(),
            must: Vec::new(),
            when: Vec::new(),
            unique: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn type_descriptor(mut self, type_descriptor: TypeDescriptor) -> Self {
        self.type_descriptor = Some(type_descriptor);
        self
    }

    #[must_use]
    pub fn keys(mut self, key_names: &[&str]) -> Self {
        self.key_names = key_names.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn ordered_by(mut self, ordered_by: OrderedBy) -> Self {
        self.ordered_by = ordered_by;
        self
    }

    #[must_use]
    pub fn config(mut self, is_config: bool) -> Self {
        self.is_config = is_config;
        self
    }

    #[must_use]
    pub fn default_value(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    #[must_use]
    pub fn cardinality(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.cardinality = Cardinality {
            min_elements: min,
            max_elements: max,
        };
        self
    }

    #[must_use]
    pub fn must(mut self, expression: impl Into<String>) -> Self {
        self.must.push(Constraint {
            expression: expression.into(),
        });
        self
    }

    #[must_use]
    pub fn when(mut self, expression: impl Into<String>) -> Self {
        self.when.push(Constraint {
            expression: expression.into(),
        });
        self
    }

    /// Declares a `unique` statement (`spec.md` §4.5, "Uniqueness"): the
    /// combined value of `leaf_names` must be distinct across every entry
    /// of this list. May be called more than once for multiple `unique`
    /// statements on the same list.
    #[must_use]
    pub fn unique(mut self, leaf_names: &[&str]) -> Self {
        self.unique
            .push(leaf_names.iter().map(|s| s.to_string()).collect());
        self
    }

    #[must_use]
    pub fn child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn build(self) -> SchemaNode {
        let mut children = Vec::with_capacity(self.children.len());
        let mut children_index = HashMap::with_capacity(self.children.len());
        for (i, child) in self.children.into_iter().enumerate() {
            children_index.insert(child.local_name().to_owned(), i);
            children.push((child.local_name().to_owned(), child));
        }
        SchemaNode(Rc::new(SchemaNodeInner {
            qualified_name: self.qualified_name,
            module_name: self.module_name,
            local_name: self.local_name,
            kind: self.kind,
            type_descriptor: self.type_descriptor,
            key_names: self.key_names,
            ordered_by: self.ordered_by,
            is_config: self.is_config,
            default_value: self.default_value,
            cardinality: self.cardinality,
            must: self.must,
            when: self.when,
            unique: self.unique,
            children,
            children_index,
        }))
    }
}

/// A schema provider backed by a single `SchemaNode` tree built in-process
/// (e.g. via [`SchemaBuilder`]).
pub struct StaticSchema {
    root: SchemaNode,
    modules: Vec<String>,
}

impl StaticSchema {
    pub fn new(root: SchemaNode) -> Self {
        let mut modules: Vec<String> =
            root.children().map(|c| c.module_name().to_owned()).collect();
        modules.sort();
        modules.dedup();
        StaticSchema { root, modules }
    }
}

impl SchemaProvider for StaticSchema {
    fn root(&self) -> SchemaNode {
        self.root.clone()
    }

    fn find_schema(&self, qualified_path: &str) -> Result<SchemaNode> {
        let trimmed = qualified_path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(self.root.clone());
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        self.root.find_descendant(&segments)
    }

    fn all_modules(&self) -> Vec<String> {
        self.modules.clone()
    }
}

/// Shared, thread-agnostic handle to a schema provider, used by call sites
/// (tree builders, codecs) that need to resolve schema on demand.
pub type SharedSchemaProvider = Arc<dyn SchemaProvider>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{TypeDescriptor, TypeKind};

    fn string_leaf(module: &str, name: &str) -> SchemaNode {
        SchemaBuilder::new(module, name, SchemaNodeKind::Leaf)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .build()
    }

    #[test]
    fn child_lookup_and_declaration_order() {
        let root = SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(string_leaf("sample", "str-val"))
            .child(string_leaf("sample", "other-val"))
            .build();
        assert_eq!(root.child_declaration_index("str-val"), Some(0));
        assert_eq!(root.child_declaration_index("other-val"), Some(1));
        assert!(root.child("missing").is_none());
    }

    #[test]
    fn static_schema_find_schema_resolves_nested_path() {
        let leaf = string_leaf("sample", "str-val");
        let root = SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(leaf)
            .build();
        let provider = StaticSchema::new(root);
        let found = provider.find_schema("/sample:sample/str-val").unwrap();
        assert_eq!(found.qualified_name(), "sample:str-val");
        assert!(provider.find_schema("/sample:sample/nope").is_err());
    }
}
