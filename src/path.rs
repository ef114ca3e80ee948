//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! Path Engine: tokenizer, evaluator, and the `Find`/`Get`/`Lookup`
//! operations over the path grammar of `spec.md` §4.4.
//!
//! ```text
//! path        := ('/')? step ('/' step)*
//! step        := axis? name predicate*
//! axis        := '.' | '..' | (empty means child)
//! name        := NCName | '*' | '...' | (prefixed name)
//! predicate   := '[' expr ']'
//! expr        := leafname '=' value | '.' '=' value | integer
//! ```

use crate::error::{Error, ErrorKind, Result};
use crate::key;
use crate::node::DataNode;
use crate::schema::{SchemaNode, SchemaNodeKind};
use crate::value;

#[derive(Clone, Debug)]
enum StepName {
    Named(String),
    Wildcard,
}

#[derive(Clone, Debug)]
enum Predicate {
    KeyValue(String, String),
    SelfValue(String),
    Positional(u64),
}

#[derive(Clone, Debug)]
enum Step {
    SelfStep,
    Parent,
    DescendantOrSelf,
    Child {
        name: StepName,
        predicates: Vec<Predicate>,
    },
}

fn split_steps(path: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut depth = 0i32;
    let mut cur = String::new();
    for ch in path.chars() {
        match ch {
            '[' => {
                depth += 1;
                cur.push(ch);
            }
            ']' => {
                depth -= 1;
                cur.push(ch);
            }
            '/' if depth == 0 => {
                if !cur.is_empty() {
                    steps.push(std::mem::take(&mut cur));
                }
            }
            _ => cur.push(ch),
        }
    }
    if !cur.is_empty() {
        steps.push(cur);
    }
    steps
}

fn syntax_error(path: &str) -> Error {
    Error::new(ErrorKind::InvalidArg, format!("malformed path step: '{path}'"))
}

fn parse_single_predicate(inner: &str) -> Result<Predicate> {
    if let Ok(n) = inner.parse::<u64>() {
        return Ok(Predicate::Positional(n));
    }
    if let Some(rest) = inner.strip_prefix(".=") {
        return Ok(Predicate::SelfValue(rest.to_owned()));
    }
    if let Some((k, v)) = inner.split_once('=') {
        return Ok(Predicate::KeyValue(k.to_owned(), v.to_owned()));
    }
    Err(syntax_error(inner))
}

fn parse_predicates(mut s: &str) -> Result<Vec<Predicate>> {
    let mut out = Vec::new();
    while !s.is_empty() {
        if !s.starts_with('[') {
            return Err(syntax_error(s));
        }
        let end = s.find(']').ok_or_else(|| syntax_error(s))?;
        out.push(parse_single_predicate(&s[1..end])?);
        s = &s[end + 1..];
    }
    Ok(out)
}

fn parse_step(text: &str) -> Result<Step> {
    if text.is_empty() {
        return Err(syntax_error(text));
    }
    match text {
        "." => return Ok(Step::SelfStep),
        ".." => return Ok(Step::Parent),
        "..." => return Ok(Step::DescendantOrSelf),
        _ => {}
    }
    let bracket_pos = text.find('[');
    let (name_part, pred_part) = match bracket_pos {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    if name_part.is_empty() {
        return Err(syntax_error(text));
    }
    let name = if name_part == "*" {
        StepName::Wildcard
    } else {
        StepName::Named(name_part.to_owned())
    };
    let predicates = parse_predicates(pred_part)?;
    Ok(Step::Child { name, predicates })
}

fn parse(path: &str) -> Result<Vec<Step>> {
    split_steps(path).iter().map(|s| parse_step(s)).collect()
}

fn local_part(raw: &str) -> &str {
    raw.rsplit(':').next().unwrap_or(raw)
}

fn single_positional(predicates: &[Predicate]) -> Option<u64> {
    if predicates.len() == 1 {
        if let Predicate::Positional(n) = predicates[0] {
            return Some(n);
        }
    }
    None
}

fn key_value_predicates(predicates: &[Predicate]) -> Result<Vec<(String, String)>> {
    predicates
        .iter()
        .map(|p| match p {
            Predicate::KeyValue(k, v) => Ok((k.clone(), v.clone())),
            _ => Err(Error::new(
                ErrorKind::InvalidArg,
                "list predicates must be of the form [key=value]",
            )),
        })
        .collect()
}

fn scan_list_partial(
    node: &DataNode,
    schema_child: &SchemaNode,
    raw_preds: &[(String, String)],
) -> Result<Vec<DataNode>> {
    let mut out = Vec::new();
    'entries: for entry in node.children()? {
        if entry.schema().qualified_name() != schema_child.qualified_name() {
            continue;
        }
        for (pred_name, pred_value) in raw_preds {
            let key_leaf = match entry.child(&key::container_key(pred_name))? {
                Some(k) => k,
                None => continue 'entries,
            };
            let type_descriptor = key_leaf.schema().type_descriptor().cloned().ok_or_else(|| {
                Error::new(ErrorKind::SchemaMissing, "key leaf has no type descriptor")
            })?;
            let parsed = value::parse(&type_descriptor, pred_value)?;
            let actual = key_leaf
                .value()?
                .ok_or_else(|| Error::new(ErrorKind::MissingElement, "key leaf has no value"))?;
            if !value::equal(&parsed, &actual) {
                continue 'entries;
            }
        }
        out.push(entry);
    }
    Ok(out)
}

fn scan_leaf_list_predicates(
    node: &DataNode,
    schema_child: &SchemaNode,
    predicates: &[Predicate],
) -> Result<Vec<DataNode>> {
    let raw_value = predicates
        .iter()
        .find_map(|p| match p {
            Predicate::SelfValue(v) => Some(v.clone()),
            _ => None,
        })
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArg,
                "leaf-list predicates must be of the form [.=value]",
            )
        })?;
    let type_descriptor = schema_child.type_descriptor().ok_or_else(|| {
        Error::new(ErrorKind::SchemaMissing, "leaf-list has no type descriptor")
    })?;
    let parsed = value::parse(type_descriptor, &raw_value)?;
    let mut out = Vec::new();
    for entry in node.children()? {
        if entry.schema().qualified_name() != schema_child.qualified_name() {
            continue;
        }
        if let Some(v) = entry.value()? {
            if value::equal(&v, &parsed) {
                out.push(entry);
            }
        }
    }
    Ok(out)
}

/// `strict` controls what happens when `node`'s schema has no child named
/// `local_part(raw)`. A single explicit context (the first step, or any step
/// chained off one) treats that as a hard `SchemaMissing` error. Once a step
/// has fanned a context out across heterogeneous schemas (`*` or `...`), the
/// same miss on an individual candidate just means that candidate isn't a
/// match, so it's dropped rather than aborting the whole `find`.
fn match_children(
    node: &DataNode,
    name: &StepName,
    predicates: &[Predicate],
    strict: bool,
) -> Result<Vec<DataNode>> {
    match name {
        StepName::Wildcard => {
            if !predicates.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidArg,
                    "wildcard steps cannot carry predicates",
                )
                .with_path(node.path()));
            }
            node.children()
        }
        StepName::Named(raw) => {
            let local = local_part(raw);
            let schema_child = match node.schema().child(local).cloned() {
                Some(s) => s,
                None if strict => {
                    return Err(Error::new(
                        ErrorKind::SchemaMissing,
                        format!("no such schema child: {local}"),
                    )
                    .with_path(node.path()))
                }
                None => return Ok(Vec::new()),
            };
            if predicates.is_empty() {
                return Ok(node
                    .children()?
                    .into_iter()
                    .filter(|c| c.schema().qualified_name() == schema_child.qualified_name())
                    .collect());
            }
            if let Some(n) = single_positional(predicates) {
                let group: Vec<DataNode> = node
                    .children()?
                    .into_iter()
                    .filter(|c| c.schema().qualified_name() == schema_child.qualified_name())
                    .collect();
                return Ok(group.into_iter().nth(n as usize).into_iter().collect());
            }
            match schema_child.kind() {
                SchemaNodeKind::List => {
                    let raw_preds = key_value_predicates(predicates)?;
                    if key::has_full_key_coverage(&schema_child, &raw_preds) {
                        let entry_key = key::list_key_from_raw(&schema_child, &raw_preds)?;
                        Ok(node.child(&entry_key)?.into_iter().collect())
                    } else {
                        scan_list_partial(node, &schema_child, &raw_preds)
                    }
                }
                SchemaNodeKind::LeafList => scan_leaf_list_predicates(node, &schema_child, predicates),
                _ => Err(Error::new(
                    ErrorKind::InvalidArg,
                    "predicates are only valid on list/leaf-list steps",
                )
                .with_path(node.path())),
            }
        }
    }
}

fn apply_step(nodes: &[DataNode], step: &Step, strict: bool) -> Result<Vec<DataNode>> {
    match step {
        Step::SelfStep => Ok(nodes.to_vec()),
        Step::Parent => Ok(nodes.iter().filter_map(|n| n.parent()).collect()),
        Step::DescendantOrSelf => {
            let mut out = Vec::new();
            for n in nodes {
                collect_self_and_descendants(n, &mut out)?;
            }
            Ok(out)
        }
        Step::Child { name, predicates } => {
            let mut out = Vec::new();
            for n in nodes {
                out.extend(match_children(n, name, predicates, strict)?);
            }
            Ok(out)
        }
    }
}

fn collect_self_and_descendants(node: &DataNode, out: &mut Vec<DataNode>) -> Result<()> {
    out.push(node.clone());
    for child in node.children()? {
        collect_self_and_descendants(&child, out)?;
    }
    Ok(())
}

/// Evaluates `path` from `context`, returning every matching node
/// (`spec.md` §4.4). An empty result is not an error: it means the path is
/// well-formed and schema-valid but no instance data matches.
pub fn find(context: &DataNode, path: &str) -> Result<Vec<DataNode>> {
    let steps = parse(path)?;
    let mut current = vec![context.clone()];
    let mut strict = true;
    for step in &steps {
        current = apply_step(&current, step, strict)?;
        if matches!(
            step,
            Step::DescendantOrSelf | Step::Child { name: StepName::Wildcard, .. }
        ) {
            strict = false;
        }
        if current.is_empty() {
            break;
        }
    }
    Ok(current)
}

/// Single-child convenience: no wildcards, no predicates beyond a full key.
pub fn get(node: &DataNode, key: &str) -> Result<Option<DataNode>> {
    node.child(key)
}

fn lookup_step(node: &DataNode, step: &Step) -> Result<DataNode> {
    match step {
        Step::SelfStep => Ok(node.clone()),
        Step::Parent => node.parent().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArg, "root has no parent").with_path(node.path())
        }),
        Step::DescendantOrSelf => Err(Error::new(
            ErrorKind::InvalidArg,
            "Lookup requires a concrete path; '...' is not allowed",
        )
        .with_path(node.path())),
        Step::Child { name, predicates } => {
            let raw = match name {
                StepName::Named(raw) => raw,
                StepName::Wildcard => {
                    return Err(Error::new(
                        ErrorKind::InvalidArg,
                        "Lookup requires a concrete path; '*' is not allowed",
                    )
                    .with_path(node.path()))
                }
            };
            let local = local_part(raw);
            let schema_child = node.schema().child(local).cloned().ok_or_else(|| {
                Error::new(
                    ErrorKind::SchemaMissing,
                    format!("no such schema child: {local}"),
                )
                .with_path(node.path())
            })?;
            match schema_child.kind() {
                SchemaNodeKind::List => {
                    let raw_preds = key_value_predicates(predicates)?;
                    let entry_key = key::list_key_from_raw(&schema_child, &raw_preds)?;
                    if let Some(existing) = node.child(&entry_key)? {
                        return Ok(existing);
                    }
                    let mut key_values = Vec::with_capacity(raw_preds.len());
                    for (name, raw_value) in &raw_preds {
                        let key_schema = schema_child.child(name).cloned().ok_or_else(|| {
                            Error::new(
                                ErrorKind::SchemaMissing,
                                format!("no such key leaf: {name}"),
                            )
                        })?;
                        let type_descriptor = key_schema.type_descriptor().cloned().ok_or_else(|| {
                            Error::new(ErrorKind::SchemaMissing, "key leaf has no type descriptor")
                        })?;
                        key_values.push((name.clone(), value::parse(&type_descriptor, raw_value)?));
                    }
                    node.new_list_entry(schema_child, key_values, None)
                }
                SchemaNodeKind::LeafList => {
                    let raw_value = predicates
                        .iter()
                        .find_map(|p| match p {
                            Predicate::SelfValue(v) => Some(v.clone()),
                            _ => None,
                        })
                        .ok_or_else(|| {
                            Error::new(
                                ErrorKind::InvalidArg,
                                "leaf-list Lookup requires a [.=value] predicate",
                            )
                        })?;
                    let type_descriptor = schema_child.type_descriptor().ok_or_else(|| {
                        Error::new(ErrorKind::SchemaMissing, "leaf-list has no type descriptor")
                    })?;
                    let parsed = value::parse(type_descriptor, &raw_value)?;
                    for entry in node.children()? {
                        if entry.schema().qualified_name() == schema_child.qualified_name() {
                            if let Some(v) = entry.value()? {
                                if value::equal(&v, &parsed) {
                                    return Ok(entry);
                                }
                            }
                        }
                    }
                    node.new_leaf_list_entry(schema_child, parsed, None)
                }
                SchemaNodeKind::Leaf => {
                    let entry_key = key::container_key(schema_child.local_name());
                    node.child(&entry_key)?.ok_or_else(|| {
                        Error::new(
                            ErrorKind::DataMissing,
                            "Lookup cannot synthesise a leaf without a value; use the Edit Engine",
                        )
                        .with_path(node.path())
                    })
                }
                _ => {
                    let entry_key = key::container_key(schema_child.local_name());
                    if let Some(existing) = node.child(&entry_key)? {
                        return Ok(existing);
                    }
                    node.new_container_child(schema_child)
                }
            }
        }
    }
}

/// Creates every missing intermediate node along a concrete (non-wildcard)
/// path and returns the leaf-most node (`spec.md` §4.4).
pub fn lookup(context: &DataNode, path: &str) -> Result<DataNode> {
    let steps = parse(path)?;
    let mut current = context.clone();
    for step in &steps {
        current = lookup_step(&current, step)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Tree, TreeOptions};
    use crate::schema::{OrderedBy, SchemaBuilder};
    use crate::value::{TypeDescriptor, TypeKind};
    use crate::value::Value;

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
        let items = SchemaBuilder::new("sample", "items", SchemaNodeKind::LeafList)
            .type_descriptor(TypeDescriptor::new(TypeKind::String {
                length: None,
                pattern: None,
            }))
            .ordered_by(OrderedBy::User)
            .build();
        SchemaBuilder::new("sample", "sample", SchemaNodeKind::Container)
            .child(list_entry_schema)
            .child(items)
            .build()
    }

    fn build_tree() -> Tree {
        let tree = Tree::new(sample_root(), TreeOptions::default());
        let root = tree.root();
        let list_schema = root.schema().child("single-key-list").unwrap().clone();
        for (k, payload) in [("A", "one"), ("B", "two")] {
            let entry = root
                .new_list_entry(
                    list_schema.clone(),
                    vec![("list-key".to_owned(), Value::String(k.to_owned()))],
                    None,
                )
                .unwrap();
            let payload_schema = entry.schema().child("payload").unwrap().clone();
            entry
                .new_leaf_child(payload_schema, Value::String(payload.to_owned()))
                .unwrap();
        }
        let items_schema = root.schema().child("items").unwrap().clone();
        for v in ["x", "y"] {
            root.new_leaf_list_entry(items_schema.clone(), Value::String(v.to_owned()), None)
                .unwrap();
        }
        tree
    }

    #[test]
    fn find_full_key_returns_single_entry() {
        let tree = build_tree();
        let found = find(&tree.root(), "single-key-list[list-key=A]/payload").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value().unwrap(), Some(Value::String("one".to_owned())));
    }

    #[test]
    fn find_wildcard_descendant_or_self_reaches_deep_nodes() {
        let tree = build_tree();
        let found = find(&tree.root(), ".../payload").unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn find_leaf_list_by_value() {
        let tree = build_tree();
        let found = find(&tree.root(), "items[.=y]").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value().unwrap(), Some(Value::String("y".to_owned())));
    }

    #[test]
    fn find_unknown_schema_child_is_schema_missing() {
        let tree = build_tree();
        let err = find(&tree.root(), "no-such-child").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SchemaMissing);
    }

    #[test]
    fn lookup_synthesises_missing_list_entry() {
        let tree = build_tree();
        let entry = lookup(&tree.root(), "single-key-list[list-key=C]").unwrap();
        assert_eq!(entry.path(), "/sample:sample/single-key-list[list-key=C]");
        assert_eq!(tree.root().children().unwrap().len(), 4);
    }

    #[test]
    fn lookup_is_idempotent_on_existing_entry() {
        let tree = build_tree();
        let first = lookup(&tree.root(), "single-key-list[list-key=A]").unwrap();
        let second = lookup(&tree.root(), "single-key-list[list-key=A]").unwrap();
        assert!(first.equal(&second).unwrap());
    }
}
