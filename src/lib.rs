//
// Copyright (c) The yangtree Contributors
//
// SPDX-License-Identifier: MIT
//

//! A schema-driven, in-memory configuration/state tree engine for YANG
//! (RFC 7950), modelled on the wire formats and edit semantics of
//! NETCONF (RFC 6241) and RESTCONF (RFC 7951).
//!
//! The engine is built in layers, each in its own module:
//!
//! - [`schema`]: the immutable, `Rc`-shared schema tree YANG modules
//!   compile down to.
//! - [`value`]: parsing, canonicalisation, and comparison of leaf values
//!   against YANG's built-in types.
//! - [`key`]: canonical child-key computation, the engine's sole identity
//!   scheme for a child inside its parent.
//! - [`node`]: the data tree itself — [`node::Tree`] and its
//!   [`node::DataNode`] handles.
//! - [`path`]: the `Find`/`Get`/`Lookup` path grammar.
//! - [`edit`]: NETCONF-style `edit-config` semantics with atomic rollback.
//! - [`traverse`]: depth-bounded subtree walks and `FindAll`.
//! - [`codec`]: JSON (plain and RFC 7951), YAML, and XML marshalling and
//!   unmarshalling.

pub mod codec;
pub mod edit;
pub mod error;
pub mod key;
pub mod node;
pub mod path;
pub mod schema;
pub mod traverse;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use node::{DataNode, InsertHint, NodeKind, Tree, TreeOptions};
pub use schema::{
    Cardinality, Constraint, OrderedBy, SchemaBuilder, SchemaNode, SchemaNodeKind, SchemaProvider,
    SharedSchemaProvider, StaticSchema,
};
pub use value::{TypeDescriptor, TypeKind, Value};
