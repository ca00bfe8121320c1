//! An RFC 8341 NACM (Network Configuration Access Control Model)
//! authorization engine.
//!
//! This crate decides, for one request at a time, whether a user may
//! invoke an RPC/action, write a data-tree node, or read a data-tree
//! node — given a parsed NACM policy. It owns none of the surrounding
//! machinery: the data tree, the YANG schema, the transport, and the
//! policy's storage format are all supplied by the host through the
//! [`tree::DataTree`]/[`tree::Schema`] traits and a [`policy::Policy`]
//! value.
//!
//! ```text
//! policy::load_xml(xml)?  →  Policy
//!                              │
//!     eval::evaluate_rpc(&request, &policy)        → Verdict
//!     eval::evaluate_write(&tree, &schema, .., &policy) → Verdict
//!     eval::evaluate_read(&mut tree, &schema, .., &policy) → ()  (tree pruned in place)
//! ```
//!
//! See [`policy`] for the data model, [`tree`] for the data-tree/schema
//! collaborator contracts (plus a reference in-memory implementation in
//! [`tree::memory`]), and [`eval`] for the three entry points.

pub mod cache;
pub mod error;
pub mod eval;
pub mod matcher;
pub mod policy;
pub mod request;
pub mod tree;

pub use error::{AccessDenied, CollaboratorError, NacmError};
pub use eval::{evaluate_read, evaluate_rpc, evaluate_write};
pub use policy::{AccessMode, AccessOps, DefaultKind, Group, Policy, Rule, RuleEffect, RuleList};
pub use request::{RpcRequest, Verdict, WriteAccess};
pub use tree::{DataTree, NodeFlag, NsContext, Schema};
