//! # meshfind - Find/Hide expressions for service-mesh graphs
//!
//! meshfind compiles the small expression language typed into a topology
//! graph's find and hide boxes (`app != details and version=v1`, `!sc`,
//! `rt > 500`) and applies it to a live graph: find highlights matches,
//! hide makes them and their dependents disappear, reversibly.
//!
//! ## Architecture
//!
//! - [`query`] - Tokenizer, splitter, operand compiler and query assembly
//! - [`graph`] - The graph handle the appliers work against, plus an
//!   in-memory implementation
//! - [`apply`] - Find marking and hide/compress with undo state
//! - [`session`] - Find/hide slot coordinator for a host UI
//! - [`config`] - Persisted settings
//! - [`output`] - Terminal and JSON rendering
//!
//! ## Quick Start
//!
//! ```
//! use meshfind::apply::{apply_find, apply_hide};
//! use meshfind::graph::MemoryGraph;
//! use meshfind::query::compile;
//! use serde_json::json;
//!
//! let mut graph = MemoryGraph::new();
//! graph.add_node("details", json!({ "app": "details", "version": "v1" })).unwrap();
//! graph.add_node("reviews", json!({ "app": "reviews", "version": "v1" })).unwrap();
//!
//! let query = compile("app != details and version=v1").unwrap();
//! let marked = apply_find(query.as_ref(), &mut graph);
//! assert_eq!(marked.len(), 1);
//!
//! // hide, then clear to undo
//! let state = apply_hide(query.as_ref(), false, &mut graph, None);
//! apply_hide(None, false, &mut graph, Some(state));
//! ```

pub mod apply;
pub mod config;
pub mod graph;
pub mod output;
pub mod query;
pub mod session;
