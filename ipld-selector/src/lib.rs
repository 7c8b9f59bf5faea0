//! Selectors over IPLD-style node graphs.
//!
//! A selector is compiled from its wire form with [`parse`] (or built with
//! [`builder`]) and then driven over a [`Node`] by a [`Walker`], which reports
//! every node the selector enters or matches.
//!
//! ```
//! use ipld_data_model::Node;
//! use ipld_selector::{parse_json, walk_matching};
//!
//! let selector = parse_json(r#"{"i": {"i": 2, ">": {".": {}}}}"#).unwrap();
//! let data = Node::list([Node::Int(9), Node::Int(8), Node::Int(7)]);
//! let mut found = Vec::new();
//! walk_matching(&data, &selector, |progress, node| {
//!     found.push((progress.path().to_string(), node.clone()));
//!     Ok(())
//! })
//! .unwrap();
//! assert_eq!(found, [("2".to_owned(), Node::Int(7))]);
//! ```

use ipld_data_model::{Format, Node};
use ipld_format_json::DagJson;

pub mod builder;
mod config;
pub mod keys;
mod loader;
mod parse;
mod recursive;
mod selector;
mod serialize;
mod walk;

pub use config::{Budget, BudgetKind, WalkConfig};
pub use loader::{LinkLoader, LoadError, MemoryLoader};
pub use parse::{ParseError, parse};
pub use recursive::{ExploreRecursive, RecursionLimit};
pub use selector::{
    ExploreAll, ExploreFields, ExploreIndex, ExploreRange, ExploreUnion, Selector, SelectorKind,
};
pub use walk::{LastBlock, Progress, VisitReason, WalkError, Walker, get, walk, walk_matching};

#[derive(Debug, thiserror::Error)]
pub enum JsonSelectorError {
    #[error("{}", .0.first().map(|e| e.message.as_str()).unwrap_or("invalid DAG-JSON"))]
    Decode(Vec<ipld_data_model::ParseError>),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Decodes DAG-JSON text and compiles the selector it holds.
pub fn parse_json(source: &str) -> Result<Selector, JsonSelectorError> {
    let node: Node = DagJson
        .decode(source, "selector.json")
        .map_err(JsonSelectorError::Decode)?;
    Ok(parse(&node)?)
}
