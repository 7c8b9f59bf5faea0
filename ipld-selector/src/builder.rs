//! Programmatic construction of selectors in their wire shape.
//!
//! ```
//! use ipld_selector::builder::{explore_fields, explore_all, matcher};
//!
//! let spec = explore_fields(|f| {
//!     f.insert("children", explore_all(matcher()));
//! });
//! let selector = spec.selector().unwrap();
//! assert_eq!(selector.kind().as_str(), "ExploreFields");
//! ```

use ipld_data_model::{Node, Path};

use crate::keys;
use crate::parse::{ParseError, parse};
use crate::recursive::RecursionLimit;
use crate::selector::Selector;
use crate::serialize::{empty, limit_to_node};

/// An uncompiled selector: the node a selector would be exchanged as.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorSpec(Node);

impl SelectorSpec {
    pub fn node(&self) -> &Node {
        &self.0
    }

    pub fn into_node(self) -> Node {
        self.0
    }

    pub fn selector(&self) -> Result<Selector, ParseError> {
        parse(&self.0)
    }
}

impl From<SelectorSpec> for Node {
    fn from(spec: SelectorSpec) -> Self {
        spec.0
    }
}

fn keyed(key: &str, body: Node) -> SelectorSpec {
    SelectorSpec(Node::map([(key, body)]))
}

pub fn matcher() -> SelectorSpec {
    keyed(keys::MATCHER, empty())
}

pub fn explore_all(next: SelectorSpec) -> SelectorSpec {
    keyed(keys::EXPLORE_ALL, Node::map([(keys::NEXT, next.0)]))
}

pub fn explore_index(index: i64, next: SelectorSpec) -> SelectorSpec {
    keyed(
        keys::EXPLORE_INDEX,
        Node::map([(keys::INDEX, Node::Int(index)), (keys::NEXT, next.0)]),
    )
}

pub fn explore_range(start: i64, end: i64, next: SelectorSpec) -> SelectorSpec {
    keyed(
        keys::EXPLORE_RANGE,
        Node::map([
            (keys::START, Node::Int(start)),
            (keys::END, Node::Int(end)),
            (keys::NEXT, next.0),
        ]),
    )
}

pub fn explore_union(members: impl IntoIterator<Item = SelectorSpec>) -> SelectorSpec {
    keyed(
        keys::EXPLORE_UNION,
        Node::list(members.into_iter().map(|member| member.0)),
    )
}

pub fn explore_recursive(limit: RecursionLimit, sequence: SelectorSpec) -> SelectorSpec {
    keyed(
        keys::EXPLORE_RECURSIVE,
        Node::map([(keys::LIMIT, limit_to_node(limit)), (keys::SEQUENCE, sequence.0)]),
    )
}

pub fn explore_recursive_edge() -> SelectorSpec {
    keyed(keys::EXPLORE_RECURSIVE_EDGE, empty())
}

#[derive(Debug, Default)]
pub struct FieldsBuilder {
    fields: Vec<(String, Node)>,
}

impl FieldsBuilder {
    pub fn insert(&mut self, name: impl Into<String>, next: SelectorSpec) -> &mut Self {
        self.fields.push((name.into(), next.0));
        self
    }
}

pub fn explore_fields(build: impl FnOnce(&mut FieldsBuilder)) -> SelectorSpec {
    let mut fields = FieldsBuilder::default();
    build(&mut fields);
    keyed(
        keys::EXPLORE_FIELDS,
        Node::map([(keys::FIELDS, Node::Map(fields.fields))]),
    )
}

/// Matches the node the selector is applied to and nothing else.
pub fn match_point() -> SelectorSpec {
    matcher()
}

/// Enters every reachable node without matching any.
pub fn explore_all_recursively() -> SelectorSpec {
    explore_recursive(
        RecursionLimit::Unbounded,
        explore_all(explore_recursive_edge()),
    )
}

/// Matches every reachable node, the starting node included.
pub fn match_all_recursively() -> SelectorSpec {
    explore_recursive(
        RecursionLimit::Unbounded,
        explore_union([matcher(), explore_all(explore_recursive_edge())]),
    )
}

/// Follows `path` one field at a time, then applies `subselector` (a
/// [`matcher`] by default) at its end. With `match_path` every node along
/// the way is matched too.
pub fn from_path(path: &Path, match_path: bool, subselector: Option<SelectorSpec>) -> SelectorSpec {
    let mut spec = subselector.unwrap_or_else(matcher);
    for segment in path.segments().iter().rev() {
        let step = explore_fields(|f| {
            f.insert(segment.as_key(), spec);
        });
        spec = if match_path {
            explore_union([matcher(), step])
        } else {
            step
        };
    }
    spec
}
