use std::collections::HashSet;

use ipld_data_model::{Kind, Node};

use crate::keys;
use crate::recursive::{ExploreRecursive, RecursionLimit};
use crate::selector::{
    ExploreAll, ExploreFields, ExploreIndex, ExploreRange, ExploreUnion, Selector, SelectorKind,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("selector spec parse rejected: selector must be a Map, found {found}")]
    NotAMap { found: Kind },
    #[error(
        "selector spec parse rejected: selector is a keyed union and thus must be a map with a single entry, found {len} entries"
    )]
    NotSingleEntry { len: usize },
    #[error("selector spec parse rejected: unknown selector key {key:?}")]
    UnknownSelector { key: String },
    #[error("selector spec parse rejected: {selector} body must be a {expected}, found {found}")]
    InvalidBody {
        selector: SelectorKind,
        expected: Kind,
        found: Kind,
    },
    #[error("selector spec parse rejected: {selector} is missing field {field} (key {key:?})")]
    MissingField {
        selector: SelectorKind,
        field: &'static str,
        key: &'static str,
    },
    #[error("selector spec parse rejected: {field} of {selector} must be a {expected}, found {found}")]
    InvalidFieldKind {
        selector: SelectorKind,
        field: &'static str,
        expected: Kind,
        found: Kind,
    },
    #[error("selector spec parse rejected: {field} of {selector} must be non-negative, found {value}")]
    Negative {
        selector: SelectorKind,
        field: &'static str,
        value: i64,
    },
    #[error("selector spec parse rejected: end of ExploreRange must be greater than start, found {start}..{end}")]
    EmptyRange { start: i64, end: i64 },
    #[error("selector spec parse rejected: field {name:?} must map to a selector or true, found {found}")]
    InvalidFieldValue { name: String, found: Kind },
    #[error("selector spec parse rejected: field {name:?} selected more than once")]
    DuplicateField { name: String },
    #[error("selector spec parse rejected: ExploreUnion must have at least one member")]
    EmptyUnion,
    #[error("selector spec parse rejected: limit of ExploreRecursive must be a Map, found {found}")]
    LimitNotAMap { found: Kind },
    #[error(
        "selector spec parse rejected: limit of ExploreRecursive is a keyed union and thus must be a map with a single entry, found {len} entries"
    )]
    LimitNotSingleEntry { len: usize },
    #[error("selector spec parse rejected: unknown recursion limit {key:?}")]
    UnknownLimit { key: String },
    #[error("selector spec parse rejected: ExploreRecursive must have at least one ExploreRecursiveEdge")]
    MissingRecursiveEdge,
    #[error("selector spec parse rejected: ExploreRecursiveEdge must be beneath ExploreRecursive")]
    EdgeOutsideRecursion,
}

/// Compiles the wire form of a selector.
pub fn parse(node: &Node) -> Result<Selector, ParseError> {
    let mut context = ParseContext::default();
    let selector = context.parse_selector(node);
    match &selector {
        Ok(selector) => log::debug!("compiled {} selector", selector.kind()),
        Err(e) => log::debug!("{e}"),
    }
    selector
}

/// One edge counter per `ExploreRecursive` being parsed. An edge belongs to
/// the innermost recursion enclosing it.
#[derive(Default)]
struct ParseContext {
    edge_counts: Vec<usize>,
}

impl ParseContext {
    fn parse_selector(&mut self, node: &Node) -> Result<Selector, ParseError> {
        let entries = node
            .as_map()
            .ok_or(ParseError::NotAMap { found: node.kind() })?;
        let [(key, body)] = entries else {
            return Err(ParseError::NotSingleEntry { len: entries.len() });
        };

        match key.as_str() {
            keys::MATCHER => {
                expect_map(SelectorKind::Matcher, body)?;
                Ok(Selector::Matcher)
            }
            keys::EXPLORE_ALL => {
                let kind = SelectorKind::ExploreAll;
                expect_map(kind, body)?;
                let next = self.parse_selector(field(kind, body, keys::NEXT, "next")?)?;
                Ok(Selector::ExploreAll(ExploreAll::new(next)))
            }
            keys::EXPLORE_FIELDS => self.parse_explore_fields(body),
            keys::EXPLORE_INDEX => {
                let kind = SelectorKind::ExploreIndex;
                expect_map(kind, body)?;
                let index = non_negative(kind, body, keys::INDEX, "index")?;
                let next = self.parse_selector(field(kind, body, keys::NEXT, "next")?)?;
                Ok(Selector::ExploreIndex(ExploreIndex::new(index, next)))
            }
            keys::EXPLORE_RANGE => {
                let kind = SelectorKind::ExploreRange;
                expect_map(kind, body)?;
                let start = non_negative(kind, body, keys::START, "start")?;
                let end = non_negative(kind, body, keys::END, "end")?;
                if end <= start {
                    return Err(ParseError::EmptyRange { start, end });
                }
                let next = self.parse_selector(field(kind, body, keys::NEXT, "next")?)?;
                Ok(Selector::ExploreRange(ExploreRange::new(start, end, next)))
            }
            keys::EXPLORE_UNION => {
                let members = body.as_list().ok_or(ParseError::InvalidBody {
                    selector: SelectorKind::ExploreUnion,
                    expected: Kind::List,
                    found: body.kind(),
                })?;
                if members.is_empty() {
                    return Err(ParseError::EmptyUnion);
                }
                let members = members
                    .iter()
                    .map(|member| self.parse_selector(member))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Selector::ExploreUnion(ExploreUnion::new(members)))
            }
            keys::EXPLORE_RECURSIVE => self.parse_explore_recursive(body),
            keys::EXPLORE_RECURSIVE_EDGE => {
                expect_map(SelectorKind::ExploreRecursiveEdge, body)?;
                let count = self
                    .edge_counts
                    .last_mut()
                    .ok_or(ParseError::EdgeOutsideRecursion)?;
                *count += 1;
                Ok(Selector::ExploreRecursiveEdge)
            }
            other => Err(ParseError::UnknownSelector {
                key: other.to_owned(),
            }),
        }
    }

    fn parse_explore_fields(&mut self, body: &Node) -> Result<Selector, ParseError> {
        let kind = SelectorKind::ExploreFields;
        expect_map(kind, body)?;
        let fields = field(kind, body, keys::FIELDS, "fields")?;
        let fields = fields.as_map().ok_or(ParseError::InvalidFieldKind {
            selector: kind,
            field: "fields",
            expected: Kind::Map,
            found: fields.kind(),
        })?;

        let mut seen = HashSet::new();
        let mut selections = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            if !seen.insert(name.as_str()) {
                return Err(ParseError::DuplicateField { name: name.clone() });
            }
            let selector = match value {
                Node::Bool(true) => Selector::Matcher,
                Node::Map(_) => self.parse_selector(value)?,
                other => {
                    return Err(ParseError::InvalidFieldValue {
                        name: name.clone(),
                        found: other.kind(),
                    });
                }
            };
            selections.push((name.clone(), selector));
        }
        Ok(Selector::ExploreFields(ExploreFields::new(selections)))
    }

    fn parse_explore_recursive(&mut self, body: &Node) -> Result<Selector, ParseError> {
        let kind = SelectorKind::ExploreRecursive;
        expect_map(kind, body)?;
        let limit = body
            .lookup(keys::LIMIT)
            .or_else(|| body.lookup(keys::LIMIT_ALT))
            .ok_or(ParseError::MissingField {
                selector: kind,
                field: "limit",
                key: keys::LIMIT,
            })?;
        let limit = parse_limit(limit)?;
        let sequence = field(kind, body, keys::SEQUENCE, "sequence")?;

        self.edge_counts.push(0);
        let sequence = self.parse_selector(sequence);
        let edges = self.edge_counts.pop().unwrap_or_default();
        let sequence = sequence?;
        if edges == 0 {
            return Err(ParseError::MissingRecursiveEdge);
        }
        log::trace!("recursion with {edges} edge(s), limit {limit:?}");

        Ok(Selector::ExploreRecursive(ExploreRecursive::new(
            sequence, limit,
        )))
    }
}

fn parse_limit(node: &Node) -> Result<RecursionLimit, ParseError> {
    let entries = node
        .as_map()
        .ok_or(ParseError::LimitNotAMap { found: node.kind() })?;
    let [(key, value)] = entries else {
        return Err(ParseError::LimitNotSingleEntry { len: entries.len() });
    };
    match key.as_str() {
        keys::LIMIT_DEPTH | keys::LIMIT_DEPTH_ALT => {
            let depth = int_value(SelectorKind::ExploreRecursive, "limit", value)?;
            Ok(RecursionLimit::Depth(depth as u64))
        }
        keys::LIMIT_NONE => Ok(RecursionLimit::Unbounded),
        other => Err(ParseError::UnknownLimit {
            key: other.to_owned(),
        }),
    }
}

fn expect_map(selector: SelectorKind, body: &Node) -> Result<(), ParseError> {
    match body.kind() {
        Kind::Map => Ok(()),
        found => Err(ParseError::InvalidBody {
            selector,
            expected: Kind::Map,
            found,
        }),
    }
}

fn field<'n>(
    selector: SelectorKind,
    body: &'n Node,
    key: &'static str,
    name: &'static str,
) -> Result<&'n Node, ParseError> {
    body.lookup(key).ok_or(ParseError::MissingField {
        selector,
        field: name,
        key,
    })
}

fn non_negative(
    selector: SelectorKind,
    body: &Node,
    key: &'static str,
    name: &'static str,
) -> Result<i64, ParseError> {
    int_value(selector, name, field(selector, body, key, name)?)
}

fn int_value(selector: SelectorKind, name: &'static str, value: &Node) -> Result<i64, ParseError> {
    let value = value.as_i64().ok_or(ParseError::InvalidFieldKind {
        selector,
        field: name,
        expected: Kind::Int,
        found: value.kind(),
    })?;
    if value < 0 {
        return Err(ParseError::Negative {
            selector,
            field: name,
            value,
        });
    }
    Ok(value)
}
