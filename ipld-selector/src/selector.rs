use std::fmt;
use std::sync::Arc;

use ipld_data_model::{Kind, Node, PathSegment};

use crate::recursive::ExploreRecursive;

/// A compiled selector.
///
/// Selectors are immutable values. [`Selector::explore`] never mutates the
/// selector it is called on; it returns the selector to apply to the child.
/// Children are held behind [`Arc`], so those returned values are cheap to
/// produce and a compiled tree can be shared between threads.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Marks the node it reaches as a result.
    Matcher,
    ExploreAll(ExploreAll),
    ExploreFields(ExploreFields),
    ExploreIndex(ExploreIndex),
    ExploreRange(ExploreRange),
    ExploreUnion(ExploreUnion),
    ExploreRecursive(ExploreRecursive),
    /// Loop-back point of the nearest enclosing [`ExploreRecursive`]. Inert on its own.
    ExploreRecursiveEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectorKind {
    Matcher,
    ExploreAll,
    ExploreFields,
    ExploreIndex,
    ExploreRange,
    ExploreUnion,
    ExploreRecursive,
    ExploreRecursiveEdge,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Matcher => "Matcher",
            SelectorKind::ExploreAll => "ExploreAll",
            SelectorKind::ExploreFields => "ExploreFields",
            SelectorKind::ExploreIndex => "ExploreIndex",
            SelectorKind::ExploreRange => "ExploreRange",
            SelectorKind::ExploreUnion => "ExploreUnion",
            SelectorKind::ExploreRecursive => "ExploreRecursive",
            SelectorKind::ExploreRecursiveEdge => "ExploreRecursiveEdge",
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Selector {
    pub fn kind(&self) -> SelectorKind {
        match self {
            Selector::Matcher => SelectorKind::Matcher,
            Selector::ExploreAll(_) => SelectorKind::ExploreAll,
            Selector::ExploreFields(_) => SelectorKind::ExploreFields,
            Selector::ExploreIndex(_) => SelectorKind::ExploreIndex,
            Selector::ExploreRange(_) => SelectorKind::ExploreRange,
            Selector::ExploreUnion(_) => SelectorKind::ExploreUnion,
            Selector::ExploreRecursive(_) => SelectorKind::ExploreRecursive,
            Selector::ExploreRecursiveEdge => SelectorKind::ExploreRecursiveEdge,
        }
    }

    /// Child segments this selector can act on, for a container holding `len`
    /// children.
    ///
    /// `None` means any child may matter and the container must be enumerated.
    /// `Some` is exhaustive: [`Selector::explore`] returns `None` for every
    /// segment not listed. Entries may repeat. Ranges are cut off at `len`, so
    /// the list never outgrows the container times the number of members.
    pub fn interests(&self, len: usize) -> Option<Vec<PathSegment>> {
        match self {
            Selector::Matcher | Selector::ExploreRecursiveEdge => Some(Vec::new()),
            Selector::ExploreAll(_) => None,
            Selector::ExploreFields(s) => Some(s.interests()),
            Selector::ExploreIndex(s) => Some(vec![PathSegment::Index(s.index)]),
            Selector::ExploreRange(s) => Some(s.interests(len)),
            Selector::ExploreUnion(s) => s.interests(len),
            Selector::ExploreRecursive(s) => s.current().interests(len),
        }
    }

    /// Selector to apply to the child of `node` at `segment`, or `None` when
    /// that child is not of interest. `node` is the container being explored.
    pub fn explore(&self, node: &Node, segment: &PathSegment) -> Option<Selector> {
        match self {
            Selector::Matcher | Selector::ExploreRecursiveEdge => None,
            Selector::ExploreAll(s) => Some(Selector::clone(&s.next)),
            Selector::ExploreFields(s) => s.explore(segment),
            Selector::ExploreIndex(s) => {
                if node.kind() != Kind::List || segment.index() != Some(s.index) {
                    return None;
                }
                Some(Selector::clone(&s.next))
            }
            Selector::ExploreRange(s) => {
                if node.kind() != Kind::List {
                    return None;
                }
                let index = segment.index()?;
                (s.start..s.end)
                    .contains(&index)
                    .then(|| Selector::clone(&s.next))
            }
            Selector::ExploreUnion(s) => s.explore(node, segment),
            Selector::ExploreRecursive(s) => s.explore(node, segment),
        }
    }

    /// Whether `node` is a result of this selector.
    pub fn decide(&self, node: &Node) -> bool {
        match self {
            Selector::Matcher => true,
            Selector::ExploreUnion(s) => s.members.iter().any(|member| member.decide(node)),
            Selector::ExploreRecursive(s) => s.current().decide(node),
            Selector::ExploreAll(_)
            | Selector::ExploreFields(_)
            | Selector::ExploreIndex(_)
            | Selector::ExploreRange(_)
            | Selector::ExploreRecursiveEdge => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreAll {
    pub(crate) next: Arc<Selector>,
}

impl ExploreAll {
    pub(crate) fn new(next: Selector) -> Self {
        Self {
            next: Arc::new(next),
        }
    }

    pub fn next(&self) -> &Selector {
        &self.next
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreFields {
    /// In declaration order; names are unique.
    pub(crate) selections: Arc<[(String, Selector)]>,
}

impl ExploreFields {
    pub(crate) fn new(selections: Vec<(String, Selector)>) -> Self {
        Self {
            selections: selections.into(),
        }
    }

    pub fn selections(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.selections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn get(&self, name: &str) -> Option<&Selector> {
        self.selections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    fn interests(&self) -> Vec<PathSegment> {
        self.selections
            .iter()
            .map(|(name, _)| PathSegment::String(name.clone()))
            .collect()
    }

    fn explore(&self, segment: &PathSegment) -> Option<Selector> {
        self.get(&segment.as_key()).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreIndex {
    pub(crate) next: Arc<Selector>,
    pub(crate) index: i64,
}

impl ExploreIndex {
    pub(crate) fn new(index: i64, next: Selector) -> Self {
        Self {
            next: Arc::new(next),
            index,
        }
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    pub fn next(&self) -> &Selector {
        &self.next
    }
}

/// Applies `next` to every list index in `start..end`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreRange {
    pub(crate) next: Arc<Selector>,
    pub(crate) start: i64,
    pub(crate) end: i64,
}

impl ExploreRange {
    pub(crate) fn new(start: i64, end: i64, next: Selector) -> Self {
        Self {
            next: Arc::new(next),
            start,
            end,
        }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn next(&self) -> &Selector {
        &self.next
    }

    fn interests(&self, len: usize) -> Vec<PathSegment> {
        let end = self.end.min(i64::try_from(len).unwrap_or(i64::MAX));
        (self.start..end).map(PathSegment::Index).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExploreUnion {
    pub(crate) members: Arc<[Selector]>,
}

impl ExploreUnion {
    pub(crate) fn new(members: Vec<Selector>) -> Self {
        Self {
            members: members.into(),
        }
    }

    pub fn members(&self) -> &[Selector] {
        &self.members
    }

    /// No members is nothing, one member stands for itself.
    pub(crate) fn collapse(mut members: Vec<Selector>) -> Option<Selector> {
        match members.len() {
            0 => None,
            1 => members.pop(),
            _ => Some(Selector::ExploreUnion(ExploreUnion::new(members))),
        }
    }

    fn interests(&self, len: usize) -> Option<Vec<PathSegment>> {
        let mut interests = Vec::new();
        for member in self.members.iter() {
            interests.extend(member.interests(len)?);
        }
        Some(interests)
    }

    fn explore(&self, node: &Node, segment: &PathSegment) -> Option<Selector> {
        let results = self
            .members
            .iter()
            .filter_map(|member| member.explore(node, segment))
            .collect();
        ExploreUnion::collapse(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recursive::RecursionLimit;

    fn list(len: i64) -> Node {
        Node::list((0..len).map(Node::Int))
    }

    fn fields(names: &[&str]) -> Selector {
        Selector::ExploreFields(ExploreFields::new(
            names
                .iter()
                .map(|name| (name.to_string(), Selector::Matcher))
                .collect(),
        ))
    }

    #[test]
    fn test_matcher_is_terminal() {
        let node = list(2);
        assert!(Selector::Matcher.decide(&node));
        assert_eq!(Selector::Matcher.explore(&node, &0usize.into()), None);
        assert_eq!(Selector::Matcher.interests(2), Some(vec![]));
    }

    #[test]
    fn test_explore_all_ignores_segment() {
        let selector = Selector::ExploreAll(ExploreAll::new(Selector::Matcher));
        let node = Node::map([("x", Node::Int(1))]);
        assert_eq!(selector.explore(&node, &"x".into()), Some(Selector::Matcher));
        assert_eq!(selector.explore(&node, &"other".into()), Some(Selector::Matcher));
        assert!(!selector.decide(&node));
        assert_eq!(selector.interests(1), None);
    }

    #[test]
    fn test_explore_fields_by_name() {
        let selector = fields(&["a", "0"]);
        let node = Node::map([("a", Node::Null)]);
        assert_eq!(selector.explore(&node, &"a".into()), Some(Selector::Matcher));
        assert_eq!(selector.explore(&node, &"b".into()), None);
        // list indices are looked up by their string form
        assert_eq!(selector.explore(&list(1), &0usize.into()), Some(Selector::Matcher));
        assert_eq!(
            selector.interests(1),
            Some(vec![PathSegment::from("a"), PathSegment::from("0")])
        );
    }

    #[test]
    fn test_explore_index_needs_list() {
        let selector = Selector::ExploreIndex(ExploreIndex::new(2, Selector::Matcher));
        assert_eq!(selector.explore(&list(4), &2usize.into()), Some(Selector::Matcher));
        assert_eq!(selector.explore(&list(4), &"2".into()), Some(Selector::Matcher));
        assert_eq!(selector.explore(&list(4), &1usize.into()), None);
        let map = Node::map([("2", Node::Null)]);
        assert_eq!(selector.explore(&map, &"2".into()), None);
    }

    #[test]
    fn test_explore_range_is_half_open() {
        let selector = Selector::ExploreRange(ExploreRange::new(1, 3, Selector::Matcher));
        let node = list(4);
        let hits: Vec<i64> = (0..4)
            .filter(|i| selector.explore(&node, &PathSegment::Index(*i)).is_some())
            .collect();
        assert_eq!(hits, [1, 2]);
        assert_eq!(
            selector.interests(4),
            Some(vec![PathSegment::Index(1), PathSegment::Index(2)])
        );
        assert_eq!(selector.interests(2), Some(vec![PathSegment::Index(1)]));
        assert_eq!(selector.interests(0), Some(vec![]));
    }

    #[test]
    fn test_wide_range_interests_are_bounded_by_container() {
        let wide = Selector::ExploreRange(ExploreRange::new(0, i64::MAX, Selector::Matcher));
        assert_eq!(
            wide.interests(2),
            Some(vec![PathSegment::Index(0), PathSegment::Index(1)])
        );
        let late = Selector::ExploreRange(ExploreRange::new(i64::MAX - 1, i64::MAX, Selector::Matcher));
        assert_eq!(late.interests(usize::MAX), Some(vec![PathSegment::Index(i64::MAX - 1)]));

        let union = Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["a"]), wide]));
        assert_eq!(union.interests(3).map(|i| i.len()), Some(4));
    }

    #[test]
    fn test_union_collapses_results() {
        let union = Selector::ExploreUnion(ExploreUnion::new(vec![
            fields(&["a"]),
            Selector::ExploreIndex(ExploreIndex::new(0, Selector::Matcher)),
        ]));
        let map = Node::map([("a", Node::Null)]);
        assert_eq!(union.explore(&map, &"a".into()), Some(Selector::Matcher));
        assert_eq!(union.explore(&map, &"b".into()), None);

        let both = Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["0"]), fields(&["0"])]));
        assert_eq!(
            both.explore(&list(1), &0usize.into()),
            Some(Selector::ExploreUnion(ExploreUnion::new(vec![
                Selector::Matcher,
                Selector::Matcher
            ])))
        );
    }

    #[test]
    fn test_union_decide_is_any_member() {
        let node = Node::Null;
        let no = Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["a"]), fields(&["b"])]));
        let yes = Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["a"]), Selector::Matcher]));
        assert!(!no.decide(&node));
        assert!(yes.decide(&node));
    }

    #[test]
    fn test_union_interests() {
        let bounded = Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["a"]), fields(&["a", "b"])]));
        assert_eq!(bounded.interests(2).map(|i| i.len()), Some(3));

        let unbounded = Selector::ExploreUnion(ExploreUnion::new(vec![
            fields(&["a"]),
            Selector::ExploreAll(ExploreAll::new(Selector::Matcher)),
        ]));
        assert_eq!(unbounded.interests(2), None);
    }

    #[test]
    fn test_edge_is_inert() {
        let node = list(1);
        assert!(!Selector::ExploreRecursiveEdge.decide(&node));
        assert_eq!(Selector::ExploreRecursiveEdge.explore(&node, &0usize.into()), None);
    }

    /// For every bounded selector, a segment outside its interests explores to nothing.
    #[test]
    fn test_interests_are_sound() {
        let recursive = Selector::ExploreRecursive(ExploreRecursive::new(
            Selector::ExploreUnion(ExploreUnion::new(vec![
                Selector::Matcher,
                Selector::ExploreRange(ExploreRange::new(
                    0,
                    2,
                    Selector::ExploreRecursiveEdge,
                )),
            ])),
            RecursionLimit::Depth(3),
        ));
        let selectors = [
            Selector::Matcher,
            fields(&["a", "1"]),
            Selector::ExploreIndex(ExploreIndex::new(1, Selector::Matcher)),
            Selector::ExploreRange(ExploreRange::new(1, 3, Selector::Matcher)),
            Selector::ExploreUnion(ExploreUnion::new(vec![fields(&["b"]), fields(&["2"])])),
            recursive,
        ];
        let nodes = [
            list(5),
            Node::map([("a", Node::Null), ("b", Node::Null), ("c", Node::Null), ("1", Node::Null)]),
        ];
        for selector in &selectors {
            for node in &nodes {
                let interests = selector.interests(node.len()).unwrap();
                for (segment, _) in node.entries() {
                    let listed = interests
                        .iter()
                        .any(|i| node.lookup_entry(i).map(|(p, _)| p) == node.lookup_entry(&segment).map(|(p, _)| p));
                    if !listed {
                        assert_eq!(
                            selector.explore(node, &segment),
                            None,
                            "{} explored {segment} outside its interests",
                            selector.kind()
                        );
                    }
                }
            }
        }
    }
}
