use std::sync::Arc;

use ipld_data_model::{Node, PathSegment};

use crate::selector::{ExploreUnion, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionLimit {
    /// Number of recursion edges that may still be followed.
    Depth(u64),
    Unbounded,
}

impl RecursionLimit {
    fn decremented(self) -> Self {
        match self {
            RecursionLimit::Depth(depth) => RecursionLimit::Depth(depth.saturating_sub(1)),
            RecursionLimit::Unbounded => RecursionLimit::Unbounded,
        }
    }
}

/// Repeats `sequence` each time an [`Selector::ExploreRecursiveEdge`] is
/// reached, until the limit runs out.
///
/// `current` is the position inside the template for the node this value was
/// handed to. The limit lives in the value rather than in a call stack because
/// the same recursion is usually live on several sibling branches at once, and
/// each branch spends its own depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreRecursive {
    pub(crate) sequence: Arc<Selector>,
    pub(crate) current: Arc<Selector>,
    pub(crate) limit: RecursionLimit,
}

impl ExploreRecursive {
    pub(crate) fn new(sequence: Selector, limit: RecursionLimit) -> Self {
        let sequence = Arc::new(sequence);
        Self {
            current: Arc::clone(&sequence),
            sequence,
            limit,
        }
    }

    pub fn sequence(&self) -> &Selector {
        &self.sequence
    }

    pub fn current(&self) -> &Selector {
        &self.current
    }

    pub fn limit(&self) -> RecursionLimit {
        self.limit
    }

    fn advanced(&self, current: Selector, limit: RecursionLimit) -> Selector {
        Selector::ExploreRecursive(ExploreRecursive {
            sequence: Arc::clone(&self.sequence),
            current: Arc::new(current),
            limit,
        })
    }

    pub(crate) fn explore(&self, node: &Node, segment: &PathSegment) -> Option<Selector> {
        let next = self.current.explore(node, segment)?;

        if !has_recursive_edge(&next) {
            return Some(self.advanced(next, self.limit));
        }

        match self.limit {
            // last lap: edges become dead ends and nothing wraps the result
            RecursionLimit::Depth(depth) if depth < 2 => replace_recursive_edge(next, None),
            limit => {
                let current = replace_recursive_edge(next, Some(&self.sequence))?;
                Some(self.advanced(current, limit.decremented()))
            }
        }
    }
}

/// Edges are found at the top of `selector` or inside (nested) unions. Any
/// other variant hides its children, in particular an inner recursion's edges.
fn has_recursive_edge(selector: &Selector) -> bool {
    match selector {
        Selector::ExploreRecursiveEdge => true,
        Selector::ExploreUnion(union) => union.members().iter().any(has_recursive_edge),
        _ => false,
    }
}

/// Swaps every edge reachable by [`has_recursive_edge`] for `replacement`,
/// or drops it when there is none. Unions are re-collapsed afterwards.
fn replace_recursive_edge(selector: Selector, replacement: Option<&Arc<Selector>>) -> Option<Selector> {
    match selector {
        Selector::ExploreRecursiveEdge => replacement.map(|s| Selector::clone(s)),
        Selector::ExploreUnion(union) => {
            let members = union
                .members()
                .iter()
                .cloned()
                .filter_map(|member| replace_recursive_edge(member, replacement))
                .collect();
            ExploreUnion::collapse(members)
        }
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{ExploreAll, ExploreFields, ExploreIndex};

    fn all(next: Selector) -> Selector {
        Selector::ExploreAll(ExploreAll::new(next))
    }

    fn union(members: Vec<Selector>) -> Selector {
        Selector::ExploreUnion(ExploreUnion::new(members))
    }

    fn recursive(sequence: Selector, limit: RecursionLimit) -> Selector {
        Selector::ExploreRecursive(ExploreRecursive::new(sequence, limit))
    }

    fn as_recursive(selector: &Selector) -> &ExploreRecursive {
        match selector {
            Selector::ExploreRecursive(r) => r,
            other => panic!("expected ExploreRecursive, got {:?}", other.kind()),
        }
    }

    fn nested_list() -> Node {
        Node::list([Node::list([Node::Int(1)])])
    }

    #[test]
    fn test_edge_restarts_sequence_and_spends_depth() {
        let sequence = all(Selector::ExploreRecursiveEdge);
        let selector = recursive(sequence.clone(), RecursionLimit::Depth(3));

        let next = selector.explore(&nested_list(), &0usize.into()).unwrap();
        let next = as_recursive(&next);
        assert_eq!(next.current(), &sequence);
        assert_eq!(next.sequence(), &sequence);
        assert_eq!(next.limit(), RecursionLimit::Depth(2));
    }

    #[test]
    fn test_step_without_edge_keeps_depth() {
        let sequence = Selector::ExploreFields(ExploreFields::new(vec![(
            "Parents".to_owned(),
            all(Selector::ExploreRecursiveEdge),
        )]));
        let selector = recursive(sequence, RecursionLimit::Depth(2));
        let node = Node::map([("Parents", Node::list([]))]);

        let next = selector.explore(&node, &"Parents".into()).unwrap();
        let next = as_recursive(&next);
        assert_eq!(next.current(), &all(Selector::ExploreRecursiveEdge));
        assert_eq!(next.limit(), RecursionLimit::Depth(2));
    }

    #[test]
    fn test_last_lap_drops_edges() {
        let selector = recursive(all(Selector::ExploreRecursiveEdge), RecursionLimit::Depth(1));
        assert_eq!(selector.explore(&nested_list(), &0usize.into()), None);

        let selector = recursive(all(Selector::ExploreRecursiveEdge), RecursionLimit::Depth(0));
        assert_eq!(selector.explore(&nested_list(), &0usize.into()), None);
    }

    #[test]
    fn test_last_lap_keeps_non_edge_union_members() {
        let sequence = all(union(vec![Selector::Matcher, Selector::ExploreRecursiveEdge]));
        let selector = recursive(sequence, RecursionLimit::Depth(1));
        assert_eq!(
            selector.explore(&nested_list(), &0usize.into()),
            Some(Selector::Matcher)
        );
    }

    #[test]
    fn test_edge_inside_union_is_substituted() {
        let sequence = all(union(vec![Selector::Matcher, Selector::ExploreRecursiveEdge]));
        let selector = recursive(sequence.clone(), RecursionLimit::Unbounded);

        let next = selector.explore(&nested_list(), &0usize.into()).unwrap();
        let next = as_recursive(&next);
        assert_eq!(next.current(), &union(vec![Selector::Matcher, sequence]));
        assert_eq!(next.limit(), RecursionLimit::Unbounded);
        assert!(next.current().decide(&Node::Null));
    }

    #[test]
    fn test_decide_follows_current() {
        let sequence = union(vec![Selector::Matcher, all(Selector::ExploreRecursiveEdge)]);
        let selector = recursive(sequence, RecursionLimit::Depth(2));
        assert!(selector.decide(&Node::Null));

        let selector = recursive(all(Selector::ExploreRecursiveEdge), RecursionLimit::Depth(2));
        assert!(!selector.decide(&Node::Null));
    }

    #[test]
    fn test_inner_recursion_edges_are_opaque() {
        let inner = recursive(all(Selector::ExploreRecursiveEdge), RecursionLimit::Depth(5));
        assert!(!has_recursive_edge(&inner));

        // outer: index 0 -> inner recursion, or loop back
        let outer_sequence = union(vec![
            Selector::ExploreIndex(ExploreIndex::new(0, inner.clone())),
            Selector::ExploreIndex(ExploreIndex::new(0, Selector::ExploreRecursiveEdge)),
        ]);
        let outer = recursive(outer_sequence.clone(), RecursionLimit::Depth(4));
        let next = outer.explore(&nested_list(), &0usize.into()).unwrap();
        let next = as_recursive(&next);
        assert_eq!(next.current(), &union(vec![inner, outer_sequence]));
        assert_eq!(next.limit(), RecursionLimit::Depth(3));
    }

    #[test]
    fn test_nothing_to_explore_is_none() {
        let selector = recursive(
            Selector::ExploreIndex(ExploreIndex::new(3, Selector::ExploreRecursiveEdge)),
            RecursionLimit::Unbounded,
        );
        assert_eq!(selector.explore(&nested_list(), &0usize.into()), None);
    }
}
