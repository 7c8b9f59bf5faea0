use ipld_data_model::Node;

use crate::keys;
use crate::recursive::RecursionLimit;
use crate::selector::Selector;

impl Selector {
    /// The wire form of this selector, in the canonical key spellings.
    ///
    /// A recursive selector is written as its `sequence`, so a selector
    /// obtained part way through a walk serializes to the recursion it
    /// came from rather than to its current position.
    pub fn to_node(&self) -> Node {
        let (key, body) = match self {
            Selector::Matcher => (keys::MATCHER, empty()),
            Selector::ExploreAll(s) => (keys::EXPLORE_ALL, Node::map([(keys::NEXT, s.next().to_node())])),
            Selector::ExploreFields(s) => {
                let fields = Node::map(s.selections().map(|(name, selector)| (name, selector.to_node())));
                (keys::EXPLORE_FIELDS, Node::map([(keys::FIELDS, fields)]))
            }
            Selector::ExploreIndex(s) => (
                keys::EXPLORE_INDEX,
                Node::map([
                    (keys::INDEX, Node::Int(s.index())),
                    (keys::NEXT, s.next().to_node()),
                ]),
            ),
            Selector::ExploreRange(s) => (
                keys::EXPLORE_RANGE,
                Node::map([
                    (keys::START, Node::Int(s.start())),
                    (keys::END, Node::Int(s.end())),
                    (keys::NEXT, s.next().to_node()),
                ]),
            ),
            Selector::ExploreUnion(s) => (
                keys::EXPLORE_UNION,
                Node::list(s.members().iter().map(Selector::to_node)),
            ),
            Selector::ExploreRecursive(s) => (
                keys::EXPLORE_RECURSIVE,
                Node::map([
                    (keys::LIMIT, limit_to_node(s.limit())),
                    (keys::SEQUENCE, s.sequence().to_node()),
                ]),
            ),
            Selector::ExploreRecursiveEdge => (keys::EXPLORE_RECURSIVE_EDGE, empty()),
        };
        Node::map([(key, body)])
    }
}

impl From<&Selector> for Node {
    fn from(selector: &Selector) -> Self {
        selector.to_node()
    }
}

pub(crate) fn limit_to_node(limit: RecursionLimit) -> Node {
    match limit {
        RecursionLimit::Depth(depth) => Node::map([(
            keys::LIMIT_DEPTH,
            Node::Int(i64::try_from(depth).unwrap_or(i64::MAX)),
        )]),
        RecursionLimit::Unbounded => Node::map([(keys::LIMIT_NONE, empty())]),
    }
}

pub(crate) fn empty() -> Node {
    Node::Map(Vec::new())
}
