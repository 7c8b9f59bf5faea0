use std::fmt;

mod path;

pub use path::{Path, PathSegment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub filename: String,
    /// start offset in bytes
    pub start: usize,
    /// end offset in bytes
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Bytes,
    Link,
    Map,
    List,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Null => "Null",
            Kind::Bool => "Bool",
            Kind::Int => "Int",
            Kind::Float => "Float",
            Kind::String => "String",
            Kind::Bytes => "Bytes",
            Kind::Link => "Link",
            Kind::Map => "Map",
            Kind::List => "List",
        }
    }

    /// Map and List are the only kinds with children.
    pub fn is_recursive(&self) -> bool {
        matches!(self, Kind::Map | Kind::List)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content address of another block. Opaque to everything except link loaders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(String);

impl Link {
    pub fn new(cid: impl Into<String>) -> Self {
        Link(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Link(Link),
    /// Entries in insertion order.
    Map(Vec<(String, Node)>),
    List(Vec<Node>),
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Bool(_) => Kind::Bool,
            Node::Int(_) => Kind::Int,
            Node::Float(_) => Kind::Float,
            Node::String(_) => Kind::String,
            Node::Bytes(_) => Kind::Bytes,
            Node::Link(_) => Kind::Link,
            Node::Map(_) => Kind::Map,
            Node::List(_) => Kind::List,
        }
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Node)>) -> Node {
        Node::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Node {
        Node::List(items.into_iter().collect())
    }

    /// Number of children; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Node::Map(entries) => entries.len(),
            Node::List(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Node::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Node::Link(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Node)]> {
        match self {
            Node::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map lookup by key.
    pub fn lookup(&self, key: &str) -> Option<&Node> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn lookup_by_segment(&self, segment: &PathSegment) -> Option<&Node> {
        self.lookup_entry(segment).map(|(_, node)| node)
    }

    /// Like [`Node::lookup_by_segment`], also returning the child's position
    /// in the order [`Node::entries`] yields it.
    pub fn lookup_entry(&self, segment: &PathSegment) -> Option<(usize, &Node)> {
        match self {
            Node::Map(entries) => {
                let key = segment.as_key();
                entries
                    .iter()
                    .position(|(k, _)| *k == *key)
                    .map(|i| (i, &entries[i].1))
            }
            Node::List(items) => {
                let index = usize::try_from(segment.index()?).ok()?;
                items.get(index).map(|node| (index, node))
            }
            _ => None,
        }
    }

    /// The child at `position` in iteration order, with its canonical segment.
    pub fn entry_at(&self, position: usize) -> Option<(PathSegment, &Node)> {
        match self {
            Node::Map(entries) => entries
                .get(position)
                .map(|(k, v)| (PathSegment::String(k.clone()), v)),
            Node::List(items) => items
                .get(position)
                .map(|v| (PathSegment::from(position), v)),
            _ => None,
        }
    }

    /// Children with their segments. Scalars and links have none.
    pub fn entries(&self) -> Entries<'_> {
        match self {
            Node::Map(entries) => Entries::Map(entries.iter()),
            Node::List(items) => Entries::List(items.iter().enumerate()),
            _ => Entries::Empty,
        }
    }
}

pub enum Entries<'a> {
    Map(std::slice::Iter<'a, (String, Node)>),
    List(std::iter::Enumerate<std::slice::Iter<'a, Node>>),
    Empty,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (PathSegment, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Entries::Map(iter) => iter
                .next()
                .map(|(k, v)| (PathSegment::String(k.clone()), v)),
            Entries::List(iter) => iter.next().map(|(i, v)| (PathSegment::from(i), v)),
            Entries::Empty => None,
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<f64> for Node {
    fn from(value: f64) -> Self {
        Node::Float(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_owned())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<Link> for Node {
    fn from(value: Link) -> Self {
        Node::Link(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::List(value)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// A codec between text and [`Node`] trees.
pub trait Format: Sync + Send {
    fn decode(&self, source: &str, filename: &str) -> Result<Node, Vec<ParseError>>;

    fn encode(&self, node: &Node) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        Node::map([
            ("name", Node::from("root")),
            ("children", Node::list([Node::Int(1), Node::Int(2)])),
        ])
    }

    #[test]
    fn test_entries_follow_insertion_order() {
        let node = sample();
        let keys: Vec<_> = node.entries().map(|(seg, _)| seg.to_string()).collect();
        assert_eq!(keys, ["name", "children"]);

        let children = node.lookup("children").unwrap();
        let indices: Vec<_> = children.entries().map(|(seg, _)| seg).collect();
        assert_eq!(indices, [PathSegment::Index(0), PathSegment::Index(1)]);
    }

    #[test]
    fn test_scalars_have_no_entries() {
        assert_eq!(Node::Int(4).entries().count(), 0);
        assert_eq!(Node::Link(Link::new("bafy")).entries().count(), 0);
        assert!(Node::Null.is_empty());
    }

    #[test]
    fn test_lookup_entry_reports_position() {
        let node = sample();
        let (pos, _) = node.lookup_entry(&"children".into()).unwrap();
        assert_eq!(pos, 1);

        let list = node.lookup("children").unwrap();
        assert_eq!(list.lookup_entry(&"1".into()), Some((1, &Node::Int(2))));
        assert_eq!(list.lookup_entry(&PathSegment::Index(2)), None);
        assert_eq!(list.lookup_entry(&PathSegment::Index(-1)), None);
    }

    #[test]
    fn test_entry_at_uses_canonical_segments() {
        let node = sample();
        assert_eq!(
            node.entry_at(1).map(|(seg, _)| seg),
            Some(PathSegment::from("children"))
        );
        let list = node.lookup("children").unwrap();
        assert_eq!(
            list.entry_at(0),
            Some((PathSegment::Index(0), &Node::Int(1)))
        );
        assert_eq!(list.entry_at(5), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(sample().kind().to_string(), "Map");
        assert!(Kind::List.is_recursive());
        assert!(!Kind::Link.is_recursive());
    }
}
