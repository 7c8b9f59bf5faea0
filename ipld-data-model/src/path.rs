use std::borrow::Cow;
use std::fmt;

/// One step of a [`Path`]: a map key or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    String(String),
    Index(i64),
}

impl PathSegment {
    /// Integer form of the segment. String segments are parsed, so `"2"`
    /// addresses the same list element as `2`.
    pub fn index(&self) -> Option<i64> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::String(s) => s.parse().ok(),
        }
    }

    /// String form of the segment, as used for map lookups.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            PathSegment::String(s) => Cow::Borrowed(s),
            PathSegment::Index(i) => Cow::Owned(i.to_string()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::String(s) => f.write_str(s),
            PathSegment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        PathSegment::String(value.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        PathSegment::String(value)
    }
}

impl From<i64> for PathSegment {
    fn from(value: i64) -> Self {
        PathSegment::Index(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        PathSegment::Index(value as i64)
    }
}

/// Route from the root of a walk to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathSegment>);

impl Path {
    pub fn new(segments: Vec<PathSegment>) -> Self {
        Path(segments)
    }

    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Splits on `/`. Empty segments are dropped, so `"/a//b/"` is `a/b`.
    pub fn parse(source: &str) -> Self {
        Path(
            source
                .split('/')
                .filter(|s| !s.is_empty())
                .map(PathSegment::from)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn append(&self, segment: impl Into<PathSegment>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Path(segments)
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<T: IntoIterator<Item = PathSegment>>(iter: T) -> Self {
        Path(iter.into_iter().collect())
    }
}
