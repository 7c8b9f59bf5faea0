use std::collections::HashMap;
use std::sync::Arc;

use dyn_clone::DynClone;
use ipld_data_model::{Link, Node};

use crate::walk::Progress;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("block {0} not found")]
    NotFound(Link),
    /// Not a failure: the walk leaves this branch out.
    #[error("block skipped")]
    Skip,
    #[error("failed to decode block {link}: {message}")]
    Decode { link: Link, message: String },
    #[error("failed to read block {link}")]
    Io {
        link: Link,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a [`Link`] reached during a walk into the node it addresses.
pub trait LinkLoader: std::fmt::Debug + DynClone + Send + Sync {
    fn load(&self, link: &Link, progress: &Progress) -> Result<Node, LoadError>;
}

dyn_clone::clone_trait_object!(LinkLoader);

/// Blocks held in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    blocks: Arc<HashMap<Link, Node>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, link: impl Into<String>, node: Node) -> Self {
        Arc::make_mut(&mut self.blocks).insert(Link::new(link), node);
        self
    }

    pub fn insert(&mut self, link: Link, node: Node) {
        Arc::make_mut(&mut self.blocks).insert(link, node);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl FromIterator<(Link, Node)> for MemoryLoader {
    fn from_iter<T: IntoIterator<Item = (Link, Node)>>(iter: T) -> Self {
        Self {
            blocks: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl LinkLoader for MemoryLoader {
    fn load(&self, link: &Link, _progress: &Progress) -> Result<Node, LoadError> {
        self.blocks
            .get(link)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(link.clone()))
    }
}
