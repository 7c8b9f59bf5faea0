use std::fmt;

use crate::loader::LinkLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    Node,
    Link,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetKind::Node => f.write_str("node"),
            BudgetKind::Link => f.write_str("link"),
        }
    }
}

/// Upper bounds on the work a single walk may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    /// Nodes that may be entered (default: unlimited).
    pub(crate) node_budget: u64,
    /// Links that may be loaded (default: unlimited).
    pub(crate) link_budget: u64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            node_budget: u64::MAX,
            link_budget: u64::MAX,
        }
    }
}

impl Budget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_budget(mut self, nodes: u64) -> Self {
        self.node_budget = nodes;
        self
    }

    pub fn link_budget(mut self, links: u64) -> Self {
        self.link_budget = links;
        self
    }

    pub fn get_node_budget(&self) -> u64 {
        self.node_budget
    }

    pub fn get_link_budget(&self) -> u64 {
        self.link_budget
    }

    /// Takes one unit of `kind`, failing once none are left.
    pub(crate) fn spend(&mut self, kind: BudgetKind) -> Result<(), BudgetKind> {
        let remaining = match kind {
            BudgetKind::Node => &mut self.node_budget,
            BudgetKind::Link => &mut self.link_budget,
        };
        *remaining = remaining.checked_sub(1).ok_or(kind)?;
        Ok(())
    }
}

/// Settings shared by every walk a [`crate::Walker`] runs.
#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    loader: Option<Box<dyn LinkLoader>>,
    budget: Option<Budget>,
    link_visit_only_once: bool,
}

impl WalkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without a loader, links are leaves.
    pub fn loader(mut self, loader: impl LinkLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Load each distinct link at most once per walk; later occurrences are pruned.
    pub fn link_visit_only_once(mut self, once: bool) -> Self {
        self.link_visit_only_once = once;
        self
    }

    pub fn get_loader(&self) -> Option<&dyn LinkLoader> {
        self.loader.as_deref()
    }

    pub fn get_budget(&self) -> Option<Budget> {
        self.budget
    }

    pub fn get_link_visit_only_once(&self) -> bool {
        self.link_visit_only_once
    }
}
