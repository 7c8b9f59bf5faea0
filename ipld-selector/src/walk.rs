use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use ipld_data_model::{Link, Node, Path, PathSegment};

use crate::config::{Budget, BudgetKind, WalkConfig};
use crate::loader::LoadError;
use crate::selector::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitReason {
    /// The selector decided on the node.
    Matched,
    /// The node was entered on the way to possible matches.
    Explored,
}

impl fmt::Display for VisitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitReason::Matched => f.write_str("matched"),
            VisitReason::Explored => f.write_str("explored"),
        }
    }
}

/// The most recently followed link and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastBlock {
    pub path: Path,
    pub link: Link,
}

/// Where the walk is. Always describes the node handed to the visitor.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    pub(crate) path: Path,
    pub(crate) last_block: Option<LastBlock>,
    pub(crate) links_followed: u64,
}

impl Progress {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_block(&self) -> Option<&LastBlock> {
        self.last_block.as_ref()
    }

    /// Links crossed between the root and the current node.
    pub fn links_followed(&self) -> u64 {
        self.links_followed
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("failed to load {link} at \"{path}\"")]
    Load {
        link: Link,
        path: Path,
        #[source]
        source: LoadError,
    },
    #[error("{kind} budget exceeded at \"{path}\"")]
    BudgetExceeded {
        kind: BudgetKind,
        path: Path,
        link: Option<Link>,
    },
    #[error("no node at \"{path}\"")]
    PathNotFound { path: Path },
    /// Returned by a visitor to end a walk early. [`Walker::walk`] and
    /// [`Walker::walk_matching`] then succeed. [`Walker::focus`] has no value
    /// to produce and hands it back unchanged.
    #[error("walk stopped")]
    Stopped,
    #[error(transparent)]
    Visit(Box<dyn Error + Send + Sync>),
}

impl WalkError {
    /// Wraps an error raised inside a visitor.
    pub fn visit(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        WalkError::Visit(error.into())
    }
}

/// Runs selectors over node graphs with one [`WalkConfig`].
///
/// Walks are depth-first and visit children in container order. The path in
/// [`Progress`] is a stack pushed and popped around every descent.
pub struct Walker<'c> {
    config: &'c WalkConfig,
    progress: Progress,
    budget: Option<Budget>,
    seen: HashSet<Link>,
}

impl<'c> Walker<'c> {
    pub fn new(config: &'c WalkConfig) -> Self {
        Self {
            config,
            progress: Progress::default(),
            budget: config.get_budget(),
            seen: HashSet::new(),
        }
    }

    fn reset(&mut self) {
        self.progress = Progress::default();
        self.budget = self.config.get_budget();
        self.seen.clear();
    }

    /// Visits every node the selector enters, with the reason it was entered.
    pub fn walk<F>(&mut self, root: &Node, selector: &Selector, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        self.reset();
        match self.enter(root, selector, &mut visit) {
            Err(WalkError::Stopped) => {
                log::debug!("walk stopped at \"{}\"", self.progress.path);
                Ok(())
            }
            result => result,
        }
    }

    /// Visits only the nodes the selector matches.
    pub fn walk_matching<F>(&mut self, root: &Node, selector: &Selector, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node) -> Result<(), WalkError>,
    {
        self.walk(root, selector, |progress, node, reason| match reason {
            VisitReason::Matched => visit(progress, node),
            VisitReason::Explored => Ok(()),
        })
    }

    /// Follows `path` from `root`, loading links on the way, and hands the
    /// node found there to `visit`.
    ///
    /// Whatever `visit` returns is returned as is, including
    /// [`WalkError::Stopped`].
    pub fn focus<T, F>(&mut self, root: &Node, path: &Path, visit: F) -> Result<T, WalkError>
    where
        F: FnOnce(&Progress, &Node) -> Result<T, WalkError>,
    {
        self.reset();
        self.focus_in(root, path.segments(), visit)
    }

    pub fn get(&mut self, root: &Node, path: &Path) -> Result<Node, WalkError> {
        self.focus(root, path, |_, node| Ok(node.clone()))
    }

    fn focus_in<T, F>(&mut self, node: &Node, rest: &[PathSegment], visit: F) -> Result<T, WalkError>
    where
        F: FnOnce(&Progress, &Node) -> Result<T, WalkError>,
    {
        let config = self.config;
        if let (Node::Link(link), Some(_)) = (node, config.get_loader()) {
            let Some(loaded) = self.load(link)? else {
                return Err(WalkError::PathNotFound {
                    path: self.progress.path.clone(),
                });
            };
            self.progress.last_block = Some(LastBlock {
                path: self.progress.path.clone(),
                link: link.clone(),
            });
            self.progress.links_followed += 1;
            return self.focus_in(&loaded, rest, visit);
        }

        let Some((segment, rest)) = rest.split_first() else {
            return visit(&self.progress, node);
        };
        self.progress.path.push(segment.clone());
        let child = node
            .lookup_by_segment(segment)
            .ok_or_else(|| WalkError::PathNotFound {
                path: self.progress.path.clone(),
            })?;
        self.focus_in(child, rest, visit)
    }

    /// Visits `node`, loading it first if it is a link, then explores it.
    fn enter<F>(&mut self, node: &Node, selector: &Selector, visit: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        let config = self.config;
        match (node, config.get_loader()) {
            (Node::Link(link), Some(_)) => self.follow_link(link, selector, visit),
            _ => self.visit_node(node, selector, visit),
        }
    }

    fn follow_link<F>(&mut self, link: &Link, selector: &Selector, visit: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        let Some(loaded) = self.load(link)? else {
            return Ok(());
        };

        let saved = self.progress.last_block.replace(LastBlock {
            path: self.progress.path.clone(),
            link: link.clone(),
        });
        self.progress.links_followed += 1;
        let result = self.visit_node(&loaded, selector, visit);
        self.progress.links_followed -= 1;
        self.progress.last_block = saved;
        result
    }

    /// `None` when the branch is pruned: the link was seen before or the loader skipped it.
    fn load(&mut self, link: &Link) -> Result<Option<Node>, WalkError> {
        let config = self.config;
        let Some(loader) = config.get_loader() else {
            return Ok(None);
        };
        if config.get_link_visit_only_once() && !self.seen.insert(link.clone()) {
            log::debug!("link {link} already visited, pruning \"{}\"", self.progress.path);
            return Ok(None);
        }
        self.spend(BudgetKind::Link, Some(link))?;

        log::debug!("loading {link} at \"{}\"", self.progress.path);
        match loader.load(link, &self.progress) {
            Ok(node) => Ok(Some(node)),
            Err(LoadError::Skip) => {
                log::debug!("loader skipped {link}");
                Ok(None)
            }
            Err(source) => Err(WalkError::Load {
                link: link.clone(),
                path: self.progress.path.clone(),
                source,
            }),
        }
    }

    fn spend(&mut self, kind: BudgetKind, link: Option<&Link>) -> Result<(), WalkError> {
        let Some(budget) = self.budget.as_mut() else {
            return Ok(());
        };
        budget.spend(kind).map_err(|kind| WalkError::BudgetExceeded {
            kind,
            path: self.progress.path.clone(),
            link: link.cloned(),
        })
    }

    fn visit_node<F>(&mut self, node: &Node, selector: &Selector, visit: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        self.spend(BudgetKind::Node, None)?;
        let reason = if selector.decide(node) {
            VisitReason::Matched
        } else {
            VisitReason::Explored
        };
        log::trace!("{reason} {} at \"{}\" with {}", node.kind(), self.progress.path, selector.kind());
        visit(&self.progress, node, reason)?;

        if node.kind().is_recursive() {
            self.walk_children(node, selector, visit)?;
        }
        Ok(())
    }

    fn walk_children<F>(&mut self, node: &Node, selector: &Selector, visit: &mut F) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        match selector.interests(node.len()) {
            Some(interests) if interests.len() < node.len() => {
                // look the interesting children up, then visit them in container order
                let mut positions: Vec<usize> = interests
                    .iter()
                    .filter_map(|segment| node.lookup_entry(segment).map(|(position, _)| position))
                    .collect();
                positions.sort_unstable();
                positions.dedup();
                log::trace!(
                    "{} of {} children of interest at \"{}\"",
                    positions.len(),
                    node.len(),
                    self.progress.path
                );
                for position in positions {
                    if let Some((segment, child)) = node.entry_at(position) {
                        self.explore_child(node, segment, child, selector, visit)?;
                    }
                }
            }
            _ => {
                for (segment, child) in node.entries() {
                    self.explore_child(node, segment, child, selector, visit)?;
                }
            }
        }
        Ok(())
    }

    fn explore_child<F>(
        &mut self,
        node: &Node,
        segment: PathSegment,
        child: &Node,
        selector: &Selector,
        visit: &mut F,
    ) -> Result<(), WalkError>
    where
        F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
    {
        let Some(next) = selector.explore(node, &segment) else {
            return Ok(());
        };
        self.progress.path.push(segment);
        let result = self.enter(child, &next, visit);
        self.progress.path.pop();
        result
    }
}

/// [`Walker::walk`] without links or budgets.
pub fn walk<F>(root: &Node, selector: &Selector, visit: F) -> Result<(), WalkError>
where
    F: FnMut(&Progress, &Node, VisitReason) -> Result<(), WalkError>,
{
    Walker::new(&WalkConfig::default()).walk(root, selector, visit)
}

/// [`Walker::walk_matching`] without links or budgets.
pub fn walk_matching<F>(root: &Node, selector: &Selector, visit: F) -> Result<(), WalkError>
where
    F: FnMut(&Progress, &Node) -> Result<(), WalkError>,
{
    Walker::new(&WalkConfig::default()).walk_matching(root, selector, visit)
}

pub fn get(root: &Node, path: &Path) -> Result<Node, WalkError> {
    Walker::new(&WalkConfig::default()).get(root, path)
}
