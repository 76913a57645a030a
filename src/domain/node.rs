//! Node wrapper: a tree participant plus its navigational links.

use std::fmt;

use generational_arena::Index;

use crate::domain::node_info::NodeInfo;

/// Handle of a node inside a [`Registry`](crate::domain::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (idx, generation) = self.0.into_raw_parts();
        write!(f, "{}v{}", idx, generation)
    }
}

/// Whether a link has been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Link<L> {
    Unresolved,
    Resolved(L),
}

impl<L> Link<L> {
    pub(crate) fn resolved(&self) -> Option<&L> {
        match self {
            Self::Resolved(l) => Some(l),
            Self::Unresolved => None,
        }
    }
}

/// One wrapped entity with its parent and child links.
///
/// The parent owns the ordered child list; the child keeps a plain handle
/// back to its parent. Ancestors and descendants are derived by walking
/// those links, never stored.
#[derive(Debug)]
pub struct Node<T> {
    pub(crate) info: T,
    pub(crate) parent: Link<Option<NodeId>>,
    pub(crate) children: Link<Vec<NodeId>>,
}

impl<T: NodeInfo> Node<T> {
    pub(crate) fn new(info: T) -> Self {
        let parent = if info.is_root() {
            Link::Resolved(None)
        } else {
            Link::Unresolved
        };
        Self {
            info,
            parent,
            children: Link::Unresolved,
        }
    }

    /// The wrapped entity.
    pub fn info(&self) -> &T {
        &self.info
    }

    pub fn into_info(self) -> T {
        self.info
    }

    /// `Some(parent)` once the parent link is known; `Some(None)` for roots.
    pub fn parent(&self) -> Option<Option<NodeId>> {
        self.parent.resolved().copied()
    }

    /// Child handles in ascending left order, if linked.
    pub fn children(&self) -> Option<&[NodeId]> {
        self.children.resolved().map(Vec::as_slice)
    }

    /// True once both links are known, so navigation needs no query.
    pub fn is_linked(&self) -> bool {
        self.parent.resolved().is_some() && self.children.resolved().is_some()
    }

    pub(crate) fn unlink(&mut self) {
        self.parent = if self.info.is_root() {
            Link::Resolved(None)
        } else {
            Link::Unresolved
        };
        self.children = Link::Unresolved;
    }
}
