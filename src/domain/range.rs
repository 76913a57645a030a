//! Range arithmetic shared by the query and mutation engines.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node_info::NodeInfo;

/// Left bound of a freshly created root.
pub const ROOT_LEFT: i64 = 1;

/// Right bound of a freshly created root.
pub const ROOT_RIGHT: i64 = 2;

/// Where a node goes relative to a reference node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertPosition {
    FirstChild,
    LastChild,
    NextSibling,
    PrevSibling,
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FirstChild => "first-child",
            Self::LastChild => "last-child",
            Self::NextSibling => "next-sibling",
            Self::PrevSibling => "prev-sibling",
        };
        f.write_str(s)
    }
}

impl FromStr for InsertPosition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-child" => Ok(Self::FirstChild),
            "last-child" => Ok(Self::LastChild),
            "next-sibling" => Ok(Self::NextSibling),
            "prev-sibling" => Ok(Self::PrevSibling),
            other => Err(DomainError::invalid(format!("unknown position: {other}"))),
        }
    }
}

/// Target slot computed for an insert or move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left bound the placed node will occupy, in pre-shift coordinates.
    pub left: i64,
    /// Level the placed node will have.
    pub level: u32,
}

/// Compute the slot for a node placed at `position` relative to `reference`.
///
/// Sibling positions next to a root are rejected: a root has no parent to
/// share.
pub fn placement<T: NodeInfo>(reference: &T, position: InsertPosition) -> DomainResult<Placement> {
    if reference.is_root()
        && matches!(
            position,
            InsertPosition::NextSibling | InsertPosition::PrevSibling
        )
    {
        return Err(DomainError::invalid(format!(
            "cannot place a {} of root node {:?}",
            position,
            reference.id()
        )));
    }
    let placement = match position {
        InsertPosition::FirstChild => Placement {
            left: reference.left() + 1,
            level: reference.level() + 1,
        },
        InsertPosition::LastChild => Placement {
            left: reference.right(),
            level: reference.level() + 1,
        },
        InsertPosition::NextSibling => Placement {
            left: reference.right() + 1,
            level: reference.level(),
        },
        InsertPosition::PrevSibling => Placement {
            left: reference.left(),
            level: reference.level(),
        },
    };
    Ok(placement)
}

/// Which bound a range shift applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeColumn {
    Left,
    Right,
}

impl RangeColumn {
    pub fn get<T: NodeInfo>(self, node: &T) -> i64 {
        match self {
            Self::Left => node.left(),
            Self::Right => node.right(),
        }
    }

    pub fn set<T: NodeInfo>(self, node: &mut T, value: i64) {
        match self {
            Self::Left => node.set_left(value),
            Self::Right => node.set_right(value),
        }
    }

    /// Column name in the relational layout.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Left => "lft",
            Self::Right => "rgt",
        }
    }
}

/// Row filter understood by every store: optional tree, left-bound window
/// (inclusive on both ends) and maximum level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeFilter {
    pub id: Option<i64>,
    pub root_id: Option<i64>,
    pub left_min: Option<i64>,
    pub left_max: Option<i64>,
    pub max_level: Option<u32>,
}

impl RangeFilter {
    /// Every row of every tree.
    pub fn all() -> Self {
        Self::default()
    }

    /// Every row of one tree.
    pub fn tree(root_id: i64) -> Self {
        Self {
            root_id: Some(root_id),
            ..Self::default()
        }
    }

    /// Only roots.
    pub fn roots() -> Self {
        Self {
            max_level: Some(0),
            ..Self::default()
        }
    }

    /// The single row with entity id `id`, in whatever tree.
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Rows strictly inside `node`'s range, i.e. its descendants.
    pub fn inside<T: NodeInfo>(node: &T) -> Self {
        Self {
            id: None,
            root_id: Some(node.root_id()),
            left_min: Some(node.left() + 1),
            left_max: Some(node.right() - 1),
            max_level: None,
        }
    }

    /// Rows starting left of `node` in its tree; ancestors are the subset
    /// whose right bound lies beyond the node's.
    pub fn before<T: NodeInfo>(node: &T) -> Self {
        Self {
            id: None,
            root_id: Some(node.root_id()),
            left_min: None,
            left_max: Some(node.left() - 1),
            max_level: None,
        }
    }

    pub fn with_max_level(mut self, max_level: Option<u32>) -> Self {
        self.max_level = max_level;
        self
    }

    pub fn matches<T: NodeInfo>(&self, node: &T) -> bool {
        self.id.map_or(true, |id| node.id() == Some(id))
            && self.root_id.map_or(true, |r| node.root_id() == r)
            && self.left_min.map_or(true, |l| node.left() >= l)
            && self.left_max.map_or(true, |l| node.left() <= l)
            && self.max_level.map_or(true, |m| node.level() <= m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Category;
    use rstest::rstest;

    fn node(left: i64, right: i64, level: u32) -> Category {
        Category::at("n", 1, left, right, level).with_id(1)
    }

    #[rstest]
    #[case(InsertPosition::FirstChild, 5, 2)]
    #[case(InsertPosition::LastChild, 7, 2)]
    #[case(InsertPosition::NextSibling, 8, 1)]
    #[case(InsertPosition::PrevSibling, 4, 1)]
    fn given_reference_when_computing_placement_then_returns_slot(
        #[case] position: InsertPosition,
        #[case] left: i64,
        #[case] level: u32,
    ) {
        let reference = node(4, 7, 1);
        let placement = placement(&reference, position).unwrap();
        assert_eq!(placement, Placement { left, level });
    }

    #[rstest]
    #[case(InsertPosition::NextSibling)]
    #[case(InsertPosition::PrevSibling)]
    fn given_root_reference_when_placing_sibling_then_rejected(#[case] position: InsertPosition) {
        let root = node(1, 10, 0);
        let err = placement(&root, position).unwrap_err();
        assert!(!err.is_integrity());
    }

    #[test]
    fn given_inside_filter_when_matching_then_excludes_node_itself() {
        let b = node(4, 7, 1);
        let filter = RangeFilter::inside(&b);
        assert!(!filter.matches(&b));
        assert!(filter.matches(&node(5, 6, 2)));
        assert!(!filter.matches(&node(8, 9, 1)));
    }

    #[test]
    fn given_position_names_when_parsing_then_round_trips() {
        for position in [
            InsertPosition::FirstChild,
            InsertPosition::LastChild,
            InsertPosition::NextSibling,
            InsertPosition::PrevSibling,
        ] {
            assert_eq!(position.to_string().parse::<InsertPosition>().unwrap(), position);
        }
        assert!("sideways".parse::<InsertPosition>().is_err());
    }
}
