//! Domain entities: concrete tree participants

use std::fmt;

use crate::domain::node_info::NodeInfo;

/// A named category stored as a nested-set row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub left: i64,
    pub right: i64,
    pub level: u32,
    pub root_id: i64,
}

impl Category {
    /// A not-yet-persisted category; ranges are assigned on insert.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            left: 0,
            right: 0,
            level: 0,
            root_id: 0,
        }
    }

    /// A category with explicit range columns.
    pub fn at(name: impl Into<String>, root_id: i64, left: i64, right: i64, level: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            left,
            right,
            level,
            root_id,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} #{} [{}, {}]", self.name, id, self.left, self.right),
            None => write!(f, "{} [{}, {}]", self.name, self.left, self.right),
        }
    }
}

impl NodeInfo for Category {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn left(&self) -> i64 {
        self.left
    }

    fn set_left(&mut self, left: i64) {
        self.left = left;
    }

    fn right(&self) -> i64 {
        self.right
    }

    fn set_right(&mut self, right: i64) {
        self.right = right;
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    fn root_id(&self) -> i64 {
        self.root_id
    }

    fn set_root_id(&mut self, root_id: i64) {
        self.root_id = root_id;
    }
}
