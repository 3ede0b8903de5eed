use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::domain::NodeType;

/// Default depth ceiling when no configuration is supplied.
pub const DEFAULT_MAX_LEVELS: u32 = 5;

/// (child, parent) pairs that may be linked. Absent pairs are disallowed.
static ALLOWED_PARENTS: Lazy<HashSet<(NodeType, NodeType)>> = Lazy::new(|| {
    HashSet::from([
        (NodeType::Company, NodeType::Company),
        (NodeType::Division, NodeType::Company),
        (NodeType::Department, NodeType::Company),
        (NodeType::Department, NodeType::Division),
        (NodeType::Department, NodeType::Department),
    ])
});

/// Raised when a node would land below the configured depth ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthExceeded {
    pub level: i32,
    pub max_levels: i32,
}

impl std::fmt::Display for DepthExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Level {} exceeds the maximum hierarchy depth of {}",
            self.level, self.max_levels
        )
    }
}

impl std::error::Error for DepthExceeded {}

/// Structural rules of the organizational tree: which node types may nest
/// under which, which may stand alone, and how deep the tree may grow.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyPolicy {
    max_levels: i32,
}

impl HierarchyPolicy {
    pub fn new(max_levels: u32) -> Self {
        Self {
            max_levels: max_levels as i32,
        }
    }

    pub fn max_levels(&self) -> i32 {
        self.max_levels
    }

    /// True when `child_type` may be attached under `parent_type`.
    pub fn allowed_parent(&self, child_type: NodeType, parent_type: NodeType) -> bool {
        ALLOWED_PARENTS.contains(&(child_type, parent_type))
    }

    /// Parent types that may carry a child of `child_type`.
    pub fn allowed_parent_types(&self, child_type: NodeType) -> Vec<NodeType> {
        [NodeType::Company, NodeType::Division, NodeType::Department]
            .into_iter()
            .filter(|parent_type| self.allowed_parent(child_type, *parent_type))
            .collect()
    }

    /// True when the node type may exist without a parent.
    pub fn may_be_root(&self, node_type: NodeType) -> bool {
        matches!(node_type, NodeType::Company | NodeType::Division)
    }

    /// Level a child placed under a parent at `parent_level` would occupy.
    pub fn next_level(&self, parent_level: i32) -> Result<i32, DepthExceeded> {
        let level = parent_level + 1;
        if level > self.max_levels {
            return Err(DepthExceeded {
                level,
                max_levels: self.max_levels,
            });
        }
        Ok(level)
    }

    /// True when `level` sits within the configured ceiling.
    pub fn within_depth(&self, level: i32) -> bool {
        (0..=self.max_levels).contains(&level)
    }
}

impl Default for HierarchyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEVELS)
    }
}
