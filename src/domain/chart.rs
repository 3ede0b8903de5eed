use serde::{Deserialize, Serialize};

use crate::domain::{DepartmentSubtype, HierarchyNode, NodeType};

/// Traversal mode for organizational charts. Department edges are kept only
/// when their subtype matches the mode; the structural backbone of companies
/// and divisions is always kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartMode {
    Functional,
    Local,
}

impl ChartMode {
    pub fn subtype(&self) -> DepartmentSubtype {
        match self {
            ChartMode::Functional => DepartmentSubtype::Functional,
            ChartMode::Local => DepartmentSubtype::Local,
        }
    }

    /// Edge filter: does this mode keep the given node in the chart?
    pub fn admits(&self, node: &HierarchyNode) -> bool {
        match node.node_type {
            NodeType::Company | NodeType::Division => true,
            NodeType::Department => node.matches_subtype(self.subtype()),
        }
    }
}

impl std::fmt::Display for ChartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartMode::Functional => f.write_str("FUNCTIONAL"),
            ChartMode::Local => f.write_str("LOCAL"),
        }
    }
}

/// One rendered entry of an organizational chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNode {
    pub id: String,
    pub name: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub head_user_name: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub inconsistent: bool,
    pub children: Vec<ChartNode>,
}

impl ChartNode {
    /// Renders a node as a childless chart entry; children and head
    /// decoration are filled in by the chart builder.
    pub fn from_node(node: &HierarchyNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type,
            head_user_name: None,
            inconsistent: false,
            children: Vec::new(),
        }
    }

    /// Marks the entry as a branch cut short by a revisited node.
    pub fn mark_inconsistent(&mut self) {
        self.inconsistent = true;
    }
}
