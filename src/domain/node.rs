use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of record participating in the organizational tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Company,
    Division,
    Department,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Company => "COMPANY",
            NodeType::Division => "DIVISION",
            NodeType::Department => "DEPARTMENT",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Department relation discriminant, matched against the chart traversal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepartmentSubtype {
    Functional,
    Local,
}

impl std::fmt::Display for DepartmentSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepartmentSubtype::Functional => f.write_str("FUNCTIONAL"),
            DepartmentSubtype::Local => f.write_str("LOCAL"),
        }
    }
}

/// Hierarchy node aggregate: a Company, Division, or Department record.
///
/// One tagged struct covers all three kinds; `department_subtype` is present
/// exactly when `node_type` is `Department`. `version` is the optimistic
/// concurrency stamp checked by the store on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: String,
    pub node_type: NodeType,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub parent_id: Option<String>,
    pub level: i32,
    pub head_user_id: Option<String>,
    pub department_subtype: Option<DepartmentSubtype>,
    pub metadata: serde_json::Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HierarchyNode {
    /// Creates a fresh, active node with a generated id and zeroed version.
    /// Level and parent linkage are assigned by the hierarchy service.
    pub fn new(node_type: NodeType, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            node_type,
            name,
            description: None,
            active: true,
            parent_id: None,
            level: 0,
            head_user_id: None,
            department_subtype: None,
            metadata: serde_json::Value::Null,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true when the node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Reassigns the parent link and level together so the two never diverge.
    pub fn attach_to(&mut self, parent_id: String, level: i32) {
        self.parent_id = Some(parent_id);
        self.level = level;
        self.touch();
    }

    /// Flips the node inactive.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.touch();
    }

    /// Flips the node back to active.
    pub fn activate(&mut self) {
        self.active = true;
        self.touch();
    }

    /// Updates the modification stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// True for department nodes whose subtype matches the given one.
    pub fn matches_subtype(&self, subtype: DepartmentSubtype) -> bool {
        self.department_subtype == Some(subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> HierarchyNode {
        HierarchyNode::new(NodeType::Division, "Sales".to_string())
    }

    #[test]
    fn test_new_node_defaults() {
        let node = test_node();

        assert!(node.active);
        assert!(node.is_root());
        assert_eq!(node.level, 0);
        assert_eq!(node.version, 0);
        assert!(node.department_subtype.is_none());
        assert!(!node.id.is_empty());
    }

    #[test]
    fn test_attach_to_keeps_parent_and_level_in_sync() {
        let mut node = test_node();
        node.attach_to("parent-1".to_string(), 2);

        assert_eq!(node.parent_id.as_deref(), Some("parent-1"));
        assert_eq!(node.level, 2);
        assert!(!node.is_root());
    }

    #[test]
    fn test_activation_round_trip() {
        let mut node = test_node();
        node.deactivate();
        assert!(!node.active);
        node.activate();
        assert!(node.active);
    }

    #[test]
    fn test_matches_subtype() {
        let mut node = HierarchyNode::new(NodeType::Department, "Finance".to_string());
        node.department_subtype = Some(DepartmentSubtype::Functional);

        assert!(node.matches_subtype(DepartmentSubtype::Functional));
        assert!(!node.matches_subtype(DepartmentSubtype::Local));
    }

    #[test]
    fn test_node_type_display() {
        assert_eq!(NodeType::Company.to_string(), "COMPANY");
        assert_eq!(NodeType::Division.to_string(), "DIVISION");
        assert_eq!(NodeType::Department.to_string(), "DEPARTMENT");
        assert_eq!(DepartmentSubtype::Local.to_string(), "LOCAL");
    }
}
