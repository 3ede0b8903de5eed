use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role entity: a named bundle of permissions that may inherit from
/// several parent roles. Edges point child to parent; the child side
/// owns the edge set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: HashSet<String>,
    pub parent_role_ids: HashSet<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            permissions: HashSet::new(),
            parent_role_ids: HashSet::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Grants a permission. Returns false when the role already holds it.
    pub fn grant_permission(&mut self, permission: String) -> bool {
        let inserted = self.permissions.insert(permission);
        if inserted {
            self.touch();
        }
        inserted
    }

    /// Revokes a permission. Returns false when the role does not hold it.
    pub fn revoke_permission(&mut self, permission: &str) -> bool {
        let removed = self.permissions.remove(permission);
        if removed {
            self.touch();
        }
        removed
    }

    /// Checks whether the role holds a permission directly (inheritance aside).
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Adds an inheritance edge to a parent role. Returns false on a duplicate.
    pub fn add_parent(&mut self, parent_role_id: String) -> bool {
        let inserted = self.parent_role_ids.insert(parent_role_id);
        if inserted {
            self.touch();
        }
        inserted
    }

    /// Removes an inheritance edge. Returns false when the edge is absent.
    pub fn remove_parent(&mut self, parent_role_id: &str) -> bool {
        let removed = self.parent_role_ids.remove(parent_role_id);
        if removed {
            self.touch();
        }
        removed
    }

    /// Checks if this role directly inherits from the given role.
    pub fn inherits_directly_from(&self, parent_role_id: &str) -> bool {
        self.parent_role_ids.contains(parent_role_id)
    }

    /// Checks if linking to the given parent would trivially self-loop.
    /// Deeper cycles require traversing the whole graph.
    pub fn would_self_inherit(&self, new_parent_id: &str) -> bool {
        self.id == new_parent_id
    }

    /// Updates the modification stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
