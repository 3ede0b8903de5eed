use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::NodeType;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> &str;
    fn aggregate_id(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn event_type(&self) -> &str;
}

/// Hierarchy-related domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCreatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub node_id: String,
    pub node_type: NodeType,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeUpdatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMovedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub node_id: String,
    pub new_parent_id: String,
    pub nodes_updated: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildrenAddedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub parent_id: String,
    pub child_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDeactivatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReactivatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub node_id: String,
}

/// Role-related domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub role_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRoleAddedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub parent_role_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRoleRemovedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub parent_role_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrantedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub permission: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRevokedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub permission: String,
}

/// Event factory functions
pub struct EventFactory;

impl EventFactory {
    pub fn node_created(node_id: String, node_type: NodeType, name: String) -> NodeCreatedEvent {
        NodeCreatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: node_id.clone(),
            occurred_at: Utc::now(),
            node_id,
            node_type,
            name,
        }
    }

    pub fn node_updated(node_id: String) -> NodeUpdatedEvent {
        NodeUpdatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: node_id.clone(),
            occurred_at: Utc::now(),
            node_id,
        }
    }

    pub fn node_moved(
        node_id: String,
        new_parent_id: String,
        nodes_updated: usize,
    ) -> NodeMovedEvent {
        NodeMovedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: node_id.clone(),
            occurred_at: Utc::now(),
            node_id,
            new_parent_id,
            nodes_updated,
        }
    }

    pub fn children_added(parent_id: String, child_ids: Vec<String>) -> ChildrenAddedEvent {
        ChildrenAddedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: parent_id.clone(),
            occurred_at: Utc::now(),
            parent_id,
            child_ids,
        }
    }

    pub fn node_deactivated(node_id: String) -> NodeDeactivatedEvent {
        NodeDeactivatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: node_id.clone(),
            occurred_at: Utc::now(),
            node_id,
        }
    }

    pub fn node_reactivated(node_id: String) -> NodeReactivatedEvent {
        NodeReactivatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: node_id.clone(),
            occurred_at: Utc::now(),
            node_id,
        }
    }

    pub fn role_created(role_id: String, role_name: String) -> RoleCreatedEvent {
        RoleCreatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            role_name,
        }
    }

    pub fn parent_role_added(role_id: String, parent_role_id: String) -> ParentRoleAddedEvent {
        ParentRoleAddedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            parent_role_id,
        }
    }

    pub fn parent_role_removed(role_id: String, parent_role_id: String) -> ParentRoleRemovedEvent {
        ParentRoleRemovedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            parent_role_id,
        }
    }

    pub fn permission_granted(role_id: String, permission: String) -> PermissionGrantedEvent {
        PermissionGrantedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            permission,
        }
    }

    pub fn permission_revoked(role_id: String, permission: String) -> PermissionRevokedEvent {
        PermissionRevokedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            permission,
        }
    }
}

/// Implement DomainEvent trait for all events
impl DomainEvent for NodeCreatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "NodeCreated"
    }
}

impl DomainEvent for NodeUpdatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "NodeUpdated"
    }
}

impl DomainEvent for NodeMovedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "NodeMoved"
    }
}

impl DomainEvent for ChildrenAddedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "ChildrenAdded"
    }
}

impl DomainEvent for NodeDeactivatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "NodeDeactivated"
    }
}

impl DomainEvent for NodeReactivatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "NodeReactivated"
    }
}

impl DomainEvent for RoleCreatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RoleCreated"
    }
}

impl DomainEvent for ParentRoleAddedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "ParentRoleAdded"
    }
}

impl DomainEvent for ParentRoleRemovedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "ParentRoleRemoved"
    }
}

impl DomainEvent for PermissionGrantedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "PermissionGranted"
    }
}

impl DomainEvent for PermissionRevokedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "PermissionRevoked"
    }
}
