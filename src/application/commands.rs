use crate::domain::{DepartmentSubtype, NodeType};

/// Command to create a hierarchy node
pub struct CreateNodeCommand {
    pub node_type: NodeType,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub head_user_id: Option<String>,
    pub department_subtype: Option<DepartmentSubtype>,
    pub metadata: Option<serde_json::Value>,
}

/// Command to edit a node in place (never moves it)
pub struct UpdateNodeCommand {
    pub node_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub head_user_id: Option<String>,
}

/// Command to re-parent a node together with its subtree
pub struct MoveNodeCommand {
    pub node_id: String,
    pub new_parent_id: String,
}

/// Command to attach a batch of existing nodes under one parent
pub struct AddChildrenCommand {
    pub parent_id: String,
    pub child_ids: Vec<String>,
}

/// Command to deactivate a node
pub struct DeactivateNodeCommand {
    pub node_id: String,
}

/// Command to reactivate a node
pub struct ReactivateNodeCommand {
    pub node_id: String,
}

/// Command to create a role
pub struct CreateRoleCommand {
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
}

/// Command to add a role inheritance edge
pub struct AddParentRoleCommand {
    pub role_id: String,
    pub parent_role_id: String,
}

/// Command to remove a role inheritance edge
pub struct RemoveParentRoleCommand {
    pub role_id: String,
    pub parent_role_id: String,
}

/// Command to grant a permission to a role
pub struct GrantPermissionCommand {
    pub role_id: String,
    pub permission: String,
}

/// Command to revoke a permission from a role
pub struct RevokePermissionCommand {
    pub role_id: String,
    pub permission: String,
}

/// Command factory for building commands from caller input
pub struct CommandFactory;

impl CommandFactory {
    pub fn create_node(
        node_type: NodeType,
        name: String,
        parent_id: Option<String>,
        department_subtype: Option<DepartmentSubtype>,
    ) -> CreateNodeCommand {
        CreateNodeCommand {
            node_type,
            name,
            description: None,
            parent_id,
            head_user_id: None,
            department_subtype,
            metadata: None,
        }
    }

    pub fn update_node(
        node_id: String,
        name: Option<String>,
        description: Option<String>,
        head_user_id: Option<String>,
    ) -> UpdateNodeCommand {
        UpdateNodeCommand {
            node_id,
            name,
            description,
            head_user_id,
        }
    }

    pub fn move_node(node_id: String, new_parent_id: String) -> MoveNodeCommand {
        MoveNodeCommand {
            node_id,
            new_parent_id,
        }
    }

    pub fn add_children(parent_id: String, child_ids: Vec<String>) -> AddChildrenCommand {
        AddChildrenCommand {
            parent_id,
            child_ids,
        }
    }

    pub fn deactivate_node(node_id: String) -> DeactivateNodeCommand {
        DeactivateNodeCommand { node_id }
    }

    pub fn reactivate_node(node_id: String) -> ReactivateNodeCommand {
        ReactivateNodeCommand { node_id }
    }

    pub fn create_role(
        name: String,
        description: Option<String>,
        permissions: Vec<String>,
    ) -> CreateRoleCommand {
        CreateRoleCommand {
            name,
            description,
            permissions,
        }
    }

    pub fn add_parent_role(role_id: String, parent_role_id: String) -> AddParentRoleCommand {
        AddParentRoleCommand {
            role_id,
            parent_role_id,
        }
    }

    pub fn remove_parent_role(role_id: String, parent_role_id: String) -> RemoveParentRoleCommand {
        RemoveParentRoleCommand {
            role_id,
            parent_role_id,
        }
    }

    pub fn grant_permission(role_id: String, permission: String) -> GrantPermissionCommand {
        GrantPermissionCommand {
            role_id,
            permission,
        }
    }

    pub fn revoke_permission(role_id: String, permission: String) -> RevokePermissionCommand {
        RevokePermissionCommand {
            role_id,
            permission,
        }
    }
}
