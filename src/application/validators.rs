use crate::domain::{DepartmentSubtype, NodeType};
use crate::infrastructure::RoleStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Validation error types
#[derive(Debug)]
pub enum ValidationError {
    FieldValidation { field: String, message: String },
    DisallowedParent { child_type: NodeType, parent_type: NodeType },
    DepthExceeded { level: i32, max_levels: i32 },
    CycleDetected { message: String },
    HasActiveChildren,
    InactiveAncestor,
    SelfInheritance,
    DuplicateParentRole,
    MissingParentRole,
    DuplicatePermission,
    PermissionNotFound,
    NameTaken { name: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::FieldValidation { field, message } => {
                write!(f, "Field validation failed: {field} - {message}")
            }
            ValidationError::DisallowedParent {
                child_type,
                parent_type,
            } => {
                write!(f, "A {child_type} cannot be placed under a {parent_type}")
            }
            ValidationError::DepthExceeded { level, max_levels } => {
                write!(
                    f,
                    "Level {level} exceeds the maximum hierarchy depth of {max_levels}"
                )
            }
            ValidationError::CycleDetected { message } => {
                write!(f, "Cycle detected: {message}")
            }
            ValidationError::HasActiveChildren => write!(f, "Node still has active children"),
            ValidationError::InactiveAncestor => write!(f, "An ancestor of the node is inactive"),
            ValidationError::SelfInheritance => write!(f, "A role cannot inherit from itself"),
            ValidationError::DuplicateParentRole => write!(f, "Parent role is already assigned"),
            ValidationError::MissingParentRole => write!(f, "Parent role is not assigned"),
            ValidationError::DuplicatePermission => {
                write!(f, "Role already holds this permission")
            }
            ValidationError::PermissionNotFound => write!(f, "Permission is not found"),
            ValidationError::NameTaken { name } => {
                write!(f, "Role name '{name}' is already taken")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<crate::domain::DepthExceeded> for ValidationError {
    fn from(err: crate::domain::DepthExceeded) -> Self {
        ValidationError::DepthExceeded {
            level: err.level,
            max_levels: err.max_levels,
        }
    }
}

/// Base trait for command validation
#[async_trait]
pub trait CommandValidator<C>: Send + Sync {
    async fn validate(&self, command: &C) -> Result<(), ValidationError>;
}

/// Node command validation rules
pub struct NodeCommandValidator;

impl NodeCommandValidator {
    /// Validates a display name
    pub fn validate_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::FieldValidation {
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
            });
        }
        if name.chars().count() > 255 {
            return Err(ValidationError::FieldValidation {
                field: "name".to_string(),
                message: "Name must be at most 255 characters long".to_string(),
            });
        }
        Ok(())
    }

    /// Validates an identifier field
    pub fn validate_id(field: &str, id: &str) -> Result<(), ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::FieldValidation {
                field: field.to_string(),
                message: "Identifier cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validates that a department subtype is present exactly for departments
    pub fn validate_subtype_pairing(
        node_type: NodeType,
        subtype: Option<DepartmentSubtype>,
    ) -> Result<(), ValidationError> {
        match (node_type, subtype) {
            (NodeType::Department, None) => Err(ValidationError::FieldValidation {
                field: "department_subtype".to_string(),
                message: "Departments require a subtype".to_string(),
            }),
            (NodeType::Department, Some(_)) => Ok(()),
            (_, Some(_)) => Err(ValidationError::FieldValidation {
                field: "department_subtype".to_string(),
                message: "Only departments carry a subtype".to_string(),
            }),
            (_, None) => Ok(()),
        }
    }
}

/// Role command validation rules
pub struct RoleCommandValidator;

impl RoleCommandValidator {
    /// Validates a role name
    pub fn validate_role_name(name: &str) -> Result<(), ValidationError> {
        NodeCommandValidator::validate_name(name)
    }

    /// Validates a permission string
    pub fn validate_permission(permission: &str) -> Result<(), ValidationError> {
        if permission.trim().is_empty() {
            return Err(ValidationError::FieldValidation {
                field: "permission".to_string(),
                message: "Permission cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Create node command validation
pub struct CreateNodeCommandValidator;

#[async_trait]
impl CommandValidator<crate::application::commands::CreateNodeCommand>
    for CreateNodeCommandValidator
{
    async fn validate(
        &self,
        command: &crate::application::commands::CreateNodeCommand,
    ) -> Result<(), ValidationError> {
        NodeCommandValidator::validate_name(&command.name)?;
        NodeCommandValidator::validate_subtype_pairing(
            command.node_type,
            command.department_subtype,
        )?;

        if let Some(parent_id) = &command.parent_id {
            NodeCommandValidator::validate_id("parent_id", parent_id)?;
        }

        Ok(())
    }
}

/// Move node command validation
pub struct MoveNodeCommandValidator;

#[async_trait]
impl CommandValidator<crate::application::commands::MoveNodeCommand> for MoveNodeCommandValidator {
    async fn validate(
        &self,
        command: &crate::application::commands::MoveNodeCommand,
    ) -> Result<(), ValidationError> {
        NodeCommandValidator::validate_id("node_id", &command.node_id)?;
        NodeCommandValidator::validate_id("new_parent_id", &command.new_parent_id)?;

        if command.node_id == command.new_parent_id {
            return Err(ValidationError::CycleDetected {
                message: "a node cannot become its own parent".to_string(),
            });
        }

        Ok(())
    }
}

/// Add children command validation
pub struct AddChildrenCommandValidator;

#[async_trait]
impl CommandValidator<crate::application::commands::AddChildrenCommand>
    for AddChildrenCommandValidator
{
    async fn validate(
        &self,
        command: &crate::application::commands::AddChildrenCommand,
    ) -> Result<(), ValidationError> {
        NodeCommandValidator::validate_id("parent_id", &command.parent_id)?;

        if command.child_ids.is_empty() {
            return Err(ValidationError::FieldValidation {
                field: "child_ids".to_string(),
                message: "At least one child must be given".to_string(),
            });
        }

        for child_id in &command.child_ids {
            NodeCommandValidator::validate_id("child_ids", child_id)?;
            if *child_id == command.parent_id {
                return Err(ValidationError::CycleDetected {
                    message: "a node cannot become its own parent".to_string(),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for child_id in &command.child_ids {
            if !seen.insert(child_id) {
                return Err(ValidationError::FieldValidation {
                    field: "child_ids".to_string(),
                    message: format!("Child '{child_id}' is listed twice"),
                });
            }
        }

        Ok(())
    }
}

/// Create role command validation, backed by the store for name uniqueness
pub struct CreateRoleCommandValidator {
    role_store: Arc<dyn RoleStore>,
}

impl CreateRoleCommandValidator {
    pub fn new(role_store: Arc<dyn RoleStore>) -> Self {
        Self { role_store }
    }
}

#[async_trait]
impl CommandValidator<crate::application::commands::CreateRoleCommand>
    for CreateRoleCommandValidator
{
    async fn validate(
        &self,
        command: &crate::application::commands::CreateRoleCommand,
    ) -> Result<(), ValidationError> {
        RoleCommandValidator::validate_role_name(&command.name)?;

        for permission in &command.permissions {
            RoleCommandValidator::validate_permission(permission)?;
        }

        let existing = self
            .role_store
            .find_by_name(&command.name)
            .await
            .map_err(|e| ValidationError::FieldValidation {
                field: "name".to_string(),
                message: e.to_string(),
            })?;
        if existing.is_some() {
            return Err(ValidationError::NameTaken {
                name: command.name.clone(),
            });
        }

        Ok(())
    }
}
