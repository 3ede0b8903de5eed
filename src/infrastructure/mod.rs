use crate::domain::node::{HierarchyNode, NodeType};
use crate::domain::role::Role;
use async_trait::async_trait;

/// Storage-level failure. Version conflicts are surfaced to services, which
/// map them onto their own error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("version conflict on '{id}': expected {expected}, found {found}")]
    VersionConflict {
        id: String,
        expected: i64,
        found: i64,
    },
    #[error("record '{0}' does not exist")]
    MissingRecord(String),
    #[error("record '{0}' appears more than once in one batch")]
    DuplicateInBatch(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// Infrastructure layer: persistence traits and in-memory adapters
pub mod org_store;
pub use org_store::InMemoryOrgStore;

pub mod role_store;
pub use role_store::InMemoryRoleStore;

/// Persistence of hierarchy nodes. `save` and `save_all` compare the incoming
/// version stamp against the stored one and fail with `VersionConflict` on a
/// mismatch; `save_all` writes its batch atomically or not at all.
#[async_trait]
pub trait OrgStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<HierarchyNode>>;
    async fn save(&self, node: HierarchyNode) -> StoreResult<HierarchyNode>;
    async fn save_all(&self, nodes: Vec<HierarchyNode>) -> StoreResult<Vec<HierarchyNode>>;
    async fn find_children(&self, parent_id: &str) -> StoreResult<Vec<HierarchyNode>>;
    async fn find_by_type(&self, node_type: NodeType) -> StoreResult<Vec<HierarchyNode>>;
}

/// Persistence of roles, with the same version stamping as `OrgStore`.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<Role>>;
    async fn save(&self, role: Role) -> StoreResult<Role>;
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    async fn count_roles(&self) -> StoreResult<u64>;
}

/// Display-name lookup for chart decoration. Never consulted for invariants.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve_display_name(&self, user_id: &str) -> StoreResult<Option<String>>;
}

pub struct InMemoryUserDirectory {
    pub users: std::sync::Mutex<Vec<(String, String)>>, // (user_id, display_name)
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self {
            users: std::sync::Mutex::new(vec![]),
        }
    }

    pub fn insert(&self, user_id: &str, display_name: &str) {
        self.users
            .lock()
            .unwrap()
            .push((user_id.to_string(), display_name.to_string()));
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn resolve_display_name(&self, user_id: &str) -> StoreResult<Option<String>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|(uid, _)| uid == user_id)
            .map(|(_, name)| name.clone()))
    }
}
