use super::{RoleStore, StoreError, StoreResult};
use crate::domain::role::Role;
use async_trait::async_trait;

pub struct InMemoryRoleStore {
    pub roles: std::sync::Mutex<Vec<Role>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self {
            roles: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for InMemoryRoleStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_version(roles: &[Role], incoming: &Role) -> StoreResult<()> {
    match roles.iter().find(|r| r.id == incoming.id) {
        Some(stored) if stored.version != incoming.version => Err(StoreError::VersionConflict {
            id: incoming.id.clone(),
            expected: incoming.version,
            found: stored.version,
        }),
        Some(_) => Ok(()),
        None if incoming.version == 0 => Ok(()),
        None => Err(StoreError::MissingRecord(incoming.id.clone())),
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn get(&self, id: &str) -> StoreResult<Option<Role>> {
        let roles = self.roles.lock().unwrap();
        Ok(roles.iter().find(|r| r.id == id).cloned())
    }

    async fn save(&self, mut role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.lock().unwrap();
        check_version(&roles, &role)?;
        role.version += 1;
        match roles.iter_mut().find(|r| r.id == role.id) {
            Some(slot) => *slot = role.clone(),
            None => roles.push(role.clone()),
        }
        Ok(role)
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let roles = self.roles.lock().unwrap();
        Ok(roles.iter().find(|r| r.name == name).cloned())
    }

    async fn count_roles(&self) -> StoreResult<u64> {
        let roles = self.roles.lock().unwrap();
        Ok(roles.len() as u64)
    }
}
