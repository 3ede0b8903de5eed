use super::{OrgStore, StoreError, StoreResult};
use crate::domain::node::{HierarchyNode, NodeType};
use async_trait::async_trait;

pub struct InMemoryOrgStore {
    pub nodes: std::sync::Mutex<Vec<HierarchyNode>>,
}

impl InMemoryOrgStore {
    pub fn new() -> Self {
        Self {
            nodes: std::sync::Mutex::new(vec![]),
        }
    }
}

impl Default for InMemoryOrgStore {
    fn default() -> Self {
        Self::new()
    }
}

// An unknown id is accepted only with version 0 (first save); a known id
// must carry the stored version exactly.
fn check_version(nodes: &[HierarchyNode], incoming: &HierarchyNode) -> StoreResult<()> {
    match nodes.iter().find(|n| n.id == incoming.id) {
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

fn store_one(
    nodes: &mut Vec<HierarchyNode>,
    mut incoming: HierarchyNode,
) -> StoreResult<HierarchyNode> {
    check_version(nodes, &incoming)?;
    incoming.version += 1;
    match nodes.iter_mut().find(|n| n.id == incoming.id) {
        Some(slot) => *slot = incoming.clone(),
        None => nodes.push(incoming.clone()),
    }
    Ok(incoming)
}

#[async_trait]
impl OrgStore for InMemoryOrgStore {
    async fn get(&self, id: &str) -> StoreResult<Option<HierarchyNode>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.iter().find(|n| n.id == id).cloned())
    }

    async fn save(&self, node: HierarchyNode) -> StoreResult<HierarchyNode> {
        let mut nodes = self.nodes.lock().unwrap();
        store_one(&mut nodes, node)
    }

    async fn save_all(&self, batch: Vec<HierarchyNode>) -> StoreResult<Vec<HierarchyNode>> {
        let mut nodes = self.nodes.lock().unwrap();
        // Every stamp is checked before anything is written so a conflict
        // anywhere aborts the whole batch. A repeated id would slip past the
        // pre-check and half-apply, so it is refused outright.
        let mut ids = std::collections::HashSet::new();
        for node in &batch {
            if !ids.insert(node.id.clone()) {
                return Err(StoreError::DuplicateInBatch(node.id.clone()));
            }
            check_version(&nodes, node)?;
        }
        batch
            .into_iter()
            .map(|node| store_one(&mut nodes, node))
            .collect()
    }

    async fn find_children(&self, parent_id: &str) -> StoreResult<Vec<HierarchyNode>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn find_by_type(&self, node_type: NodeType) -> StoreResult<Vec<HierarchyNode>> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect())
    }
}
