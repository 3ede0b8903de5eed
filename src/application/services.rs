use crate::application::commands::{
    AddChildrenCommand, AddParentRoleCommand, CreateNodeCommand, CreateRoleCommand,
    DeactivateNodeCommand, GrantPermissionCommand, MoveNodeCommand, ReactivateNodeCommand,
    RemoveParentRoleCommand, RevokePermissionCommand, UpdateNodeCommand,
};
use crate::application::events::EventFactory;
use crate::application::queries::{BuildChartQuery, ListChildrenQuery, PaginatedResult, SortOrder};
use crate::application::validators::{
    AddChildrenCommandValidator, CommandValidator, CreateNodeCommandValidator,
    CreateRoleCommandValidator, MoveNodeCommandValidator, NodeCommandValidator,
    RoleCommandValidator, ValidationError,
};
use crate::domain::{ChartMode, ChartNode, HierarchyNode, HierarchyPolicy, NodeType, Role};
use crate::infrastructure::{OrgStore, RoleStore, StoreError, UserDirectory};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Service-level error. The four kinds are distinguishable so callers can map
/// them onto their own responses: bad input, missing record, lost race,
/// corrupted data.
#[derive(Debug)]
pub enum OrgError {
    Validation(ValidationError),
    NotFound(String),
    Conflict {
        id: String,
        expected: i64,
        found: i64,
    },
    Consistency(String),
}

impl std::fmt::Display for OrgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrgError::Validation(err) => write!(f, "{err}"),
            OrgError::NotFound(id) => write!(f, "'{id}' was not found"),
            OrgError::Conflict {
                id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Concurrent update on '{id}': expected version {expected}, found {found}"
                )
            }
            OrgError::Consistency(detail) => write!(f, "Inconsistent hierarchy data: {detail}"),
        }
    }
}

impl std::error::Error for OrgError {}

impl From<ValidationError> for OrgError {
    fn from(err: ValidationError) -> Self {
        OrgError::Validation(err)
    }
}

impl From<StoreError> for OrgError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict {
                id,
                expected,
                found,
            } => OrgError::Conflict {
                id,
                expected,
                found,
            },
            StoreError::MissingRecord(id) => OrgError::NotFound(id),
            StoreError::DuplicateInBatch(id) => {
                OrgError::Consistency(format!("record '{id}' was written twice in one batch"))
            }
        }
    }
}

pub type OrgResult<T> = Result<T, OrgError>;

/// Owns every structural mutation of the organizational tree and enforces
/// the hierarchy policy on each of them.
pub struct HierarchyService {
    pub org_store: Arc<dyn OrgStore>,
    pub policy: HierarchyPolicy,
}

impl HierarchyService {
    /// Fetches a node by id.
    pub async fn get_node(&self, node_id: &str) -> OrgResult<HierarchyNode> {
        self.org_store
            .get(node_id)
            .await?
            .ok_or_else(|| OrgError::NotFound(node_id.to_string()))
    }

    /// Creates a node, attached under a parent or standing as a root.
    #[instrument(
        name = "create_node",
        skip(self, command),
        fields(node_type = %command.node_type, name = %command.name)
    )]
    pub async fn create_node(&self, command: CreateNodeCommand) -> OrgResult<HierarchyNode> {
        CreateNodeCommandValidator.validate(&command).await?;

        let mut node = HierarchyNode::new(command.node_type, command.name);
        node.description = command.description;
        node.head_user_id = command.head_user_id;
        node.department_subtype = command.department_subtype;
        if let Some(metadata) = command.metadata {
            node.metadata = metadata;
        }

        match &command.parent_id {
            Some(parent_id) => {
                let parent = self.active_parent(parent_id).await?;
                self.check_type_pair(node.node_type, &parent)?;
                let level = self
                    .policy
                    .next_level(parent.level)
                    .map_err(ValidationError::from)?;
                node.attach_to(parent.id.clone(), level);
            }
            None => {
                if !self.policy.may_be_root(node.node_type) {
                    return Err(ValidationError::FieldValidation {
                        field: "parent_id".to_string(),
                        message: format!("A {} requires a parent", node.node_type),
                    }
                    .into());
                }
            }
        }

        let saved = self.org_store.save(node).await?;
        let event =
            EventFactory::node_created(saved.id.clone(), saved.node_type, saved.name.clone());
        info!(event_id = %event.event_id, node_id = %saved.id, "Node created");
        Ok(saved)
    }

    /// Edits name, description, or head user in place. Never moves the node.
    #[instrument(name = "update_node", skip(self, command), fields(node_id = %command.node_id))]
    pub async fn update_node(&self, command: UpdateNodeCommand) -> OrgResult<HierarchyNode> {
        NodeCommandValidator::validate_id("node_id", &command.node_id)?;
        if let Some(name) = &command.name {
            NodeCommandValidator::validate_name(name)?;
        }

        let mut node = self.get_node(&command.node_id).await?;
        if let Some(name) = command.name {
            node.name = name;
        }
        if let Some(description) = command.description {
            node.description = Some(description);
        }
        if let Some(head_user_id) = command.head_user_id {
            node.head_user_id = Some(head_user_id);
        }
        node.touch();

        let saved = self.org_store.save(node).await?;
        let event = EventFactory::node_updated(saved.id.clone());
        info!(event_id = %event.event_id, node_id = %saved.id, "Node updated");
        Ok(saved)
    }

    /// Re-parents a node and recomputes the level of its whole subtree. All
    /// level updates land in a single batch, so a failure anywhere leaves the
    /// tree untouched.
    #[instrument(
        name = "move_node",
        skip(self, command),
        fields(node_id = %command.node_id, new_parent_id = %command.new_parent_id)
    )]
    pub async fn move_node(&self, command: MoveNodeCommand) -> OrgResult<HierarchyNode> {
        MoveNodeCommandValidator.validate(&command).await?;

        let node = self.get_node(&command.node_id).await?;
        let parent = self.active_parent(&command.new_parent_id).await?;
        self.check_type_pair(node.node_type, &parent)?;

        // The new parent must not sit inside the moved subtree
        let chain = self.ancestor_chain(&parent.id).await?;
        if chain.iter().any(|ancestor| ancestor.id == node.id) {
            error!(node_id = %node.id, "Move refused, it would close a cycle");
            return Err(ValidationError::CycleDetected {
                message: format!(
                    "'{}' is an ancestor of '{}'",
                    command.node_id, command.new_parent_id
                ),
            }
            .into());
        }

        let new_level = self
            .policy
            .next_level(parent.level)
            .map_err(ValidationError::from)?;
        let delta = new_level - node.level;

        let mut batch = Vec::new();
        let mut moved = node.clone();
        moved.attach_to(parent.id.clone(), new_level);
        batch.push(moved);
        if delta != 0 {
            self.collect_subtree_updates(&node.id, delta, &mut batch)
                .await?;
        }

        let count = batch.len();
        let saved = self.org_store.save_all(batch).await?;
        let moved = saved
            .into_iter()
            .find(|n| n.id == command.node_id)
            .ok_or_else(|| {
                OrgError::Consistency(format!(
                    "node '{}' missing from its own move batch",
                    command.node_id
                ))
            })?;
        let event = EventFactory::node_moved(
            command.node_id.clone(),
            command.new_parent_id.clone(),
            count,
        );
        info!(
            event_id = %event.event_id,
            node_id = %command.node_id,
            nodes_updated = count,
            "Node moved"
        );
        Ok(moved)
    }

    /// Attaches a batch of existing nodes under one parent. Each child passes
    /// the same checks as a single move; one bad child rejects the whole batch.
    #[instrument(name = "add_children", skip(self, command), fields(parent_id = %command.parent_id))]
    pub async fn add_children(&self, command: AddChildrenCommand) -> OrgResult<Vec<HierarchyNode>> {
        AddChildrenCommandValidator.validate(&command).await?;

        let parent = self.active_parent(&command.parent_id).await?;
        let chain = self.ancestor_chain(&parent.id).await?;

        let mut batch = Vec::new();
        for child_id in &command.child_ids {
            let child = self.get_node(child_id).await?;
            self.check_type_pair(child.node_type, &parent)?;
            if chain.iter().any(|ancestor| &ancestor.id == child_id) {
                error!(child_id = %child_id, "Attach refused, it would close a cycle");
                return Err(ValidationError::CycleDetected {
                    message: format!(
                        "'{child_id}' is an ancestor of '{}'",
                        command.parent_id
                    ),
                }
                .into());
            }

            let level = self
                .policy
                .next_level(parent.level)
                .map_err(ValidationError::from)?;
            let delta = level - child.level;
            let mut moved = child;
            moved.attach_to(parent.id.clone(), level);
            batch.push(moved);
            if delta != 0 {
                self.collect_subtree_updates(child_id, delta, &mut batch)
                    .await?;
            }
        }

        // A child nested inside another child's subtree would be written twice
        let mut seen = HashSet::new();
        for node in &batch {
            if !seen.insert(node.id.clone()) {
                return Err(ValidationError::FieldValidation {
                    field: "child_ids".to_string(),
                    message: format!("Child '{}' overlaps another child's subtree", node.id),
                }
                .into());
            }
        }

        let wanted: HashSet<String> = command.child_ids.iter().cloned().collect();
        let saved = self.org_store.save_all(batch).await?;
        let children: Vec<HierarchyNode> = saved
            .into_iter()
            .filter(|n| wanted.contains(&n.id))
            .collect();

        let event =
            EventFactory::children_added(command.parent_id.clone(), command.child_ids.clone());
        info!(
            event_id = %event.event_id,
            parent_id = %command.parent_id,
            children = children.len(),
            "Children attached"
        );
        Ok(children)
    }

    /// Active nodes whose type may carry a child of `node_type`.
    pub async fn get_valid_parents(&self, node_type: NodeType) -> OrgResult<Vec<HierarchyNode>> {
        let mut parents = Vec::new();
        for parent_type in self.policy.allowed_parent_types(node_type) {
            let nodes = self.org_store.find_by_type(parent_type).await?;
            parents.extend(nodes.into_iter().filter(|n| n.active));
        }
        Ok(parents)
    }

    /// Immediate children of a node, paginated. Never recurses.
    pub async fn get_children(
        &self,
        query: ListChildrenQuery,
    ) -> OrgResult<PaginatedResult<HierarchyNode>> {
        self.get_node(&query.parent_id).await?;

        let mut children = self.org_store.find_children(&query.parent_id).await?;
        if !query.include_inactive {
            children.retain(|c| c.active);
        }
        if let Some(filter) = &query.name_filter {
            let needle = filter.to_lowercase();
            children.retain(|c| c.name.to_lowercase().contains(&needle));
        }
        children.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        if query.sort_order == Some(SortOrder::Desc) {
            children.reverse();
        }

        let page = query.page.max(1);
        let page_size = if query.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size
        };
        let total_count = children.len() as u64;
        let start = ((page - 1) as usize).saturating_mul(page_size as usize);
        let items: Vec<HierarchyNode> = children
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .collect();
        Ok(PaginatedResult::new(items, total_count, page, page_size))
    }

    /// Immediate active children, unpaginated, ordered by name.
    pub async fn active_children(&self, node_id: &str) -> OrgResult<Vec<HierarchyNode>> {
        let mut children = self.org_store.find_children(node_id).await?;
        children.retain(|c| c.active);
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    /// Deactivates a node. Refused while any direct child is still active;
    /// deactivation never cascades.
    #[instrument(name = "deactivate_node", skip(self, command), fields(node_id = %command.node_id))]
    pub async fn deactivate(&self, command: DeactivateNodeCommand) -> OrgResult<HierarchyNode> {
        NodeCommandValidator::validate_id("node_id", &command.node_id)?;
        let mut node = self.get_node(&command.node_id).await?;

        let children = self.org_store.find_children(&node.id).await?;
        if children.iter().any(|c| c.active) {
            error!(node_id = %node.id, "Deactivation refused, active children remain");
            return Err(ValidationError::HasActiveChildren.into());
        }

        node.deactivate();
        let saved = self.org_store.save(node).await?;
        let event = EventFactory::node_deactivated(saved.id.clone());
        info!(event_id = %event.event_id, node_id = %saved.id, "Node deactivated");
        Ok(saved)
    }

    /// Reactivates a node, permitted only while every ancestor is active.
    #[instrument(name = "reactivate_node", skip(self, command), fields(node_id = %command.node_id))]
    pub async fn reactivate(&self, command: ReactivateNodeCommand) -> OrgResult<HierarchyNode> {
        NodeCommandValidator::validate_id("node_id", &command.node_id)?;
        let mut node = self.get_node(&command.node_id).await?;

        if let Some(parent_id) = &node.parent_id {
            let chain = self.ancestor_chain(parent_id).await?;
            if let Some(ancestor) = chain.iter().find(|a| !a.active) {
                error!(
                    node_id = %node.id,
                    ancestor_id = %ancestor.id,
                    "Reactivation refused, inactive ancestor"
                );
                return Err(ValidationError::InactiveAncestor.into());
            }
        }

        node.activate();
        let saved = self.org_store.save(node).await?;
        let event = EventFactory::node_reactivated(saved.id.clone());
        info!(event_id = %event.event_id, node_id = %saved.id, "Node reactivated");
        Ok(saved)
    }

    async fn active_parent(&self, parent_id: &str) -> OrgResult<HierarchyNode> {
        self.org_store
            .get(parent_id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| OrgError::NotFound(parent_id.to_string()))
    }

    fn check_type_pair(
        &self,
        child_type: NodeType,
        parent: &HierarchyNode,
    ) -> Result<(), ValidationError> {
        if !self.policy.allowed_parent(child_type, parent.node_type) {
            return Err(ValidationError::DisallowedParent {
                child_type,
                parent_type: parent.node_type,
            });
        }
        Ok(())
    }

    /// Walks parent links from `start_id` up to the root, returning the nodes
    /// visited, `start_id` included. One hop per configured level; a longer
    /// chain means the stored tree is malformed.
    async fn ancestor_chain(&self, start_id: &str) -> OrgResult<Vec<HierarchyNode>> {
        let mut chain = Vec::new();
        let mut cursor = Some(start_id.to_string());
        let mut hops = 0;
        while let Some(id) = cursor {
            if hops > self.policy.max_levels() {
                return Err(OrgError::Consistency(format!(
                    "ancestor chain of '{start_id}' exceeds {} levels",
                    self.policy.max_levels()
                )));
            }
            let node = self.org_store.get(&id).await?.ok_or_else(|| {
                OrgError::Consistency(format!(
                    "node '{id}' is referenced as an ancestor but does not exist"
                ))
            })?;
            cursor = node.parent_id.clone();
            chain.push(node);
            hops += 1;
        }
        Ok(chain)
    }

    /// Applies a level shift to every descendant of `root_id`, breadth first,
    /// and stages the updated nodes in `batch`. Nothing is written here.
    async fn collect_subtree_updates(
        &self,
        root_id: &str,
        delta: i32,
        batch: &mut Vec<HierarchyNode>,
    ) -> OrgResult<()> {
        let mut queue = VecDeque::from([root_id.to_string()]);
        let mut visited = HashSet::from([root_id.to_string()]);
        while let Some(id) = queue.pop_front() {
            for mut child in self.org_store.find_children(&id).await? {
                if !visited.insert(child.id.clone()) {
                    return Err(OrgError::Consistency(format!(
                        "node '{}' appears twice in the subtree of '{root_id}'",
                        child.id
                    )));
                }
                let level = child.level + delta;
                if !self.policy.within_depth(level) {
                    return Err(ValidationError::DepthExceeded {
                        level,
                        max_levels: self.policy.max_levels(),
                    }
                    .into());
                }
                child.level = level;
                child.touch();
                queue.push_back(child.id.clone());
                batch.push(child);
            }
        }
        Ok(())
    }
}

/// Renders display trees out of the hierarchy, one traversal mode at a time.
pub struct ChartBuilder {
    pub hierarchy: Arc<HierarchyService>,
    pub directory: Arc<dyn UserDirectory>,
}

impl ChartBuilder {
    /// Assembles the chart rooted at `query.root_id`. Department branches are
    /// kept only when their subtype matches the mode; inactive nodes never
    /// appear. A revisited node is rendered as a leaf marked inconsistent
    /// instead of being descended into again.
    #[instrument(
        name = "build_chart",
        skip(self, query),
        fields(root_id = %query.root_id, mode = %query.mode)
    )]
    pub async fn build_chart(&self, query: BuildChartQuery) -> OrgResult<ChartNode> {
        let root = self.hierarchy.get_node(&query.root_id).await?;
        if !root.active {
            return Err(OrgError::NotFound(query.root_id.clone()));
        }

        let mut visited = HashSet::new();
        let chart = self.assemble(root, query.mode, 0, &mut visited).await?;
        info!(root_id = %query.root_id, mode = %query.mode, "Chart assembled");
        Ok(chart)
    }

    fn assemble<'a>(
        &'a self,
        node: HierarchyNode,
        mode: ChartMode,
        depth: i32,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, OrgResult<ChartNode>> {
        async move {
            if !visited.insert(node.id.clone()) {
                error!(node_id = %node.id, "Node revisited during chart traversal");
                let mut entry = ChartNode::from_node(&node);
                entry.mark_inconsistent();
                return Ok(entry);
            }

            let mut entry = ChartNode::from_node(&node);
            entry.head_user_name = self.resolve_head(&node).await;

            // Descent stops at the depth ceiling even if the data goes deeper
            if depth >= self.hierarchy.policy.max_levels() {
                return Ok(entry);
            }

            for child in self.hierarchy.active_children(&node.id).await? {
                if !mode.admits(&child) {
                    continue;
                }
                let rendered = self.assemble(child, mode, depth + 1, visited).await?;
                entry.children.push(rendered);
            }
            Ok(entry)
        }
        .boxed()
    }

    async fn resolve_head(&self, node: &HierarchyNode) -> Option<String> {
        let head_user_id = node.head_user_id.as_deref()?;
        match self.directory.resolve_display_name(head_user_id).await {
            Ok(name) => name,
            Err(err) => {
                warn!(node_id = %node.id, error = %err, "Head display name lookup failed");
                None
            }
        }
    }
}

/// Role records and the inheritance graph between them. Every successful
/// mutation drops the resolver cache.
pub struct RoleGraphService {
    pub role_store: Arc<dyn RoleStore>,
    pub resolver: Arc<PermissionResolver>,
}

impl RoleGraphService {
    /// Fetches a role by id.
    pub async fn get_role(&self, role_id: &str) -> OrgResult<Role> {
        self.role_store
            .get(role_id)
            .await?
            .ok_or_else(|| OrgError::NotFound(role_id.to_string()))
    }

    /// Creates a role with an initial permission set. Role names are unique.
    #[instrument(name = "create_role", skip(self, command), fields(name = %command.name))]
    pub async fn create_role(&self, command: CreateRoleCommand) -> OrgResult<Role> {
        CreateRoleCommandValidator::new(self.role_store.clone())
            .validate(&command)
            .await?;

        let mut role = Role::new(command.name, command.description);
        for permission in command.permissions {
            role.grant_permission(permission);
        }

        let saved = self.role_store.save(role).await?;
        self.resolver.invalidate_all().await;
        let event = EventFactory::role_created(saved.id.clone(), saved.name.clone());
        info!(event_id = %event.event_id, role_id = %saved.id, "Role created");
        Ok(saved)
    }

    /// Adds an inheritance edge from `role_id` to `parent_role_id`. The edge
    /// is refused when the child is already reachable from the parent, so the
    /// graph stays acyclic.
    #[instrument(
        name = "add_parent_role",
        skip(self, command),
        fields(role_id = %command.role_id, parent_role_id = %command.parent_role_id)
    )]
    pub async fn add_parent_role(&self, command: AddParentRoleCommand) -> OrgResult<Role> {
        NodeCommandValidator::validate_id("role_id", &command.role_id)?;
        NodeCommandValidator::validate_id("parent_role_id", &command.parent_role_id)?;

        let mut role = self.get_role(&command.role_id).await?;
        if role.would_self_inherit(&command.parent_role_id) {
            return Err(ValidationError::SelfInheritance.into());
        }
        if role.inherits_directly_from(&command.parent_role_id) {
            return Err(ValidationError::DuplicateParentRole.into());
        }
        self.get_role(&command.parent_role_id).await?;

        if self
            .is_reachable(&command.parent_role_id, &command.role_id)
            .await?
        {
            error!(
                role_id = %command.role_id,
                parent_role_id = %command.parent_role_id,
                "Inheritance edge refused, it would close a cycle"
            );
            return Err(ValidationError::CycleDetected {
                message: format!(
                    "'{}' already inherits from '{}'",
                    command.parent_role_id, command.role_id
                ),
            }
            .into());
        }

        role.add_parent(command.parent_role_id.clone());
        let saved = self.role_store.save(role).await?;
        self.resolver.invalidate_all().await;
        let event =
            EventFactory::parent_role_added(saved.id.clone(), command.parent_role_id.clone());
        info!(event_id = %event.event_id, role_id = %saved.id, "Parent role added");
        Ok(saved)
    }

    /// Removes an inheritance edge. Removing an edge that is not there is an
    /// error, so callers notice drifted state.
    #[instrument(
        name = "remove_parent_role",
        skip(self, command),
        fields(role_id = %command.role_id, parent_role_id = %command.parent_role_id)
    )]
    pub async fn remove_parent_role(&self, command: RemoveParentRoleCommand) -> OrgResult<Role> {
        NodeCommandValidator::validate_id("role_id", &command.role_id)?;
        NodeCommandValidator::validate_id("parent_role_id", &command.parent_role_id)?;

        let mut role = self.get_role(&command.role_id).await?;
        if !role.remove_parent(&command.parent_role_id) {
            return Err(ValidationError::MissingParentRole.into());
        }

        let saved = self.role_store.save(role).await?;
        self.resolver.invalidate_all().await;
        let event =
            EventFactory::parent_role_removed(saved.id.clone(), command.parent_role_id.clone());
        info!(event_id = %event.event_id, role_id = %saved.id, "Parent role removed");
        Ok(saved)
    }

    /// Grants a direct permission to a role.
    #[instrument(name = "grant_permission", skip(self, command), fields(role_id = %command.role_id))]
    pub async fn grant_permission(&self, command: GrantPermissionCommand) -> OrgResult<Role> {
        NodeCommandValidator::validate_id("role_id", &command.role_id)?;
        RoleCommandValidator::validate_permission(&command.permission)?;

        let mut role = self.get_role(&command.role_id).await?;
        if !role.grant_permission(command.permission.clone()) {
            return Err(ValidationError::DuplicatePermission.into());
        }

        let saved = self.role_store.save(role).await?;
        self.resolver.invalidate_all().await;
        let event = EventFactory::permission_granted(saved.id.clone(), command.permission.clone());
        info!(event_id = %event.event_id, role_id = %saved.id, "Permission granted");
        Ok(saved)
    }

    /// Revokes a direct permission from a role.
    #[instrument(name = "revoke_permission", skip(self, command), fields(role_id = %command.role_id))]
    pub async fn revoke_permission(&self, command: RevokePermissionCommand) -> OrgResult<Role> {
        NodeCommandValidator::validate_id("role_id", &command.role_id)?;
        RoleCommandValidator::validate_permission(&command.permission)?;

        let mut role = self.get_role(&command.role_id).await?;
        if !role.revoke_permission(&command.permission) {
            return Err(ValidationError::PermissionNotFound.into());
        }

        let saved = self.role_store.save(role).await?;
        self.resolver.invalidate_all().await;
        let event = EventFactory::permission_revoked(saved.id.clone(), command.permission.clone());
        info!(event_id = %event.event_id, role_id = %saved.id, "Permission revoked");
        Ok(saved)
    }

    /// Breadth-first walk over parent edges, asking whether `to` is reachable
    /// from `from`. Visits are capped by the total role count.
    async fn is_reachable(&self, from: &str, to: &str) -> OrgResult<bool> {
        let ceiling = self.role_store.count_roles().await?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from.to_string()]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id.clone()) {
                continue;
            }
            if visited.len() as u64 > ceiling {
                return Err(OrgError::Consistency(format!(
                    "role graph traversal from '{from}' visited more roles than exist ({ceiling})"
                )));
            }
            if id == to {
                return Ok(true);
            }
            let role = self.role_store.get(&id).await?.ok_or_else(|| {
                OrgError::Consistency(format!(
                    "role '{id}' is referenced as a parent but does not exist"
                ))
            })?;
            for parent_id in &role.parent_role_ids {
                if !visited.contains(parent_id) {
                    queue.push_back(parent_id.clone());
                }
            }
        }
        Ok(false)
    }
}

/// Computes effective permission sets over the role graph. Resolved sets are
/// cached across calls until a role mutation drops the cache.
pub struct PermissionResolver {
    pub role_store: Arc<dyn RoleStore>,
    cache: RwLock<HashMap<String, HashSet<String>>>,
}

impl PermissionResolver {
    pub fn new(role_store: Arc<dyn RoleStore>) -> Self {
        Self {
            role_store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Effective permissions of a role: its own set unioned with every
    /// ancestor's, each ancestor visited once.
    #[instrument(name = "resolve_permissions", skip(self))]
    pub async fn resolve_permissions(&self, role_id: &str) -> OrgResult<HashSet<String>> {
        if let Some(cached) = self.cache.read().await.get(role_id) {
            return Ok(cached.clone());
        }

        let role = self
            .role_store
            .get(role_id)
            .await?
            .ok_or_else(|| OrgError::NotFound(role_id.to_string()))?;
        let ceiling = self.role_store.count_roles().await?;

        let mut done: HashMap<String, HashSet<String>> = HashMap::new();
        let mut in_path: HashSet<String> = HashSet::from([role_id.to_string()]);
        let mut permissions = role.permissions.clone();
        for parent_id in &role.parent_role_ids {
            let inherited = self
                .resolve_into(parent_id, ceiling, &mut done, &mut in_path)
                .await?;
            permissions.extend(inherited);
        }

        self.cache
            .write()
            .await
            .insert(role_id.to_string(), permissions.clone());
        info!(role_id, permissions = permissions.len(), "Permissions resolved");
        Ok(permissions)
    }

    /// Drops every cached set. Called after any role mutation.
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }

    fn resolve_into<'a>(
        &'a self,
        role_id: &'a str,
        ceiling: u64,
        done: &'a mut HashMap<String, HashSet<String>>,
        in_path: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, OrgResult<HashSet<String>>> {
        async move {
            if let Some(memo) = done.get(role_id) {
                return Ok(memo.clone());
            }
            if !in_path.insert(role_id.to_string()) {
                error!(role_id, "Role inheritance cycle discovered during resolution");
                return Err(OrgError::Consistency(format!(
                    "role '{role_id}' participates in an inheritance cycle"
                )));
            }
            if done.len() as u64 > ceiling {
                return Err(OrgError::Consistency(format!(
                    "role graph resolution visited more roles than exist ({ceiling})"
                )));
            }

            let role = self.role_store.get(role_id).await?.ok_or_else(|| {
                OrgError::Consistency(format!(
                    "role '{role_id}' is referenced as a parent but does not exist"
                ))
            })?;

            let mut permissions = role.permissions.clone();
            for parent_id in &role.parent_role_ids {
                let inherited = self
                    .resolve_into(parent_id, ceiling, done, in_path)
                    .await?;
                permissions.extend(inherited);
            }

            in_path.remove(role_id);
            done.insert(role_id.to_string(), permissions.clone());
            Ok(permissions)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::CommandFactory;
    use crate::domain::DepartmentSubtype;
    use crate::infrastructure::{InMemoryOrgStore, InMemoryRoleStore, InMemoryUserDirectory};

    fn hierarchy_service(max_levels: u32) -> HierarchyService {
        HierarchyService {
            org_store: Arc::new(InMemoryOrgStore::new()),
            policy: HierarchyPolicy::new(max_levels),
        }
    }

    fn role_graph() -> RoleGraphService {
        let role_store: Arc<dyn RoleStore> = Arc::new(InMemoryRoleStore::new());
        RoleGraphService {
            role_store: role_store.clone(),
            resolver: Arc::new(PermissionResolver::new(role_store)),
        }
    }

    async fn create_company(service: &HierarchyService, name: &str) -> HierarchyNode {
        service
            .create_node(CommandFactory::create_node(
                NodeType::Company,
                name.to_string(),
                None,
                None,
            ))
            .await
            .unwrap()
    }

    async fn create_child(
        service: &HierarchyService,
        node_type: NodeType,
        name: &str,
        parent_id: &str,
        subtype: Option<DepartmentSubtype>,
    ) -> HierarchyNode {
        service
            .create_node(CommandFactory::create_node(
                node_type,
                name.to_string(),
                Some(parent_id.to_string()),
                subtype,
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_node_levels() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        assert_eq!(company.level, 0);
        assert!(company.is_root());

        let division =
            create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;
        assert_eq!(division.level, 1);
        assert_eq!(division.parent_id.as_deref(), Some(company.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_node_rejects_disallowed_pair() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        let division =
            create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;

        let err = service
            .create_node(CommandFactory::create_node(
                NodeType::Division,
                "Nested".to_string(),
                Some(division.id.clone()),
                None,
            ))
            .await
            .unwrap_err();
        match err {
            OrgError::Validation(ValidationError::DisallowedParent { .. }) => {}
            other => panic!("expected DisallowedParent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_department_cannot_be_root() {
        let service = hierarchy_service(5);

        let err = service
            .create_node(CommandFactory::create_node(
                NodeType::Department,
                "Lonely".to_string(),
                None,
                Some(DepartmentSubtype::Functional),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrgError::Validation(ValidationError::FieldValidation { .. })
        ));
    }

    #[tokio::test]
    async fn test_depth_ceiling() {
        let service = hierarchy_service(2);

        let company = create_company(&service, "Acme").await;
        let d1 = create_child(
            &service,
            NodeType::Department,
            "L1",
            &company.id,
            Some(DepartmentSubtype::Functional),
        )
        .await;
        let d2 = create_child(
            &service,
            NodeType::Department,
            "L2",
            &d1.id,
            Some(DepartmentSubtype::Functional),
        )
        .await;
        assert_eq!(d2.level, 2);

        let err = service
            .create_node(CommandFactory::create_node(
                NodeType::Department,
                "L3".to_string(),
                Some(d2.id.clone()),
                Some(DepartmentSubtype::Functional),
            ))
            .await
            .unwrap_err();
        match err {
            OrgError::Validation(ValidationError::DepthExceeded { level, max_levels }) => {
                assert_eq!(level, 3);
                assert_eq!(max_levels, 2);
            }
            other => panic!("expected DepthExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_move_node_into_own_subtree_is_rejected() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        let division =
            create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;
        let department = create_child(
            &service,
            NodeType::Department,
            "Sales",
            &division.id,
            Some(DepartmentSubtype::Local),
        )
        .await;

        let err = service
            .move_node(CommandFactory::move_node(
                division.id.clone(),
                department.id.clone(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrgError::Validation(ValidationError::CycleDetected { .. })
        ));

        // The failed move must leave the tree untouched
        let unchanged = service.get_node(&division.id).await.unwrap();
        assert_eq!(unchanged.parent_id.as_deref(), Some(company.id.as_str()));
        assert_eq!(unchanged.level, 1);
    }

    #[tokio::test]
    async fn test_move_node_recomputes_descendant_levels() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        let emea = create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;
        let dept = create_child(
            &service,
            NodeType::Department,
            "Sales",
            &emea.id,
            Some(DepartmentSubtype::Local),
        )
        .await;
        let sub = create_child(
            &service,
            NodeType::Department,
            "Inside Sales",
            &dept.id,
            Some(DepartmentSubtype::Local),
        )
        .await;

        // Move the department directly under the company
        let moved = service
            .move_node(CommandFactory::move_node(dept.id.clone(), company.id.clone()))
            .await
            .unwrap();
        assert_eq!(moved.level, 1);

        let sub_after = service.get_node(&sub.id).await.unwrap();
        assert_eq!(sub_after.level, 2);
    }

    #[tokio::test]
    async fn test_deactivate_with_active_child_is_rejected() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        let division =
            create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;

        let err = service
            .deactivate(CommandFactory::deactivate_node(company.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrgError::Validation(ValidationError::HasActiveChildren)
        ));

        let company_after = service.get_node(&company.id).await.unwrap();
        assert!(company_after.active);

        // After the child goes first the parent may follow
        service
            .deactivate(CommandFactory::deactivate_node(division.id.clone()))
            .await
            .unwrap();
        let company_after = service
            .deactivate(CommandFactory::deactivate_node(company.id.clone()))
            .await
            .unwrap();
        assert!(!company_after.active);
    }

    #[tokio::test]
    async fn test_reactivate_under_inactive_ancestor_is_rejected() {
        let service = hierarchy_service(5);

        let company = create_company(&service, "Acme").await;
        let division =
            create_child(&service, NodeType::Division, "EMEA", &company.id, None).await;

        service
            .deactivate(CommandFactory::deactivate_node(division.id.clone()))
            .await
            .unwrap();
        service
            .deactivate(CommandFactory::deactivate_node(company.id.clone()))
            .await
            .unwrap();

        let err = service
            .reactivate(CommandFactory::reactivate_node(division.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrgError::Validation(ValidationError::InactiveAncestor)
        ));

        service
            .reactivate(CommandFactory::reactivate_node(company.id.clone()))
            .await
            .unwrap();
        let division_after = service
            .reactivate(CommandFactory::reactivate_node(division.id.clone()))
            .await
            .unwrap();
        assert!(division_after.active);
    }

    #[tokio::test]
    async fn test_role_cycle_is_rejected() {
        let service = role_graph();

        let base = service
            .create_role(CommandFactory::create_role("base".to_string(), None, vec![]))
            .await
            .unwrap();
        let mid = service
            .create_role(CommandFactory::create_role("mid".to_string(), None, vec![]))
            .await
            .unwrap();
        let top = service
            .create_role(CommandFactory::create_role("top".to_string(), None, vec![]))
            .await
            .unwrap();

        service
            .add_parent_role(CommandFactory::add_parent_role(
                mid.id.clone(),
                base.id.clone(),
            ))
            .await
            .unwrap();
        service
            .add_parent_role(CommandFactory::add_parent_role(
                top.id.clone(),
                mid.id.clone(),
            ))
            .await
            .unwrap();

        // base -> top would close the loop
        let err = service
            .add_parent_role(CommandFactory::add_parent_role(
                base.id.clone(),
                top.id.clone(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrgError::Validation(ValidationError::CycleDetected { .. })
        ));

        // No edge may have been written
        let base_after = service.get_role(&base.id).await.unwrap();
        assert!(base_after.parent_role_ids.is_empty());
    }

    #[tokio::test]
    async fn test_diamond_resolves_each_permission_once() {
        let service = role_graph();

        let grandparent = service
            .create_role(CommandFactory::create_role(
                "grandparent".to_string(),
                None,
                vec!["p4".to_string()],
            ))
            .await
            .unwrap();
        let left = service
            .create_role(CommandFactory::create_role(
                "left".to_string(),
                None,
                vec!["p2".to_string()],
            ))
            .await
            .unwrap();
        let right = service
            .create_role(CommandFactory::create_role(
                "right".to_string(),
                None,
                vec!["p3".to_string()],
            ))
            .await
            .unwrap();
        let child = service
            .create_role(CommandFactory::create_role(
                "child".to_string(),
                None,
                vec!["p1".to_string()],
            ))
            .await
            .unwrap();

        for (role, parent) in [
            (&left, &grandparent),
            (&right, &grandparent),
            (&child, &left),
            (&child, &right),
        ] {
            service
                .add_parent_role(CommandFactory::add_parent_role(
                    role.id.clone(),
                    parent.id.clone(),
                ))
                .await
                .unwrap();
        }

        let resolved = service.resolver.resolve_permissions(&child.id).await.unwrap();
        let expected: HashSet<String> = ["p1", "p2", "p3", "p4"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn test_resolver_cache_is_invalidated_on_mutation() {
        let service = role_graph();

        let role = service
            .create_role(CommandFactory::create_role(
                "ops".to_string(),
                None,
                vec!["deploy".to_string()],
            ))
            .await
            .unwrap();

        let first = service.resolver.resolve_permissions(&role.id).await.unwrap();
        assert_eq!(first.len(), 1);

        service
            .grant_permission(CommandFactory::grant_permission(
                role.id.clone(),
                "rollback".to_string(),
            ))
            .await
            .unwrap();

        let second = service.resolver.resolve_permissions(&role.id).await.unwrap();
        assert!(second.contains("deploy"));
        assert!(second.contains("rollback"));
    }

    #[tokio::test]
    async fn test_chart_filters_departments_by_mode() {
        let org_store = Arc::new(InMemoryOrgStore::new());
        let hierarchy = Arc::new(HierarchyService {
            org_store: org_store.clone(),
            policy: HierarchyPolicy::new(5),
        });
        let builder = ChartBuilder {
            hierarchy: hierarchy.clone(),
            directory: Arc::new(InMemoryUserDirectory::new()),
        };

        let company = create_company(&hierarchy, "Acme").await;
        let division =
            create_child(&hierarchy, NodeType::Division, "EMEA", &company.id, None).await;
        create_child(
            &hierarchy,
            NodeType::Department,
            "Payroll",
            &division.id,
            Some(DepartmentSubtype::Functional),
        )
        .await;
        create_child(
            &hierarchy,
            NodeType::Department,
            "Berlin Office",
            &division.id,
            Some(DepartmentSubtype::Local),
        )
        .await;

        let functional = builder
            .build_chart(crate::application::queries::QueryFactory::build_chart(
                company.id.clone(),
                ChartMode::Functional,
            ))
            .await
            .unwrap();
        let names: Vec<&str> = functional.children[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Payroll"]);

        let local = builder
            .build_chart(crate::application::queries::QueryFactory::build_chart(
                company.id.clone(),
                ChartMode::Local,
            ))
            .await
            .unwrap();
        let names: Vec<&str> = local.children[0]
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Berlin Office"]);
    }
}
