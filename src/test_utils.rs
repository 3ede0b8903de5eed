use crate::application::CommandFactory;
use crate::application::services::{
    ChartBuilder, HierarchyService, PermissionResolver, RoleGraphService,
};
use crate::domain::{DepartmentSubtype, HierarchyNode, HierarchyPolicy, NodeType, Role};
use crate::infrastructure::{InMemoryOrgStore, InMemoryRoleStore, InMemoryUserDirectory};
use std::sync::Arc;

// Type aliases to reduce complexity
type ChartFixture = (Arc<HierarchyService>, Arc<InMemoryUserDirectory>, ChartBuilder);

/// Creates a hierarchy service over a fresh in-memory store
pub fn create_hierarchy_service(max_levels: u32) -> HierarchyService {
    HierarchyService {
        org_store: Arc::new(InMemoryOrgStore::new()),
        policy: HierarchyPolicy::new(max_levels),
    }
}

/// Creates a role graph service and its resolver over a fresh in-memory store
pub fn create_role_graph_service() -> RoleGraphService {
    let role_store: Arc<InMemoryRoleStore> = Arc::new(InMemoryRoleStore::new());
    RoleGraphService {
        role_store: role_store.clone(),
        resolver: Arc::new(PermissionResolver::new(role_store)),
    }
}

/// Creates a chart builder together with the hierarchy service and directory
/// it reads from
pub fn create_chart_fixture(max_levels: u32) -> ChartFixture {
    let hierarchy = Arc::new(create_hierarchy_service(max_levels));
    let directory = Arc::new(InMemoryUserDirectory::new());
    let builder = ChartBuilder {
        hierarchy: hierarchy.clone(),
        directory: directory.clone(),
    };
    (hierarchy, directory, builder)
}

/// Creates a test node with default values
pub fn create_test_node(node_type: NodeType, name: &str) -> HierarchyNode {
    HierarchyNode::new(node_type, name.to_string())
}

/// Creates a test role with the given direct permissions
pub fn create_test_role(name: &str, permissions: &[&str]) -> Role {
    let mut role = Role::new(name.to_string(), None);
    for permission in permissions {
        role.grant_permission(permission.to_string());
    }
    role
}

/// Nodes of the standard sample tree
pub struct SampleTree {
    pub company: HierarchyNode,
    pub division: HierarchyNode,
    pub functional_department: HierarchyNode,
    pub local_department: HierarchyNode,
}

/// Seeds a company > division > two departments tree through the service, one
/// department per subtype
pub async fn seed_sample_tree(service: &HierarchyService) -> SampleTree {
    let company = service
        .create_node(CommandFactory::create_node(
            NodeType::Company,
            "Acme Group".to_string(),
            None,
            None,
        ))
        .await
        .expect("sample company must be created");

    let division = service
        .create_node(CommandFactory::create_node(
            NodeType::Division,
            "EMEA".to_string(),
            Some(company.id.clone()),
            None,
        ))
        .await
        .expect("sample division must be created");

    let functional_department = service
        .create_node(CommandFactory::create_node(
            NodeType::Department,
            "Payroll".to_string(),
            Some(division.id.clone()),
            Some(DepartmentSubtype::Functional),
        ))
        .await
        .expect("sample functional department must be created");

    let local_department = service
        .create_node(CommandFactory::create_node(
            NodeType::Department,
            "Berlin Office".to_string(),
            Some(division.id.clone()),
            Some(DepartmentSubtype::Local),
        ))
        .await
        .expect("sample local department must be created");

    SampleTree {
        company,
        division,
        functional_department,
        local_department,
    }
}

/// Roles of the diamond sample graph: child inherits base along two paths
pub struct SampleRoleDiamond {
    pub base: Role,
    pub left: Role,
    pub right: Role,
    pub child: Role,
}

/// Seeds a diamond inheritance graph through the service. Direct permissions:
/// base has `p-base`, left `p-left`, right `p-right`, child `p-child`.
pub async fn seed_role_diamond(service: &RoleGraphService) -> SampleRoleDiamond {
    let base = service
        .create_role(CommandFactory::create_role(
            "base".to_string(),
            Some("Diamond root".to_string()),
            vec!["p-base".to_string()],
        ))
        .await
        .expect("base role must be created");
    let left = service
        .create_role(CommandFactory::create_role(
            "left".to_string(),
            None,
            vec!["p-left".to_string()],
        ))
        .await
        .expect("left role must be created");
    let right = service
        .create_role(CommandFactory::create_role(
            "right".to_string(),
            None,
            vec!["p-right".to_string()],
        ))
        .await
        .expect("right role must be created");
    let child = service
        .create_role(CommandFactory::create_role(
            "child".to_string(),
            None,
            vec!["p-child".to_string()],
        ))
        .await
        .expect("child role must be created");

    for (role_id, parent_id) in [
        (&left.id, &base.id),
        (&right.id, &base.id),
        (&child.id, &left.id),
        (&child.id, &right.id),
    ] {
        service
            .add_parent_role(CommandFactory::add_parent_role(
                role_id.clone(),
                parent_id.clone(),
            ))
            .await
            .expect("diamond edge must be added");
    }

    SampleRoleDiamond {
        base,
        left,
        right,
        child,
    }
}
