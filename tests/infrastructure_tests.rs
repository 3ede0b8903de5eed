use organization_service::domain::{HierarchyNode, NodeType, Role};
use organization_service::infrastructure::{
    InMemoryOrgStore, InMemoryRoleStore, InMemoryUserDirectory, OrgStore, RoleStore, StoreError,
    UserDirectory,
};
use organization_service::test_utils::create_test_role;
use std::sync::Arc;

#[tokio::test]
async fn test_org_store_stamps_versions_on_save() {
    let store = InMemoryOrgStore::new();

    let node = HierarchyNode::new(NodeType::Company, "Acme Group".to_string());
    assert_eq!(node.version, 0);

    let saved = store.save(node).await.unwrap();
    assert_eq!(saved.version, 1);

    let saved = store.save(saved).await.unwrap();
    assert_eq!(saved.version, 2);
}

#[tokio::test]
async fn test_org_store_reports_both_versions_on_conflict() {
    let store = InMemoryOrgStore::new();

    let node = store
        .save(HierarchyNode::new(NodeType::Company, "Acme Group".to_string()))
        .await
        .unwrap();
    let stale = node.clone();
    // Another writer lands first
    store.save(node).await.unwrap();

    let err = store.save(stale.clone()).await.unwrap_err();
    match err {
        StoreError::VersionConflict {
            id,
            expected,
            found,
        } => {
            assert_eq!(id, stale.id);
            assert_eq!(expected, 1);
            assert_eq!(found, 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_org_store_rejects_unknown_id_with_nonzero_version() {
    let store = InMemoryOrgStore::new();

    let mut node = HierarchyNode::new(NodeType::Company, "Ghost".to_string());
    node.version = 4;

    let err = store.save(node.clone()).await.unwrap_err();
    assert!(matches!(err, StoreError::MissingRecord(id) if id == node.id));
}

#[tokio::test]
async fn test_org_store_save_all_aborts_whole_batch_on_conflict() {
    let store = InMemoryOrgStore::new();

    let a = store
        .save(HierarchyNode::new(NodeType::Company, "Acme".to_string()))
        .await
        .unwrap();
    let b = store
        .save(HierarchyNode::new(NodeType::Division, "EMEA".to_string()))
        .await
        .unwrap();
    // The held copy of B goes stale before the batch lands
    store.save(b.clone()).await.unwrap();

    let mut a_edit = a.clone();
    a_edit.name = "Acme Group".to_string();
    let err = store.save_all(vec![a_edit, b]).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionConflict { .. }));

    let stored = store.get(&a.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Acme");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_org_store_save_all_refuses_repeated_ids() {
    let store = InMemoryOrgStore::new();

    let node = store
        .save(HierarchyNode::new(NodeType::Company, "Acme".to_string()))
        .await
        .unwrap();
    let mut twin = node.clone();
    twin.name = "Acme again".to_string();

    let err = store.save_all(vec![node.clone(), twin]).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateInBatch(id) if id == node.id));

    let stored = store.get(&node.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Acme");
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn test_org_store_lookups_through_trait_object() {
    let store: Arc<dyn OrgStore> = Arc::new(InMemoryOrgStore::new());

    let root = store
        .save(HierarchyNode::new(NodeType::Company, "Acme".to_string()))
        .await
        .unwrap();
    let other = store
        .save(HierarchyNode::new(NodeType::Company, "Globex".to_string()))
        .await
        .unwrap();

    let mut emea = HierarchyNode::new(NodeType::Division, "EMEA".to_string());
    emea.attach_to(root.id.clone(), 1);
    store.save(emea).await.unwrap();
    let mut apac = HierarchyNode::new(NodeType::Division, "APAC".to_string());
    apac.attach_to(other.id.clone(), 1);
    store.save(apac).await.unwrap();

    let children = store.find_children(&root.id).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "EMEA");

    let divisions = store.find_by_type(NodeType::Division).await.unwrap();
    assert_eq!(divisions.len(), 2);
    assert!(store.find_children("no-such-node").await.unwrap().is_empty());
    assert!(store.get("no-such-node").await.unwrap().is_none());
}

#[tokio::test]
async fn test_role_store_save_and_name_lookup() {
    let store = InMemoryRoleStore::new();
    assert_eq!(store.count_roles().await.unwrap(), 0);

    let admin = store
        .save(Role::new(
            "admin".to_string(),
            Some("Full access".to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(admin.version, 1);
    store
        .save(Role::new("viewer".to_string(), None))
        .await
        .unwrap();

    let found = store.find_by_name("admin").await.unwrap().unwrap();
    assert_eq!(found.id, admin.id);
    assert_eq!(found.description.as_deref(), Some("Full access"));
    assert!(store.find_by_name("missing").await.unwrap().is_none());
    assert_eq!(store.count_roles().await.unwrap(), 2);
}

#[tokio::test]
async fn test_role_store_concurrent_edit_conflict() {
    let store = InMemoryRoleStore::new();

    let role = store
        .save(Role::new("editor".to_string(), None))
        .await
        .unwrap();
    let stale = role.clone();
    store.save(role).await.unwrap();

    let err = store.save(stale).await.unwrap_err();
    match err {
        StoreError::VersionConflict {
            expected, found, ..
        } => {
            assert_eq!(expected, 1);
            assert_eq!(found, 2);
        }
        other => panic!("expected VersionConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_role_store_keeps_edges_and_permissions_across_saves() {
    let store = InMemoryRoleStore::new();

    let base = store
        .save(Role::new("base".to_string(), None))
        .await
        .unwrap();
    let mut child = create_test_role("child", &["reports:read"]);
    child.add_parent(base.id.clone());
    let child = store.save(child).await.unwrap();

    let stored = store.get(&child.id).await.unwrap().unwrap();
    assert!(stored.has_permission("reports:read"));
    assert!(stored.inherits_directly_from(&base.id));
}

#[tokio::test]
async fn test_user_directory_resolves_known_users() {
    let directory = InMemoryUserDirectory::new();
    directory.insert("u-1", "Ada Lovelace");

    let name = directory.resolve_display_name("u-1").await.unwrap();
    assert_eq!(name.as_deref(), Some("Ada Lovelace"));
    assert!(directory.resolve_display_name("u-2").await.unwrap().is_none());
}
