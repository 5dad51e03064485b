//! Integration tests for the Tenant repository implementation using
//! in-memory SurrealDB.

use courtier_core::error::CoreError;
use courtier_core::models::role::CreateRole;
use courtier_core::models::tenant::CreateTenant;
use courtier_core::repository::{Pagination, RoleRepository, TenantRepository};
use courtier_db::repository::{SurrealRoleRepository, SurrealTenantRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    courtier_db::run_migrations(&db).await.unwrap();
    db
}

fn tenant(name: &str, slug: &str) -> CreateTenant {
    CreateTenant {
        name: name.into(),
        slug: slug.into(),
        metadata: None,
    }
}

#[tokio::test]
async fn create_and_get_tenant() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let created = repo
        .create(CreateTenant {
            name: "Cabinet Genève".into(),
            slug: "cabinet-geneve".into(),
            metadata: Some(serde_json::json!({ "canton": "GE" })),
        })
        .await
        .unwrap();

    assert_eq!(created.name, "Cabinet Genève");
    assert_eq!(created.metadata["canton"], "GE");

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.slug, "cabinet-geneve");
}

#[tokio::test]
async fn get_tenant_by_slug() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let created = repo.create(tenant("Lausanne", "lausanne")).await.unwrap();

    let fetched = repo.get_by_slug("lausanne").await.unwrap();
    assert_eq!(fetched.id, created.id);

    let missing = repo.get_by_slug("zurich").await;
    assert!(matches!(missing, Err(CoreError::NotFound { .. })));
}

#[tokio::test]
async fn duplicate_slug_rejected() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(tenant("First", "same-slug")).await.unwrap();
    let result = repo.create(tenant("Second", "same-slug")).await;

    assert!(result.is_err(), "duplicate slug should be rejected");
}

#[tokio::test]
async fn list_tenants_with_pagination() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    for i in 0..4 {
        repo.create(tenant(&format!("Office {i}"), &format!("office-{i}")))
            .await
            .unwrap();
    }

    let page1 = repo
        .list(Pagination {
            offset: 0,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 4);

    let page2 = repo
        .list(Pagination {
            offset: 3,
            limit: 3,
        })
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 1);
}

#[tokio::test]
async fn delete_tenant_removes_its_roles() {
    let db = setup().await;
    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let role_repo = SurrealRoleRepository::new(db);

    let t = tenant_repo.create(tenant("Doomed", "doomed")).await.unwrap();
    let role = role_repo
        .create(CreateRole::named(t.id, "courtier"))
        .await
        .unwrap();

    tenant_repo.delete(t.id).await.unwrap();

    assert!(tenant_repo.get_by_id(t.id).await.is_err());
    assert!(role_repo.get_by_id(t.id, role.id).await.is_err());
}

#[tokio::test]
async fn delete_tenant_keeps_other_tenants_roles() {
    let db = setup().await;
    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let role_repo = SurrealRoleRepository::new(db);

    let doomed = tenant_repo.create(tenant("Doomed", "doomed")).await.unwrap();
    let kept = tenant_repo.create(tenant("Kept", "kept")).await.unwrap();
    let role = role_repo
        .create(CreateRole::named(kept.id, "courtier"))
        .await
        .unwrap();

    tenant_repo.delete(doomed.id).await.unwrap();

    assert!(tenant_repo.get_by_id(kept.id).await.is_ok());
    assert!(role_repo.get_by_id(kept.id, role.id).await.is_ok());
}
