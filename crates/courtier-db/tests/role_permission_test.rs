//! Integration tests for Role and PermissionGrant repositories using
//! in-memory SurrealDB.

use courtier_core::models::permission::{
    Action, Module, PermissionKey, PermissionMatrix, SetPermissionGrant,
};
use courtier_core::models::role::{CreateRole, DashboardScope, UpdateRole};
use courtier_core::models::tenant::CreateTenant;
use courtier_core::repository::{
    Pagination, PermissionGrantRepository, RoleRepository, TenantRepository,
};
use courtier_db::repository::{
    SurrealPermissionGrantRepository, SurrealRoleRepository, SurrealTenantRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

/// Helper: spin up in-memory DB, run migrations, create two tenants.
async fn setup() -> (
    Surreal<surrealdb::engine::local::Db>,
    Uuid, // tenant_a
    Uuid, // tenant_b
) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    courtier_db::run_migrations(&db).await.unwrap();

    let tenant_repo = SurrealTenantRepository::new(db.clone());
    let a = tenant_repo
        .create(CreateTenant {
            name: "Tenant A".into(),
            slug: "tenant-a".into(),
            metadata: None,
        })
        .await
        .unwrap();
    let b = tenant_repo
        .create(CreateTenant {
            name: "Tenant B".into(),
            slug: "tenant-b".into(),
            metadata: None,
        })
        .await
        .unwrap();

    (db, a.id, b.id)
}

fn grant(tenant_id: Uuid, role_id: Uuid, module: Module, action: Action) -> SetPermissionGrant {
    SetPermissionGrant {
        tenant_id,
        role_id,
        module,
        action,
        allowed: true,
    }
}

// ---------------------------------------------------------------------------
// Role tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_role() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    let role = repo
        .create(CreateRole {
            dashboard_scope: DashboardScope::Team,
            can_see_team_commissions: true,
            ..CreateRole::named(tenant_id, "Chef d'équipe")
        })
        .await
        .unwrap();

    assert_eq!(role.tenant_id, tenant_id);
    assert!(role.is_active, "new roles start active");
    assert!(!role.is_super_role);
    assert_eq!(role.dashboard_scope, DashboardScope::Team);

    let fetched = repo.get_by_id(tenant_id, role.id).await.unwrap();
    assert_eq!(fetched.name, "Chef d'équipe");
    assert!(fetched.can_see_team_commissions);
}

#[tokio::test]
async fn role_is_invisible_from_other_tenant() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    let role = repo
        .create(CreateRole::named(tenant_a, "gestionnaire"))
        .await
        .unwrap();

    assert!(repo.get_by_id(tenant_b, role.id).await.is_err());
}

#[tokio::test]
async fn update_role_partially() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    let role = repo
        .create(CreateRole {
            description: "Saisie des contrats".into(),
            ..CreateRole::named(tenant_id, "assistant")
        })
        .await
        .unwrap();

    let updated = repo
        .update(
            tenant_id,
            role.id,
            UpdateRole {
                is_active: Some(false),
                dashboard_scope: Some(DashboardScope::Global),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.is_active);
    assert_eq!(updated.dashboard_scope, DashboardScope::Global);
    assert_eq!(updated.description, "Saisie des contrats"); // unchanged
}

#[tokio::test]
async fn duplicate_role_name_rejected_within_tenant_only() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    repo.create(CreateRole::named(tenant_a, "courtier"))
        .await
        .unwrap();

    let same_tenant = repo.create(CreateRole::named(tenant_a, "courtier")).await;
    assert!(same_tenant.is_err(), "duplicate role name should be rejected");

    let other_tenant = repo.create(CreateRole::named(tenant_b, "courtier")).await;
    assert!(other_tenant.is_ok(), "same name is fine in another tenant");
}

#[tokio::test]
async fn list_roles_with_pagination() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);

    for i in 0..5 {
        repo.create(CreateRole::named(tenant_id, format!("role-{i}")))
            .await
            .unwrap();
    }

    let page1 = repo
        .list(
            tenant_id,
            Pagination {
                offset: 0,
                limit: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(page1.items.len(), 3);
    assert_eq!(page1.total, 5);

    let page2 = repo
        .list(
            tenant_id,
            Pagination {
                offset: 3,
                limit: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(page2.items.len(), 2);
}

#[tokio::test]
async fn unknown_dashboard_scope_reads_as_personal() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db.clone());

    let role = repo
        .create(CreateRole {
            dashboard_scope: DashboardScope::Global,
            ..CreateRole::named(tenant_id, "legacy")
        })
        .await
        .unwrap();

    // Simulate a row written by another tool with a value we don't know.
    db.query("UPDATE type::record('role', $id) SET dashboard_scope = 'galaxy'")
        .bind(("id", role.id.to_string()))
        .await
        .unwrap();

    let fetched = repo.get_by_id(tenant_id, role.id).await.unwrap();
    assert_eq!(fetched.dashboard_scope, DashboardScope::Personal);
}

// ---------------------------------------------------------------------------
// Assignment tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn assign_and_get_user_roles() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);
    let user = Uuid::new_v4();

    let first = repo
        .create(CreateRole::named(tenant_id, "conseiller"))
        .await
        .unwrap();
    let second = repo
        .create(CreateRole::named(tenant_id, "comptable"))
        .await
        .unwrap();

    repo.assign_to_user(tenant_id, user, first.id).await.unwrap();
    repo.assign_to_user(tenant_id, user, second.id).await.unwrap();

    let roles = repo.get_user_roles(tenant_id, user).await.unwrap();
    let names: Vec<&str> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"conseiller"));
    assert!(names.contains(&"comptable"));

    repo.unassign_from_user(tenant_id, user, first.id)
        .await
        .unwrap();

    let roles = repo.get_user_roles(tenant_id, user).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].name, "comptable");
}

#[tokio::test]
async fn assigning_twice_is_a_noop() {
    let (db, tenant_id, _) = setup().await;
    let repo = SurrealRoleRepository::new(db);
    let user = Uuid::new_v4();

    let role = repo
        .create(CreateRole::named(tenant_id, "conseiller"))
        .await
        .unwrap();

    let first = repo.assign_to_user(tenant_id, user, role.id).await.unwrap();
    let second = repo.assign_to_user(tenant_id, user, role.id).await.unwrap();
    assert_eq!(first.assigned_at, second.assigned_at);

    let members = repo.get_role_members(tenant_id, role.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, user);
}

#[tokio::test]
async fn cannot_assign_role_from_another_tenant() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealRoleRepository::new(db);
    let user = Uuid::new_v4();

    let role = repo
        .create(CreateRole::named(tenant_a, "conseiller"))
        .await
        .unwrap();

    let result = repo.assign_to_user(tenant_b, user, role.id).await;
    assert!(result.is_err());
    assert!(repo.get_user_roles(tenant_b, user).await.unwrap().is_empty());
}

#[tokio::test]
async fn user_roles_are_isolated_per_tenant() {
    let (db, tenant_a, tenant_b) = setup().await;
    let repo = SurrealRoleRepository::new(db);
    let user = Uuid::new_v4();

    let role_a = repo
        .create(CreateRole::named(tenant_a, "directeur"))
        .await
        .unwrap();
    let role_b = repo
        .create(CreateRole::named(tenant_b, "stagiaire"))
        .await
        .unwrap();

    repo.assign_to_user(tenant_a, user, role_a.id).await.unwrap();
    repo.assign_to_user(tenant_b, user, role_b.id).await.unwrap();

    let in_a = repo.get_user_roles(tenant_a, user).await.unwrap();
    let in_b = repo.get_user_roles(tenant_b, user).await.unwrap();
    assert_eq!(in_a.len(), 1);
    assert_eq!(in_a[0].name, "directeur");
    assert_eq!(in_b.len(), 1);
    assert_eq!(in_b[0].name, "stagiaire");
}

#[tokio::test]
async fn delete_role_removes_assignments_and_grants() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db);
    let user = Uuid::new_v4();

    let role = role_repo
        .create(CreateRole::named(tenant_id, "temporaire"))
        .await
        .unwrap();
    role_repo
        .assign_to_user(tenant_id, user, role.id)
        .await
        .unwrap();
    grant_repo
        .set_grant(grant(tenant_id, role.id, Module::Clients, Action::View))
        .await
        .unwrap();

    role_repo.delete(tenant_id, role.id).await.unwrap();

    assert!(role_repo.get_by_id(tenant_id, role.id).await.is_err());
    assert!(role_repo.get_user_roles(tenant_id, user).await.unwrap().is_empty());
    assert!(
        grant_repo
            .get_role_grants(tenant_id, role.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn delete_role_through_another_tenant_leaves_it_in_place() {
    let (db, tenant_a, tenant_b) = setup().await;
    let role_repo = SurrealRoleRepository::new(db);
    let user = Uuid::new_v4();

    let role = role_repo
        .create(CreateRole::named(tenant_a, "gestionnaire"))
        .await
        .unwrap();
    role_repo
        .assign_to_user(tenant_a, user, role.id)
        .await
        .unwrap();

    role_repo.delete(tenant_b, role.id).await.unwrap();

    assert!(role_repo.get_by_id(tenant_a, role.id).await.is_ok());
    assert_eq!(role_repo.get_user_roles(tenant_a, user).await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Grant tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_grant_upserts_per_role_module_action() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db);

    let role = role_repo
        .create(CreateRole::named(tenant_id, "conseiller"))
        .await
        .unwrap();

    let first = grant_repo
        .set_grant(grant(tenant_id, role.id, Module::Contracts, Action::Create))
        .await
        .unwrap();
    assert!(first.allowed);

    let second = grant_repo
        .set_grant(SetPermissionGrant {
            allowed: false,
            ..grant(tenant_id, role.id, Module::Contracts, Action::Create)
        })
        .await
        .unwrap();

    assert_eq!(first.id, second.id, "same triple must reuse the row");
    assert!(!second.allowed);

    let grants = grant_repo.get_role_grants(tenant_id, role.id).await.unwrap();
    assert_eq!(grants.len(), 1);
}

#[tokio::test]
async fn allowed_grants_skip_denied_rows() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db);

    let role = role_repo
        .create(CreateRole::named(tenant_id, "conseiller"))
        .await
        .unwrap();

    grant_repo
        .set_grant(grant(tenant_id, role.id, Module::Clients, Action::View))
        .await
        .unwrap();
    grant_repo
        .set_grant(SetPermissionGrant {
            allowed: false,
            ..grant(tenant_id, role.id, Module::Clients, Action::Delete)
        })
        .await
        .unwrap();

    let keys = grant_repo
        .get_allowed_grants(tenant_id, &[role.id])
        .await
        .unwrap();
    assert_eq!(keys, vec![PermissionKey::new(Module::Clients, Action::View)]);
}

#[tokio::test]
async fn allowed_grants_span_several_roles() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db);

    let a = role_repo
        .create(CreateRole::named(tenant_id, "a"))
        .await
        .unwrap();
    let b = role_repo
        .create(CreateRole::named(tenant_id, "b"))
        .await
        .unwrap();

    grant_repo
        .set_grant(grant(tenant_id, a.id, Module::Payout, Action::Deposit))
        .await
        .unwrap();
    grant_repo
        .set_grant(grant(tenant_id, b.id, Module::Payout, Action::Deposit))
        .await
        .unwrap();
    grant_repo
        .set_grant(grant(tenant_id, b.id, Module::Decomptes, Action::Generate))
        .await
        .unwrap();

    let keys = grant_repo
        .get_allowed_grants(tenant_id, &[a.id, b.id])
        .await
        .unwrap();
    let matrix: PermissionMatrix = keys.into_iter().collect();
    assert_eq!(matrix.len(), 2);
    assert!(matrix.contains(Module::Decomptes, Action::Generate));

    let none = grant_repo.get_allowed_grants(tenant_id, &[]).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn replace_role_grants_overwrites_matrix() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db);

    let role = role_repo
        .create(CreateRole::named(tenant_id, "collaborateur"))
        .await
        .unwrap();

    grant_repo
        .set_grant(grant(tenant_id, role.id, Module::Settings, Action::Update))
        .await
        .unwrap();

    let mut matrix = PermissionMatrix::new();
    matrix.insert(Module::Clients, Action::View);
    matrix.insert(Module::Clients, Action::Export);
    grant_repo
        .replace_role_grants(tenant_id, role.id, matrix)
        .await
        .unwrap();

    let grants = grant_repo.get_role_grants(tenant_id, role.id).await.unwrap();
    let stored: PermissionMatrix = grants.iter().map(|g| g.key()).collect();
    assert_eq!(stored, matrix);

    grant_repo
        .revoke_grant(
            tenant_id,
            role.id,
            PermissionKey::new(Module::Clients, Action::Export),
        )
        .await
        .unwrap();
    let grants = grant_repo.get_role_grants(tenant_id, role.id).await.unwrap();
    assert_eq!(grants.len(), 1);
}

#[tokio::test]
async fn unknown_grant_values_are_skipped() {
    let (db, tenant_id, _) = setup().await;
    let role_repo = SurrealRoleRepository::new(db.clone());
    let grant_repo = SurrealPermissionGrantRepository::new(db.clone());

    let role = role_repo
        .create(CreateRole::named(tenant_id, "legacy"))
        .await
        .unwrap();

    db.query(
        "CREATE permission_grant SET tenant_id = $tenant_id, role_id = $role_id, \
         module = 'invoices', action = 'view', allowed = true",
    )
    .bind(("tenant_id", tenant_id.to_string()))
    .bind(("role_id", role.id.to_string()))
    .await
    .unwrap();

    let keys = grant_repo
        .get_allowed_grants(tenant_id, &[role.id])
        .await
        .unwrap();
    assert!(keys.is_empty());
}
