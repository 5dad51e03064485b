//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use courtier_core::error::CoreResult;
use courtier_core::models::assignment::RoleAssignment;
use courtier_core::models::role::{CreateRole, DashboardScope, Role, UpdateRole};
use courtier_core::repository::{PaginatedResult, Pagination, RoleRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRow {
    tenant_id: String,
    name: String,
    description: String,
    is_active: bool,
    is_super_role: bool,
    dashboard_scope: String,
    can_see_own_commissions: bool,
    can_see_team_commissions: bool,
    can_see_all_commissions: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, id: Uuid) -> Result<Role, DbError> {
        let tenant_id = parse_uuid(&self.tenant_id, "tenant")?;
        Ok(Role {
            id,
            tenant_id,
            dashboard_scope: read_dashboard_scope(&self.dashboard_scope, id),
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            is_super_role: self.is_super_role,
            can_see_own_commissions: self.can_see_own_commissions,
            can_see_team_commissions: self.can_see_team_commissions,
            can_see_all_commissions: self.can_see_all_commissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    tenant_id: String,
    name: String,
    description: String,
    is_active: bool,
    is_super_role: bool,
    dashboard_scope: String,
    can_see_own_commissions: bool,
    can_see_team_commissions: bool,
    can_see_all_commissions: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let id = parse_uuid(&self.record_id, "role")?;
        RoleRow {
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            is_active: self.is_active,
            is_super_role: self.is_super_role,
            dashboard_scope: self.dashboard_scope,
            can_see_own_commissions: self.can_see_own_commissions,
            can_see_team_commissions: self.can_see_team_commissions,
            can_see_all_commissions: self.can_see_all_commissions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_role(id)
    }
}

#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    tenant_id: String,
    user_id: String,
    role_id: String,
    assigned_at: DateTime<Utc>,
}

impl AssignmentRow {
    fn try_into_assignment(self) -> Result<RoleAssignment, DbError> {
        Ok(RoleAssignment {
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            role_id: parse_uuid(&self.role_id, "role")?,
            assigned_at: self.assigned_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Migration(format!("invalid {what} UUID: {e}")))
}

/// Unknown scope strings read as the lowest scope rather than failing
/// the whole query.
fn read_dashboard_scope(raw: &str, role_id: Uuid) -> DashboardScope {
    raw.parse().unwrap_or_else(|_| {
        warn!(%role_id, value = raw, "Unknown dashboard scope on role, reading as personal");
        DashboardScope::Personal
    })
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_assignment(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<RoleAssignment>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT tenant_id, user_id, role_id, assigned_at FROM user_role \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 AND role_id = $role_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await?;

        let rows: Vec<AssignmentRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .map(AssignmentRow::try_into_assignment)
            .transpose()
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> CoreResult<Role> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 tenant_id = $tenant_id, \
                 name = $name, description = $description, \
                 is_super_role = $is_super_role, \
                 dashboard_scope = $dashboard_scope, \
                 can_see_own_commissions = $own, \
                 can_see_team_commissions = $team, \
                 can_see_all_commissions = $all",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .bind(("is_super_role", input.is_super_role))
            .bind(("dashboard_scope", input.dashboard_scope.as_str().to_string()))
            .bind(("own", input.can_see_own_commissions))
            .bind(("team", input.can_see_team_commissions))
            .bind(("all", input.can_see_all_commissions))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> CoreResult<Role> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('role', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateRole) -> CoreResult<Role> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.is_super_role.is_some() {
            sets.push("is_super_role = $is_super_role");
        }
        if input.dashboard_scope.is_some() {
            sets.push("dashboard_scope = $dashboard_scope");
        }
        if input.can_see_own_commissions.is_some() {
            sets.push("can_see_own_commissions = $own");
        }
        if input.can_see_team_commissions.is_some() {
            sets.push("can_see_team_commissions = $team");
        }
        if input.can_see_all_commissions.is_some() {
            sets.push("can_see_all_commissions = $all");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('role', $id) SET {} \
             WHERE tenant_id = $tenant_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(is_super_role) = input.is_super_role {
            builder = builder.bind(("is_super_role", is_super_role));
        }
        if let Some(scope) = input.dashboard_scope {
            builder = builder.bind(("dashboard_scope", scope.as_str().to_string()));
        }
        if let Some(own) = input.can_see_own_commissions {
            builder = builder.bind(("own", own));
        }
        if let Some(team) = input.can_see_team_commissions {
            builder = builder.bind(("team", team));
        }
        if let Some(all) = input.can_see_all_commissions {
            builder = builder.bind(("all", all));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<RoleRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "role".into(),
            id: id_str,
        })?;

        Ok(row.into_role(id)?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> CoreResult<()> {
        // Assignments and grants first, then the role record.
        self.db
            .query(
                "DELETE user_role WHERE tenant_id = $tenant_id AND role_id = $id; \
                 DELETE permission_grant WHERE tenant_id = $tenant_id AND role_id = $id; \
                 DELETE type::record('role', $id) WHERE tenant_id = $tenant_id;",
            )
            .bind(("id", id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }

    async fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<Role>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM role \
                 WHERE tenant_id = $tenant_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_role())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CoreResult<RoleAssignment> {
        if let Some(existing) = self.find_assignment(tenant_id, user_id, role_id).await? {
            return Ok(existing);
        }

        // Refuses roles from another tenant: get_by_id filters on tenant_id.
        self.get_by_id(tenant_id, role_id).await?;

        let result = self
            .db
            .query(
                "CREATE user_role SET \
                 tenant_id = $tenant_id, user_id = $user_id, role_id = $role_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user_role".into(),
            id: format!("user={user_id},role={role_id}"),
        })?;

        Ok(row.try_into_assignment()?)
    }

    async fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CoreResult<()> {
        self.db
            .query(
                "DELETE user_role WHERE \
                 tenant_id = $tenant_id AND user_id = $user_id AND role_id = $role_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_user_roles(&self, tenant_id: Uuid, user_id: Uuid) -> CoreResult<Vec<Role>> {
        let tenant_id_str = tenant_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT tenant_id, user_id, role_id, assigned_at FROM user_role \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 ORDER BY assigned_at ASC",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let assignments: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        if assignments.is_empty() {
            return Ok(Vec::new());
        }
        let role_ids: Vec<String> = assignments.into_iter().map(|a| a.role_id).collect();

        // Both the assignment and the role must sit in the requested tenant.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE tenant_id = $tenant_id AND meta::id(id) IN $role_ids",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("role_ids", role_ids.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let mut roles = rows
            .into_iter()
            .map(|row| {
                let position = role_ids.iter().position(|id| *id == row.record_id);
                row.try_into_role().map(|role| (position, role))
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        roles.sort_by_key(|(position, _)| *position);

        Ok(roles.into_iter().map(|(_, role)| role).collect())
    }

    async fn get_role_members(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> CoreResult<Vec<RoleAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT tenant_id, user_id, role_id, assigned_at FROM user_role \
                 WHERE tenant_id = $tenant_id AND role_id = $role_id \
                 ORDER BY assigned_at ASC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;

        let members = rows
            .into_iter()
            .map(|row| row.try_into_assignment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(members)
    }
}
