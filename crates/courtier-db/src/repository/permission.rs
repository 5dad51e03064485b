//! SurrealDB implementation of [`PermissionGrantRepository`].

use chrono::{DateTime, Utc};
use courtier_core::error::CoreResult;
use courtier_core::models::permission::{
    Action, Module, PermissionGrant, PermissionKey, PermissionMatrix, SetPermissionGrant,
};
use courtier_core::repository::PermissionGrantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    tenant_id: String,
    role_id: String,
    module: String,
    action: String,
    allowed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GrantRowWithId {
    /// `Ok(None)` when the stored module/action is not a known value.
    fn try_into_grant(self) -> Result<Option<PermissionGrant>, DbError> {
        let Some(key) = read_key(&self.module, &self.action) else {
            return Ok(None);
        };
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let tenant_id = Uuid::parse_str(&self.tenant_id)
            .map_err(|e| DbError::Migration(format!("invalid tenant UUID: {e}")))?;
        let role_id = Uuid::parse_str(&self.role_id)
            .map_err(|e| DbError::Migration(format!("invalid role UUID: {e}")))?;
        Ok(Some(PermissionGrant {
            id,
            tenant_id,
            role_id,
            module: key.module,
            action: key.action,
            allowed: self.allowed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(Debug, SurrealValue)]
struct GrantKeyRow {
    module: String,
    action: String,
}

/// Rows with a module or action this build does not know are skipped:
/// an unknown grant can never allow anything.
fn read_key(module: &str, action: &str) -> Option<PermissionKey> {
    match (module.parse::<Module>(), action.parse::<Action>()) {
        (Ok(module), Ok(action)) => Some(PermissionKey::new(module, action)),
        _ => {
            warn!(module, action, "Skipping grant with unknown module or action");
            None
        }
    }
}

const SELECT_GRANT: &str = "SELECT meta::id(id) AS record_id, * FROM permission_grant";

/// SurrealDB implementation of the permission grant repository.
#[derive(Clone)]
pub struct SurrealPermissionGrantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionGrantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_grant(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        key: PermissionKey,
    ) -> Result<Option<PermissionGrant>, DbError> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_GRANT} WHERE tenant_id = $tenant_id AND role_id = $role_id \
                 AND module = $module AND action = $action"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("module", key.module.as_str().to_string()))
            .bind(("action", key.action.as_str().to_string()))
            .await?;

        let rows: Vec<GrantRowWithId> = result.take(0)?;
        match rows.into_iter().next() {
            Some(row) => row.try_into_grant(),
            None => Ok(None),
        }
    }
}

impl<C: Connection> PermissionGrantRepository for SurrealPermissionGrantRepository<C> {
    async fn set_grant(&self, input: SetPermissionGrant) -> CoreResult<PermissionGrant> {
        let key = PermissionKey::new(input.module, input.action);

        let (id, query) = match self.find_grant(input.tenant_id, input.role_id, key).await? {
            Some(existing) => (
                existing.id,
                "UPDATE type::record('permission_grant', $id) SET \
                 allowed = $allowed, updated_at = time::now()",
            ),
            None => (
                Uuid::new_v4(),
                "CREATE type::record('permission_grant', $id) SET \
                 tenant_id = $tenant_id, role_id = $role_id, \
                 module = $module, action = $action, allowed = $allowed",
            ),
        };
        let id_str = id.to_string();

        let result = self
            .db
            .query(format!(
                "{query}; {SELECT_GRANT} WHERE id = type::record('permission_grant', $id)"
            ))
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("role_id", input.role_id.to_string()))
            .bind(("module", input.module.as_str().to_string()))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("allowed", input.allowed))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<GrantRowWithId> = result.take(1).map_err(DbError::from)?;
        let grant = rows
            .into_iter()
            .next()
            .map(GrantRowWithId::try_into_grant)
            .transpose()?
            .flatten()
            .ok_or_else(|| DbError::NotFound {
                entity: "permission_grant".into(),
                id: id_str,
            })?;

        Ok(grant)
    }

    async fn revoke_grant(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        key: PermissionKey,
    ) -> CoreResult<()> {
        self.db
            .query(
                "DELETE permission_grant WHERE tenant_id = $tenant_id \
                 AND role_id = $role_id AND module = $module AND action = $action",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .bind(("module", key.module.as_str().to_string()))
            .bind(("action", key.action.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_role_grants(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> CoreResult<Vec<PermissionGrant>> {
        let mut result = self
            .db
            .query(format!(
                "{SELECT_GRANT} WHERE tenant_id = $tenant_id AND role_id = $role_id \
                 ORDER BY created_at ASC"
            ))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantRowWithId> = result.take(0).map_err(DbError::from)?;

        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(grant) = row.try_into_grant()? {
                grants.push(grant);
            }
        }

        Ok(grants)
    }

    async fn replace_role_grants(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        matrix: PermissionMatrix,
    ) -> CoreResult<()> {
        // Module and action strings come from closed enums and record ids
        // are freshly generated UUIDs, so they are embedded directly.
        let mut query = String::from(
            "BEGIN TRANSACTION; \
             DELETE permission_grant WHERE tenant_id = $tenant_id AND role_id = $role_id;",
        );
        for key in matrix.iter() {
            let id = Uuid::new_v4();
            query.push_str(&format!(
                " CREATE permission_grant:`{id}` SET \
                 tenant_id = $tenant_id, role_id = $role_id, \
                 module = '{}', action = '{}', allowed = true;",
                key.module.as_str(),
                key.action.as_str(),
            ));
        }
        query.push_str(" COMMIT TRANSACTION;");

        self.db
            .query(query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }

    async fn get_allowed_grants(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> CoreResult<Vec<PermissionKey>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let role_ids: Vec<String> = role_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT module, action FROM permission_grant \
                 WHERE tenant_id = $tenant_id AND allowed = true \
                 AND role_id IN $role_ids",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("role_ids", role_ids))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GrantKeyRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .iter()
            .filter_map(|row| read_key(&row.module, &row.action))
            .collect())
    }
}
