//! Access control service: permission resolution and the resolved-set
//! cache.

use std::sync::Arc;

use courtier_core::models::permission::PermissionMatrix;
use courtier_core::models::role::{CommissionScope, DashboardScope, Role};
use courtier_core::repository::{PermissionGrantRepository, RoleRepository};
use tracing::{debug, error};
use uuid::Uuid;

use crate::cache::PermissionCache;
use crate::config::{AccessConfig, AdminDetection};
use crate::error::AccessError;
use crate::resolved::ResolvedPermissions;

/// Access control service.
///
/// Generic over repository implementations so that the access layer
/// has no dependency on the database crate.
pub struct AccessControl<R: RoleRepository, P: PermissionGrantRepository> {
    role_repo: R,
    grant_repo: P,
    config: AccessConfig,
    cache: PermissionCache,
}

impl<R: RoleRepository, P: PermissionGrantRepository> AccessControl<R, P> {
    pub fn new(role_repo: R, grant_repo: P, config: AccessConfig) -> Self {
        Self {
            role_repo,
            grant_repo,
            config,
            cache: PermissionCache::new(),
        }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Resolve the permission set of a user in a tenant.
    ///
    /// Never fails. A missing or nil identifier yields the empty set, and
    /// so does a store failure (logged): no permissions loaded and an
    /// explicit deny look the same to callers.
    pub async fn resolve(
        &self,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> ResolvedPermissions {
        match self.try_resolve(user_id, tenant_id).await {
            Ok(perms) => perms,
            Err(e) => {
                error!(
                    ?user_id,
                    ?tenant_id,
                    error = %e,
                    "Permission resolution failed, denying all"
                );
                ResolvedPermissions::empty()
            }
        }
    }

    /// Same as [`resolve`](Self::resolve) but surfaces store failures.
    pub async fn try_resolve(
        &self,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> Result<ResolvedPermissions, AccessError> {
        let Some((user_id, tenant_id)) = context(user_id, tenant_id) else {
            return Ok(ResolvedPermissions::empty());
        };

        // 1. Roles held in this tenant; inactive ones contribute nothing.
        let active: Vec<Role> = self
            .role_repo
            .get_user_roles(tenant_id, user_id)
            .await?
            .into_iter()
            .filter(|role| role.is_active)
            .collect();

        if active.is_empty() {
            return Ok(ResolvedPermissions::empty());
        }

        // 2. Scopes and admin status.
        let is_admin = active.iter().any(|role| self.is_admin_role(role));
        let dashboard_scope = merge_dashboard_scopes(active.iter().map(|r| r.dashboard_scope));
        let commission_scope = merge_commission_scopes(active.iter().map(Role::commission_scope));

        // 3. Union of allowed grants across the active roles.
        let role_ids: Vec<Uuid> = active.iter().map(|role| role.id).collect();
        let permissions: PermissionMatrix = self
            .grant_repo
            .get_allowed_grants(tenant_id, &role_ids)
            .await?
            .into_iter()
            .collect();

        debug!(
            %user_id,
            %tenant_id,
            roles = active.len(),
            grants = permissions.len(),
            is_admin,
            "Resolved permissions"
        );

        Ok(ResolvedPermissions {
            permissions,
            dashboard_scope,
            commission_scope,
            roles: active.into_iter().map(|role| role.name).collect(),
            is_admin,
        })
    }

    /// Whether holding `role` makes a user an administrator under the
    /// configured detection policy.
    pub fn is_admin_role(&self, role: &Role) -> bool {
        match self.config.admin_detection {
            AdminDetection::ExplicitFlag => role.is_super_role,
            AdminDetection::FlagOrNameFallback => {
                role.is_super_role || self.config.name_marks_admin(&role.name)
            }
            AdminDetection::NameHeuristic => self.config.name_marks_admin(&role.name),
        }
    }

    // -----------------------------------------------------------------------
    // Cached access
    // -----------------------------------------------------------------------

    /// The permission set of a user in a tenant, from the cache when
    /// present.
    ///
    /// Missing context and degraded resolutions are returned but never
    /// stored, so the next call retries.
    pub async fn permissions(
        &self,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> Arc<ResolvedPermissions> {
        let Some((user, tenant)) = context(user_id, tenant_id) else {
            return Arc::new(ResolvedPermissions::empty());
        };

        if self.config.cache_enabled {
            if let Some(hit) = self.cache.get(user, tenant).await {
                debug!(user_id = %user, tenant_id = %tenant, "Permission cache hit");
                return hit;
            }
            debug!(user_id = %user, tenant_id = %tenant, "Permission cache miss");
        }

        self.resolve_and_store(user, tenant).await
    }

    /// Resolve again and replace the cached entry.
    pub async fn refresh(
        &self,
        user_id: Option<Uuid>,
        tenant_id: Option<Uuid>,
    ) -> Arc<ResolvedPermissions> {
        let Some((user, tenant)) = context(user_id, tenant_id) else {
            return Arc::new(ResolvedPermissions::empty());
        };
        self.resolve_and_store(user, tenant).await
    }

    pub async fn invalidate(&self, user_id: Uuid, tenant_id: Uuid) {
        if self.cache.invalidate(user_id, tenant_id).await {
            debug!(%user_id, %tenant_id, "Invalidated cached permissions");
        }
    }

    /// Drop every cached set of a tenant. Call after changing a role or
    /// its grants, since any member may be affected.
    pub async fn invalidate_tenant(&self, tenant_id: Uuid) {
        let removed = self.cache.invalidate_tenant(tenant_id).await;
        debug!(%tenant_id, removed, "Invalidated cached permissions for tenant");
    }

    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all().await;
    }

    async fn resolve_and_store(&self, user: Uuid, tenant: Uuid) -> Arc<ResolvedPermissions> {
        // Read before resolving: an invalidation landing mid-resolution
        // must win over the (possibly stale) result.
        let generation = self.cache.generation().await;

        match self.try_resolve(Some(user), Some(tenant)).await {
            Ok(perms) if self.config.cache_enabled => {
                self.cache
                    .insert_if_current(user, tenant, generation, perms)
                    .await
            }
            Ok(perms) => Arc::new(perms),
            Err(e) => {
                error!(
                    user_id = %user,
                    tenant_id = %tenant,
                    error = %e,
                    "Permission resolution failed, denying all"
                );
                // A stale entry must not outlive a failed refresh.
                self.cache.invalidate(user, tenant).await;
                Arc::new(ResolvedPermissions::empty())
            }
        }
    }
}

/// Both identifiers, when present and non-nil.
fn context(user_id: Option<Uuid>, tenant_id: Option<Uuid>) -> Option<(Uuid, Uuid)> {
    match (user_id, tenant_id) {
        (Some(user), Some(tenant)) if !user.is_nil() && !tenant.is_nil() => Some((user, tenant)),
        _ => None,
    }
}

/// Highest dashboard scope, stopping at the first `Global`. Never
/// downgrades.
fn merge_dashboard_scopes(scopes: impl IntoIterator<Item = DashboardScope>) -> DashboardScope {
    let mut merged = DashboardScope::Personal;
    for scope in scopes {
        match scope {
            DashboardScope::Global => return DashboardScope::Global,
            DashboardScope::Team if merged == DashboardScope::Personal => {
                merged = DashboardScope::Team;
            }
            _ => {}
        }
    }
    merged
}

/// Highest commission scope, stopping at the first `All`.
fn merge_commission_scopes(scopes: impl IntoIterator<Item = CommissionScope>) -> CommissionScope {
    let mut merged = CommissionScope::None;
    for scope in scopes {
        if scope == CommissionScope::All {
            return CommissionScope::All;
        }
        merged = merged.max(scope);
    }
    merged
}
