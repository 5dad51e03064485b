//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation.

use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    assignment::RoleAssignment,
    permission::{PermissionGrant, PermissionKey, PermissionMatrix, SetPermissionGrant},
    role::{CreateRole, Role, UpdateRole},
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenants (global scope)
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = CoreResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = CoreResult<Tenant>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = CoreResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Tenant>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = CoreResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CoreResult<Role>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CoreResult<Role>> + Send;
    /// Deletes the role together with its grants and assignments.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = CoreResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<Role>>> + Send;

    /// Assign a role to a user within the tenant. Assigning twice is a no-op.
    fn assign_to_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CoreResult<RoleAssignment>> + Send;

    /// Remove a role assignment from a user.
    fn unassign_from_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Get every role (active or not) the user holds in this tenant, in
    /// assignment order.
    fn get_user_roles(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CoreResult<Vec<Role>>> + Send;

    /// Get all assignments of one role.
    fn get_role_members(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CoreResult<Vec<RoleAssignment>>> + Send;
}

pub trait PermissionGrantRepository: Send + Sync {
    /// Insert or replace the grant for `(role_id, module, action)`.
    fn set_grant(
        &self,
        input: SetPermissionGrant,
    ) -> impl Future<Output = CoreResult<PermissionGrant>> + Send;

    /// Remove the grant row for `(role_id, key)` if present.
    fn revoke_grant(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        key: PermissionKey,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Get all grant rows of a role, allowed or not.
    fn get_role_grants(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CoreResult<Vec<PermissionGrant>>> + Send;

    /// Replace every grant of a role with exactly the allowed pairs in
    /// `matrix`.
    fn replace_role_grants(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        matrix: PermissionMatrix,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Get the `(module, action)` pairs with `allowed = true` across a set
    /// of roles. Duplicates across roles may appear.
    fn get_allowed_grants(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = CoreResult<Vec<PermissionKey>>> + Send;
}
