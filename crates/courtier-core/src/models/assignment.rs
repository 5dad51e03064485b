//! User-role assignment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Records that a user holds a role within one tenant.
///
/// `(tenant_id, user_id, role_id)` is unique. The same user may hold
/// several roles in a tenant and roles in other tenants independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}
