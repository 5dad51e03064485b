//! The resolved permission set of one user in one tenant.

use courtier_core::models::permission::{Action, Module, PermissionKey, PermissionMatrix};
use courtier_core::models::role::{CommissionScope, DashboardScope};
use serde::{Deserialize, Serialize};

/// Everything a user may do in a tenant, computed from their active roles.
///
/// A snapshot: it does not follow later role or grant changes until it is
/// resolved again.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolvedPermissions {
    pub permissions: PermissionMatrix,
    pub dashboard_scope: DashboardScope,
    pub commission_scope: CommissionScope,
    /// Names of the active roles held, in assignment order.
    pub roles: Vec<String>,
    pub is_admin: bool,
}

impl ResolvedPermissions {
    /// The set that grants nothing: no roles, lowest scopes, not admin.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `action` is allowed on `module`. Administrators are always
    /// allowed; otherwise a missing grant denies.
    pub fn can(&self, module: Module, action: Action) -> bool {
        self.is_admin || self.permissions.contains(module, action)
    }

    /// True if any of `actions` is allowed on `module`.
    pub fn can_any(&self, module: Module, actions: &[Action]) -> bool {
        self.is_admin || actions.iter().any(|&a| self.permissions.contains(module, a))
    }

    /// True if every one of `actions` is allowed on `module`. Vacuously
    /// true for an empty list.
    pub fn can_all(&self, module: Module, actions: &[Action]) -> bool {
        self.is_admin || actions.iter().all(|&a| self.permissions.contains(module, a))
    }

    /// Lookup by textual `"module:action"` key. Keys that don't parse are
    /// denied, except for administrators.
    pub fn can_key(&self, key: &str) -> bool {
        if self.is_admin {
            return true;
        }
        key.parse::<PermissionKey>()
            .map(|key| self.permissions.contains_key(key))
            .unwrap_or(false)
    }

    pub fn can_see_commissions(&self, scope: CommissionScope) -> bool {
        self.commission_scope >= scope
    }

    pub fn can_see_dashboard(&self, scope: DashboardScope) -> bool {
        self.dashboard_scope >= scope
    }
}
