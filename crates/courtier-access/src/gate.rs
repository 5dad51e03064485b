//! Gates: conditional rendering and write guards on top of a resolved set.

use courtier_core::models::permission::{Action, Module};

use crate::error::AccessError;
use crate::resolved::ResolvedPermissions;

/// Shows its content only when `(module, action)` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGate {
    pub module: Module,
    pub action: Action,
}

impl PermissionGate {
    pub fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }

    pub fn allows(&self, perms: &ResolvedPermissions) -> bool {
        perms.can(self.module, self.action)
    }

    /// `children` when allowed, `fallback` otherwise.
    pub fn render<T>(&self, perms: &ResolvedPermissions, children: T, fallback: T) -> T {
        if self.allows(perms) { children } else { fallback }
    }

    /// `Some(children)` when allowed, nothing otherwise.
    pub fn render_or_empty<T>(&self, perms: &ResolvedPermissions, children: T) -> Option<T> {
        self.allows(perms).then_some(children)
    }
}

/// Guard to call before permitting a write.
pub fn require(
    perms: &ResolvedPermissions,
    module: Module,
    action: Action,
) -> Result<(), AccessError> {
    if perms.can(module, action) {
        Ok(())
    } else {
        Err(AccessError::Denied { module, action })
    }
}
