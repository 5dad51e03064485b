//! Role domain model.
//!
//! A role is a named, tenant-scoped bundle of permission grants plus two
//! coarse visibility scopes: which dashboards the holder sees and whose
//! commissions the holder may read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Dashboard visibility, ordered `Personal < Team < Global`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DashboardScope {
    #[default]
    Personal,
    Team,
    Global,
}

impl DashboardScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DashboardScope::Personal => "personal",
            DashboardScope::Team => "team",
            DashboardScope::Global => "global",
        }
    }
}

impl fmt::Display for DashboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(DashboardScope::Personal),
            "team" => Ok(DashboardScope::Team),
            "global" => Ok(DashboardScope::Global),
            other => Err(CoreError::Validation {
                message: format!("unknown dashboard scope: {other}"),
            }),
        }
    }
}

/// Commission visibility, ordered `None < Own < Team < All`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CommissionScope {
    #[default]
    None,
    Own,
    Team,
    All,
}

impl CommissionScope {
    pub fn as_str(self) -> &'static str {
        match self {
            CommissionScope::None => "none",
            CommissionScope::Own => "own",
            CommissionScope::Team => "team",
            CommissionScope::All => "all",
        }
    }
}

impl fmt::Display for CommissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    /// Inactive roles stay assigned but contribute nothing on resolution.
    pub is_active: bool,
    /// Explicit administrator flag: holders bypass the grant table.
    pub is_super_role: bool,
    pub dashboard_scope: DashboardScope,
    pub can_see_own_commissions: bool,
    pub can_see_team_commissions: bool,
    pub can_see_all_commissions: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// The highest commission scope this role's flags allow.
    pub fn commission_scope(&self) -> CommissionScope {
        if self.can_see_all_commissions {
            CommissionScope::All
        } else if self.can_see_team_commissions {
            CommissionScope::Team
        } else if self.can_see_own_commissions {
            CommissionScope::Own
        } else {
            CommissionScope::None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_super_role: bool,
    pub dashboard_scope: DashboardScope,
    pub can_see_own_commissions: bool,
    pub can_see_team_commissions: bool,
    pub can_see_all_commissions: bool,
}

impl CreateRole {
    /// A plain active role with the lowest scopes and no commission access.
    pub fn named(tenant_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            tenant_id,
            name: name.into(),
            description: String::new(),
            is_super_role: false,
            dashboard_scope: DashboardScope::Personal,
            can_see_own_commissions: false,
            can_see_team_commissions: false,
            can_see_all_commissions: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateRole {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub is_super_role: Option<bool>,
    pub dashboard_scope: Option<DashboardScope>,
    pub can_see_own_commissions: Option<bool>,
    pub can_see_team_commissions: Option<bool>,
    pub can_see_all_commissions: Option<bool>,
}
