//! Permission domain model.
//!
//! Grants are expressed over two closed enumerations, [`Module`] and
//! [`Action`]. Resolved grants live in a [`PermissionMatrix`], a fixed
//! bit matrix indexed by `Module × Action`, so an unknown module or
//! action cannot be looked up at all.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Functional area of the portal a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Clients,
    Contracts,
    Partners,
    Products,
    Collaborators,
    Commissions,
    Decomptes,
    Payout,
    Dashboard,
    Settings,
}

impl Module {
    pub const COUNT: usize = 10;

    /// Every module, in declaration order.
    pub const ALL: [Module; Module::COUNT] = [
        Module::Clients,
        Module::Contracts,
        Module::Partners,
        Module::Products,
        Module::Collaborators,
        Module::Commissions,
        Module::Decomptes,
        Module::Payout,
        Module::Dashboard,
        Module::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Module::Clients => "clients",
            Module::Contracts => "contracts",
            Module::Partners => "partners",
            Module::Products => "products",
            Module::Collaborators => "collaborators",
            Module::Commissions => "commissions",
            Module::Decomptes => "decomptes",
            Module::Payout => "payout",
            Module::Dashboard => "dashboard",
            Module::Settings => "settings",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Module::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::Validation {
                message: format!("unknown module: {s}"),
            })
    }
}

/// Operation a grant allows within a [`Module`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    Export,
    Deposit,
    Cancel,
    Generate,
    Validate,
    ModifyRules,
}

impl Action {
    pub const COUNT: usize = 10;

    /// Every action, in declaration order.
    pub const ALL: [Action; Action::COUNT] = [
        Action::View,
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Export,
        Action::Deposit,
        Action::Cancel,
        Action::Generate,
        Action::Validate,
        Action::ModifyRules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Export => "export",
            Action::Deposit => "deposit",
            Action::Cancel => "cancel",
            Action::Generate => "generate",
            Action::Validate => "validate",
            Action::ModifyRules => "modify_rules",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| CoreError::Validation {
                message: format!("unknown action: {s}"),
            })
    }
}

/// A `(module, action)` pair. Its textual form is `"module:action"`,
/// e.g. `"clients:view"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionKey {
    pub module: Module,
    pub action: Action,
}

impl PermissionKey {
    pub fn new(module: Module, action: Action) -> Self {
        Self { module, action }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.action)
    }
}

impl FromStr for PermissionKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (module, action) = s.split_once(':').ok_or_else(|| CoreError::Validation {
            message: format!("permission key must be `module:action`, got `{s}`"),
        })?;
        Ok(Self {
            module: module.parse()?,
            action: action.parse()?,
        })
    }
}

impl TryFrom<String> for PermissionKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PermissionKey> for String {
    fn from(key: PermissionKey) -> Self {
        key.to_string()
    }
}

/// Set of allowed `(module, action)` pairs stored as one bit row per
/// module.
///
/// Serializes as the list of `"module:action"` keys in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<PermissionKey>", into = "Vec<PermissionKey>")]
pub struct PermissionMatrix {
    rows: [u16; Module::COUNT],
}

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the pair was not already present.
    pub fn insert(&mut self, module: Module, action: Action) -> bool {
        let row = &mut self.rows[module.index()];
        let added = *row & action.bit() == 0;
        *row |= action.bit();
        added
    }

    /// Returns `true` if the pair was present.
    pub fn remove(&mut self, module: Module, action: Action) -> bool {
        let row = &mut self.rows[module.index()];
        let present = *row & action.bit() != 0;
        *row &= !action.bit();
        present
    }

    pub fn contains(&self, module: Module, action: Action) -> bool {
        self.rows[module.index()] & action.bit() != 0
    }

    pub fn contains_key(&self, key: PermissionKey) -> bool {
        self.contains(key.module, key.action)
    }

    pub fn union_with(&mut self, other: &PermissionMatrix) {
        for (row, other_row) in self.rows.iter_mut().zip(other.rows) {
            *row |= other_row;
        }
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(|r| r.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| *r == 0)
    }

    /// Actions allowed on one module, in declaration order.
    pub fn actions(&self, module: Module) -> impl Iterator<Item = Action> + '_ {
        let row = self.rows[module.index()];
        Action::ALL.into_iter().filter(move |a| row & a.bit() != 0)
    }

    /// All allowed pairs, module-major in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = PermissionKey> + '_ {
        Module::ALL.into_iter().flat_map(move |m| {
            self.actions(m).map(move |a| PermissionKey::new(m, a))
        })
    }
}

impl FromIterator<PermissionKey> for PermissionMatrix {
    fn from_iter<I: IntoIterator<Item = PermissionKey>>(iter: I) -> Self {
        let mut matrix = Self::new();
        matrix.extend(iter);
        matrix
    }
}

impl Extend<PermissionKey> for PermissionMatrix {
    fn extend<I: IntoIterator<Item = PermissionKey>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key.module, key.action);
        }
    }
}

impl From<Vec<PermissionKey>> for PermissionMatrix {
    fn from(keys: Vec<PermissionKey>) -> Self {
        keys.into_iter().collect()
    }
}

impl From<PermissionMatrix> for Vec<PermissionKey> {
    fn from(matrix: PermissionMatrix) -> Self {
        matrix.iter().collect()
    }
}

/// A stored grant row: `(role, module, action) -> allowed`.
///
/// `(role_id, module, action)` is unique; only rows with `allowed = true`
/// contribute to resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub module: Module,
    pub action: Action,
    pub allowed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionGrant {
    pub fn key(&self) -> PermissionKey {
        PermissionKey::new(self.module, self.action)
    }
}

/// Upsert input for a single grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPermissionGrant {
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub module: Module,
    pub action: Action,
    pub allowed: bool,
}
