//! Access control configuration.

/// How a role is recognized as an administrator role.
///
/// Administrator roles bypass the grant table: every `can` query answers
/// true for their holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminDetection {
    /// Only the role's `is_super_role` flag counts.
    ExplicitFlag,
    /// The flag, or a role name matching one of the configured markers.
    /// Lets tenants whose roles predate the flag keep working.
    #[default]
    FlagOrNameFallback,
    /// Only the role name is inspected; the flag is ignored.
    NameHeuristic,
}

/// Configuration for [`AccessControl`](crate::AccessControl).
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Administrator detection policy (default: flag with name fallback).
    pub admin_detection: AdminDetection,
    /// Name markers for the name heuristic, lowercase. A role name matches
    /// when it contains a marker, case-insensitively
    /// (default: `["admin", "administrateur"]`).
    pub admin_name_markers: Vec<String>,
    /// Keep resolved sets per `(user, tenant)` until invalidated
    /// (default: true).
    pub cache_enabled: bool,
}

impl AccessConfig {
    /// Whether `name` matches any configured administrator marker.
    pub fn name_marks_admin(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.admin_name_markers
            .iter()
            .any(|marker| name.contains(marker.as_str()))
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            admin_detection: AdminDetection::default(),
            admin_name_markers: vec!["admin".into(), "administrateur".into()],
            cache_enabled: true,
        }
    }
}
