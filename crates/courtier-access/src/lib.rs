//! Courtier Access: tenant-scoped permission resolution, the resolved-set
//! cache, and permission gates.

pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod resolved;
pub mod service;

pub use cache::PermissionCache;
pub use config::{AccessConfig, AdminDetection};
pub use error::AccessError;
pub use gate::{PermissionGate, require};
pub use resolved::ResolvedPermissions;
pub use service::AccessControl;
