//! SurrealDB repository implementations.

mod permission;
mod role;
mod tenant;

pub use permission::SurrealPermissionGrantRepository;
pub use role::SurrealRoleRepository;
pub use tenant::SurrealTenantRepository;
