//! Per-`(user, tenant)` store of resolved permission sets.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::resolved::ResolvedPermissions;

/// `(user_id, tenant_id)`
pub type CacheKey = (Uuid, Uuid);

/// Resolved sets kept until explicitly invalidated.
///
/// Entries never expire on their own: code that changes roles, grants or
/// assignments must call one of the `invalidate*` methods (or refresh the
/// entry) for the change to become visible.
///
/// Every invalidation bumps a generation counter. A resolution started
/// before an invalidation is stored with [`insert_if_current`], which
/// drops it once the generation has moved.
///
/// [`insert_if_current`]: PermissionCache::insert_if_current
#[derive(Debug, Default)]
pub struct PermissionCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<ResolvedPermissions>>,
    generation: u64,
}

impl CacheState {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: Uuid, tenant_id: Uuid) -> Option<Arc<ResolvedPermissions>> {
        self.state
            .read()
            .await
            .entries
            .get(&(user_id, tenant_id))
            .cloned()
    }

    /// Current generation. Read it before resolving and hand it back to
    /// [`insert_if_current`](Self::insert_if_current).
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Store `perms`, replacing any previous entry for the key.
    pub async fn insert(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        perms: ResolvedPermissions,
    ) -> Arc<ResolvedPermissions> {
        let perms = Arc::new(perms);
        self.state
            .write()
            .await
            .entries
            .insert((user_id, tenant_id), Arc::clone(&perms));
        perms
    }

    /// Store `perms` only if no invalidation happened since `generation`
    /// was read. The set is returned either way.
    pub async fn insert_if_current(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        generation: u64,
        perms: ResolvedPermissions,
    ) -> Arc<ResolvedPermissions> {
        let perms = Arc::new(perms);
        let mut state = self.state.write().await;
        if state.generation == generation {
            state.entries.insert((user_id, tenant_id), Arc::clone(&perms));
        }
        perms
    }

    /// Drop the entry for one user in one tenant. Returns whether an entry
    /// was present.
    pub async fn invalidate(&self, user_id: Uuid, tenant_id: Uuid) -> bool {
        let mut state = self.state.write().await;
        state.bump();
        state.entries.remove(&(user_id, tenant_id)).is_some()
    }

    /// Drop every entry of a tenant, e.g. after a role's grants changed.
    /// Returns the number of entries removed.
    pub async fn invalidate_tenant(&self, tenant_id: Uuid) -> usize {
        let mut state = self.state.write().await;
        state.bump();
        let before = state.entries.len();
        state.entries.retain(|&(_, tenant), _| tenant != tenant_id);
        before - state.entries.len()
    }

    pub async fn invalidate_all(&self) {
        let mut state = self.state.write().await;
        state.bump();
        state.entries.clear();
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}
