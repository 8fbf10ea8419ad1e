//! Realm locks.
//!
//! A realm lock marks a remote location (`host:port`) as in use by one
//! [`ScopedConnection`](super::ScopedConnection). It is a resource separate
//! from the network connection: releasing it does not touch the transport,
//! and it is released when the [`RealmLock`] guard drops, whatever happened
//! to the connection.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::debug;

/// Process-wide realm lock registry.
pub static REALM_LOCKS: Lazy<RealmLocks> = Lazy::new(RealmLocks::new);

/// The realm is already held by another scoped connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("realm {realm} is already in use by {holder}")]
pub struct RealmBusy {
    pub realm: String,
    pub holder: String,
}

/// Registry of held realms: realm -> holder id.
#[derive(Debug, Clone, Default)]
pub struct RealmLocks {
    held: Arc<DashMap<String, String>>,
}

impl RealmLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `realm` on behalf of `holder`.
    pub fn try_acquire(&self, realm: &str, holder: &str) -> Result<RealmLock, RealmBusy> {
        match self.held.entry(realm.to_string()) {
            Entry::Occupied(entry) => Err(RealmBusy {
                realm: realm.to_string(),
                holder: entry.get().clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(holder.to_string());
                debug!("Realm {} locked by {}", realm, holder);
                Ok(RealmLock {
                    registry: self.clone(),
                    realm: realm.to_string(),
                })
            }
        }
    }

    /// Current holder of `realm`, if locked.
    pub fn holder(&self, realm: &str) -> Option<String> {
        self.held.get(realm).map(|entry| entry.value().clone())
    }

    pub fn is_locked(&self, realm: &str) -> bool {
        self.held.contains_key(realm)
    }
}

/// Guard releasing its realm on drop.
#[derive(Debug)]
pub struct RealmLock {
    registry: RealmLocks,
    realm: String,
}

impl RealmLock {
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Drop for RealmLock {
    fn drop(&mut self) {
        self.registry.held.remove(&self.realm);
        debug!("Realm {} released", self.realm);
    }
}
