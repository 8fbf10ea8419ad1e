//! Scoped connection: a handler paired with its realm lock.

use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use super::handler::ConnectionHandler;
use super::lock::{RealmBusy, RealmLock, RealmLocks};
use super::transport::Transport;

/// Holds the realm lock for a handler's target while in use.
///
/// [`close`](Self::close) tears the connection down and then releases the
/// lock. The lock is released even if teardown panics, and also when the
/// value is dropped without calling `close` (the connection itself is then
/// left to the handler's owner).
pub struct ScopedConnection<T: Transport> {
    handler: Arc<ConnectionHandler<T>>,
    lock: Option<RealmLock>,
}

impl<T: Transport> ScopedConnection<T> {
    /// Lock the handler's realm in `locks`.
    pub fn open(handler: Arc<ConnectionHandler<T>>, locks: &RealmLocks) -> Result<Self, RealmBusy> {
        let holder = uuid::Uuid::new_v4().to_string();
        let lock = locks.try_acquire(&handler.target().realm(), &holder)?;
        Ok(Self {
            handler,
            lock: Some(lock),
        })
    }

    pub fn handler(&self) -> &Arc<ConnectionHandler<T>> {
        &self.handler
    }

    /// Close the connection, then release the realm lock.
    pub async fn close(mut self) {
        let lock = self.lock.take();
        self.handler.close().await;
        if let Some(lock) = lock {
            debug!("Releasing realm {}", lock.realm());
        }
    }
}

impl<T: Transport> Deref for ScopedConnection<T> {
    type Target = ConnectionHandler<T>;

    fn deref(&self) -> &Self::Target {
        &self.handler
    }
}
