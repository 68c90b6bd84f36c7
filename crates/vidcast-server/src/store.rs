//! Async handle over the SQLite store.
//!
//! `rusqlite` is blocking, so every call hops onto the blocking pool and
//! takes the connection mutex there. No lock is ever held across `.await`.

use std::sync::{Arc, Mutex};

use vidcast_store::Database;

use crate::error::ServerError;

#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `op` against the database on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> vidcast_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|_| ServerError::Internal("store mutex poisoned".into()))?;
            op(&guard).map_err(ServerError::from)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))?
    }

    /// Close the connection. Only succeeds once every other handle is gone.
    pub fn close(self) -> Result<(), ServerError> {
        let mutex = Arc::try_unwrap(self.db)
            .map_err(|_| ServerError::Internal("store still in use at shutdown".into()))?;
        let db = mutex
            .into_inner()
            .map_err(|_| ServerError::Internal("store mutex poisoned".into()))?;
        db.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_maps_store_errors() {
        let store = Store::new(Database::open_in_memory().unwrap());
        let err = store
            .run(|db| db.get_user(vidcast_shared::UserId::new()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Store(vidcast_store::StoreError::NotFound("User"))
        ));
    }

    #[tokio::test]
    async fn close_requires_sole_owner() {
        let store = Store::new(Database::open_in_memory().unwrap());
        let other = store.clone();
        assert!(store.close().is_err());
        drop(other);

        let store = Store::new(Database::open_in_memory().unwrap());
        let handler_copy = store.clone();
        drop(handler_copy);
        store.close().unwrap();
    }
}
