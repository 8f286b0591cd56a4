use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{LocalStorage, StorageError};

/// Storage key holding the single persisted session
pub const SESSION_KEY: &str = "backoffice_user_data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub real_name: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

impl UserRecord {
    /// Name to show the user: real name, falling back to the display name.
    pub fn display_name(&self) -> &str {
        if self.real_name.is_empty() {
            &self.name
        } else {
            &self.real_name
        }
    }
}

/// A logged-in client: the user record plus its bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user: UserRecord,
    pub access_token: String,
}

/// The one session slot in durable storage.
///
/// Clones share a lock, so load/save/clear never interleave across threads.
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    lock: Arc<Mutex<()>>,
}

impl SessionStore {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the session, replacing whatever was stored.
    pub fn save(&self, session: &SessionData) -> Result<(), StorageError> {
        let _guard = self.guard();
        self.storage.save(SESSION_KEY, session)?;
        debug!(user_id = session.user.id, "Session saved");
        Ok(())
    }

    /// Read the stored session. Fails with `StorageError::CorruptData` when
    /// the value does not parse as a session.
    pub fn load(&self) -> Result<Option<SessionData>, StorageError> {
        let _guard = self.guard();
        self.storage.load(SESSION_KEY)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.guard();
        self.storage.remove_item(SESSION_KEY)?;
        debug!("Session cleared");
        Ok(())
    }

    /// Load, treating a corrupt entry as absent and evicting it. The read
    /// and the eviction happen under one guard, so a concurrent `save` is
    /// never the thing evicted.
    pub fn load_or_evict(&self) -> Result<Option<SessionData>, StorageError> {
        let _guard = self.guard();
        match self.storage.load(SESSION_KEY) {
            Ok(session) => Ok(session),
            Err(StorageError::CorruptData { source, .. }) => {
                warn!(error = %source, "Stored session is corrupt, evicting");
                self.storage.remove_item(SESSION_KEY)?;
                debug!("Session cleared");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
