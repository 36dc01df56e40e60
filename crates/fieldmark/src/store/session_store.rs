//! Session CRUD and index consistency over the remote blob store
//!
//! Two documents exist per user: the session blobs (authoritative) and the
//! denormalized index used for listing. The blob is always written before
//! the index: an index entry pointing at a missing blob is detectable and
//! repairable (`SESSION_NOT_FOUND` then [`SessionStore::remove_from_index`]),
//! while an orphaned blob is invisible but harmless. There is no two-phase
//! commit and no client-side locking; concurrent index writers race and the
//! last write wins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{BlobClient, UserAuth};
use crate::error::{FieldmarkError, Result};
use crate::models::{
    SessionData, SessionMeta, TrackedPoint, UserSessionIndex, SESSION_SCHEMA_VERSION,
};
use crate::store::error::{map_blob_error, map_json_error, StorageError};
use crate::store::migrate::{migrate_index, migrate_session_data};

/// Path of the per-user index document
pub fn index_path(uid: &str) -> String {
    format!("users/{}/index.json", uid)
}

/// Path of a session blob
pub fn session_path(uid: &str, session_id: &str) -> String {
    format!("users/{}/sessions/{}.json", uid, session_id)
}

/// Prefix under which all of a user's session blobs live
pub fn sessions_prefix(uid: &str) -> String {
    format!("users/{}/sessions/", uid)
}

type StorageResult<T> = std::result::Result<T, StorageError>;

/// Session persistence orchestrator.
///
/// Owns the observable `loading`/`last_error` state. One instance per
/// signed-in user; operations take `&self` and may be issued concurrently,
/// in which case the last index write wins.
pub struct SessionStore {
    client: BlobClient,
    user: Mutex<Option<UserAuth>>,
    in_flight: AtomicBool,
    last_error: Mutex<Option<StorageError>>,
}

/// Keeps the in-flight flag set for the duration of one operation
struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightGuard<'a> {
    fn begin(store: &'a SessionStore) -> Self {
        *lock(&store.last_error) = None;
        store.in_flight.store(true, Ordering::SeqCst);
        Self {
            flag: &store.in_flight,
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionStore {
    pub fn new(client: BlobClient) -> Self {
        Self {
            client,
            user: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub fn with_user(client: BlobClient, user: UserAuth) -> Self {
        let store = Self::new(client);
        store.set_user(Some(user));
        store
    }

    /// Swap the signed-in identity; `None` signs out
    pub fn set_user(&self, user: Option<UserAuth>) {
        *lock(&self.user) = user;
    }

    /// Whether an operation is currently in flight
    pub fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The most recent classified failure, if any
    pub fn last_error(&self) -> Option<StorageError> {
        lock(&self.last_error).clone()
    }

    pub fn clear_error(&self) {
        *lock(&self.last_error) = None;
    }

    fn auth(&self) -> StorageResult<UserAuth> {
        lock(&self.user)
            .clone()
            .ok_or_else(StorageError::not_authenticated)
    }

    /// Record a failure in the error slot before surfacing it
    fn fail(&self, err: StorageError) -> FieldmarkError {
        *lock(&self.last_error) = Some(err.clone());
        err.into()
    }

    /// Fetch the per-user index.
    ///
    /// Returns `None` when no index exists yet ("no sessions" is a valid
    /// state, not an error). Corrupted index bytes resolve to an empty
    /// current-version index rather than failing: stale garbage must not
    /// block the user from saving new sessions. The corrupt document is
    /// left in place until the next explicit index write overwrites it.
    pub async fn fetch_index(&self) -> Result<Option<UserSessionIndex>> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, "fetching session index");
        self.read_index(&auth).await.map_err(|e| self.fail(e))
    }

    /// Save a new session and append it to the index. Returns the meta
    /// entry actually written.
    pub async fn save_new_session(
        &self,
        name: &str,
        points: &[TrackedPoint],
        area: f64,
    ) -> Result<SessionMeta> {
        let _flight = FlightGuard::begin(self);
        if points.is_empty() {
            return Err(FieldmarkError::invalid_param(
                "a session must contain at least one point",
            ));
        }
        let auth = self.auth().map_err(|e| self.fail(e))?;

        let now = Utc::now();
        let session = SessionData {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
            schema_version: SESSION_SCHEMA_VERSION,
            points: points.to_vec(),
            area,
            notes: None,
        };

        debug!(uid = %auth.uid, id = %session.id, "saving new session");
        self.append_session(&auth, session)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Overwrite an existing session's points and area, preserving its
    /// name, notes and creation time, and sync the index entry.
    pub async fn update_session(
        &self,
        id: &str,
        points: &[TrackedPoint],
        area: f64,
    ) -> Result<SessionMeta> {
        let _flight = FlightGuard::begin(self);
        if points.is_empty() {
            return Err(FieldmarkError::invalid_param(
                "a session must contain at least one point",
            ));
        }
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, id, "updating session");
        self.rewrite_session(&auth, id, points, area)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Fetch and migrate a session blob.
    ///
    /// A not-found condition surfaces as `SESSION_NOT_FOUND` specifically,
    /// so callers can offer [`SessionStore::remove_from_index`] as repair.
    pub async fn load_session(&self, id: &str) -> Result<SessionData> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, id, "loading session");
        self.read_session(&auth, id).await.map_err(|e| self.fail(e))
    }

    /// Rename a session, patching the matching index entry in place
    pub async fn rename_session(&self, id: &str, new_name: &str) -> Result<()> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, id, "renaming session");
        self.rename_inner(&auth, id, new_name.trim())
            .await
            .map_err(|e| self.fail(e))
    }

    /// Delete a session blob and drop it from the index
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, id, "deleting session");
        self.delete_inner(&auth, id).await.map_err(|e| self.fail(e))
    }

    /// Drop an id from the index without touching the blob — the repair
    /// operation for an index entry whose blob is gone.
    pub async fn remove_from_index(&self, id: &str) -> Result<()> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, id, "removing session from index");
        self.remove_from_index_inner(&auth, id)
            .await
            .map_err(|e| self.fail(e))
    }

    /// Delete every session blob under the user's prefix, then the index
    pub async fn delete_all_sessions(&self) -> Result<()> {
        let _flight = FlightGuard::begin(self);
        let auth = self.auth().map_err(|e| self.fail(e))?;

        debug!(uid = %auth.uid, "deleting all sessions");
        self.delete_all_inner(&auth).await.map_err(|e| self.fail(e))
    }

    async fn append_session(
        &self,
        auth: &UserAuth,
        session: SessionData,
    ) -> StorageResult<SessionMeta> {
        // Blob first: it is the authoritative record. If the index write
        // below fails we are left with an orphaned blob, the less-bad
        // inconsistency.
        self.write_session(auth, &session).await?;

        let mut index = self
            .read_index(auth)
            .await?
            .unwrap_or_else(UserSessionIndex::empty);

        let meta = session.meta();
        index.sessions.push(meta.clone());
        index.last_modified = session.updated_at;
        self.write_index(auth, &index).await?;

        Ok(meta)
    }

    async fn rewrite_session(
        &self,
        auth: &UserAuth,
        id: &str,
        points: &[TrackedPoint],
        area: f64,
    ) -> StorageResult<SessionMeta> {
        let existing = self.read_session(auth, id).await?;
        let now = Utc::now();

        let session = SessionData {
            id: id.to_string(),
            name: existing.name,
            created_at: existing.created_at,
            updated_at: now,
            schema_version: SESSION_SCHEMA_VERSION,
            points: points.to_vec(),
            area,
            notes: existing.notes,
        };
        self.write_session(auth, &session).await?;

        let mut index = self
            .read_index(auth)
            .await?
            .unwrap_or_else(UserSessionIndex::empty);

        let meta = session.meta();
        match index.sessions.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => *entry = meta.clone(),
            None => index.sessions.push(meta.clone()),
        }
        index.last_modified = now;
        self.write_index(auth, &index).await?;

        Ok(meta)
    }

    async fn rename_inner(&self, auth: &UserAuth, id: &str, name: &str) -> StorageResult<()> {
        let mut session = self.read_session(auth, id).await?;
        let now = Utc::now();
        session.name = name.to_string();
        session.updated_at = now;
        self.write_session(auth, &session).await?;

        // The index is only rewritten when the session is actually listed
        let Some(mut index) = self.read_index(auth).await? else {
            return Ok(());
        };
        if let Some(entry) = index.sessions.iter_mut().find(|entry| entry.id == id) {
            entry.name = name.to_string();
            entry.updated_at = now;
            index.last_modified = now;
            self.write_index(auth, &index).await?;
        }
        Ok(())
    }

    async fn delete_inner(&self, auth: &UserAuth, id: &str) -> StorageResult<()> {
        match self
            .client
            .delete_object(auth, &session_path(&auth.uid, id))
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Err(StorageError::session_not_found()),
            Err(e) => return Err(map_blob_error(&e)),
        }

        let mut index = self
            .read_index(auth)
            .await?
            .unwrap_or_else(UserSessionIndex::empty);
        index.sessions.retain(|entry| entry.id != id);
        index.last_modified = Utc::now();
        self.write_index(auth, &index).await
    }

    async fn remove_from_index_inner(&self, auth: &UserAuth, id: &str) -> StorageResult<()> {
        let Some(mut index) = self.read_index(auth).await? else {
            return Ok(());
        };

        let before = index.sessions.len();
        index.sessions.retain(|entry| entry.id != id);
        if index.sessions.len() == before {
            return Ok(());
        }

        index.last_modified = Utc::now();
        self.write_index(auth, &index).await
    }

    async fn delete_all_inner(&self, auth: &UserAuth) -> StorageResult<()> {
        let paths = self
            .client
            .list_all(auth, &sessions_prefix(&auth.uid))
            .await
            .map_err(|e| map_blob_error(&e))?;

        for path in &paths {
            match self.client.delete_object(auth, path).await {
                Ok(()) => {}
                // Another writer already removed it; the goal state holds
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(map_blob_error(&e)),
            }
        }

        match self.client.delete_object(auth, &index_path(&auth.uid)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(map_blob_error(&e)),
        }
    }

    async fn read_index(&self, auth: &UserAuth) -> StorageResult<Option<UserSessionIndex>> {
        let bytes = match self.client.download(auth, &index_path(&auth.uid)).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(map_blob_error(&e)),
        };

        let raw: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(uid = %auth.uid, error = %e, "index unreadable, falling back to empty");
                return Ok(Some(UserSessionIndex::empty()));
            }
        };

        if index_shape_is_corrupted(&raw) {
            warn!(uid = %auth.uid, "index has unusable shape, falling back to empty");
            return Ok(Some(UserSessionIndex::empty()));
        }

        Ok(Some(migrate_index(&raw)))
    }

    async fn read_session(&self, auth: &UserAuth, id: &str) -> StorageResult<SessionData> {
        let bytes = match self
            .client
            .download(auth, &session_path(&auth.uid, id))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Err(StorageError::session_not_found()),
            Err(e) => return Err(map_blob_error(&e)),
        };

        let raw: Value = serde_json::from_slice(&bytes).map_err(|e| map_json_error(&e))?;
        Ok(migrate_session_data(&raw))
    }

    async fn write_session(&self, auth: &UserAuth, session: &SessionData) -> StorageResult<()> {
        let json = serde_json::to_string(session).map_err(|e| map_json_error(&e))?;
        self.client
            .upload_string(auth, &session_path(&auth.uid, &session.id), &json)
            .await
            .map_err(|e| map_blob_error(&e))
    }

    async fn write_index(&self, auth: &UserAuth, index: &UserSessionIndex) -> StorageResult<()> {
        let json = serde_json::to_string(index).map_err(|e| map_json_error(&e))?;
        self.client
            .upload_string(auth, &index_path(&auth.uid), &json)
            .await
            .map_err(|e| map_blob_error(&e))
    }
}

/// A wrapped index whose `sessions` field is not an array is unusable.
/// A bare array is the legacy v0 shape, not corruption.
fn index_shape_is_corrupted(raw: &Value) -> bool {
    if raw.is_array() {
        return false;
    }
    match raw.as_object() {
        Some(obj) => matches!(obj.get("sessions"), Some(sessions) if !sessions.is_array()),
        None => true,
    }
}
