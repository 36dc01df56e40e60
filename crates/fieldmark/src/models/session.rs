//! Session data models for the remote storage layer
//!
//! These structures describe the two persisted document kinds (per-session
//! blobs and the per-user index) plus the client-side snapshot used for
//! unsaved-changes detection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::points_hash;

/// Schema version written into every session blob by the current code.
/// A missing or zero value in stored data marks a legacy document.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Version written into the index document. Version 0 indexes were stored
/// as a bare JSON array with no wrapper object.
pub const INDEX_VERSION: u32 = 1;

/// A geographic coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// How a point was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Tapped in by the user
    Manual,
    /// Captured by continuous GPS tracking
    Auto,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Manual => "manual",
            PointKind::Auto => "auto",
        }
    }
}

/// One recorded point. Immutable once recorded; the order of points in a
/// sequence is significant (it affects the hash and the rendered path).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPoint {
    pub point: GeoPoint,

    #[serde(rename = "type")]
    pub kind: PointKind,

    /// Capture time in epoch milliseconds
    pub timestamp: i64,
}

impl TrackedPoint {
    pub fn new(lat: f64, lng: f64, kind: PointKind, timestamp: i64) -> Self {
        Self {
            point: GeoPoint { lat, lng },
            kind,
            timestamp,
        }
    }
}

/// Full session blob, stored at `users/{uid}/sessions/{id}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub id: String,

    pub name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub schema_version: u32,

    pub points: Vec<TrackedPoint>,

    /// Enclosed area in square meters, computed by the caller
    pub area: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SessionData {
    /// Project the index entry for this session
    pub fn meta(&self) -> SessionMeta {
        SessionMeta {
            id: self.id.clone(),
            name: self.name.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            area: self.area,
            point_count: self.points.len(),
        }
    }
}

/// Denormalized projection of a session carried inside the index, so the
/// session list renders without fetching every blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub area: f64,
    pub point_count: usize,
}

/// Per-user index document, stored at `users/{uid}/index.json`.
/// Exactly one per user; `sessions` order is not meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSessionIndex {
    pub version: u32,
    pub last_modified: DateTime<Utc>,
    pub sessions: Vec<SessionMeta>,
}

impl UserSessionIndex {
    /// A current-version index with no sessions
    pub fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            last_modified: Utc::now(),
            sessions: Vec::new(),
        }
    }
}

/// Client-side snapshot of the session being edited. Never persisted as its
/// own document; used to detect unsaved changes against the live points.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSessionState {
    pub id: String,
    pub name: String,
    pub last_saved_at: DateTime<Utc>,
    pub points_hash_at_save: String,
}

impl CurrentSessionState {
    /// Snapshot the state of a session at save time
    pub fn at_save(session: &SessionData) -> Self {
        Self {
            id: session.id.clone(),
            name: session.name.clone(),
            last_saved_at: session.updated_at,
            points_hash_at_save: points_hash(&session.points),
        }
    }

    /// Re-hash the live points and compare against the saved fingerprint
    pub fn has_unsaved_changes(&self, points: &[TrackedPoint]) -> bool {
        points_hash(points) != self.points_hash_at_save
    }
}
