//! Defensive normalization of stored JSON into the current document shapes
//!
//! Older client versions wrote sessions and indexes in slightly different
//! shapes (flat point coordinates, a bare array instead of the wrapped
//! index). Everything read from storage passes through these functions, so
//! every field access here has an explicit default and no input shape can
//! make them fail. Both functions are pure and idempotent.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{
    GeoPoint, PointKind, SessionData, SessionMeta, TrackedPoint, UserSessionIndex, INDEX_VERSION,
    SESSION_SCHEMA_VERSION,
};

type Obj<'a> = Option<&'a Map<String, Value>>;

/// Normalize an arbitrary stored value into a current-shape session blob.
pub fn migrate_session_data(raw: &Value) -> SessionData {
    let obj = raw.as_object();
    let now = Utc::now();

    SessionData {
        id: non_empty_string(obj, "id").unwrap_or_default(),
        name: non_empty_string(obj, "name").unwrap_or_else(|| "Unnamed Session".to_string()),
        created_at: datetime_field(obj, "createdAt").unwrap_or(now),
        updated_at: datetime_field(obj, "updatedAt").unwrap_or(now),
        schema_version: SESSION_SCHEMA_VERSION,
        points: field(obj, "points").map(migrate_points).unwrap_or_default(),
        area: f64_field(obj, "area"),
        notes: string_field(obj, "notes"),
    }
}

/// Normalize a stored points array, accepting both the current nested shape
/// and the legacy flat `{lat, lng}` shape. Entries are never dropped: a
/// null entry becomes a zeroed manual point so the count is preserved.
pub fn migrate_points(raw: &Value) -> Vec<TrackedPoint> {
    match raw.as_array() {
        Some(items) => items.iter().map(migrate_point).collect(),
        None => Vec::new(),
    }
}

fn migrate_point(raw: &Value) -> TrackedPoint {
    let obj = raw.as_object();

    // Legacy points carried lat/lng directly on the point object. When the
    // nested `point` key exists it wins, even if its value is null or empty.
    let (lat, lng) = match field(obj, "point") {
        Some(nested) => {
            let nested = nested.as_object();
            (f64_field(nested, "lat"), f64_field(nested, "lng"))
        }
        None => (f64_field(obj, "lat"), f64_field(obj, "lng")),
    };

    let kind = match field(obj, "type").and_then(Value::as_str) {
        Some("auto") => PointKind::Auto,
        _ => PointKind::Manual,
    };

    TrackedPoint {
        point: GeoPoint { lat, lng },
        kind,
        timestamp: i64_field(obj, "timestamp").unwrap_or_else(now_millis),
    }
}

/// Normalize an arbitrary stored value into a current-shape index.
///
/// Version 0 indexes were a bare JSON array of meta-like objects; the
/// current shape wraps them in `{version, lastModified, sessions}`.
pub fn migrate_index(raw: &Value) -> UserSessionIndex {
    let now = Utc::now();

    if let Some(items) = raw.as_array() {
        return UserSessionIndex {
            version: INDEX_VERSION,
            last_modified: now,
            sessions: items.iter().map(migrate_meta).collect(),
        };
    }

    let obj = raw.as_object();
    UserSessionIndex {
        version: INDEX_VERSION,
        last_modified: datetime_field(obj, "lastModified").unwrap_or(now),
        sessions: field(obj, "sessions")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(migrate_meta).collect())
            .unwrap_or_default(),
    }
}

fn migrate_meta(raw: &Value) -> SessionMeta {
    let obj = raw.as_object();
    let created_at = datetime_field(obj, "createdAt");

    SessionMeta {
        id: non_empty_string(obj, "id").unwrap_or_default(),
        name: non_empty_string(obj, "name").unwrap_or_else(|| "Unnamed".to_string()),
        created_at: created_at.unwrap_or_else(Utc::now),
        updated_at: datetime_field(obj, "updatedAt")
            .or(created_at)
            .unwrap_or_else(Utc::now),
        area: f64_field(obj, "area"),
        point_count: field(obj, "pointCount")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize,
    }
}

fn field<'a>(obj: Obj<'a>, key: &str) -> Option<&'a Value> {
    obj.and_then(|o| o.get(key))
}

fn string_field(obj: Obj<'_>, key: &str) -> Option<String> {
    field(obj, key).and_then(Value::as_str).map(str::to_string)
}

fn non_empty_string(obj: Obj<'_>, key: &str) -> Option<String> {
    string_field(obj, key).filter(|s| !s.is_empty())
}

fn f64_field(obj: Obj<'_>, key: &str) -> f64 {
    field(obj, key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn i64_field(obj: Obj<'_>, key: &str) -> Option<i64> {
    let value = field(obj, key)?;
    // Stored timestamps are integers, but tolerate a float representation
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn datetime_field(obj: Obj<'_>, key: &str) -> Option<DateTime<Utc>> {
    field(obj, key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_on_null_and_empty_input() {
        for raw in [Value::Null, json!({}), json!("garbage"), json!(42)] {
            let session = migrate_session_data(&raw);
            assert_eq!(session.id, "");
            assert_eq!(session.name, "Unnamed Session");
            assert_eq!(session.schema_version, SESSION_SCHEMA_VERSION);
            assert!(session.points.is_empty());
            assert_eq!(session.area, 0.0);
            assert!(session.notes.is_none());

            let index = migrate_index(&raw);
            assert_eq!(index.version, INDEX_VERSION);
            assert!(index.sessions.is_empty());
        }
    }

    #[test]
    fn test_idempotent_on_migrated_output() {
        let raw = json!({
            "id": "abc",
            "name": "South field",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T11:00:00Z",
            "schemaVersion": 0,
            "points": [
                {"lat": 32.0, "lng": 34.0, "type": "manual", "timestamp": 1000}
            ],
            "area": 42.5,
            "notes": "gate on the east side"
        });

        let once = migrate_session_data(&raw);
        let twice = migrate_session_data(&serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_current_session_passes_through() {
        let raw = json!({
            "id": "abc",
            "name": "South field",
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T11:00:00Z",
            "schemaVersion": 1,
            "points": [
                {"point": {"lat": 32.0, "lng": 34.0}, "type": "auto", "timestamp": 1000}
            ],
            "area": 42.5
        });

        let session = migrate_session_data(&raw);
        assert_eq!(session.id, "abc");
        assert_eq!(session.name, "South field");
        assert_eq!(session.points[0].point.lat, 32.0);
        assert_eq!(session.points[0].kind, PointKind::Auto);
        assert_eq!(session.area, 42.5);
        assert!(session.notes.is_none());
    }

    #[test]
    fn test_flat_and_nested_points_migrate_identically() {
        let flat = json!({"lat": 32.0, "lng": 34.0, "type": "manual", "timestamp": 1000});
        let nested =
            json!({"point": {"lat": 32.0, "lng": 34.0}, "type": "manual", "timestamp": 1000});

        assert_eq!(migrate_point(&flat), migrate_point(&nested));
    }

    #[test]
    fn test_nested_point_key_wins_even_when_null() {
        let raw = json!({"point": null, "lat": 32.0, "lng": 34.0, "timestamp": 1000});
        let point = migrate_point(&raw);
        assert_eq!(point.point.lat, 0.0);
        assert_eq!(point.point.lng, 0.0);
    }

    #[test]
    fn test_null_point_entries_are_kept_not_dropped() {
        let raw = json!([
            {"point": {"lat": 1.0, "lng": 2.0}, "type": "auto", "timestamp": 5},
            null,
            {"lat": 3.0, "lng": 4.0}
        ]);

        let points = migrate_points(&raw);
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].point.lat, 0.0);
        assert_eq!(points[1].kind, PointKind::Manual);
        assert_eq!(points[2].point.lat, 3.0);
        assert_eq!(points[2].kind, PointKind::Manual);
    }

    #[test]
    fn test_point_defaults() {
        let point = migrate_point(&json!({}));
        assert_eq!(point.point, GeoPoint { lat: 0.0, lng: 0.0 });
        assert_eq!(point.kind, PointKind::Manual);
        assert!(point.timestamp > 0);
    }

    #[test]
    fn test_legacy_index_array_is_wrapped() {
        let raw = json!([
            {"id": "a", "name": "Field A", "createdAt": "2024-01-01T00:00:00Z",
             "area": 10.0, "pointCount": 4},
            null
        ]);

        let index = migrate_index(&raw);
        assert_eq!(index.version, INDEX_VERSION);
        assert_eq!(index.sessions.len(), 2);

        let first = &index.sessions[0];
        assert_eq!(first.id, "a");
        assert_eq!(first.point_count, 4);
        // missing updatedAt falls back to createdAt
        assert_eq!(first.updated_at, first.created_at);

        let second = &index.sessions[1];
        assert_eq!(second.id, "");
        assert_eq!(second.name, "Unnamed");
        assert_eq!(second.point_count, 0);
    }

    #[test]
    fn test_wrapped_index_preserves_last_modified() {
        let raw = json!({
            "version": 1,
            "lastModified": "2024-06-01T12:00:00Z",
            "sessions": []
        });

        let index = migrate_index(&raw);
        assert_eq!(
            index.last_modified,
            "2024-06-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_unparseable_timestamps_default_to_now() {
        let raw = json!({
            "id": "x",
            "createdAt": "last tuesday",
            "updatedAt": 12345
        });

        let before = Utc::now();
        let session = migrate_session_data(&raw);
        assert!(session.created_at >= before);
        assert!(session.updated_at >= before);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let raw = json!({"name": "", "points": [null]});
        let snapshot = raw.clone();
        let _ = migrate_session_data(&raw);
        assert_eq!(raw, snapshot);
    }
}
