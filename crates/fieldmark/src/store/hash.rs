//! Deterministic fingerprint of a point sequence
//!
//! Used to detect unsaved changes: the hash of the live points is compared
//! against the hash captured at the last save. This is a change detector,
//! not a security primitive, so a non-cryptographic hash is enough.

use std::fmt::Write as _;

use crate::models::TrackedPoint;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hash a point sequence to a short base-36 digest.
///
/// Deterministic, order-sensitive, and sensitive to every participating
/// field (`lat`, `lng`, `type`, `timestamp`) at full numeric precision.
/// Non-empty even for an empty sequence.
pub fn points_hash(points: &[TrackedPoint]) -> String {
    let mut canonical = String::with_capacity(points.len() * 48);
    for p in points {
        // f64 Display is the shortest round-trip representation, so any
        // bit-level coordinate difference yields a different string.
        let _ = write!(
            canonical,
            "{}:{}:{}:{}|",
            p.point.lat,
            p.point.lng,
            p.kind.as_str(),
            p.timestamp
        );
    }
    to_base36(fnv1a(canonical.as_bytes()))
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    // u64::MAX in base 36 is 13 digits
    let mut buf = [0u8; 13];
    let mut i = buf.len();
    while value > 0 {
        i -= 1;
        buf[i] = DIGITS[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8_lossy(&buf[i..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointKind;

    fn point(lat: f64, lng: f64, kind: PointKind, timestamp: i64) -> TrackedPoint {
        TrackedPoint::new(lat, lng, kind, timestamp)
    }

    fn sample() -> Vec<TrackedPoint> {
        vec![
            point(32.0853, 34.7818, PointKind::Manual, 1000),
            point(32.0854, 34.7819, PointKind::Auto, 2000),
            point(32.0855, 34.7820, PointKind::Manual, 3000),
        ]
    }

    #[test]
    fn test_deterministic() {
        let points = sample();
        assert_eq!(points_hash(&points), points_hash(&points));
        // structurally equal but distinct instances
        assert_eq!(points_hash(&sample()), points_hash(&points));
    }

    #[test]
    fn test_order_sensitive() {
        let points = sample();
        let mut reversed = points.clone();
        reversed.reverse();
        assert_ne!(points_hash(&points), points_hash(&reversed));
    }

    #[test]
    fn test_lat_sensitive() {
        let mut points = sample();
        points[1].point.lat += 1e-12;
        assert_ne!(points_hash(&sample()), points_hash(&points));
    }

    #[test]
    fn test_lng_sensitive() {
        let mut points = sample();
        points[0].point.lng = -points[0].point.lng;
        assert_ne!(points_hash(&sample()), points_hash(&points));
    }

    #[test]
    fn test_kind_sensitive() {
        let mut points = sample();
        points[2].kind = PointKind::Auto;
        assert_ne!(points_hash(&sample()), points_hash(&points));
    }

    #[test]
    fn test_timestamp_sensitive() {
        let mut points = sample();
        points[0].timestamp += 1;
        assert_ne!(points_hash(&sample()), points_hash(&points));
    }

    #[test]
    fn test_empty_sequence_has_nonempty_hash() {
        let hash = points_hash(&[]);
        assert!(!hash.is_empty());
        assert!(hash.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_large_sequence() {
        let points: Vec<TrackedPoint> = (0..5000)
            .map(|i| {
                point(
                    32.0 + i as f64 * 1e-5,
                    34.0 + i as f64 * 1e-5,
                    PointKind::Auto,
                    i,
                )
            })
            .collect();
        let hash = points_hash(&points);
        assert!(!hash.is_empty());
        assert_eq!(hash, points_hash(&points));
    }

    #[test]
    fn test_base36_digits() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }
}
