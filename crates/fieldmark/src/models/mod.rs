pub mod session;

pub use session::{
    CurrentSessionState, GeoPoint, PointKind, SessionData, SessionMeta, TrackedPoint,
    UserSessionIndex, INDEX_VERSION, SESSION_SCHEMA_VERSION,
};
