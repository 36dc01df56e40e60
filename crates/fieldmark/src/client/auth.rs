use serde::{Deserialize, Serialize};

/// Authenticated identity used for storage requests.
///
/// Obtaining the token (OAuth or email sign-in) happens outside this crate;
/// callers hand the identity over ready-made and the credential store
/// persists it between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAuth {
    /// Stable user id, keys the per-user storage layout
    pub uid: String,
    /// Bearer token for the object store
    pub id_token: String,
}

impl UserAuth {
    pub fn new(uid: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            id_token: id_token.into(),
        }
    }

    /// Returns the Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Firebase {}", self.id_token)
    }
}
