use std::fs;
use std::path::PathBuf;

use crate::client::UserAuth;
use crate::error::Result;

const AUTH_FILENAME: &str = "auth.json";

/// Manages on-disk storage of the signed-in identity between runs.
pub struct CredentialStore {
    base_dir: PathBuf,
}

impl CredentialStore {
    /// Create a credential store under the default data directory
    pub fn new() -> Result<Self> {
        let base_dir = super::data_dir()?;
        super::ensure_dir(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Create a credential store with a custom base directory (for testing)
    pub fn with_dir(base_dir: PathBuf) -> Result<Self> {
        super::ensure_dir(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn auth_path(&self) -> PathBuf {
        self.base_dir.join(AUTH_FILENAME)
    }

    /// Whether a saved identity exists
    pub fn has_credentials(&self) -> bool {
        self.auth_path().exists()
    }

    /// Save the identity to storage
    pub fn save(&self, auth: &UserAuth) -> Result<()> {
        let path = self.auth_path();
        let json = serde_json::to_string_pretty(auth)?;
        fs::write(&path, json)?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Load the saved identity. Returns `None` when nothing is stored or
    /// the stored file no longer parses.
    pub fn load(&self) -> Result<Option<UserAuth>> {
        let path = self.auth_path();
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&json).ok())
    }

    /// Remove the saved identity
    pub fn clear(&self) -> Result<()> {
        let path = self.auth_path();
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}
