mod credentials;

pub use credentials::CredentialStore;

use crate::error::{FieldmarkError, Result};
use std::path::PathBuf;

/// Default configuration directory name
const CONFIG_DIR_NAME: &str = "fieldmark";

/// Get the data directory path for storing the saved identity
/// Returns ~/.local/share/fieldmark on Unix, ~/Library/Application Support/fieldmark on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(CONFIG_DIR_NAME))
        .ok_or_else(|| FieldmarkError::config("Could not determine data directory"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &PathBuf) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
