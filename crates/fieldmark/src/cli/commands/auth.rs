//! Authentication commands for fieldmark

use crate::client::UserAuth;
use crate::config::CredentialStore;
use crate::error::Result;

/// Execute the login command
pub async fn login(uid: String, token: String) -> Result<()> {
    let store = CredentialStore::new()?;

    if store.has_credentials() {
        println!("Replacing existing identity.");
    }

    store.save(&UserAuth::new(uid, token))?;

    println!("Successfully logged in!");
    Ok(())
}

/// Execute the logout command
pub async fn logout() -> Result<()> {
    let store = CredentialStore::new()?;

    if !store.has_credentials() {
        println!("Not logged in.");
        return Ok(());
    }

    store.clear()?;
    println!("Successfully logged out.");
    Ok(())
}

/// Execute the status command
pub async fn status() -> Result<()> {
    let store = CredentialStore::new()?;

    if !store.has_credentials() {
        println!("Status: Not logged in");
        println!("Run 'fieldmark auth login' to store an identity.");
        return Ok(());
    }

    match store.load()? {
        Some(auth) => {
            println!("Status: Logged in");
            println!("User: {}", auth.uid);
        }
        None => {
            println!("Status: Credentials corrupted");
            println!("Run 'fieldmark auth logout' then 'fieldmark auth login' to fix.");
        }
    }

    Ok(())
}
