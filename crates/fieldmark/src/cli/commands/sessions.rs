//! Session commands for fieldmark

use std::io::{self, Write};
use std::path::Path;

use crate::client::BlobClient;
use crate::config::CredentialStore;
use crate::error::{FieldmarkError, Result};
use crate::store::migrate::migrate_points;
use crate::store::{SessionStore, StorageError, StorageErrorCode};

/// Build a session store backed by the stored identity
fn open_store(bucket: &str) -> Result<SessionStore> {
    let creds = CredentialStore::new()?;
    let auth = creds
        .load()?
        .ok_or_else(|| FieldmarkError::from(StorageError::not_authenticated()))?;
    Ok(SessionStore::with_user(BlobClient::new(bucket), auth))
}

/// List sessions from the index
pub async fn list(bucket: &str) -> Result<()> {
    let store = open_store(bucket)?;

    let Some(index) = store.fetch_index().await? else {
        println!("No sessions yet.");
        return Ok(());
    };

    if index.sessions.is_empty() {
        println!("No sessions yet.");
        return Ok(());
    }

    println!(
        "{:<38} {:<24} {:<12} {:>7} {:>12}",
        "ID", "Name", "Updated", "Points", "Area"
    );
    println!("{}", "-".repeat(97));

    for meta in &index.sessions {
        println!(
            "{:<38} {:<24} {:<12} {:>7} {:>10} m²",
            meta.id,
            truncate(&meta.name, 24),
            meta.updated_at.format("%Y-%m-%d"),
            meta.point_count,
            format!("{:.1}", meta.area),
        );
    }

    println!("\nShowing {} sessions", index.sessions.len());
    Ok(())
}

/// Save a new session from a JSON points file
pub async fn save(bucket: &str, name: String, points_file: &Path, area: f64) -> Result<()> {
    let raw = std::fs::read_to_string(points_file)?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    // Accepts both current and legacy point shapes
    let points = migrate_points(&value);

    let store = open_store(bucket)?;
    let meta = store.save_new_session(&name, &points, area).await?;

    println!("Saved session '{}' ({})", meta.name, meta.id);
    println!("Points: {}  Area: {:.1} m²", meta.point_count, meta.area);
    Ok(())
}

/// Load and print a session blob
pub async fn show(bucket: &str, id: String) -> Result<()> {
    let store = open_store(bucket)?;

    match store.load_session(&id).await {
        Ok(session) => {
            println!("{}", serde_json::to_string_pretty(&session)?);
            Ok(())
        }
        Err(FieldmarkError::Storage(err)) if err.code == StorageErrorCode::SessionNotFound => {
            println!("Session {} was not found in storage.", id);
            println!(
                "If it still appears in the list, run 'fieldmark sessions repair {}' to remove the stale entry.",
                id
            );
            Err(FieldmarkError::Storage(err))
        }
        Err(err) => Err(err),
    }
}

/// Rename a session
pub async fn rename(bucket: &str, id: String, new_name: String) -> Result<()> {
    let store = open_store(bucket)?;
    store.rename_session(&id, &new_name).await?;

    println!("Renamed session {} to '{}'", id, new_name.trim());
    Ok(())
}

/// Delete a session
pub async fn delete(bucket: &str, id: String, yes: bool) -> Result<()> {
    if !yes && !confirm(&format!("Delete session {}?", id))? {
        println!("Aborted.");
        return Ok(());
    }

    let store = open_store(bucket)?;
    store.delete_session(&id).await?;

    println!("Deleted session {}", id);
    Ok(())
}

/// Remove a stale index entry whose blob is gone
pub async fn repair(bucket: &str, id: String) -> Result<()> {
    let store = open_store(bucket)?;
    store.remove_from_index(&id).await?;

    println!("Removed {} from the session index.", id);
    Ok(())
}

/// Delete every session and the index
pub async fn clear(bucket: &str, yes: bool) -> Result<()> {
    if !yes && !confirm("Delete ALL sessions? This cannot be undone.")? {
        println!("Aborted.");
        return Ok(());
    }

    let store = open_store(bucket)?;
    store.delete_all_sessions().await?;

    println!("All sessions deleted.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
