//! Character snapshot persistence.
//!
//! Snapshots are written as pretty JSON so they stay readable and hand
//! editable. A save carries a format version; loading a different version is
//! an error, there is no migration.

use crate::character::Character;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current save file version.
pub const SAVE_VERSION: u32 = 1;

/// A saved character sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedCharacter {
    /// Save format version for compatibility checking.
    pub version: u32,

    pub saved_at: DateTime<Utc>,

    /// The complete character snapshot, combat log included.
    pub character: Character,

    /// Quick-access metadata for save listings.
    pub metadata: CharacterMetadata,
}

/// Metadata about a saved character for quick display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMetadata {
    pub name: String,
    pub class: String,
    pub level: u8,
    pub hit_points: i32,
    pub max_hit_points: i32,
    /// Combat log entries at save time.
    pub log_entries: usize,
    pub saved_at: DateTime<Utc>,
}

impl SavedCharacter {
    pub fn new(character: Character) -> Self {
        let saved_at = Utc::now();
        let metadata = CharacterMetadata {
            name: character.name.clone(),
            class: character.class.name().to_string(),
            level: character.level,
            hit_points: character.hit_points.current,
            max_hit_points: character.hit_points.maximum,
            log_entries: character.combat_log.len(),
            saved_at,
        };

        Self {
            version: SAVE_VERSION,
            saved_at,
            character,
            metadata,
        }
    }

    /// Save to a JSON file, creating the parent directory if needed.
    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        tracing::info!(path = %path.display(), character = %self.metadata.name, "character saved");
        Ok(())
    }

    /// Load from a JSON file.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;
        check_version(saved.version)?;

        tracing::info!(
            path = %path.display(),
            character = %saved.metadata.name,
            "character loaded"
        );
        Ok(saved)
    }

    /// Read the metadata without deserializing the character.
    pub async fn peek_metadata(path: impl AsRef<Path>) -> Result<CharacterMetadata, PersistError> {
        let content = fs::read_to_string(path).await?;

        #[derive(Deserialize)]
        struct Partial {
            version: u32,
            metadata: CharacterMetadata,
        }

        let partial: Partial = serde_json::from_str(&content)?;
        check_version(partial.version)?;
        Ok(partial.metadata)
    }
}

fn check_version(found: u32) -> Result<(), PersistError> {
    if found == SAVE_VERSION {
        Ok(())
    } else {
        Err(PersistError::VersionMismatch {
            expected: SAVE_VERSION,
            found,
        })
    }
}

/// A save file found on disk.
#[derive(Debug, Clone)]
pub struct SaveInfo {
    pub path: PathBuf,
    pub metadata: CharacterMetadata,
}

/// List character saves in a directory, sorted by character name.
///
/// A missing directory is created and reported as empty. Files that are not
/// readable saves are skipped.
pub async fn list_saves(dir: impl AsRef<Path>) -> Result<Vec<SaveInfo>, PersistError> {
    let dir = dir.as_ref();
    let mut saves = Vec::new();

    if !fs::try_exists(dir).await? {
        fs::create_dir_all(dir).await?;
        return Ok(saves);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        match SavedCharacter::peek_metadata(&path).await {
            Ok(metadata) => saves.push(SaveInfo { path, metadata }),
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping file"),
        }
    }

    saves.sort_by(|a, b| a.metadata.name.cmp(&b.metadata.name));
    Ok(saves)
}

/// Save path for a character name. Anything but letters and digits becomes
/// `_`.
pub fn character_save_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    let sanitized = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>();
    dir.as_ref().join(format!("{sanitized}.json"))
}

pub async fn delete_save(path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    fs::remove_file(path).await?;
    tracing::info!(path = %path.display(), "save deleted");
    Ok(())
}
