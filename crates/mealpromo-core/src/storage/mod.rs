mod config;
pub mod database;
pub mod kv;

pub use config::{Config, RotationSettings, SelectionSettings};
pub use database::Database;
pub use kv::{KvStore, MemoryKvStore};

use std::path::PathBuf;

use crate::error::StoreError;

/// Returns `~/.config/mealpromo[-dev]/` based on MEALPROMO_ENV.
///
/// Set MEALPROMO_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEALPROMO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("mealpromo-dev")
    } else {
        base_dir.join("mealpromo")
    };

    std::fs::create_dir_all(&dir).map_err(|e| StoreError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
