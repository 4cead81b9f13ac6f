pub mod cache;
pub mod carousel;
pub mod config;
pub mod promos;

use std::sync::Arc;

use mealpromo_core::{Config, Database, PromoManager, SystemClock};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Selector backed by the on-disk cache and the user's config.
pub fn open_manager(config: &Config) -> Result<PromoManager, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(PromoManager::from_config(config, Arc::new(db), Arc::new(SystemClock))?)
}

/// Print `value` as one line of JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
