use clap::Subcommand;
use mealpromo_core::Config;

use super::{open_manager, CliResult};

#[derive(Subcommand)]
pub enum CacheAction {
    /// Drop every cached bucket from memory and disk
    Clear,
}

pub async fn run(action: CacheAction) -> CliResult {
    match action {
        CacheAction::Clear => {
            let manager = open_manager(&Config::load()?)?;
            manager.clear_cache().await;
            println!("promo cache cleared");
        }
    }
    Ok(())
}
