use std::path::{Path, PathBuf};

use clap::Subcommand;
use mealpromo_core::{
    resolve_context_with, Clock, Config, MealBucket, PromoManager, PromoRequest, SystemClock, UserProfile,
};

use super::{open_manager, print_json, CliResult};

#[derive(Subcommand)]
pub enum PromosAction {
    /// Select promos for a meal bucket and print them as JSON
    List {
        /// Meal bucket (breakfast, lunch, snacks, dinner); defaults to the current one
        #[arg(long)]
        bucket: Option<String>,
        /// JSON file with a user profile to filter against
        #[arg(long)]
        profile: Option<PathBuf>,
        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
        /// Maximum number of promos
        #[arg(long)]
        limit: Option<usize>,
        /// Use the weekend lists regardless of the date
        #[arg(long)]
        weekend: bool,
    },
    /// Print a catalog entry by id
    Show {
        /// Promo id (e.g. "lunch_light_fresh")
        id: String,
    },
    /// Print the meal context resolved from the current time
    Context {
        /// Force weekend mode
        #[arg(long)]
        weekend: bool,
    },
}

fn resolve_bucket(manager: &PromoManager, bucket: Option<&str>) -> Result<MealBucket, Box<dyn std::error::Error>> {
    match bucket {
        Some(name) => Ok(name.parse()?),
        None => Ok(manager.context().meal_bucket),
    }
}

fn load_profile(path: &Path) -> Result<UserProfile, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read profile {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

pub async fn run(action: PromosAction) -> CliResult {
    match action {
        PromosAction::List {
            bucket,
            profile,
            refresh,
            limit,
            weekend,
        } => {
            let manager = open_manager(&Config::load()?)?;
            if weekend {
                manager.force_weekend_mode(true).await;
            }
            let bucket = resolve_bucket(&manager, bucket.as_deref())?;
            let profile = profile.as_deref().map(load_profile).transpose()?;
            let request = PromoRequest {
                force_refresh: refresh,
                limit,
            };
            let promos = manager.get_promos(bucket, profile.as_ref(), request).await;
            if weekend {
                manager.force_weekend_mode(false).await;
            }
            let json = serde_json::to_string_pretty(promos?.as_ref())?;
            println!("{json}");
        }
        PromosAction::Show { id } => {
            let manager = open_manager(&Config::load()?)?;
            match manager.get_promo_by_id(&id) {
                Some(entry) => {
                    let json = serde_json::to_string_pretty(&entry)?;
                    println!("{json}");
                }
                None => return Err(format!("promo not found: {id}").into()),
            }
        }
        PromosAction::Context { weekend } => {
            print_json(&resolve_context_with(&SystemClock.now(), weekend.then_some(true)))?;
        }
    }
    Ok(())
}
