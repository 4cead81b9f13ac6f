use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use mealpromo_core::{Carousel, CarouselDriver, Config, SystemClock};
use tokio::sync::Mutex;
use tracing::info;

use super::{open_manager, print_json, CliResult};

#[derive(Subcommand)]
pub enum CarouselAction {
    /// Rotate a carousel headlessly, printing each event as a JSON line
    Run {
        /// Meal bucket; defaults to the current one
        #[arg(long)]
        bucket: Option<String>,
        /// How long to run
        #[arg(long, default_value = "15")]
        seconds: u64,
        /// Tick cadence in milliseconds
        #[arg(long, default_value = "250")]
        tick_ms: u64,
    },
}

pub async fn run(action: CarouselAction) -> CliResult {
    match action {
        CarouselAction::Run {
            bucket,
            seconds,
            tick_ms,
        } => {
            let config = Config::load()?;
            let manager = Arc::new(open_manager(&config)?);
            let bucket = match bucket {
                Some(name) => name.parse()?,
                None => manager.context().meal_bucket,
            };

            info!(%bucket, seconds, tick_ms, "running carousel");
            let mut carousel = Carousel::new(manager, Arc::new(SystemClock), config.rotation(), bucket);
            print_json(&carousel.load().await)?;
            print_json(&carousel.snapshot())?;

            let carousel = Arc::new(Mutex::new(carousel));
            let (driver, mut events) = CarouselDriver::spawn(carousel.clone(), Duration::from_millis(tick_ms.max(1)));

            let deadline = tokio::time::sleep(Duration::from_secs(seconds));
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    event = events.recv() => match event {
                        Some(event) => print_json(&event)?,
                        None => break,
                    },
                }
            }
            driver.shutdown().await;

            let mut carousel = carousel.lock().await;
            if let Some(event) = carousel.teardown() {
                print_json(&event)?;
            }
            print_json(&carousel.snapshot())?;
        }
    }
    Ok(())
}
