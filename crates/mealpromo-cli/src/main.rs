use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "mealpromo", version, about = "MealPromo CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Promo selection
    Promos {
        #[command(subcommand)]
        action: commands::promos::PromosAction,
    },
    /// Promo cache management
    Cache {
        #[command(subcommand)]
        action: commands::cache::CacheAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Headless carousel rotation
    Carousel {
        #[command(subcommand)]
        action: commands::carousel::CarouselAction,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mealpromo=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Promos { action } => commands::promos::run(action).await,
        Commands::Cache { action } => commands::cache::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Carousel { action } => commands::carousel::run(action).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
