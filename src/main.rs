use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use derpedia::ai::{ContentGenerator, GeminiGenerator};
use derpedia::cache::ArticleCache;
use derpedia::config::Config;
use derpedia::error::Result;
use derpedia::web::{create_router, AppState};

/// Serve Derpedia, the encyclopedia that writes itself.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file
    #[arg(long, env = "DERPEDIA_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(long)]
    listen: Option<String>,

    /// SQLite database path, overriding the config file
    #[arg(long)]
    db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info for this crate, warnings elsewhere)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "derpedia=info,tower_http=info,warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(db) = args.db {
        config.db_path = db;
    }

    let cache = ArticleCache::open(&config.db_path).await?;

    let generator = match config.gemini_settings() {
        Some(settings) => {
            Some(Arc::new(GeminiGenerator::new(settings)?) as Arc<dyn ContentGenerator>)
        }
        None => {
            tracing::warn!("No Gemini API key configured; only cached articles can be served");
            None
        }
    };

    let state = AppState::new(cache, generator)
        .with_recent_limit(config.recent_limit)
        .with_image_generation(config.generate_images);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("Derpedia listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
