//! Binance UM-futures public quote ingester entrypoint.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder_backend::cache::InMemoryQuoteCache;
use ladder_backend::config;
use ladder_backend::ingest::binance;

#[derive(Parser, Debug)]
#[command(name = "binance_ingest")]
struct Args {
    /// Path to a JSON config listing `depth_symbols`/`ticker_symbols`.
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "binance_ingest=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let cfg = match config::load_ingest_config(&args.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, path = ?args.config, "failed to load ingest config");
            std::process::exit(1);
        }
    };

    let cache = Arc::new(InMemoryQuoteCache::new()) as Arc<dyn ladder_backend::cache::QuoteCache>;
    binance::run(cache, cfg.depth_symbols, cfg.ticker_symbols, "binance_future_depth", "binance_future_ticker").await;
}
