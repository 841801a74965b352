//! Market-making entrypoint: one task per configured symbol, each ticking
//! its own `near_interval` and rolling a far-end pass in on `far_interval`.
//! See SPEC_FULL.md §6 "CLI": one positional JSON config path, exit 1 on
//! load failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder_backend::cache::InMemoryQuoteCache;
use ladder_backend::config::{self, MmTokenConfig};
use ladder_backend::mm::{self, MmContext};
use ladder_backend::venue::MockVenueClient;

#[derive(Parser, Debug)]
#[command(name = "market_maker")]
struct Args {
    /// Path to a JSON array of per-symbol market-making configs.
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "market_maker=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let configs = match config::load_mm_configs(&args.config) {
        Ok(configs) => configs,
        Err(err) => {
            tracing::error!(error = %err, path = ?args.config, "failed to load market-making config");
            std::process::exit(1);
        }
    };

    // No production venue adapter is wired here: venue REST clients are an
    // external collaborator (SPEC_FULL.md §11/§1). The mock routes every
    // order through an in-memory double; swap in a real `VenueClient` impl
    // for live trading.
    let venue = Arc::new(MockVenueClient::new());
    let cache = Arc::new(InMemoryQuoteCache::new());

    let mut tasks = Vec::new();
    for cfg in configs {
        let venue = Arc::clone(&venue);
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(run_symbol(cache, venue, cfg)));
    }

    for task in tasks {
        let _ = task.await;
    }
}

async fn run_symbol(cache: Arc<InMemoryQuoteCache>, venue: Arc<MockVenueClient>, cfg: MmTokenConfig) {
    info!(symbol = %cfg.maker_symbol, "starting market-making loop");
    let mut ctx = MmContext::default();
    let near_interval = Duration::from_secs_f64(cfg.near_interval.max(0.01));
    let mut ticker = tokio::time::interval(near_interval);
    let mut far_elapsed = 0.0_f64;

    loop {
        ticker.tick().await;
        far_elapsed += cfg.near_interval;
        let is_far = match cfg.far_interval {
            Some(far_interval) if far_interval > 0.0 && far_elapsed >= far_interval => {
                far_elapsed = 0.0;
                true
            }
            _ => false,
        };

        mm::run_pass(cache.as_ref(), venue.as_ref(), &cfg, &mut ctx, is_far).await;
    }
}
