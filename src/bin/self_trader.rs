//! Self-trader entrypoint: one task per configured symbol, each ticking its
//! own `interval` and submitting a paired maker/taker self-trade.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder_backend::cache::InMemoryQuoteCache;
use ladder_backend::config::{self, SelfTraderConfig};
use ladder_backend::selftrade::{self, SelfTradeContext};
use ladder_backend::venue::MockVenueClient;

#[derive(Parser, Debug)]
#[command(name = "self_trader")]
struct Args {
    /// Path to a JSON array of per-symbol self-trader configs.
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "self_trader=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let configs = match config::load_selftrader_configs(&args.config) {
        Ok(configs) => configs,
        Err(err) => {
            tracing::error!(error = %err, path = ?args.config, "failed to load self-trader config");
            std::process::exit(1);
        }
    };

    // `client.mock = True` in the original's default wiring: the self-trader
    // never touches a live venue client of its own construction.
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

async fn run_symbol(cache: Arc<InMemoryQuoteCache>, venue: Arc<MockVenueClient>, cfg: SelfTraderConfig) {
    info!(symbol = %cfg.maker_symbol, "starting self-trade loop");
    let mut ctx = SelfTradeContext::default();
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(cfg.interval.max(0.01)));
    loop {
        ticker.tick().await;
        selftrade::self_trade(cache.as_ref(), venue.as_ref(), &cfg, &mut ctx).await;
    }
}
