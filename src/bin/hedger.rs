//! Hedger entrypoint: private fill-stream consumer feeding a single
//! `HedgerEngine`, ticking every 100ms per SPEC_FULL.md §5/§4.E housekeeping.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ladder_backend::config::{self, ConfigStore, HedgerConfig, NoopConfigStore};
use ladder_backend::hedger::{private_ws, HedgerEngine};
use ladder_backend::venue::{MockVenueClient, VenueClient};

#[derive(Parser, Debug)]
#[command(name = "hedger")]
struct Args {
    /// Path to a JSON hedger config.
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "hedger=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();

    let cfg = match config::load_hedger_config(&args.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(error = %err, path = ?args.config, "failed to load hedger config");
            std::process::exit(1);
        }
    };

    let venue: Arc<dyn VenueClient> = Arc::new(MockVenueClient::new());
    let config_store = NoopConfigStore;

    let (tx, mut rx) = mpsc::unbounded_channel();
    if !cfg.private_ws_url.is_empty() {
        tokio::spawn(private_ws::run(cfg.private_ws_url.clone(), cfg.api_key.clone(), cfg.api_secret.clone(), tx));
    } else {
        info!("no private_ws_url configured, running without a live fill stream");
    }

    run(cfg, venue, &mut rx, &config_store).await;
}

async fn run(mut cfg: HedgerConfig, venue: Arc<dyn VenueClient>, rx: &mut mpsc::UnboundedReceiver<ladder_backend::models::FilledOrder>, config_store: &dyn ConfigStore) {
    let mut engine = HedgerEngine::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));

    let mut since_log = Duration::ZERO;
    let mut since_housekeeping = Duration::ZERO;
    let mut since_config_poll = Duration::ZERO;
    const TICK: Duration = Duration::from_millis(100);
    const LOG_EVERY: Duration = Duration::from_secs(60);
    const HOUSEKEEPING_EVERY: Duration = Duration::from_secs(600);
    const CONFIG_POLL_EVERY: Duration = Duration::from_secs(1);

    loop {
        tick.tick().await;

        while let Ok(fill) = rx.try_recv() {
            engine.handle_trade_filled(fill);
        }

        let did_work = engine.handle_risk_positions(Arc::clone(&venue), &cfg);
        engine.poll_hedge_tasks(venue.as_ref(), &cfg.hedge_symbol).await;

        since_log += TICK;
        if since_log >= LOG_EVERY {
            since_log = Duration::ZERO;
            info!(
                unhedged_task_count = engine.unfinished_hedge_count(),
                risk_position_count = engine.risk_position_count(),
                maker_symbol = %cfg.maker_symbol,
                "hedger status"
            );
        }

        since_housekeeping += TICK;
        if since_housekeeping >= HOUSEKEEPING_EVERY && !did_work {
            since_housekeeping = Duration::ZERO;
            engine.remove_stale_trade_ids();
        }

        since_config_poll += TICK;
        if since_config_poll >= CONFIG_POLL_EVERY {
            since_config_poll = Duration::ZERO;
            if let Some((version, value)) = config_store.poll(&cfg.store_key(), cfg.version) {
                match serde_json::from_value::<HedgerConfig>(value) {
                    Ok(mut new_cfg) => {
                        new_cfg.version = version;
                        info!(version, "hedger config reloaded");
                        cfg = new_cfg;
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to parse reloaded hedger config"),
                }
            }
        }
    }
}
