//! Public market-data ingestion: one task per (exchange, market-type) pair,
//! each holding its own WebSocket connection and writing into a shared
//! `QuoteCache`. See SPEC_FULL.md §4.B/§4.C.

pub mod binance;
pub mod okx;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::cache::QuoteCache;

/// Shared reconnect-forever wrapper: a fixed 5s pause between attempts,
/// matching the teacher's WS client loop.
pub async fn run_forever<F, Fut>(label: &str, mut connect_and_stream: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    const RECONNECT_DELAY: Duration = Duration::from_secs(5);

    loop {
        match connect_and_stream().await {
            Ok(()) => info!(stream = label, "websocket closed cleanly, reconnecting"),
            Err(err) => error!(stream = label, error = %err, "websocket error, reconnecting"),
        }
        warn!(stream = label, "backing off before reconnect");
        sleep(RECONNECT_DELAY).await;
    }
}

pub type SharedCache = Arc<dyn QuoteCache>;
