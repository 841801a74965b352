//! Binance public market data: partial-depth snapshots (`depth20@100ms`) and
//! aggregate-trade tickers over the combined-stream endpoint.
//!
//! Each `depth20` message is a full top-of-book snapshot, so there is no
//! merge step here (contrast `ingest::okx`, which must stitch deltas onto a
//! maintained book). Grounded in `bn_future_public_ws.py` /
//! `bn_future_pub_ws.py`: depth and ticker land on the same cache prefixes,
//! keyed by symbol and the current 100ms bucket.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use super::{run_forever, SharedCache};
use crate::cache::{now_tenths, publish_order_book, publish_ticker};
use crate::models::{Level, OrderBookSnapshot, Ticker};

const COMBINED_STREAM_BASE: &str = "wss://fstream.binance.com/stream?streams=";

#[derive(Debug, Deserialize)]
struct CombinedEnvelope {
    stream: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DepthPayload {
    #[serde(rename = "a")]
    asks: Vec<[String; 2]>,
    #[serde(rename = "b")]
    bids: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct AggTradePayload {
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    qty: String,
    #[serde(rename = "s")]
    symbol: String,
}

fn parse_levels(raw: &[[String; 2]], descending: bool) -> Vec<Level> {
    let mut levels: Vec<Level> = raw
        .iter()
        .filter_map(|[p, q]| Some(Level::new(p.parse().ok()?, q.parse().ok()?)))
        .collect();
    levels.sort_by(|a, b| {
        if descending {
            b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
    levels
}

/// Subscribe to depth and aggTrade streams for the given symbols (already
/// lowercase, venue-native) and publish every update into `cache`.
pub async fn run(cache: SharedCache, depth_symbols: Vec<String>, ticker_symbols: Vec<String>, depth_prefix: &'static str, ticker_prefix: &'static str) {
    let streams: Vec<String> = depth_symbols
        .iter()
        .map(|s| format!("{}@depth20@100ms", s.to_lowercase()))
        .chain(ticker_symbols.iter().map(|s| format!("{}@aggTrade", s.to_lowercase())))
        .collect();
    let url = format!("{COMBINED_STREAM_BASE}{}", streams.join("/"));

    run_forever("binance_combined", || {
        let cache = Arc::clone(&cache);
        let url = url.clone();
        async move { connect_and_stream(&url, &cache, depth_prefix, ticker_prefix).await }
    })
    .await;
}

async fn connect_and_stream(url: &str, cache: &SharedCache, depth_prefix: &str, ticker_prefix: &str) -> anyhow::Result<()> {
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                if let Err(err) = handle_message(&text, cache, depth_prefix, ticker_prefix) {
                    warn!(error = %err, "failed to handle binance message");
                }
            }
            Message::Ping(payload) => write.send(Message::Pong(payload)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

fn handle_message(text: &str, cache: &SharedCache, depth_prefix: &str, ticker_prefix: &str) -> anyhow::Result<()> {
    let envelope: CombinedEnvelope = serde_json::from_str(text)?;
    let now = now_tenths();

    if envelope.stream.contains("depth") {
        let pair = envelope
            .stream
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();
        let payload: DepthPayload = serde_json::from_value(envelope.data)?;
        let ob = OrderBookSnapshot {
            asks: parse_levels(&payload.asks, false),
            bids: parse_levels(&payload.bids, true),
        };
        let stream = format!("{depth_prefix}{pair}");
        debug!(stream = %stream, asks = ob.asks.len(), bids = ob.bids.len(), "binance depth update");
        publish_order_book(cache.as_ref(), &stream, now, &ob);
    } else if envelope.stream.contains("aggTrade") {
        let payload: AggTradePayload = serde_json::from_value(envelope.data)?;
        let ticker = Ticker {
            price: payload.price.parse()?,
            qty: payload.qty.parse()?,
        };
        let stream = format!("{ticker_prefix}{}", payload.symbol.to_lowercase());
        publish_ticker(cache.as_ref(), &stream, now, &ticker);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_levels_sorts_asks_ascending_and_bids_descending() {
        let raw = vec![
            ["101.5".to_string(), "1.0".to_string()],
            ["100.0".to_string(), "2.0".to_string()],
        ];
        let asks = parse_levels(&raw, false);
        assert_eq!(asks[0].price, 100.0);
        let bids = parse_levels(&raw, true);
        assert_eq!(bids[0].price, 101.5);
    }

    #[test]
    fn handle_depth_message_publishes_snapshot() {
        let cache: SharedCache = Arc::new(crate::cache::InMemoryQuoteCache::new());
        let text = serde_json::json!({
            "stream": "btcusdt@depth20@100ms",
            "data": {"a": [["30001.0", "1.0"]], "b": [["30000.0", "2.0"]]}
        })
        .to_string();
        handle_message(&text, &cache, "binance_future_depth", "binance_future_ticker").unwrap();
        let ob = crate::cache::get_order_book(cache.as_ref(), "binance_future_depthbtcusdt").unwrap();
        assert_eq!(ob.top_bid().unwrap().price, 30000.0);
    }
}
