//! OKX public market data: `books` snapshot + delta merge and `tickers`.
//!
//! OKX sends one `snapshot` action establishing the book, then `update`
//! actions that must be applied in `seqId`/`prevSeqId` order. Deltas that
//! arrive before their predecessor are buffered and retried; deltas older
//! than the book's current `ts` are discarded. Unlike the original
//! (`okx_future_public_ws.py`, which spawns a merge thread per message), the
//! merge here runs inline on the single ingest task — there is only ever one
//! writer per symbol, so a thread bought nothing but indirection.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use super::{run_forever, SharedCache};
use crate::cache::{now_tenths, publish_order_book, publish_ticker};
use crate::models::{Level, OrderBookSnapshot, Ticker};

const OKX_PUBLIC_WS: &str = "wss://ws.okx.com:8443/ws/v5/public";

#[derive(Debug, Deserialize)]
struct OkxEnvelope {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    arg: Option<OkxArg>,
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OkxArg {
    channel: String,
    #[serde(rename = "instId")]
    inst_id: String,
}

#[derive(Debug, Deserialize, Clone)]
struct BookPayload {
    asks: Vec<(String, String, String, String)>,
    bids: Vec<(String, String, String, String)>,
    #[serde(rename = "seqId")]
    seq_id: i64,
    #[serde(rename = "prevSeqId")]
    prev_seq_id: i64,
    ts: String,
}

#[derive(Debug, Deserialize)]
struct TickerPayload {
    last: String,
    #[serde(rename = "lastSz")]
    last_sz: String,
}

#[derive(Debug, Clone, Default)]
struct BookState {
    asks: HashMap<String, String>,
    bids: HashMap<String, String>,
    seq_id: i64,
    ts: i64,
}

impl BookState {
    fn apply_snapshot(&mut self, payload: &BookPayload) {
        self.asks = payload.asks.iter().map(|(p, q, _, _)| (p.clone(), q.clone())).collect();
        self.bids = payload.bids.iter().map(|(p, q, _, _)| (p.clone(), q.clone())).collect();
        self.seq_id = payload.seq_id;
        self.ts = payload.ts.parse().unwrap_or(0);
    }

    fn apply_delta(&mut self, payload: &BookPayload) {
        for (price, qty, _, _) in &payload.asks {
            if qty.parse::<f64>().unwrap_or(0.0) == 0.0 {
                self.asks.remove(price);
            } else {
                self.asks.insert(price.clone(), qty.clone());
            }
        }
        for (price, qty, _, _) in &payload.bids {
            if qty.parse::<f64>().unwrap_or(0.0) == 0.0 {
                self.bids.remove(price);
            } else {
                self.bids.insert(price.clone(), qty.clone());
            }
        }
        self.seq_id = payload.seq_id;
        self.ts = payload.ts.parse().unwrap_or(0);
    }

    fn snapshot(&self) -> OrderBookSnapshot {
        let mut asks: Vec<Level> = self
            .asks
            .iter()
            .filter_map(|(p, q)| Some(Level::new(p.parse().ok()?, q.parse().ok()?)))
            .collect();
        asks.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal));
        let mut bids: Vec<Level> = self
            .bids
            .iter()
            .filter_map(|(p, q)| Some(Level::new(p.parse().ok()?, q.parse().ok()?)))
            .collect();
        bids.sort_by(|a, b| b.price.partial_cmp(&a.price).unwrap_or(std::cmp::Ordering::Equal));
        OrderBookSnapshot { asks, bids }
    }
}

#[derive(Default)]
struct MergeTable {
    books: HashMap<String, BookState>,
    pending: HashMap<String, Vec<BookPayload>>,
}

impl MergeTable {
    /// Buffer `delta` for `symbol` and apply whatever contiguous chain of
    /// pending deltas now connects to the book's current `seq_id`,
    /// discarding anything older than the book and leaving genuine gaps
    /// buffered for the next message.
    fn ingest_delta(&mut self, symbol: &str, delta: BookPayload) {
        self.pending.entry(symbol.to_string()).or_default().push(delta);

        loop {
            let book = match self.books.get(symbol) {
                Some(b) => b.clone(),
                None => return,
            };
            let pending = self.pending.get_mut(symbol).unwrap();

            let mut applied_index = None;
            let mut stale_index = None;
            for (i, candidate) in pending.iter().enumerate() {
                let candidate_ts: i64 = candidate.ts.parse().unwrap_or(0);
                if candidate_ts < book.ts {
                    stale_index = Some(i);
                    break;
                }
                if candidate.prev_seq_id == book.seq_id {
                    applied_index = Some(i);
                    break;
                }
            }

            if let Some(i) = stale_index {
                pending.remove(i);
                continue;
            }
            if let Some(i) = applied_index {
                let candidate = pending.remove(i);
                self.books.get_mut(symbol).unwrap().apply_delta(&candidate);
                continue;
            }
            break;
        }
    }

    fn ingest_snapshot(&mut self, symbol: &str, snapshot: BookPayload) {
        let mut state = BookState::default();
        state.apply_snapshot(&snapshot);
        self.books.insert(symbol.to_string(), state);
        self.pending.insert(symbol.to_string(), Vec::new());
    }

    fn current(&self, symbol: &str) -> Option<OrderBookSnapshot> {
        self.books.get(symbol).map(BookState::snapshot)
    }
}

pub async fn run(cache: SharedCache, depth_symbols: Vec<String>, ticker_symbols: Vec<String>, depth_prefix: &'static str, ticker_prefix: &'static str) {
    let merge_table = Arc::new(Mutex::new(MergeTable::default()));

    run_forever("okx_public", || {
        let cache = Arc::clone(&cache);
        let merge_table = Arc::clone(&merge_table);
        let depth_symbols = depth_symbols.clone();
        let ticker_symbols = ticker_symbols.clone();
        async move {
            connect_and_stream(&cache, &merge_table, &depth_symbols, &ticker_symbols, depth_prefix, ticker_prefix).await
        }
    })
    .await;
}

async fn connect_and_stream(
    cache: &SharedCache,
    merge_table: &Arc<Mutex<MergeTable>>,
    depth_symbols: &[String],
    ticker_symbols: &[String],
    depth_prefix: &str,
    ticker_prefix: &str,
) -> anyhow::Result<()> {
    merge_table.lock().await.books.clear();
    merge_table.lock().await.pending.clear();

    let (ws_stream, _) = connect_async(OKX_PUBLIC_WS).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut args = Vec::new();
    for symbol in ticker_symbols {
        args.push(serde_json::json!({"channel": "tickers", "instId": symbol}));
    }
    for symbol in depth_symbols {
        args.push(serde_json::json!({"channel": "books", "instId": symbol}));
    }
    let subscribe = serde_json::json!({"op": "subscribe", "args": args}).to_string();
    write.send(Message::Text(subscribe)).await?;

    while let Some(message) = read.next().await {
        match message? {
            Message::Text(text) => {
                if let Err(err) = handle_message(&text, cache, merge_table, depth_prefix, ticker_prefix).await {
                    warn!(error = %err, "failed to handle okx message");
                }
            }
            Message::Ping(payload) => write.send(Message::Pong(payload)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

async fn handle_message(
    text: &str,
    cache: &SharedCache,
    merge_table: &Arc<Mutex<MergeTable>>,
    depth_prefix: &str,
    ticker_prefix: &str,
) -> anyhow::Result<()> {
    let envelope: OkxEnvelope = serde_json::from_str(text)?;

    if let Some(event) = &envelope.event {
        if event == "error" {
            warn!(message = %text, "okx error event");
        }
        return Ok(());
    }

    let arg = match &envelope.arg {
        Some(a) => a,
        None => return Ok(()),
    };
    let now = now_tenths();

    match arg.channel.as_str() {
        "tickers" => {
            let payload: TickerPayload = serde_json::from_value(envelope.data.into_iter().next().unwrap_or_default())?;
            let ticker = Ticker {
                price: payload.last.parse()?,
                qty: payload.last_sz.parse()?,
            };
            let stream = format!("{ticker_prefix}{}", arg.inst_id.to_lowercase());
            publish_ticker(cache.as_ref(), &stream, now, &ticker);
        }
        "books" => {
            let payload: BookPayload = serde_json::from_value(envelope.data.into_iter().next().unwrap_or_default())?;
            let mut table = merge_table.lock().await;
            match envelope.action.as_deref() {
                Some("snapshot") => table.ingest_snapshot(&arg.inst_id, payload),
                Some("update") => table.ingest_delta(&arg.inst_id, payload),
                other => warn!(action = ?other, "unhandled okx book action"),
            }
            if let Some(ob) = table.current(&arg.inst_id) {
                let stream = format!("{depth_prefix}{}", arg.inst_id.to_lowercase());
                debug!(stream = %stream, asks = ob.asks.len(), bids = ob.bids.len(), "okx depth update");
                publish_order_book(cache.as_ref(), &stream, now, &ob);
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(seq: i64, prev: i64, ts: i64, ask_price: &str, ask_qty: &str) -> BookPayload {
        BookPayload {
            asks: vec![(ask_price.to_string(), ask_qty.to_string(), "0".to_string(), "0".to_string())],
            bids: vec![],
            seq_id: seq,
            prev_seq_id: prev,
            ts: ts.to_string(),
        }
    }

    #[test]
    fn snapshot_then_contiguous_delta_applies() {
        let mut table = MergeTable::default();
        table.ingest_snapshot(
            "BTC-USDT-SWAP",
            BookPayload {
                asks: vec![("101".to_string(), "1".to_string(), "0".to_string(), "0".to_string())],
                bids: vec![("100".to_string(), "1".to_string(), "0".to_string(), "0".to_string())],
                seq_id: 10,
                prev_seq_id: 9,
                ts: "1000".to_string(),
            },
        );
        table.ingest_delta("BTC-USDT-SWAP", delta(11, 10, 1100, "102", "2"));
        let ob = table.current("BTC-USDT-SWAP").unwrap();
        assert_eq!(ob.asks.len(), 2);
    }

    #[test]
    fn out_of_order_delta_buffers_until_gap_fills() {
        let mut table = MergeTable::default();
        table.ingest_snapshot(
            "BTC-USDT-SWAP",
            BookPayload {
                asks: vec![("101".to_string(), "1".to_string(), "0".to_string(), "0".to_string())],
                bids: vec![],
                seq_id: 10,
                prev_seq_id: 9,
                ts: "1000".to_string(),
            },
        );
        // seq 12 arrives before seq 11: must not apply yet.
        table.ingest_delta("BTC-USDT-SWAP", delta(12, 11, 1200, "103", "3"));
        assert_eq!(table.current("BTC-USDT-SWAP").unwrap().asks.len(), 1);

        // seq 11 arrives: both 11 and the buffered 12 apply in order.
        table.ingest_delta("BTC-USDT-SWAP", delta(11, 10, 1100, "102", "2"));
        assert_eq!(table.current("BTC-USDT-SWAP").unwrap().asks.len(), 3);
    }

    #[test]
    fn stale_delta_is_discarded_not_applied() {
        let mut table = MergeTable::default();
        table.ingest_snapshot(
            "BTC-USDT-SWAP",
            BookPayload {
                asks: vec![],
                bids: vec![],
                seq_id: 10,
                prev_seq_id: 9,
                ts: "5000".to_string(),
            },
        );
        table.ingest_delta("BTC-USDT-SWAP", delta(5, 4, 1000, "99", "1"));
        assert!(table.current("BTC-USDT-SWAP").unwrap().asks.is_empty());
    }
}
