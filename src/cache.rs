//! Quote Cache: the time-bucketed snapshot store shared across processes.
//! See SPEC_FULL.md §3 and §4.A for the key schema and freshness contract.
//!
//! `QuoteCache` is the pluggable KV seam (design note: "keep this: a
//! pluggable interface... over any shared store is sufficient"). Production
//! deployments back it with whatever shared store is available (Redis and
//! friends); `InMemoryQuoteCache` is the in-process default used by tests and
//! by single-process wiring.

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{OrderBookSnapshot, Ticker};

/// Number of 100ms buckets in one minute; the ring size for every stream.
pub const BUCKETS_PER_MINUTE: i64 = 600;

/// Fundamental KV operations a shared cache backend must provide.
/// Writes are fire-and-forget; readers tolerate missing keys by returning
/// `None`. No locks are used beyond what the backend itself needs.
pub trait QuoteCache: Send + Sync {
    fn set_int(&self, key: &str, value: i64);
    fn get_int(&self, key: &str) -> Option<i64>;
    fn set_float(&self, key: &str, value: f64);
    fn get_float(&self, key: &str) -> Option<f64>;
    fn set_dict(&self, key: &str, value: serde_json::Value);
    fn get_dict(&self, key: &str) -> Option<serde_json::Value>;
}

/// `t = floor(now() * 10)`, i.e. the current time in tenths of a second.
pub fn now_tenths() -> i64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (dur.as_secs_f64() * 10.0).floor() as i64
}

/// `b = t mod 600`, wrapping negative `t` into `[0, 600)`.
pub fn bucket_of(t: i64) -> i64 {
    t.rem_euclid(BUCKETS_PER_MINUTE)
}

fn read_bucketed<T: DeserializeOwned>(
    cache: &dyn QuoteCache,
    stream: &str,
    now_tenths: i64,
) -> Option<T> {
    let current = bucket_of(now_tenths);
    for prev_tag in (current - BUCKETS_PER_MINUTE + 1..=current).rev() {
        let tag = prev_tag.rem_euclid(BUCKETS_PER_MINUTE);
        let key = format!("{stream}{tag}");
        if let Some(t1) = cache.get_int(&key) {
            if now_tenths - BUCKETS_PER_MINUTE < t1 && t1 <= now_tenths {
                if let Some(value) = cache.get_dict(&format!("{key}_value")) {
                    if let Ok(parsed) = serde_json::from_value(value) {
                        return Some(parsed);
                    }
                }
            }
        }
    }
    None
}

fn write_bucketed<T: Serialize>(
    cache: &dyn QuoteCache,
    stream: &str,
    now_tenths: i64,
    value: &T,
) {
    let key = format!("{stream}{}", bucket_of(now_tenths));
    if let Ok(json) = serde_json::to_value(value) {
        cache.set_dict(&format!("{key}_value"), json);
        cache.set_int(&key, now_tenths);
    }
}

/// Publish a full order book snapshot for `stream` at the current bucket.
pub fn publish_order_book(cache: &dyn QuoteCache, stream: &str, now_tenths: i64, ob: &OrderBookSnapshot) {
    write_bucketed(cache, stream, now_tenths, ob);
}

/// Publish a ticker for `stream` at the current bucket.
pub fn publish_ticker(cache: &dyn QuoteCache, stream: &str, now_tenths: i64, ticker: &Ticker) {
    write_bucketed(cache, stream, now_tenths, ticker);
}

/// Scan buckets backwards for the freshest order book no more than 60s old.
pub fn get_order_book(cache: &dyn QuoteCache, stream: &str) -> Option<OrderBookSnapshot> {
    read_bucketed(cache, stream, now_tenths())
}

/// Scan buckets backwards for the freshest ticker no more than 60s old.
pub fn get_ticker(cache: &dyn QuoteCache, stream: &str) -> Option<Ticker> {
    read_bucketed(cache, stream, now_tenths())
}

#[derive(Debug, Clone)]
enum CacheValue {
    Int(i64),
    Float(f64),
    Dict(serde_json::Value),
}

/// In-process default: a lock-guarded hash map standing in for the shared
/// KV store. Correct single-process wiring and tests; a multi-process
/// deployment swaps this for a real backend behind the same trait.
#[derive(Debug, Default)]
pub struct InMemoryQuoteCache {
    inner: RwLock<HashMap<String, CacheValue>>,
}

impl InMemoryQuoteCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuoteCache for InMemoryQuoteCache {
    fn set_int(&self, key: &str, value: i64) {
        if key.is_empty() {
            return;
        }
        self.inner.write().insert(key.to_string(), CacheValue::Int(value));
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.inner.read().get(key) {
            Some(CacheValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    fn set_float(&self, key: &str, value: f64) {
        if key.is_empty() {
            return;
        }
        self.inner.write().insert(key.to_string(), CacheValue::Float(value));
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        match self.inner.read().get(key) {
            Some(CacheValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    fn set_dict(&self, key: &str, value: serde_json::Value) {
        if key.is_empty() || value.is_null() {
            return;
        }
        self.inner.write().insert(key.to_string(), CacheValue::Dict(value));
    }

    fn get_dict(&self, key: &str) -> Option<serde_json::Value> {
        match self.inner.read().get(key) {
            Some(CacheValue::Dict(v)) => Some(v.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;

    #[test]
    fn bucket_wrap_scenario_a() {
        // Scenario A from SPEC_FULL.md §8: writer at t=599 stores bucket 599;
        // reader at t=601 (b=1) must find it by scanning back through -1 -> 599.
        let cache = InMemoryQuoteCache::new();
        let stream = "binance_future_depthbtcusdt";
        cache.set_dict(
            &format!("{stream}599_value"),
            serde_json::to_value(OrderBookSnapshot {
                asks: vec![Level::new(101.0, 1.0)],
                bids: vec![Level::new(100.0, 1.0)],
            })
            .unwrap(),
        );
        cache.set_int(&format!("{stream}599"), 599);

        let result = read_bucketed::<OrderBookSnapshot>(&cache, stream, 601);
        assert!(result.is_some());
        assert_eq!(result.unwrap().top_bid().unwrap().price, 100.0);
    }

    #[test]
    fn missing_stream_returns_none() {
        let cache = InMemoryQuoteCache::new();
        assert!(get_order_book(&cache, "nope").is_none());
        assert!(get_ticker(&cache, "nope").is_none());
    }

    #[test]
    fn stale_bucket_older_than_60s_is_not_returned() {
        let cache = InMemoryQuoteCache::new();
        let stream = "tickerBNBUSDT";
        let old_ts = 100;
        cache.set_dict(
            &format!("{stream}{}_value", bucket_of(old_ts)),
            serde_json::to_value(Ticker { price: 1.0, qty: 1.0 }).unwrap(),
        );
        cache.set_int(&format!("{stream}{}", bucket_of(old_ts)), old_ts);

        // 61s later: 610 tenths, well past the 600-tenth (60s) freshness window.
        let result = read_bucketed::<Ticker>(&cache, stream, old_ts + 610);
        assert!(result.is_none());
    }

    #[test]
    fn round_trip_via_publish_helpers() {
        let cache = InMemoryQuoteCache::new();
        let ob = OrderBookSnapshot {
            asks: vec![Level::new(102.0, 2.0)],
            bids: vec![Level::new(101.0, 3.0)],
        };
        let t = now_tenths();
        publish_order_book(&cache, "okx_future_depitBTC-USDT-SWAP", t, &ob);
        let fetched = read_bucketed::<OrderBookSnapshot>(&cache, "okx_future_depitBTC-USDT-SWAP", t);
        assert_eq!(fetched, Some(ob));
    }

    #[test]
    fn float_and_dict_accessors_round_trip() {
        let cache = InMemoryQuoteCache::new();
        cache.set_float("last_price", 42.5);
        assert_eq!(cache.get_float("last_price"), Some(42.5));
        assert_eq!(cache.get_int("last_price"), None);
    }
}
