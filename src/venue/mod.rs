//! Venue abstraction: the `VenueClient` trait every exchange adapter
//! implements, plus a generic HMAC-signed REST client shape and an
//! in-memory mock used by the market maker, hedger and self-trader in tests.
//!
//! Concrete per-exchange wire formats (Binance, OKX, BiFu REST dialects) are
//! the external client-library seam noted in SPEC_FULL.md §11 and are not
//! reimplemented here; this module is what those adapters plug into.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use parking_lot::RwLock;
use sha2::Sha256;

use crate::error::VenueError;
use crate::models::{AskBid, NewOrder, OpenOrder, OrderAck, OrderStatus};

type HmacSha256 = Hmac<Sha256>;

/// Everything a market-making, hedging or self-trade pass needs from an
/// exchange connection. One instance per (exchange, symbol) pair.
#[async_trait]
pub trait VenueClient: Send + Sync {
    async fn batch_make_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<OrderAck>, VenueError>;

    async fn batch_cancel(&self, order_ids: Vec<String>) -> Result<Vec<OrderAck>, VenueError>;

    async fn cancel_order(&self, order_id: &str) -> Result<OrderAck, VenueError>;

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, VenueError>;

    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<OrderStatus, VenueError>;

    async fn top_askbid(&self, symbol: &str) -> Result<AskBid, VenueError>;

    /// True for adapters that never touch a live venue (paper/backtest
    /// wiring, and the mock used in tests). The hedger and self-trader use
    /// this to skip real-money guards when mocked.
    fn mock(&self) -> bool {
        false
    }
}

/// Shared request-signing helper for exchanges whose L2 auth scheme is
/// `HMAC-SHA256(timestamp + method + path + body)` base64-encoded, matching
/// the BiFu private-WS scheme described in SPEC_FULL.md §11.
pub struct RequestSigner {
    secret: Vec<u8>,
}

impl RequestSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    pub fn sign(&self, method: &str, path: &str, body: &str, timestamp_ms: i64) -> Result<String, VenueError> {
        let message = format!("{timestamp_ms}{method}{path}{body}");
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| VenueError::Request(format!("bad signing key: {e}")))?;
        mac.update(message.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    pub fn auth_headers(
        &self,
        api_key: &str,
        passphrase: &str,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<Vec<(String, String)>, VenueError> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        let signature = self.sign(method, path, body, timestamp_ms)?;
        Ok(vec![
            ("X-API-KEY".to_string(), api_key.to_string()),
            ("X-SIGNATURE".to_string(), signature),
            ("X-TIMESTAMP".to_string(), timestamp_ms.to_string()),
            ("X-PASSPHRASE".to_string(), passphrase.to_string()),
        ])
    }
}

#[derive(Debug, Default, Clone)]
struct MockOrder {
    ack: OrderAck,
    client_id: String,
    cancelled: bool,
}

/// In-memory venue double: every order is accepted with a synthetic id,
/// cancels succeed unless the order id is unknown, and `top_askbid` returns
/// whatever was last pushed via `set_top_askbid`. Used by mm/hedger/selftrade
/// unit tests in place of a live exchange.
#[derive(Debug, Default)]
pub struct MockVenueClient {
    next_id: RwLock<u64>,
    orders: RwLock<HashMap<String, MockOrder>>,
    top: RwLock<HashMap<String, AskBid>>,
}

impl MockVenueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_top_askbid(&self, symbol: &str, quote: AskBid) {
        self.top.write().insert(symbol.to_string(), quote);
    }

    fn next_order_id(&self) -> String {
        let mut guard = self.next_id.write();
        *guard += 1;
        // numeric, matching the exchange-native order id shape `CachedOrder::id` expects.
        guard.to_string()
    }
}

#[async_trait]
impl VenueClient for MockVenueClient {
    async fn batch_make_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<OrderAck>, VenueError> {
        let mut acks = Vec::with_capacity(orders.len());
        for order in orders {
            let order_id = self.next_order_id();
            let ack = OrderAck {
                order_id: order_id.clone(),
                client_id: order.client_id.clone(),
            };
            self.orders.write().insert(
                order_id,
                MockOrder {
                    ack: ack.clone(),
                    client_id: order.client_id,
                    cancelled: false,
                },
            );
            acks.push(ack);
        }
        Ok(acks)
    }

    async fn batch_cancel(&self, order_ids: Vec<String>) -> Result<Vec<OrderAck>, VenueError> {
        let mut acks = Vec::with_capacity(order_ids.len());
        for id in order_ids {
            acks.push(self.cancel_order(&id).await?);
        }
        Ok(acks)
    }

    async fn cancel_order(&self, order_id: &str) -> Result<OrderAck, VenueError> {
        let mut orders = self.orders.write();
        match orders.get_mut(order_id) {
            Some(entry) => {
                entry.cancelled = true;
                Ok(entry.ack.clone())
            }
            None => Ok(OrderAck::failed()),
        }
    }

    async fn open_orders(&self, _symbol: &str) -> Result<Vec<OpenOrder>, VenueError> {
        Ok(self
            .orders
            .read()
            .values()
            .filter(|o| !o.cancelled)
            .map(|o| OpenOrder {
                order_id: o.ack.order_id.clone(),
                client_id: o.client_id.clone(),
            })
            .collect())
    }

    async fn order_status(&self, _symbol: &str, order_id: &str) -> Result<OrderStatus, VenueError> {
        let orders = self.orders.read();
        match orders.get(order_id) {
            Some(entry) if entry.cancelled => Ok(OrderStatus {
                status: Some("CANCELED".to_string()),
                executed_qty: 0.0,
                side: None,
            }),
            Some(_) => Ok(OrderStatus {
                status: Some("NEW".to_string()),
                executed_qty: 0.0,
                side: None,
            }),
            None => Ok(OrderStatus::default()),
        }
    }

    async fn top_askbid(&self, symbol: &str) -> Result<AskBid, VenueError> {
        self.top
            .read()
            .get(symbol)
            .copied()
            .ok_or_else(|| VenueError::MissingField("top_askbid"))
    }

    fn mock(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BizType, PositionSide, Side, TimeInForce};

    #[tokio::test]
    async fn mock_place_then_cancel_roundtrip() {
        let client = MockVenueClient::new();
        let order = NewOrder::limit(
            "BTCUSDT",
            "C0B1_1_0",
            Side::Buy,
            0.01,
            30_000.0,
            BizType::Spot,
            TimeInForce::Gtc,
            PositionSide::None,
        );
        let acks = client.batch_make_orders(vec![order]).await.unwrap();
        assert_eq!(acks.len(), 1);
        assert!(acks[0].is_success());

        let open = client.open_orders("BTCUSDT").await.unwrap();
        assert_eq!(open.len(), 1);

        let cancel_ack = client.cancel_order(&acks[0].order_id).await.unwrap();
        assert!(cancel_ack.is_success());
        let open_after = client.open_orders("BTCUSDT").await.unwrap();
        assert!(open_after.is_empty());
    }

    #[tokio::test]
    async fn top_askbid_missing_symbol_errors() {
        let client = MockVenueClient::new();
        let result = client.top_askbid("ETHUSDT").await;
        assert!(result.is_err());
    }

    #[test]
    fn signer_produces_deterministic_signature() {
        let signer = RequestSigner::new("topsecret");
        let sig1 = signer.sign("POST", "/orders", "{}", 1_700_000_000_000).unwrap();
        let sig2 = signer.sign("POST", "/orders", "{}", 1_700_000_000_000).unwrap();
        assert_eq!(sig1, sig2);
    }
}
