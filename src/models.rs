//! Shared data model: order book snapshots, tickers, orders and risk state.
//! See SPEC_FULL.md §3 for the authoritative field-by-field description.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One price level: a decimal-string price/qty pair preserving venue-native
/// precision, plus the parsed `f64` used for sort keys and arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub qty: f64,
}

impl Level {
    pub fn new(price: f64, qty: f64) -> Self {
        Self { price, qty }
    }
}

/// Order book snapshot for one stream, one bucket.
///
/// Invariant: `asks` sorted ascending, `bids` sorted descending; when both
/// sides are non-empty, `top_ask() > top_bid()`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
}

impl OrderBookSnapshot {
    pub fn top_ask(&self) -> Option<&Level> {
        self.asks.first()
    }

    pub fn top_bid(&self) -> Option<&Level> {
        self.bids.first()
    }

    pub fn is_crossed(&self) -> bool {
        match (self.top_ask(), self.top_bid()) {
            (Some(a), Some(b)) => a.price <= b.price,
            _ => false,
        }
    }
}

/// Last-trade ticker, venue-native precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub price: f64,
    pub qty: f64,
}

/// Top-of-book quote for a maker symbol, as returned by the venue client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AskBid {
    pub ap: f64,
    pub aq: f64,
    pub bp: f64,
    pub bq: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BizType {
    Spot,
    Future,
    Umfuture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Gtc,
    Gtx,
    Ioc,
}

impl TimeInForce {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Gtx => "GTX",
            TimeInForce::Ioc => "IOC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    #[default]
    None,
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionSide::None => "",
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

/// Request to place a single limit order through a `VenueClient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub symbol: String,
    pub client_id: String,
    pub side: Side,
    pub order_type: &'static str,
    pub quantity: f64,
    pub price: f64,
    pub biz_type: BizType,
    pub tif: TimeInForce,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default)]
    pub position_side: PositionSide,
    #[serde(default)]
    pub bait: bool,
    #[serde(default)]
    pub selftrade_enabled: bool,
}

impl NewOrder {
    pub fn limit(
        symbol: impl Into<String>,
        client_id: impl Into<String>,
        side: Side,
        quantity: f64,
        price: f64,
        biz_type: BizType,
        tif: TimeInForce,
        position_side: PositionSide,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            client_id: client_id.into(),
            side,
            order_type: "LIMIT",
            quantity,
            price,
            biz_type,
            tif,
            reduce_only: false,
            position_side,
            bait: false,
            selftrade_enabled: false,
        }
    }
}

/// Venue's ack for an order placement or cancel request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub client_id: String,
}

impl OrderAck {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        !self.order_id.is_empty()
    }
}

/// Open order as returned by `VenueClient::open_orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: String,
    pub client_id: String,
}

/// Order status lookup result. Venue-protocol errors (§7) are modelled as a
/// response with no `status` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStatus {
    pub status: Option<String>,
    #[serde(default)]
    pub executed_qty: f64,
    pub side: Option<Side>,
}

/// A maker order this process believes to be live on the venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedOrder {
    pub price: f64,
    pub id: u64,
}

/// Risk accumulated against one maker order id until fully hedged.
/// See SPEC_FULL.md §3 for the lifecycle (created on first fill, accumulated
/// on partials, removed once `hedged_qty >= qty`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPosition {
    pub symbol: String,
    pub side: Side,
    pub qty: f64,
    pub total_amt: f64,
    pub hedged_qty: f64,
    pub hedged_amt: f64,
    pub created_ts: f64,
    /// Individual trade fills contributing to this position, keyed by trade id.
    pub fills: HashMap<String, FilledOrder>,
}

impl RiskPosition {
    pub fn price(&self) -> f64 {
        if self.qty == 0.0 {
            0.0
        } else {
            self.total_amt / self.qty
        }
    }

    pub fn is_fully_hedged(&self) -> bool {
        self.hedged_qty >= self.qty
    }
}

/// A single maker fill event, as projected from the private trade-event
/// stream (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilledOrder {
    pub trade_id: String,
    pub qty: f64,
    pub amount: f64,
    pub symbol: String,
    pub side: Side,
    pub order_id: String,
    pub match_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_book_crossed_detection() {
        let ob = OrderBookSnapshot {
            asks: vec![Level::new(100.0, 1.0)],
            bids: vec![Level::new(101.0, 1.0)],
        };
        assert!(ob.is_crossed());

        let ob = OrderBookSnapshot {
            asks: vec![Level::new(101.0, 1.0)],
            bids: vec![Level::new(100.0, 1.0)],
        };
        assert!(!ob.is_crossed());
    }

    #[test]
    fn risk_position_price_recomputed_on_accumulate() {
        let mut pos = RiskPosition {
            symbol: "BTCUSDT".into(),
            side: Side::Buy,
            qty: 1.0,
            total_amt: 30_000.0,
            hedged_qty: 0.0,
            hedged_amt: 0.0,
            created_ts: 0.0,
            fills: HashMap::new(),
        };
        assert_eq!(pos.price(), 30_000.0);
        pos.qty += 0.3;
        pos.total_amt += 9_003.0;
        assert!((pos.price() - 30_002.307_692_307_7).abs() < 1e-6);
        assert!(!pos.is_fully_hedged());
        pos.hedged_qty = pos.qty;
        assert!(pos.is_fully_hedged());
    }
}
