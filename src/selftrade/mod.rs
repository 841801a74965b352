//! Self-trader: periodically crosses a maker/taker order pair against the
//! maker's own book to manufacture printed trades that track a followed
//! ticker. Grounded in `self_trader/self_trader.py`.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

use crate::cache::QuoteCache;
use crate::config::SelfTraderConfig;
use crate::models::{AskBid, BizType, NewOrder, PositionSide, Side, TimeInForce};
use crate::venue::VenueClient;

/// Per-symbol running state across rounds: the last trade price used (so a
/// repeated tick price nudges instead of standing still), the minute bucket
/// the last trade belonged to, and the last quantity (so two identical
/// quantities in a row get perturbed).
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfTradeContext {
    pub price: f64,
    pub minute: i64,
    pub qty: f64,
}

fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        value.trunc()
    } else {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }
}

/// Build the paired maker(GTX)/taker(IOC) order set for one self-trade.
/// FUTURE orders convert quantity into contracts (`qty * leverage / contract_size`)
/// and flip `position_side` per leg so the pair nets to flat.
fn build_order_pair(symbol: &str, term_type: BizType, price: f64, qty: f64, taker_side: Side) -> Option<[NewOrder; 2]> {
    const CONTRACT_SIZE: f64 = 0.1;
    const LEVERAGE: f64 = 2.0;

    let ts = (now_secs() * 1000.0) as i64;
    let maker_side = taker_side.opposite();

    match term_type {
        BizType::Spot => Some([
            NewOrder::limit(symbol, format!("M{symbol}_{ts}"), maker_side, qty, price, term_type, TimeInForce::Gtx, PositionSide::None),
            NewOrder::limit(symbol, format!("T{symbol}_{ts}"), taker_side, qty, price, term_type, TimeInForce::Ioc, PositionSide::None),
        ]),
        BizType::Future | BizType::Umfuture => {
            let contracts = ((qty * LEVERAGE) / CONTRACT_SIZE).trunc();
            let maker_position = if taker_side == Side::Sell { PositionSide::Long } else { PositionSide::Short };
            let taker_position = if taker_side == Side::Sell { PositionSide::Short } else { PositionSide::Long };
            Some([
                NewOrder::limit(symbol, format!("M{symbol}_{ts}"), maker_side, contracts, price, term_type, TimeInForce::Gtx, maker_position),
                NewOrder::limit(symbol, format!("T{symbol}_{ts}"), taker_side, contracts, price, term_type, TimeInForce::Ioc, taker_position),
            ])
        }
    }
}

/// Retry the maker-leg cancel up to 3 times, 500ms apart, matching
/// `_cancel_orders`'s retry loop in the original.
async fn cancel_maker_leg(venue: &dyn VenueClient, order_id: &str) -> bool {
    for _ in 0..3 {
        match venue.cancel_order(order_id).await {
            Ok(ack) if ack.order_id == order_id => return true,
            Ok(_) => {}
            Err(err) => warn!(error = %err, order_id, "cancel_maker_leg failed"),
        }
        sleep(Duration::from_millis(500)).await;
    }
    false
}

/// One self-trade round for a single symbol. Returns `true` if an order
/// pair was (attempted to be) submitted.
pub async fn self_trade(cache: &dyn QuoteCache, venue: &dyn VenueClient, cfg: &SelfTraderConfig, ctx: &mut SelfTradeContext) -> bool {
    debug!(symbol = %cfg.maker_symbol, "self_trade begin");

    // The ticker is published by the ingesters under a prefixed key
    // (`{exchange}_ticker{symbol}`, see ingest::binance/ingest::okx); that is
    // the only key anything in the system ever writes to.
    let ticker_key = format!("{}_ticker{}", cfg.follow_exchange, cfg.follow_symbol.to_lowercase());
    let ticker = match crate::cache::get_ticker(cache, &ticker_key) {
        Some(t) if t.price > 0.0 && t.qty > 0.0 => t,
        _ => {
            warn!(symbol = %cfg.follow_symbol, "fail to get ticker");
            return false;
        }
    };

    let ob: AskBid = match venue.top_askbid(&cfg.maker_symbol).await {
        Ok(ob) => ob,
        Err(err) => {
            warn!(symbol = %cfg.maker_symbol, error = %err, "no order book");
            return false;
        }
    };

    let top_ask = ob.ap;
    let top_bid = ob.bp;

    let mut qty = ticker.qty * cfg.qty_multiplier;
    let mut rng = rand::thread_rng();
    let random_coef = 0.9995 + 0.00001 * rng.gen_range(0..100) as f64;

    let mut price = ticker.price;
    if (ctx.price - price).abs() < f64::EPSILON && ctx.price != 0.0 {
        // same tick as last round: nudge off it so the order doesn't sit at
        // the exact same price as the previous printed trade.
        if (price - top_ask).abs() < f64::EPSILON {
            price -= 1.0 / 10f64.powi(cfg.price_decimals as i32);
        } else {
            price += 1.0 / 10f64.powi(cfg.price_decimals as i32);
        }
    } else if ctx.price > 0.0 && (price / ctx.price - 1.0).abs() > cfg.price_divergence {
        error!(symbol = %cfg.maker_symbol, prev = ctx.price, price, "abnormal ticker volatility");
        price = if price > ctx.price {
            ctx.price * (1.0 + cfg.price_divergence)
        } else {
            ctx.price * (1.0 - cfg.price_divergence)
        };
    }
    qty *= random_coef;

    if price <= 0.0 {
        return false;
    }

    qty = cfg.min_qty_per_order.max(qty).min(cfg.max_amt_per_order / price);
    qty = round_to(qty, cfg.qty_decimals);
    if qty <= 0.0 || qty * price < cfg.min_amt_per_order {
        return false;
    }

    info!(symbol = %cfg.maker_symbol, price, qty, top_bid, top_ask, "put self-trade");

    // the close of minute N must equal the open of minute N+1: reuse the
    // last price at the start of a new minute instead of the freshly
    // derived one.
    let current_minute = (now_secs() as i64 / 60) % 60;
    if current_minute != ctx.minute {
        price = ctx.price;
    }
    ctx.minute = current_minute;
    price = price.max(top_bid).min(top_ask);
    ctx.price = price;
    if (qty - ctx.qty).abs() < f64::EPSILON {
        qty *= 1.0001;
    }
    ctx.qty = qty;

    let price_rounded = round_to(price, cfg.price_decimals);
    let qty_rounded = round_to(qty, cfg.qty_decimals);
    let taker_side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };

    let Some([maker_order, taker_order]) = build_order_pair(&cfg.maker_symbol, cfg.term_type, price_rounded, qty_rounded, taker_side) else {
        error!(term_type = ?cfg.term_type, "unknown term_type");
        return false;
    };

    match venue.batch_make_orders(vec![maker_order, taker_order]).await {
        Ok(acks) if !acks.is_empty() => {
            info!(?acks, "self-trade submitted");
            if let Some(maker_ack) = acks.first().filter(|a| a.is_success()) {
                cancel_maker_leg(venue, &maker_ack.order_id).await;
            }
            true
        }
        Ok(_) => true,
        Err(err) => {
            warn!(error = %err, "self-trade submission failed");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryQuoteCache;
    use crate::models::Ticker;
    use crate::venue::MockVenueClient;

    fn cfg() -> SelfTraderConfig {
        SelfTraderConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            passphrase: String::new(),
            follow_exchange: "binance_spot".into(),
            follow_symbol: "btcusdt".into(),
            maker_symbol: "BTCUSDT".into(),
            term_type: BizType::Spot,
            price_decimals: 2,
            qty_decimals: 5,
            interval: 2.0,
            quote_timeout: 1.0,
            qty_multiplier: 0.8,
            max_amt_per_order: 2_000.0,
            min_qty_per_order: 0.00001,
            min_amt_per_order: 10.0,
            price_divergence: 0.02,
        }
    }

    #[tokio::test]
    async fn missing_ticker_returns_false() {
        let cache = InMemoryQuoteCache::new();
        let venue = MockVenueClient::new();
        let mut ctx = SelfTradeContext::default();
        assert!(!self_trade(&cache, &venue, &cfg(), &mut ctx).await);
    }

    #[tokio::test]
    async fn missing_order_book_returns_false() {
        let cache = InMemoryQuoteCache::new();
        let cfg = cfg();
        let key = format!("{}_ticker{}", cfg.follow_exchange, cfg.follow_symbol);
        crate::cache::publish_ticker(&cache, &key, crate::cache::now_tenths(), &Ticker { price: 100.0, qty: 1.0 });
        let venue = MockVenueClient::new();
        let mut ctx = SelfTradeContext::default();
        assert!(!self_trade(&cache, &venue, &cfg, &mut ctx).await);
    }

    #[tokio::test]
    async fn happy_path_submits_maker_taker_pair() {
        let cache = InMemoryQuoteCache::new();
        let cfg = cfg();
        let key = format!("{}_ticker{}", cfg.follow_exchange, cfg.follow_symbol);
        crate::cache::publish_ticker(&cache, &key, crate::cache::now_tenths(), &Ticker { price: 100.0, qty: 1.0 });
        let venue = MockVenueClient::new();
        venue.set_top_askbid(&cfg.maker_symbol, AskBid { ap: 100.5, aq: 2.0, bp: 99.5, bq: 2.0 });
        let mut ctx = SelfTradeContext::default();
        assert!(self_trade(&cache, &venue, &cfg, &mut ctx).await);
        assert!(ctx.price >= 99.5 && ctx.price <= 100.5);
    }

    #[test]
    fn build_order_pair_future_converts_to_contracts() {
        let pair = build_order_pair("BTCUSDT", BizType::Future, 100.0, 1.0, Side::Sell).unwrap();
        assert_eq!(pair[0].quantity, 20.0); // 1.0 * 2 leverage / 0.1 contract size
        assert_eq!(pair[0].side, Side::Buy); // maker leg opposite the taker
        assert_eq!(pair[0].position_side, PositionSide::Long);
    }
}
