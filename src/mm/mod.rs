//! Market-making engine: mirrors a followed venue's order book onto a maker
//! venue, reusing still-close orders across rounds instead of
//! cancel/replacing everything every pass. Grounded in
//! `maker/maker_libs.py` and `maker/market_maker.py`.

pub mod far;

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::cache::QuoteCache;
use crate::config::MmTokenConfig;
use crate::models::{CachedOrder, Level, NewOrder, Side};
use crate::venue::VenueClient;

const BATCH_SIZE: usize = 10;
const DEPTH_PREFIX: &str = "depth";

/// Per-symbol state carried across market-making rounds: the orders this
/// process believes are live, and the self-trade guard prices.
#[derive(Debug, Default)]
pub struct MmContext {
    pub prev_asks: Vec<CachedOrder>,
    pub prev_bids: Vec<CachedOrder>,
    pub prev_far_asks: Vec<CachedOrder>,
    pub prev_far_bids: Vec<CachedOrder>,
    pub no_force_refresh_num: u32,
    pub top_ask: Option<f64>,
    pub top_bid: Option<f64>,
}

fn calc_maker_qty(order_price: f64, mut order_qty: f64, max_amt_per_order: f64, qty_decimals: u32) -> f64 {
    if order_qty * order_price > max_amt_per_order {
        order_qty = max_amt_per_order / order_price;
    }
    if qty_decimals == 0 {
        order_qty.trunc()
    } else {
        let factor = 10f64.powi(qty_decimals as i32);
        (order_qty * factor).round() / factor
    }
}

fn round_price(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        value.trunc()
    } else {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }
}

/// Mirror the followed book's asks into maker ask quotes at a markup.
pub fn gen_ask_orders(order_book_asks: &[Level], cfg: &MmTokenConfig) -> Vec<Level> {
    let price_coef = 1.0 + 0.0001 * cfg.near_sell_price_margin;
    let mut out = Vec::new();
    for level in order_book_asks.iter().take(cfg.near_ask_size) {
        let price = round_price(level.price * price_coef, cfg.price_decimals);
        let qty = calc_maker_qty(price, level.qty * cfg.near_qty_multiplier, cfg.near_max_amt_per_order, cfg.qty_decimals);
        if qty > 0.0 {
            out.push(Level::new(price, qty));
        }
    }
    out
}

/// Mirror the followed book's bids into maker bid quotes at a markdown.
pub fn gen_bid_orders(order_book_bids: &[Level], cfg: &MmTokenConfig) -> Vec<Level> {
    let price_coef = 1.0 + 0.0001 * cfg.near_buy_price_margin;
    let mut out = Vec::new();
    for level in order_book_bids.iter().take(cfg.near_bid_size) {
        let price = round_price(level.price * price_coef, cfg.price_decimals);
        let qty = calc_maker_qty(price, level.qty * cfg.near_qty_multiplier, cfg.near_max_amt_per_order, cfg.qty_decimals);
        if qty > 0.0 {
            out.push(Level::new(price, qty));
        }
    }
    out
}

/// Near-end client order ids are `{symbol}_{day}_{offset}`; far-end ids are
/// prefixed `F0` ahead of the (already `B`/`S`-prefixed) symbol tag, per
/// `gen_client_order_id` in the original.
pub fn gen_client_order_id(symbol: &str, clorder_start: i64, clorder_offset: i64, far_end: bool) -> String {
    if far_end {
        format!("F0{symbol}_{clorder_start}_{clorder_offset}")
    } else {
        format!("{symbol}_{clorder_start}_{clorder_offset}")
    }
}

/// Interleave ask/bid orders ask, bid, ask, bid... with the longer side's
/// remainder appended, so cancel/replace batches don't starve one side.
pub fn mix_ask_bid_orders(ask_orders: Vec<NewOrder>, bid_orders: Vec<NewOrder>) -> Vec<NewOrder> {
    let mut mixed = Vec::with_capacity(ask_orders.len() + bid_orders.len());
    let common = ask_orders.len().min(bid_orders.len());
    let mut asks = ask_orders.into_iter();
    let mut bids = bid_orders.into_iter();
    for _ in 0..common {
        mixed.push(asks.next().unwrap());
        mixed.push(bids.next().unwrap());
    }
    mixed.extend(asks);
    mixed.extend(bids);
    mixed
}

fn cmp_price(a: f64, b: f64, descending: bool) -> std::cmp::Ordering {
    let ord = a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal);
    if descending {
        ord.reverse()
    } else {
        ord
    }
}

fn merge_orders(
    prev_orders: &[CachedOrder],
    new_orders: &[NewOrder],
    flags: &[bool],
    cancel_ids: &mut Vec<String>,
    reserve_orders: &mut Vec<CachedOrder>,
) -> Vec<NewOrder> {
    let mut merged = Vec::new();
    for (idx, &flag) in flags.iter().enumerate() {
        let prev = prev_orders[idx];
        if !flag {
            cancel_ids.push(prev.id.to_string());
            merged.push(new_orders[idx].clone());
        } else {
            reserve_orders.push(prev);
        }
    }
    if prev_orders.len() > flags.len() {
        cancel_ids.extend(prev_orders[flags.len()..].iter().map(|o| o.id.to_string()));
    }
    if new_orders.len() > flags.len() {
        merged.extend(new_orders[flags.len()..].iter().cloned());
    }
    merged
}

/// Compare previous and newly generated orders by price; reuse a previous
/// order if its price is within `diff_rate_per_round` of the new one,
/// otherwise cancel it and place the new order instead.
pub fn diff_prev_new_orders(
    diff_rate_per_round: f64,
    side: Side,
    prev_orders: &mut Vec<CachedOrder>,
    new_orders: &mut Vec<NewOrder>,
    cancel_ids: &mut Vec<String>,
    reserve_orders: &mut Vec<CachedOrder>,
) -> Vec<NewOrder> {
    let descending = side == Side::Buy;
    prev_orders.sort_by(|a, b| cmp_price(a.price, b.price, descending));
    new_orders.sort_by(|a, b| cmp_price(a.price, b.price, descending));

    let flags: Vec<bool> = prev_orders
        .iter()
        .zip(new_orders.iter())
        .map(|(prev, new)| (prev.price / new.price - 1.0).abs() < diff_rate_per_round)
        .collect();
    merge_orders(prev_orders, new_orders, &flags, cancel_ids, reserve_orders)
}

/// Returns the acks plus whether any chunk failed outright (venue-call
/// error, not a per-order rejection) — callers use the latter to decide
/// whether the whole pass needs a defensive teardown.
async fn make_orders(venue: &dyn VenueClient, orders: &[NewOrder]) -> (Vec<crate::models::OrderAck>, bool) {
    let mut acks = Vec::with_capacity(orders.len());
    let mut failed = false;
    for chunk in orders.chunks(BATCH_SIZE) {
        match venue.batch_make_orders(chunk.to_vec()).await {
            Ok(mut sub) => acks.append(&mut sub),
            Err(err) => {
                warn!(error = %err, "batch_make_orders failed");
                failed = true;
            }
        }
    }
    (acks, failed)
}

async fn cancel_orders(venue: &dyn VenueClient, cancel_ids: &[String]) -> (usize, bool) {
    let mut cancelled = 0;
    let mut failed = false;
    for chunk in cancel_ids.chunks(BATCH_SIZE) {
        match venue.batch_cancel(chunk.to_vec()).await {
            Ok(acks) => cancelled += acks.iter().filter(|a| a.is_success()).count(),
            Err(err) => {
                warn!(error = %err, "batch_cancel failed");
                failed = true;
            }
        }
    }
    (cancelled, failed)
}

/// Place/cancel/reconcile one side-pair of orders (near or far) for a round.
/// See `maker_libs.py::handle_orders` for the reference sequencing: new
/// orders are placed before previous ones are cancelled, and a failed cancel
/// tightens (never loosens) the self-trade guard prices.
pub async fn handle_orders(
    venue: &dyn VenueClient,
    cfg: &MmTokenConfig,
    ask_orders: Vec<NewOrder>,
    bid_orders: Vec<NewOrder>,
    ctx: &mut MmContext,
    is_far: bool,
) -> bool {
    let mut failed = false;
    let top_bid = bid_orders.first().map(|o| o.price).unwrap_or(0.0);
    let top_ask = ask_orders.first().map(|o| o.price).unwrap_or(f64::MAX);

    let mut prev_asks = if is_far {
        std::mem::take(&mut ctx.prev_far_asks)
    } else {
        std::mem::take(&mut ctx.prev_asks)
    };
    let mut prev_bids = if is_far {
        std::mem::take(&mut ctx.prev_far_bids)
    } else {
        std::mem::take(&mut ctx.prev_bids)
    };

    let diff_rate_per_round = cfg.near_diff_rate_per_round * 0.0001;
    let force_refresh_num = cfg.force_refresh_num;

    let mut cancel_ids = Vec::new();
    let mut reserve_asks = Vec::new();
    let mut reserve_bids = Vec::new();
    let mut ask_orders = ask_orders;
    let mut bid_orders = bid_orders;

    let (merged_asks, merged_bids) = if diff_rate_per_round <= 0.0 || ctx.no_force_refresh_num >= force_refresh_num {
        cancel_ids.extend(prev_asks.iter().chain(prev_bids.iter()).map(|o| o.id.to_string()));
        ctx.no_force_refresh_num = 0;
        (ask_orders, bid_orders)
    } else {
        let merged_asks =
            diff_prev_new_orders(diff_rate_per_round, Side::Sell, &mut prev_asks, &mut ask_orders, &mut cancel_ids, &mut reserve_asks);
        let merged_bids =
            diff_prev_new_orders(diff_rate_per_round, Side::Buy, &mut prev_bids, &mut bid_orders, &mut cancel_ids, &mut reserve_bids);
        ctx.no_force_refresh_num += 1;
        (merged_asks, merged_bids)
    };

    let mixed = mix_ask_bid_orders(merged_asks, merged_bids);
    debug!(new_orders = mixed.len(), "handle_orders mixed batch");

    if !mixed.is_empty() {
        let (made, make_failed) = make_orders(venue, &mixed).await;
        failed |= make_failed;
        for (order, ack) in mixed.iter().zip(made.iter()) {
            if ack.is_success() {
                let cached = CachedOrder {
                    price: order.price,
                    id: ack.order_id.parse().unwrap_or_default(),
                };
                match order.side {
                    Side::Buy => reserve_bids.push(cached),
                    Side::Sell => reserve_asks.push(cached),
                }
            }
        }
    }

    // Every reused-but-still-live order (and every freshly placed one) must
    // land back in ctx.prev_* regardless of which branch above ran, or the
    // next pass loses track of orders it believes are live.
    if is_far {
        ctx.prev_far_asks = reserve_asks.clone();
        ctx.prev_far_bids = reserve_bids.clone();
    } else {
        ctx.prev_asks = reserve_asks.clone();
        ctx.prev_bids = reserve_bids.clone();
    }

    if !cancel_ids.is_empty() {
        let (cancel_num, cancel_failed) = cancel_orders(venue, &cancel_ids).await;
        failed |= cancel_failed;
        if cancel_num == 0 {
            ctx.top_ask = Some(ctx.top_ask.unwrap_or(top_ask).min(top_ask));
            ctx.top_bid = Some(ctx.top_bid.unwrap_or(top_bid).max(top_bid));
        } else if !is_far {
            ctx.top_ask = Some(top_ask);
            ctx.top_bid = Some(top_bid);
        }
    }

    if is_far && !mixed.is_empty() {
        // roll back anything unexpected still open (ids outside the
        // reconciled near+far sets), mirroring the post-far sweep.
        if let Ok(open) = venue.open_orders(&cfg.maker_symbol).await {
            let mut expect_ids: std::collections::HashSet<String> =
                reserve_asks.iter().chain(reserve_bids.iter()).map(|o| o.id.to_string()).collect();
            expect_ids.extend(ctx.prev_asks.iter().map(|o| o.id.to_string()));
            expect_ids.extend(ctx.prev_bids.iter().map(|o| o.id.to_string()));
            let unexpected: Vec<String> = open
                .iter()
                .filter(|o| !expect_ids.contains(&o.order_id))
                .map(|o| o.order_id.clone())
                .collect();
            if !unexpected.is_empty() {
                warn!(unexpected = unexpected.len(), "unexpected open orders after far pass");
                let (_, sweep_failed) = cancel_orders(venue, &unexpected).await;
                failed |= sweep_failed;
            }
        } else {
            failed = true;
        }
    }

    failed
}

fn now_secs() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn now_millis_mod_day() -> i64 {
    (SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64) % 86_400_000
}

fn exchange_depth_prefix(follow_exchange: &str) -> &str {
    match follow_exchange {
        "binance_UMFuture" | "binance_portfolio_margin" => "binance_future",
        other => other,
    }
}

/// Run one near-end (and, if `is_far`, far-end) market-making round for a
/// single symbol. Returns `Ok` even when there is no quote to mirror yet
/// (logged and skipped), matching the original's early-return on a cold
/// cache.
pub async fn run_pass(cache: &dyn QuoteCache, venue: &dyn VenueClient, cfg: &MmTokenConfig, ctx: &mut MmContext, is_far: bool) {
    let prefix = exchange_depth_prefix(&cfg.follow_exchange);
    let symbol_key = format!("{prefix}_{DEPTH_PREFIX}{}", cfg.follow_symbol.to_lowercase());
    let ob = match crate::cache::get_order_book(cache, &symbol_key) {
        Some(ob) if !ob.asks.is_empty() && !ob.bids.is_empty() => ob,
        _ => {
            warn!(symbol = %cfg.maker_symbol, key = %symbol_key, "cannot get quotes, skipping round");
            return;
        }
    };

    let new_asks = if cfg.near_side.wants_ask() { gen_ask_orders(&ob.asks, cfg) } else { Vec::new() };
    let new_bids = if cfg.near_side.wants_bid() { gen_bid_orders(&ob.bids, cfg) } else { Vec::new() };

    let clorder_start = now_secs() / 86_400;
    let mut clorder_offset = now_millis_mod_day();

    let top_bid = new_bids
        .first()
        .map(|l| l.price)
        .unwrap_or_else(|| ob.bids[0].price)
        .max(ctx.top_bid.unwrap_or(0.0));

    let mut valid_asks = Vec::new();
    for level in &new_asks {
        if level.price > top_bid {
            valid_asks.push(NewOrder::limit(
                cfg.maker_symbol.clone(),
                gen_client_order_id(&cfg.maker_symbol, clorder_start, clorder_offset, false),
                Side::Sell,
                level.qty,
                level.price,
                cfg.term_type,
                cfg.near_tif,
                cfg.position_side,
            ));
            clorder_offset += 1;
        }
    }

    let top_ask = new_asks
        .first()
        .map(|l| l.price)
        .unwrap_or_else(|| ob.asks[0].price)
        .min(ctx.top_ask.unwrap_or(top_bid));

    let mut valid_bids = Vec::new();
    for level in &new_bids {
        if level.price < top_ask {
            valid_bids.push(NewOrder::limit(
                cfg.maker_symbol.clone(),
                gen_client_order_id(&cfg.maker_symbol, clorder_start, clorder_offset, false),
                Side::Buy,
                level.qty,
                level.price,
                cfg.term_type,
                cfg.near_tif,
                cfg.position_side,
            ));
            clorder_offset += 1;
        }
    }

    let near_failed = handle_orders(venue, cfg, valid_asks, valid_bids, ctx, false).await;
    info!(symbol = %cfg.maker_symbol, "near-end pass complete");

    if near_failed {
        warn!(symbol = %cfg.maker_symbol, "near-end pass failed, clearing near open orders");
        clear_near_open_orders(venue, &cfg.maker_symbol).await;
        return;
    }

    if !is_far {
        return;
    }

    let far_side = cfg.far_side.unwrap_or(crate::config::SideSelect::Both);
    let far_ask_orders = if far_side.wants_ask() {
        far::gen_far_liquidity(&cfg.maker_symbol, cfg, &ob.asks, &ob.bids, Side::Sell, top_bid, clorder_start)
    } else {
        Vec::new()
    };
    let far_bid_orders = if far_side.wants_bid() {
        far::gen_far_liquidity(&cfg.maker_symbol, cfg, &ob.asks, &ob.bids, Side::Buy, top_ask, clorder_start)
    } else {
        Vec::new()
    };

    let far_failed = handle_orders(venue, cfg, far_ask_orders, far_bid_orders, ctx, true).await;
    info!(symbol = %cfg.maker_symbol, "far-end pass complete");

    if far_failed {
        warn!(symbol = %cfg.maker_symbol, "far-end pass failed, clearing near open orders");
        clear_near_open_orders(venue, &cfg.maker_symbol).await;
    }
}

/// Best-effort teardown: cancel every near-end (non-`F0`-prefixed) open
/// order for `symbol`. Called after a pass fails, and at shutdown.
pub async fn clear_near_open_orders(venue: &dyn VenueClient, symbol: &str) {
    let orders = match venue.open_orders(symbol).await {
        Ok(orders) => orders,
        Err(err) => {
            warn!(symbol, error = %err, "could not list open orders for cleanup");
            return;
        }
    };
    let ids: Vec<String> = orders
        .into_iter()
        .filter(|o| !o.client_id.starts_with("F0"))
        .map(|o| o.order_id)
        .collect();
    if !ids.is_empty() {
        cancel_orders(venue, &ids).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BizType, PositionSide, TimeInForce};
    use crate::venue::MockVenueClient;

    fn order(symbol: &str, side: Side, price: f64, qty: f64) -> NewOrder {
        NewOrder::limit(symbol, format!("{symbol}_1_1"), side, qty, price, BizType::Spot, TimeInForce::Gtc, PositionSide::None)
    }

    #[test]
    fn gen_ask_orders_respects_size_and_margin() {
        let cfg = test_cfg();
        let book = vec![Level::new(100.0, 1.0), Level::new(101.0, 1.0), Level::new(102.0, 1.0)];
        let orders = gen_ask_orders(&book, &cfg);
        assert_eq!(orders.len(), 2); // near_ask_size = 2 in test_cfg
        assert!(orders[0].price > 100.0);
    }

    #[test]
    fn diff_prev_new_orders_reuses_close_prices() {
        let prev = CachedOrder { price: 100.0, id: 7 };
        let mut prev_orders = vec![prev];
        let mut new_orders = vec![order("BTCUSDT", Side::Sell, 100.0001, 1.0)];
        let mut cancel_ids = Vec::new();
        let mut reserve = Vec::new();
        let merged = diff_prev_new_orders(0.001, Side::Sell, &mut prev_orders, &mut new_orders, &mut cancel_ids, &mut reserve);
        assert!(merged.is_empty());
        assert!(cancel_ids.is_empty());
        assert_eq!(reserve.len(), 1);
    }

    #[test]
    fn diff_prev_new_orders_replaces_far_price() {
        let prev = CachedOrder { price: 100.0, id: 7 };
        let mut prev_orders = vec![prev];
        let mut new_orders = vec![order("BTCUSDT", Side::Sell, 110.0, 1.0)];
        let mut cancel_ids = Vec::new();
        let mut reserve = Vec::new();
        let merged = diff_prev_new_orders(0.001, Side::Sell, &mut prev_orders, &mut new_orders, &mut cancel_ids, &mut reserve);
        assert_eq!(merged.len(), 1);
        assert_eq!(cancel_ids, vec!["7".to_string()]);
        assert!(reserve.is_empty());
    }

    #[test]
    fn mix_ask_bid_orders_interleaves_then_appends_remainder() {
        let asks = vec![order("BTCUSDT", Side::Sell, 101.0, 1.0)];
        let bids = vec![order("BTCUSDT", Side::Buy, 99.0, 1.0), order("BTCUSDT", Side::Buy, 98.0, 1.0)];
        let mixed = mix_ask_bid_orders(asks, bids);
        assert_eq!(mixed.len(), 3);
        assert_eq!(mixed[0].side, Side::Sell);
        assert_eq!(mixed[1].side, Side::Buy);
        assert_eq!(mixed[2].side, Side::Buy);
    }

    #[test]
    fn far_client_order_id_prefix() {
        assert_eq!(gen_client_order_id("BBTCUSDT", 19000, 5, true), "F0BBTCUSDT_19000_5");
        assert_eq!(gen_client_order_id("BTCUSDT", 19000, 5, false), "BTCUSDT_19000_5");
    }

    #[tokio::test]
    async fn handle_orders_places_then_reserves_cached_orders() {
        let venue = MockVenueClient::new();
        let cfg = test_cfg();
        let mut ctx = MmContext::default();
        let asks = vec![order(&cfg.maker_symbol, Side::Sell, 101.0, 1.0)];
        let bids = vec![order(&cfg.maker_symbol, Side::Buy, 99.0, 1.0)];
        handle_orders(&venue, &cfg, asks, bids, &mut ctx, false).await;
        assert_eq!(ctx.prev_asks.len(), 1);
        assert_eq!(ctx.prev_bids.len(), 1);
    }

    #[tokio::test]
    async fn steady_state_reuse_keeps_prev_orders_tracked() {
        // A calm round where every new order matches an existing one within
        // the diff threshold must carry the reused orders forward into
        // ctx.prev_*, not drop them.
        let venue = MockVenueClient::new();
        let mut cfg = test_cfg();
        cfg.near_diff_rate_per_round = 1_000.0;
        let mut ctx = MmContext::default();

        let asks = vec![order(&cfg.maker_symbol, Side::Sell, 101.0, 1.0)];
        let bids = vec![order(&cfg.maker_symbol, Side::Buy, 99.0, 1.0)];
        handle_orders(&venue, &cfg, asks, bids, &mut ctx, false).await;
        assert_eq!(ctx.prev_asks.len(), 1);
        assert_eq!(ctx.prev_bids.len(), 1);

        let asks = vec![order(&cfg.maker_symbol, Side::Sell, 101.0, 1.0)];
        let bids = vec![order(&cfg.maker_symbol, Side::Buy, 99.0, 1.0)];
        handle_orders(&venue, &cfg, asks, bids, &mut ctx, false).await;
        assert_eq!(ctx.prev_asks.len(), 1, "reused order must still be tracked after a calm round");
        assert_eq!(ctx.prev_bids.len(), 1, "reused order must still be tracked after a calm round");
    }

    #[tokio::test]
    async fn calm_round_increments_force_refresh_counter_once() {
        let venue = MockVenueClient::new();
        let mut cfg = test_cfg();
        cfg.near_diff_rate_per_round = 1_000.0;
        let mut ctx = MmContext::default();

        let asks = vec![order(&cfg.maker_symbol, Side::Sell, 101.0, 1.0)];
        let bids = vec![order(&cfg.maker_symbol, Side::Buy, 99.0, 1.0)];
        handle_orders(&venue, &cfg, asks, bids, &mut ctx, false).await;
        assert_eq!(ctx.no_force_refresh_num, 1);

        let asks = vec![order(&cfg.maker_symbol, Side::Sell, 101.0, 1.0)];
        let bids = vec![order(&cfg.maker_symbol, Side::Buy, 99.0, 1.0)];
        handle_orders(&venue, &cfg, asks, bids, &mut ctx, false).await;
        assert_eq!(ctx.no_force_refresh_num, 2);
    }

    fn test_cfg() -> MmTokenConfig {
        MmTokenConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            passphrase: String::new(),
            maker_exchange: "binance_spot".into(),
            maker_symbol: "BTCUSDT".into(),
            follow_exchange: "binance_spot".into(),
            follow_symbol: "btcusdt".into(),
            price_decimals: 2,
            qty_decimals: 5,
            term_type: BizType::Spot,
            position_side: PositionSide::None,
            near_side: crate::config::SideSelect::Both,
            near_ask_size: 2,
            near_bid_size: 2,
            near_qty_multiplier: 1.0,
            near_sell_price_margin: 1.0,
            near_buy_price_margin: 1.0,
            near_max_amt_per_order: 1_000_000.0,
            near_interval: 1.0,
            near_tif: TimeInForce::Gtc,
            near_diff_rate_per_round: 5.0,
            force_refresh_num: 20,
            far_side: None,
            far_ask_size: 0,
            far_bid_size: 0,
            far_qty_multiplier: 1.0,
            far_sell_price_margin: 0.0,
            far_buy_price_margin: 0.0,
            far_max_amt_per_order: 0.0,
            far_strategy: None,
            far_interval: None,
            far_tif: None,
        }
    }
}
