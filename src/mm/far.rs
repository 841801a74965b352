//! Far-end liquidity generation: a second, wider ladder refreshed on its own
//! (usually slower) cadence. Grounded in `maker_libs.py`'s
//! `gen_far_liquidity` / `_spread_far` / `_gen_*_orders_far`.

use rand::Rng;

use crate::config::{FarStrategy, MmTokenConfig};
use crate::models::{Level, NewOrder, Side};

use super::{calc_maker_qty, gen_client_order_id};

/// One far-liquidity pass for a single side. `guard_price` is the near-end
/// top price on the opposite side; orders crossing it are dropped inline
/// during generation rather than filtered afterwards, matching the
/// original's `if price < guard_price: orders.append(...)` structure.
pub fn gen_far_liquidity(
    symbol: &str,
    cfg: &MmTokenConfig,
    near_asks: &[Level],
    near_bids: &[Level],
    side: Side,
    guard_price: f64,
    clorder_start: i64,
) -> Vec<NewOrder> {
    let mut offset = (now_millis_mod_day()) as i64;
    let tif = cfg.far_tif.unwrap_or(crate::models::TimeInForce::Gtc);
    let mut orders = Vec::new();

    match side {
        Side::Buy => {
            for level in spread_far(near_bids, cfg, Side::Buy) {
                if level.price < guard_price {
                    orders.push(NewOrder::limit(
                        symbol,
                        gen_client_order_id(&format!("B{symbol}"), clorder_start, offset, true),
                        Side::Buy,
                        level.qty,
                        level.price,
                        cfg.term_type,
                        tif,
                        cfg.position_side,
                    ));
                    offset += 1;
                }
            }
        }
        Side::Sell => {
            for level in spread_far(near_asks, cfg, Side::Sell) {
                if level.price > guard_price {
                    orders.push(NewOrder::limit(
                        symbol,
                        gen_client_order_id(&format!("S{symbol}"), clorder_start, offset, true),
                        Side::Sell,
                        level.qty,
                        level.price,
                        cfg.term_type,
                        tif,
                        cfg.position_side,
                    ));
                    offset += 1;
                }
            }
        }
    }
    orders
}

fn now_millis_mod_day() -> u64 {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    (dur.as_millis() as u64) % 8_640_000
}

/// `spread_far`: walk the base price outward by `far_*_price_margin` bps per
/// step, drawing a random quantity from the near-end book each time. Only
/// the `Spread` strategy is implemented; anything else yields no far orders.
fn spread_far(near_book: &[Level], cfg: &MmTokenConfig, side: Side) -> Vec<Level> {
    if near_book.is_empty() {
        return Vec::new();
    }
    if !matches!(cfg.far_strategy, Some(FarStrategy::Spread)) {
        return Vec::new();
    }

    let (price_coef, max_size, max_amt) = match side {
        Side::Sell => (1.0 + 0.0001 * cfg.far_sell_price_margin, cfg.far_ask_size, cfg.far_max_amt_per_order),
        Side::Buy => (1.0 - 0.0001 * cfg.far_buy_price_margin, cfg.far_bid_size, cfg.far_max_amt_per_order),
    };

    let mut base_price = near_book[0].price;
    let qtys: Vec<f64> = near_book.iter().map(|l| l.qty).collect();
    let qty_size = qtys.len();
    let mut rng = rand::thread_rng();
    let mut out = Vec::with_capacity(max_size);

    for _ in 0..max_size {
        base_price *= price_coef;
        let rand_idx = rng.gen_range(0..qty_size);
        let qty = qtys[rand_idx] * (0.95 + rand_idx as f64 * 0.05 / qty_size as f64);

        let order_price = round_to(base_price, cfg.price_decimals);
        let order_qty = calc_maker_qty(order_price, qty * cfg.far_qty_multiplier, max_amt, cfg.qty_decimals);
        if order_qty > 0.0 {
            out.push(Level::new(order_price, order_qty));
        }
    }
    out
}

fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        value.trunc()
    } else {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SideSelect;
    use crate::models::{BizType, PositionSide, TimeInForce};

    fn base_cfg() -> MmTokenConfig {
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
            near_side: SideSelect::Both,
            near_ask_size: 5,
            near_bid_size: 5,
            near_qty_multiplier: 1.0,
            near_sell_price_margin: 1.0,
            near_buy_price_margin: 1.0,
            near_max_amt_per_order: 1000.0,
            near_interval: 1.0,
            near_tif: TimeInForce::Gtc,
            near_diff_rate_per_round: 5.0,
            force_refresh_num: 20,
            far_side: Some(SideSelect::Both),
            far_ask_size: 3,
            far_bid_size: 3,
            far_qty_multiplier: 1.0,
            far_sell_price_margin: 10.0,
            far_buy_price_margin: 10.0,
            far_max_amt_per_order: 1000.0,
            far_strategy: Some(FarStrategy::Spread),
            far_interval: Some(5.0),
            far_tif: Some(TimeInForce::Gtc),
        }
    }

    #[test]
    fn far_orders_respect_guard_price_on_buy_side() {
        let cfg = base_cfg();
        let near_bids = vec![Level::new(100.0, 1.0), Level::new(99.5, 2.0)];
        let orders = gen_far_liquidity("BTCUSDT", &cfg, &[], &near_bids, Side::Buy, 50.0, 19_000);
        // guard_price of 50 is far below any spread-far bid price, so every generated
        // order should be dropped rather than crossing it.
        assert!(orders.is_empty());
    }

    #[test]
    fn far_orders_generated_when_within_guard() {
        let cfg = base_cfg();
        let near_bids = vec![Level::new(100.0, 1.0), Level::new(99.5, 2.0)];
        let orders = gen_far_liquidity("BTCUSDT", &cfg, &[], &near_bids, Side::Buy, 1_000_000.0, 19_000);
        assert_eq!(orders.len(), cfg.far_bid_size);
        assert!(orders.iter().all(|o| o.client_id.starts_with("F0BBTCUSDT_")));
    }

    #[test]
    fn unsupported_strategy_yields_no_far_orders() {
        let mut cfg = base_cfg();
        cfg.far_strategy = Some(FarStrategy::Unsupported);
        let near_asks = vec![Level::new(101.0, 1.0)];
        let orders = gen_far_liquidity("BTCUSDT", &cfg, &near_asks, &[], Side::Sell, 0.0, 19_000);
        assert!(orders.is_empty());
    }
}
