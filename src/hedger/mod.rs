//! Hedger: turns maker fills into risk positions, nets them per symbol, and
//! works them off against the hedge venue on a bounded worker pool.
//! Grounded in `hedger/hedger_main.py`'s `HedgerAgent`.

pub mod private_ws;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::HedgerConfig;
use crate::models::{BizType, FilledOrder, NewOrder, PositionSide, RiskPosition, Side, TimeInForce};
use crate::venue::VenueClient;

/// How long a deduplicated trade id is retained before being forgotten.
/// `hedger_main.py`'s `_remove_trade_id` calls this "2 hours ago".
const TRADE_ID_TTL_SECS: f64 = 7_200.0;

const MAX_CONCURRENT_HEDGES: usize = 10;

fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

struct HedgeTask {
    symbol: String,
    handle: JoinHandle<Option<String>>,
}

/// Everything the hedger remembers between ticks: open risk, trade dedup,
/// and in-flight hedge submissions.
pub struct HedgerEngine {
    risk_positions: HashMap<String, RiskPosition>,
    trade_ids: HashMap<String, f64>,
    hedge_tasks: HashMap<i64, HedgeTask>,
    hedge_semaphore: Arc<Semaphore>,
}

impl Default for HedgerEngine {
    fn default() -> Self {
        Self {
            risk_positions: HashMap::new(),
            trade_ids: HashMap::new(),
            hedge_tasks: HashMap::new(),
            hedge_semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_HEDGES)),
        }
    }
}

impl HedgerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn risk_position_count(&self) -> usize {
        self.risk_positions.len()
    }

    pub fn unfinished_hedge_count(&self) -> usize {
        self.hedge_tasks.len()
    }

    /// Accumulate a maker fill into the risk position for its maker order
    /// id. Trade ids are deduplicated silently (matches `handle_trade_filled`
    /// dropping repeats with no log).
    pub fn handle_trade_filled(&mut self, fill: FilledOrder) {
        if fill.trade_id.is_empty() {
            error!(target: "hedger::monitor", "cannot get trade id from fill");
            return;
        }
        if self.trade_ids.contains_key(&fill.trade_id) {
            return;
        }
        self.trade_ids.insert(fill.trade_id.clone(), now_secs());

        if fill.qty <= 0.0 || fill.amount <= 0.0 {
            error!(target: "hedger::monitor", trade_id = %fill.trade_id, "invalid trade data");
            return;
        }

        let avg_price = (fill.amount / fill.qty * 1e8).round() / 1e8;
        info!(
            target: "hedger::monitor",
            symbol = %fill.symbol,
            order_id = %fill.order_id,
            trade_id = %fill.trade_id,
            side = ?fill.side,
            price = avg_price,
            qty = fill.qty,
            total_amt = fill.amount,
            "user ws fill"
        );

        let order_id = fill.order_id.clone();
        let entry = self.risk_positions.entry(order_id).or_insert_with(|| RiskPosition {
            symbol: fill.symbol.clone(),
            side: fill.side,
            qty: 0.0,
            total_amt: 0.0,
            hedged_qty: 0.0,
            hedged_amt: 0.0,
            created_ts: now_secs(),
            fills: HashMap::new(),
        });
        entry.qty += fill.qty;
        entry.total_amt += fill.amount;
        entry.fills.insert(fill.trade_id.clone(), fill);
    }

    /// One instruction to place against the hedge venue: net quantity/amount
    /// across every maker order id contributing to it.
    fn accumulate_risk(&mut self, cfg: &HedgerConfig) -> Vec<(i64, Side, f64, f64)> {
        struct Acc {
            qty: f64,
            amt: f64,
            order_ids: Vec<String>,
        }

        let mut acc: HashMap<String, Acc> = HashMap::new();
        for order_id in self.risk_positions.keys().cloned().collect::<Vec<_>>() {
            let position = self.risk_positions.get(&order_id).unwrap();
            if position.is_fully_hedged() {
                self.risk_positions.remove(&order_id);
                continue;
            }
            let hedge_qty = position.qty - position.hedged_qty;
            let hedge_amt = position.total_amt - position.hedged_amt;
            let entry = acc.entry(position.symbol.clone()).or_insert(Acc {
                qty: 0.0,
                amt: 0.0,
                order_ids: Vec::new(),
            });
            entry.order_ids.push(order_id.clone());
            match position.side {
                Side::Buy => {
                    entry.qty += hedge_qty;
                    entry.amt += hedge_amt;
                }
                Side::Sell => {
                    entry.qty -= hedge_qty;
                    entry.amt -= hedge_amt;
                }
            }
        }

        let mut instructions = Vec::new();
        for (symbol, group) in acc {
            if group.amt.abs() < cfg.min_amt_per_order || group.qty.abs() < cfg.min_qty_per_order {
                continue;
            }

            // Mark these maker orders fully hedged before the hedge order is
            // even submitted -- this can under-hedge if the submission later
            // fails, but matches the original ordering exactly.
            for order_id in &group.order_ids {
                if let Some(p) = self.risk_positions.get_mut(order_id) {
                    p.hedged_qty = p.qty;
                    p.hedged_amt = p.total_amt;
                }
            }

            if group.qty == 0.0 {
                info!(target: "hedger::monitor", %symbol, "self-hedged, no residual position");
                continue;
            }
            let hedge_side = if group.qty > 0.0 { Side::Sell } else { Side::Buy };
            let cl_order_id = (now_secs() * 1000.0) as i64;
            let hedge_price = group.amt.abs() / group.qty.abs();
            instructions.push((cl_order_id, hedge_side, group.qty.abs(), hedge_price));
            let _ = symbol;
        }
        instructions
    }

    /// One hedger tick: net current risk, submit whatever crosses the
    /// per-order minimums, and return whether any hedge was submitted.
    pub fn handle_risk_positions(&mut self, venue: Arc<dyn VenueClient>, cfg: &HedgerConfig) -> bool {
        let instructions = self.accumulate_risk(cfg);
        if instructions.is_empty() {
            return false;
        }

        for (cl_order_id, side, qty, price) in instructions {
            info!(
                target: "hedger::monitor",
                cl_order_id,
                side = ?side,
                qty,
                symbol = %cfg.hedge_symbol,
                price,
                "pre-hedge"
            );
            let semaphore = Arc::clone(&self.hedge_semaphore);
            let venue = Arc::clone(&venue);
            let hedge_symbol = cfg.hedge_symbol.clone();
            let slippage = cfg.slippage;
            let price_decimals = cfg.price_decimals;
            let qty_decimals = cfg.qty_decimals;
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                instant_hedge(venue.as_ref(), &hedge_symbol, cl_order_id, side, qty, price, slippage, price_decimals, qty_decimals).await
            });
            self.hedge_tasks.insert(cl_order_id, HedgeTask { symbol: cfg.hedge_symbol.clone(), handle });
        }
        true
    }

    /// Poll in-flight hedge submissions without blocking; finished tasks are
    /// logged and, unless the hedge symbol is the `"manual"` sentinel,
    /// followed by an order-status lookup.
    pub async fn poll_hedge_tasks(&mut self, venue: &dyn VenueClient, hedge_symbol: &str) {
        let finished: Vec<i64> = self
            .hedge_tasks
            .iter()
            .filter(|(_, task)| task.handle.is_finished())
            .map(|(id, _)| *id)
            .collect();

        for cl_order_id in finished {
            let task = self.hedge_tasks.remove(&cl_order_id).unwrap();
            let result = task.handle.await;
            let hedge_order_id = match result {
                Ok(Some(id)) => id,
                Ok(None) => {
                    info!(target: "hedger::monitor", %cl_order_id, symbol = %task.symbol, "hedge result: empty");
                    continue;
                }
                Err(err) => {
                    warn!(target: "hedger::monitor", %cl_order_id, error = %err, "hedge task panicked");
                    continue;
                }
            };
            info!(target: "hedger::monitor", %cl_order_id, symbol = %task.symbol, %hedge_order_id, "hedge result");

            if hedge_symbol == "manual" {
                continue;
            }
            match venue.order_status(hedge_symbol, &hedge_order_id).await {
                Ok(status) if status.status.is_none() => {
                    error!(
                        target: "hedger::monitor",
                        %cl_order_id,
                        symbol = %task.symbol,
                        %hedge_order_id,
                        "order_status returned no status, venue protocol error, dropping hedge task"
                    );
                }
                Ok(status) => info!(
                    target: "hedger::monitor",
                    %cl_order_id,
                    symbol = %task.symbol,
                    status = ?status.status,
                    executed_qty = status.executed_qty,
                    "hedged"
                ),
                Err(err) => warn!(error = %err, %hedge_order_id, "order_status lookup failed"),
            }
        }
    }

    /// Drop trade ids recorded more than `TRADE_ID_TTL_SECS` ago.
    pub fn remove_stale_trade_ids(&mut self) {
        let now = now_secs();
        self.trade_ids.retain(|_, created_ts| *created_ts + TRADE_ID_TTL_SECS >= now);
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        value.trunc()
    } else {
        let factor = 10f64.powi(decimals as i32);
        (value * factor).round() / factor
    }
}

/// Pad the hedge price for a better fill probability before submitting.
/// `slippage` is clamped to `[1, 10]` bps and applied in the direction that
/// improves the chance of a fill: up for BUY, down for SELL.
#[allow(clippy::too_many_arguments)]
async fn instant_hedge(
    venue: &dyn VenueClient,
    hedge_symbol: &str,
    cl_order_id: i64,
    side: Side,
    qty: f64,
    price: f64,
    slippage: f64,
    price_decimals: u32,
    qty_decimals: u32,
) -> Option<String> {
    if hedge_symbol.is_empty() {
        error!(target: "hedger::monitor", "hedge symbol is empty");
        return None;
    }
    let slippage = slippage.clamp(1.0, 10.0);
    let padded_price = match side {
        Side::Buy => price * (1.0 + 0.01 * slippage),
        Side::Sell => price * (1.0 - 0.01 * slippage),
    };
    let price = round_to(padded_price, price_decimals);
    let qty = round_to(qty, qty_decimals);
    let order = NewOrder::limit(
        hedge_symbol,
        cl_order_id.to_string(),
        side,
        qty,
        price,
        BizType::Spot,
        TimeInForce::Gtc,
        PositionSide::None,
    );
    match venue.batch_make_orders(vec![order]).await {
        Ok(acks) => acks.into_iter().next().filter(|a| a.is_success()).map(|a| a.order_id),
        Err(err) => {
            error!(target: "hedger::monitor", error = %err, "hedge execution failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venue::MockVenueClient;

    fn cfg() -> HedgerConfig {
        HedgerConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            passphrase: String::new(),
            maker_symbol: "BTCUSDT".into(),
            hedge_symbol: "BTCUSDT".into(),
            hedge_exchange: "okx_spot".into(),
            price_decimals: 2,
            qty_decimals: 5,
            min_qty_per_order: 0.001,
            min_amt_per_order: 10.0,
            slippage: 3.0,
            version: 0,
        }
    }

    fn fill(trade_id: &str, order_id: &str, qty: f64, amount: f64) -> FilledOrder {
        FilledOrder {
            trade_id: trade_id.to_string(),
            qty,
            amount,
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_id: order_id.to_string(),
            match_time: 0.0,
        }
    }

    #[test]
    fn duplicate_trade_id_is_dropped() {
        let mut engine = HedgerEngine::new();
        engine.handle_trade_filled(fill("t1", "o1", 0.01, 300.0));
        engine.handle_trade_filled(fill("t1", "o1", 0.01, 300.0));
        assert_eq!(engine.risk_positions.get("o1").unwrap().qty, 0.01);
    }

    #[test]
    fn partial_fills_accumulate_and_recompute_average_price() {
        let mut engine = HedgerEngine::new();
        engine.handle_trade_filled(fill("t1", "o1", 1.0, 30_000.0));
        engine.handle_trade_filled(fill("t2", "o1", 0.3, 9_003.0));
        let pos = engine.risk_positions.get("o1").unwrap();
        assert!((pos.price() - 30_002.307_692_307_7).abs() < 1e-6);
    }

    #[test]
    fn below_minimum_net_position_is_not_hedged() {
        let mut engine = HedgerEngine::new();
        engine.handle_trade_filled(fill("t1", "o1", 0.0001, 3.0));
        let instructions = engine.accumulate_risk(&cfg());
        assert!(instructions.is_empty());
        // below-threshold positions stay un-marked so they can accumulate further fills.
        assert!(!engine.risk_positions.get("o1").unwrap().is_fully_hedged());
    }

    #[test]
    fn marks_hedged_before_submission_even_if_never_submitted() {
        let mut engine = HedgerEngine::new();
        engine.handle_trade_filled(fill("t1", "o1", 1.0, 30_000.0));
        let instructions = engine.accumulate_risk(&cfg());
        assert_eq!(instructions.len(), 1);
        // the position is marked fully hedged as soon as it crosses the
        // threshold, before the hedge order is ever placed.
        assert!(engine.risk_positions.get("o1").unwrap().is_fully_hedged());
    }

    #[tokio::test]
    async fn hedge_instruction_submits_and_resolves() {
        let mut engine = HedgerEngine::new();
        engine.handle_trade_filled(fill("t1", "o1", 1.0, 30_000.0));
        let venue: Arc<dyn VenueClient> = Arc::new(MockVenueClient::new());
        let submitted = engine.handle_risk_positions(Arc::clone(&venue), &cfg());
        assert!(submitted);
        assert_eq!(engine.unfinished_hedge_count(), 1);

        // give the spawned task a chance to run
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        engine.poll_hedge_tasks(venue.as_ref(), "BTCUSDT").await;
        assert_eq!(engine.unfinished_hedge_count(), 0);
    }

    #[test]
    fn stale_trade_ids_are_purged() {
        let mut engine = HedgerEngine::new();
        engine.trade_ids.insert("old".to_string(), now_secs() - 7_300.0);
        engine.trade_ids.insert("fresh".to_string(), now_secs());
        engine.remove_stale_trade_ids();
        assert!(!engine.trade_ids.contains_key("old"));
        assert!(engine.trade_ids.contains_key("fresh"));
    }
}
