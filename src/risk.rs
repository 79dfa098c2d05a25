use std::collections::HashMap;

use crate::pricing::clamp;
use crate::types::{MarketInfo, Order, Portfolio, Side, TopOfBook};

#[derive(Clone, Debug)]
pub struct RiskConfig {
    pub max_pos_per_market: f64,
    pub max_open_positions: usize,
    pub max_event_exposure: f64,
    pub daily_loss_limit: f64,
    pub max_feed_lag_ms: i64,
    pub max_spread: f64,
    pub kill_switch: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_pos_per_market: 100.0,
            max_open_positions: 10,
            max_event_exposure: 250.0,
            daily_loss_limit: 500.0,
            max_feed_lag_ms: 5_000,
            max_spread: 0.15,
            kill_switch: false,
        }
    }
}

/// Result of a pricing/risk check: pricing and risk never raise, they
/// return a reason code matching the literal strings named by the
/// engine's error taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiskCheck {
    pub ok: bool,
    pub reason: Option<&'static str>,
}

impl RiskCheck {
    pub fn pass() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn reject(reason: &'static str) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
        }
    }
}

/// Market-open circuit breaker: feed staleness always applies; a crossed
/// book or a spread blown out past `max_spread` only apply when both
/// book sides are present (a one-sided book has no spread to blow out).
pub fn circuit_ok(tob: Option<&TopOfBook>, now_ms: i64, cfg: &RiskConfig) -> RiskCheck {
    let Some(tob) = tob else {
        return RiskCheck::reject("no_top_of_book");
    };
    if now_ms - tob.ts > cfg.max_feed_lag_ms {
        return RiskCheck::reject("feed_lag");
    }
    if let (Some(bid), Some(ask)) = (tob.best_bid, tob.best_ask) {
        if ask < bid {
            return RiskCheck::reject("crossed_book");
        }
        if ask - bid > cfg.max_spread {
            return RiskCheck::reject("spread_too_wide");
        }
    }
    RiskCheck::pass()
}

/// Stateful risk engine. Holds the kill switch and a rate limit on
/// repeated rejection logging; everything else is evaluated fresh
/// against the portfolio/market snapshot passed into `pre_trade_check`.
pub struct RiskEngine {
    cfg: RiskConfig,
    kill_switch: bool,
    last_reject_log: HashMap<(String, &'static str), i64>,
}

impl RiskEngine {
    pub fn new(cfg: RiskConfig) -> Self {
        let kill_switch = cfg.kill_switch;
        Self {
            cfg,
            kill_switch,
            last_reject_log: HashMap::new(),
        }
    }

    pub fn trigger_kill_switch(&mut self) {
        self.kill_switch = true;
    }

    pub fn clear_kill_switch(&mut self) {
        self.kill_switch = false;
    }

    pub fn is_halted(&self) -> bool {
        self.kill_switch
    }

    /// Returns whether a repeated rejection reason for this market should
    /// be logged again, rate-limited to once per 5s per (market, reason).
    pub fn should_log_rejection(&mut self, market_id: &str, reason: &'static str, now_ms: i64) -> bool {
        let key = (market_id.to_string(), reason);
        match self.last_reject_log.get(&key) {
            Some(last) if now_ms - last < 5_000 => false,
            _ => {
                self.last_reject_log.insert(key, now_ms);
                true
            }
        }
    }

    /// Eight ordered gates, evaluated in sequence; the first rejection
    /// wins: bad_size, bad_price, circuit, max_open_positions,
    /// kill_switch, max_pos_per_market, event_exposure, daily_loss.
    /// `reduce_only` orders bypass max_open_positions, kill_switch, and
    /// max_pos_per_market -- they can only shrink exposure, so blocking
    /// them defeats their purpose as a de-risking path. event_exposure
    /// and daily_loss are never bypassed.
    pub fn pre_trade_check(
        &mut self,
        order: &Order,
        market: &MarketInfo,
        tob: Option<&TopOfBook>,
        portfolio: &Portfolio,
        open_position_count: usize,
        event_exposure: &HashMap<String, f64>,
        now_ms: i64,
    ) -> RiskCheck {
        if order.size <= 0.0 {
            return RiskCheck::reject("bad_size");
        }
        if !(0.0..=1.0).contains(&order.price) {
            return RiskCheck::reject("bad_price");
        }

        let circuit = circuit_ok(tob, now_ms, &self.cfg);
        if !circuit.ok {
            return circuit;
        }

        if !order.reduce_only {
            let opens_new_position = portfolio
                .position(&order.market_id)
                .map(|p| p.is_flat())
                .unwrap_or(true);
            if opens_new_position && open_position_count >= self.cfg.max_open_positions {
                return RiskCheck::reject("max_open_positions");
            }

            if self.kill_switch {
                return RiskCheck::reject("kill_switch");
            }

            let current_qty = portfolio
                .position(&order.market_id)
                .map(|p| p.qty)
                .unwrap_or(0.0);
            let signed = match order.side {
                Side::Buy => order.size,
                Side::Sell => -order.size,
            };
            if (current_qty + signed).abs() > self.cfg.max_pos_per_market {
                return RiskCheck::reject("max_pos_per_market");
            }
        }

        let existing = event_exposure.get(&market.event_id).copied().unwrap_or(0.0);
        let added = order.size * clamp(order.price, 0.0, 1.0);
        if existing + added > self.cfg.max_event_exposure {
            return RiskCheck::reject("max_event_exposure");
        }

        let total_pnl = portfolio.total_realized() + portfolio.total_unrealized_at_last_mark();
        if total_pnl < -self.cfg.daily_loss_limit {
            return RiskCheck::reject("daily_loss_limit");
        }

        RiskCheck::pass()
    }
}
