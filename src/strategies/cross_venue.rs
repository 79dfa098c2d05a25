use std::collections::HashMap;

use crate::pricing::apply_buffers;
use crate::types::{Side, TopOfBook};

use super::QuoteIntent;

#[derive(Clone, Debug)]
pub struct CrossVenueConfig {
    pub fees_bps: f64,
    pub slippage_bps: f64,
    pub latency_bps: f64,
    pub min_edge: f64,
    pub size: f64,
    pub cooldown_ms: i64,
}

impl Default for CrossVenueConfig {
    fn default() -> Self {
        Self {
            fees_bps: 50.0,
            slippage_bps: 10.0,
            latency_bps: 10.0,
            min_edge: 0.01,
            size: 10.0,
            cooldown_ms: 5_000,
        }
    }
}

/// Takes liquidity when an external fair-value source disagrees with the
/// book by more than the buffered-cost edge, at most once per cooldown
/// window per market.
pub struct CrossVenueTaker {
    pub cfg: CrossVenueConfig,
    last_trade_ts: HashMap<String, i64>,
}

impl CrossVenueTaker {
    pub fn new(cfg: CrossVenueConfig) -> Self {
        Self {
            cfg,
            last_trade_ts: HashMap::new(),
        }
    }

    pub fn record_trade(&mut self, market_id: &str, ts: i64) {
        self.last_trade_ts.insert(market_id.to_string(), ts);
    }

    fn cooldown_elapsed(&self, market_id: &str, now_ms: i64) -> bool {
        match self.last_trade_ts.get(market_id) {
            Some(last) => now_ms - last >= self.cfg.cooldown_ms,
            None => true,
        }
    }

    pub fn evaluate(
        &self,
        market_id: &str,
        tob: &TopOfBook,
        fair: f64,
        now_ms: i64,
    ) -> Option<QuoteIntent> {
        if !self.cooldown_elapsed(market_id, now_ms) {
            return None;
        }
        let (best_bid, best_ask) = (tob.best_bid?, tob.best_ask?);

        let buy_fair = apply_buffers(fair, self.cfg.fees_bps, self.cfg.slippage_bps, self.cfg.latency_bps, Side::Buy);
        let sell_fair = apply_buffers(fair, self.cfg.fees_bps, self.cfg.slippage_bps, self.cfg.latency_bps, Side::Sell);

        let edge_buy = buy_fair - best_ask;
        let edge_sell = best_bid - sell_fair;

        if edge_buy > self.cfg.min_edge && edge_buy >= edge_sell {
            return Some(QuoteIntent {
                market_id: market_id.to_string(),
                side: Side::Buy,
                price: best_ask,
                size: self.cfg.size,
                reduce_only: false,
                strategy: "cross_venue",
            });
        }
        if edge_sell > self.cfg.min_edge {
            return Some(QuoteIntent {
                market_id: market_id.to_string(),
                side: Side::Sell,
                price: best_bid,
                size: self.cfg.size,
                reduce_only: false,
                strategy: "cross_venue",
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tob(bid: f64, ask: f64) -> TopOfBook {
        TopOfBook {
            best_bid: Some(bid),
            best_bid_size: Some(10.0),
            best_ask: Some(ask),
            best_ask_size: Some(10.0),
            ts: 0,
        }
    }

    /// Scenario: external fair value well above the ask, edge exceeds
    /// buffered costs.
    /// Expected: the strategy takes the ask with a buy.
    #[test]
    fn buys_ask_when_fair_value_exceeds_it_past_buffers() {
        let taker = CrossVenueTaker::new(CrossVenueConfig::default());
        let tob = tob(0.40, 0.45);
        let intent = taker.evaluate("m1", &tob, 0.60, 1_000).unwrap();
        assert_eq!(intent.side, Side::Buy);
        assert_eq!(intent.price, 0.45);
    }

    /// Scenario: a trade was just recorded for this market.
    /// Expected: no new trade fires until the cooldown elapses.
    #[test]
    fn cooldown_suppresses_repeat_trades() {
        let mut taker = CrossVenueTaker::new(CrossVenueConfig::default());
        taker.record_trade("m1", 1_000);
        let tob = tob(0.40, 0.45);
        assert!(taker.evaluate("m1", &tob, 0.60, 1_500).is_none());
        assert!(taker.evaluate("m1", &tob, 0.60, 6_001).is_some());
    }

    /// Scenario: fair value sits inside the buffered no-trade band.
    /// Expected: no trade is signaled.
    #[test]
    fn no_trade_when_edge_is_within_buffers() {
        let taker = CrossVenueTaker::new(CrossVenueConfig::default());
        let tob = tob(0.495, 0.505);
        assert!(taker.evaluate("m1", &tob, 0.50, 1_000).is_none());
    }

    /// Scenario: the book is one-sided (no resting bid).
    /// Expected: no trade is signaled even with a large external edge.
    #[test]
    fn missing_tob_side_suppresses_trade() {
        let taker = CrossVenueTaker::new(CrossVenueConfig::default());
        let tob = TopOfBook {
            best_bid: None,
            best_bid_size: None,
            best_ask: Some(0.45),
            best_ask_size: Some(10.0),
            ts: 0,
        };
        assert!(taker.evaluate("m1", &tob, 0.60, 1_000).is_none());
    }
}
