use crate::pricing::clamp;
use crate::types::{Order, Side, TopOfBook};

use super::{round_to_tick_ceil, round_to_tick_floor, QuoteIntent};

#[derive(Clone, Debug)]
pub struct MarketMakerConfig {
    pub quote_width: f64,
    pub inventory_skew: f64,
    pub max_pos: f64,
    pub tick: f64,
    pub min_life_ms: i64,
    pub reprice_threshold: f64,
    pub join_touch: bool,
    pub size: f64,
    pub disallow_mock_data: bool,
}

impl Default for MarketMakerConfig {
    fn default() -> Self {
        Self {
            quote_width: 0.02,
            inventory_skew: 0.5,
            max_pos: 100.0,
            tick: 0.001,
            min_life_ms: 2_000,
            reprice_threshold: 0.005,
            join_touch: true,
            size: 10.0,
            disallow_mock_data: false,
        }
    }
}

/// Two-sided quoting strategy: prices around a fair value, skewed away
/// from existing inventory, optionally joining the touch for priority.
pub struct MarketMaker {
    pub cfg: MarketMakerConfig,
}

impl MarketMaker {
    pub fn new(cfg: MarketMakerConfig) -> Self {
        Self { cfg }
    }

    /// Picks the reference fair value: an external quote unless it is
    /// mock data and mock data is disallowed, in which case the book
    /// mid is used instead. `None` if neither source is available (no
    /// external quote and a one-sided or absent book).
    pub fn fair_value(&self, tob: &TopOfBook, external: Option<(f64, &'static str)>) -> Option<(f64, &'static str)> {
        if let Some((fv, source)) = external {
            if !(self.cfg.disallow_mock_data && source == "mock") {
                return Some((fv, source));
            }
        }
        tob.mid().map(|m| (m, "book_mid"))
    }

    /// Computes the desired bid/ask, already tick-rounded (bid floored,
    /// ask ceiled), clamped to `[tick, 1-tick]`. Returns `None` if either
    /// book side is missing or the computed quotes would cross.
    pub fn desired_quotes(&self, fair: f64, tob: &TopOfBook, position_qty: f64) -> Option<(f64, f64)> {
        let best_bid = tob.best_bid?;
        let best_ask = tob.best_ask?;
        let tick = self.cfg.tick;

        let spread = best_ask - best_bid;
        let width_cap = self.cfg.quote_width.max(2.0 * tick);
        let width = width_cap.min((spread + 2.0 * tick).max(6.0 * tick));

        let inv_frac = clamp(position_qty / self.cfg.max_pos, -1.0, 1.0);
        let skew = -inv_frac * self.cfg.inventory_skew * width;

        let mut bid = fair + skew - width / 2.0;
        let mut ask = fair + skew + width / 2.0;

        if self.cfg.join_touch {
            // Join the bid touch unless already overly long; join the ask
            // touch unless already overly short.
            if inv_frac < 1.0 {
                bid = bid.max(best_bid);
            }
            if inv_frac > -1.0 {
                ask = ask.min(best_ask);
            }
        }

        let lo = tick;
        let hi = 1.0 - tick;
        bid = round_to_tick_floor(clamp(bid, lo, hi), tick);
        ask = round_to_tick_ceil(clamp(ask, lo, hi), tick);

        if bid >= ask {
            return None;
        }

        Some((bid, ask))
    }

    /// Whether a resting order for one side should be replaced by a
    /// freshly computed quote: either it has lived past `min_life_ms` or
    /// the desired price has moved more than `reprice_threshold` away.
    pub fn should_replace(&self, existing: &Order, desired_price: f64, now_ms: i64) -> bool {
        let age_ms = now_ms - existing.created_ts;
        age_ms >= self.cfg.min_life_ms || (existing.price - desired_price).abs() >= self.cfg.reprice_threshold
    }

    pub fn quote_intents(&self, market_id: &str, bid: f64, ask: f64) -> (QuoteIntent, QuoteIntent) {
        (
            QuoteIntent {
                market_id: market_id.to_string(),
                side: Side::Buy,
                price: bid,
                size: self.cfg.size,
                reduce_only: false,
                strategy: "market_maker",
            },
            QuoteIntent {
                market_id: market_id.to_string(),
                side: Side::Sell,
                price: ask,
                size: self.cfg.size,
                reduce_only: false,
                strategy: "market_maker",
            },
        )
    }
}
