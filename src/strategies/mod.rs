mod cross_venue;
mod market_maker;

pub use cross_venue::{CrossVenueConfig, CrossVenueTaker};
pub use market_maker::{MarketMaker, MarketMakerConfig};

use crate::types::Side;

/// An order a strategy wants placed. Risk-checked and routed to the
/// broker by the engine; strategies never talk to the broker directly.
#[derive(Clone, Debug)]
pub struct QuoteIntent {
    pub market_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub reduce_only: bool,
    pub strategy: &'static str,
}

/// Rounds down to the nearest tick multiple, for bid prices -- a bid
/// never overpays relative to its intended level.
pub fn round_to_tick_floor(price: f64, tick: f64) -> f64 {
    (price / tick).floor() * tick
}

/// Rounds up to the nearest tick multiple, for ask prices -- an ask
/// never underprices relative to its intended level.
pub fn round_to_tick_ceil(price: f64, tick: f64) -> f64 {
    (price / tick).ceil() * tick
}

#[cfg(test)]
mod tick_tests {
    use super::*;

    #[test]
    fn round_to_tick_floor_rounds_down() {
        assert!((round_to_tick_floor(0.4567, 0.001) - 0.456).abs() < 1e-9);
        assert!((round_to_tick_floor(0.4560, 0.001) - 0.456).abs() < 1e-9);
    }

    #[test]
    fn round_to_tick_ceil_rounds_up() {
        assert!((round_to_tick_ceil(0.4563, 0.001) - 0.457).abs() < 1e-9);
        assert!((round_to_tick_ceil(0.4560, 0.001) - 0.456).abs() < 1e-9);
    }
}
