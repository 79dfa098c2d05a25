use crate::types::Side;

/// Clamp `x` into `[lo, hi]`.
pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// American odds to implied probability.
pub fn american_to_prob(odds: f64) -> f64 {
    if odds >= 0.0 {
        100.0 / (odds + 100.0)
    } else {
        (-odds) / (-odds + 100.0)
    }
}

/// Decimal odds to implied probability.
pub fn decimal_to_prob(decimal_odds: f64) -> f64 {
    if decimal_odds <= 0.0 {
        0.0
    } else {
        1.0 / decimal_odds
    }
}

/// Binary-market probabilities and prices are the same clamped [0,1]
/// quantity; these two are kept distinct so call sites read intent.
pub fn prob_to_price(p: f64) -> f64 {
    clamp(p, 0.0, 1.0)
}

pub fn price_to_prob(price: f64) -> f64 {
    clamp(price, 0.0, 1.0)
}

pub fn bps_to_decimal(bps: f64) -> f64 {
    bps / 10_000.0
}

/// Apply fee/slippage/latency buffers (all in bps) to a reference price,
/// pushing the executable price against the trader: down for a buy,
/// up for a sell. Result is clamped back into `[0, 1]`.
pub fn apply_buffers(price: f64, fees_bps: f64, slippage_bps: f64, latency_bps: f64, side: Side) -> f64 {
    let buf = bps_to_decimal(fees_bps + slippage_bps + latency_bps);
    match side {
        Side::Buy => clamp(price - buf, 0.0, 1.0),
        Side::Sell => clamp(price + buf, 0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_bounds_input_into_range() {
        assert_eq!(clamp(1.5, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-0.5, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.4, 0.0, 1.0), 0.4);
    }

    #[test]
    fn apply_buffers_pushes_buy_price_down_and_sell_price_up() {
        let buy = apply_buffers(0.50, 50.0, 20.0, 10.0, Side::Buy);
        let sell = apply_buffers(0.50, 50.0, 20.0, 10.0, Side::Sell);
        assert!(buy < 0.50);
        assert!(sell > 0.50);
        assert!((buy - 0.492).abs() < 1e-9);
        assert!((sell - 0.508).abs() < 1e-9);
    }

    #[test]
    fn apply_buffers_clamps_at_bounds() {
        let sell = apply_buffers(0.999, 500.0, 500.0, 500.0, Side::Sell);
        assert_eq!(sell, 1.0);
        let buy = apply_buffers(0.001, 500.0, 500.0, 500.0, Side::Buy);
        assert_eq!(buy, 0.0);
    }
}
