use crate::types::{Fill, Portfolio, Position, Side};

/// Apply a fill to the portfolio's per-market position, following the
/// usual weighted-average-cost accounting: fills that add to an existing
/// position update `avg_price` by notional-weighted average; fills that
/// reduce or flip a position book realized P&L on the closed quantity
/// and, when the position flips sign, restart `avg_price`/`opened_ts` at
/// the fill that caused the flip.
pub fn apply_fill(portfolio: &mut Portfolio, fill: &Fill) {
    let pos = portfolio
        .positions
        .entry(fill.market_id.clone())
        .or_insert_with(|| Position {
            market_id: fill.market_id.clone(),
            ..Default::default()
        });

    let signed_qty = match fill.side {
        Side::Buy => fill.size,
        Side::Sell => -fill.size,
    };

    if pos.is_flat() {
        pos.qty = signed_qty;
        pos.avg_price = fill.price;
        pos.opened_ts = Some(fill.ts);
        return;
    }

    let same_direction = pos.qty.signum() == signed_qty.signum();

    if same_direction {
        let new_qty = pos.qty + signed_qty;
        let notional = pos.avg_price * pos.qty.abs() + fill.price * fill.size;
        pos.avg_price = notional / new_qty.abs();
        pos.qty = new_qty;
        return;
    }

    let closing_qty = signed_qty.abs().min(pos.qty.abs());
    let realized = if pos.qty > 0.0 {
        (fill.price - pos.avg_price) * closing_qty
    } else {
        (pos.avg_price - fill.price) * closing_qty
    };
    pos.realized_pnl += realized;

    let new_qty = pos.qty + signed_qty;
    if new_qty.abs() < f64::EPSILON {
        pos.qty = 0.0;
        pos.avg_price = 0.0;
        pos.opened_ts = None;
    } else if new_qty.signum() != pos.qty.signum() {
        pos.qty = new_qty;
        pos.avg_price = fill.price;
        pos.opened_ts = Some(fill.ts);
    } else {
        pos.qty = new_qty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FillMeta, FillModel};

    fn fill(market_id: &str, side: Side, price: f64, size: f64, ts: i64) -> Fill {
        Fill {
            fill_id: 1,
            order_id: 1,
            market_id: market_id.to_string(),
            side,
            price,
            size,
            ts,
            meta: FillMeta {
                fill_model: FillModel::OnBookCross,
                detail: None,
            },
        }
    }

    /// Scenario: opening fill on a flat position.
    /// Expected: qty/avg_price/opened_ts take the fill's values verbatim.
    #[test]
    fn opening_fill_sets_qty_avg_price_and_opened_ts() {
        let mut portfolio = Portfolio::default();
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.40, 10.0, 1_000));
        let pos = portfolio.position("m1").unwrap();
        assert_eq!(pos.qty, 10.0);
        assert_eq!(pos.avg_price, 0.40);
        assert_eq!(pos.opened_ts, Some(1_000));
        assert_eq!(pos.realized_pnl, 0.0);
    }

    /// Scenario: two same-direction buys at different prices.
    /// Expected: avg_price is the notional-weighted average, qty sums.
    #[test]
    fn adding_to_position_updates_weighted_average_price() {
        let mut portfolio = Portfolio::default();
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.40, 10.0, 1_000));
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.60, 10.0, 2_000));
        let pos = portfolio.position("m1").unwrap();
        assert_eq!(pos.qty, 20.0);
        assert!((pos.avg_price - 0.50).abs() < 1e-9);
        assert_eq!(pos.opened_ts, Some(1_000));
    }

    /// Scenario: partial reduce of a long position at a gain.
    /// Expected: realized_pnl books the gain on the closed qty only,
    /// avg_price is unchanged, position stays long.
    #[test]
    fn partial_reduce_books_realized_pnl_without_moving_avg_price() {
        let mut portfolio = Portfolio::default();
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.40, 10.0, 1_000));
        apply_fill(&mut portfolio, &fill("m1", Side::Sell, 0.55, 4.0, 2_000));
        let pos = portfolio.position("m1").unwrap();
        assert_eq!(pos.qty, 6.0);
        assert_eq!(pos.avg_price, 0.40);
        assert!((pos.realized_pnl - 0.60).abs() < 1e-9);
        assert_eq!(pos.opened_ts, Some(1_000));
    }

    /// Scenario: a sell that more than closes a long position.
    /// Expected: realized_pnl books against the full closing qty, the
    /// position flips short, and avg_price/opened_ts restart at the
    /// flipping fill.
    #[test]
    fn flip_through_zero_restarts_avg_price_and_opened_ts() {
        let mut portfolio = Portfolio::default();
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.40, 10.0, 1_000));
        apply_fill(&mut portfolio, &fill("m1", Side::Sell, 0.50, 15.0, 2_000));
        let pos = portfolio.position("m1").unwrap();
        assert_eq!(pos.qty, -5.0);
        assert_eq!(pos.avg_price, 0.50);
        assert_eq!(pos.opened_ts, Some(2_000));
        assert!((pos.realized_pnl - 1.0).abs() < 1e-9);
    }

    /// Scenario: a sell that exactly flattens a long position.
    /// Expected: qty is zero and opened_ts resets to None.
    #[test]
    fn exact_close_flattens_position() {
        let mut portfolio = Portfolio::default();
        apply_fill(&mut portfolio, &fill("m1", Side::Buy, 0.40, 10.0, 1_000));
        apply_fill(&mut portfolio, &fill("m1", Side::Sell, 0.45, 10.0, 2_000));
        let pos = portfolio.position("m1").unwrap();
        assert!(pos.is_flat());
        assert_eq!(pos.avg_price, 0.0);
        assert_eq!(pos.opened_ts, None);
        assert!((pos.realized_pnl - 0.5).abs() < 1e-9);
    }
}
