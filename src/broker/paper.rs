use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::{EngineError, EngineResult};
use crate::types::{Fill, FillMeta, FillModel, Order, OrderStatus, Side, TopOfBook, TradeTick};

use super::{Broker, NewOrderRequest};

const TOUCH_EPS: f64 = 1e-4;

struct PaperState {
    orders: HashMap<u64, Order>,
    prev_tob: HashMap<String, TopOfBook>,
}

/// Simulated fill engine for paper trading. Owns its own order blotter
/// under a single lock; the engine never reaches into it directly, only
/// through the `Broker` trait. Configured at construction with exactly
/// one fill model and a minimum rest time before an order is eligible
/// to fill at all.
pub struct PaperBroker {
    state: Mutex<PaperState>,
    next_order_id: AtomicU64,
    next_fill_id: AtomicU64,
    fill_model: FillModel,
    min_rest_ms: i64,
}

impl PaperBroker {
    pub fn new(fill_model: FillModel, min_rest_ms: i64) -> Self {
        Self {
            state: Mutex::new(PaperState {
                orders: HashMap::new(),
                prev_tob: HashMap::new(),
            }),
            next_order_id: AtomicU64::new(1),
            next_fill_id: AtomicU64::new(1),
            fill_model,
            min_rest_ms,
        }
    }

    fn rested_long_enough(&self, order: &Order, now_ms: i64) -> bool {
        now_ms - order.created_ts >= self.min_rest_ms
    }

    fn fill(&self, order: &mut Order, price: f64, ts: i64, model: FillModel) -> Fill {
        order.filled_size = order.size;
        order.status = OrderStatus::Filled;
        let fill = Fill {
            fill_id: self.next_fill_id.fetch_add(1, Ordering::SeqCst),
            order_id: order.order_id,
            market_id: order.market_id.clone(),
            side: order.side,
            price,
            size: order.size,
            ts,
            meta: FillMeta {
                fill_model: model,
                detail: None,
            },
        };
        info!(
            order_id = order.order_id,
            market_id = %order.market_id,
            price,
            size = order.size,
            model = ?model,
            "fill.paper"
        );
        fill
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn place_limit(&self, req: NewOrderRequest, now_ms: i64) -> EngineResult<Order> {
        if req.size <= 0.0 {
            return Err(EngineError::BadArgument("order size must be positive".into()));
        }
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            order_id,
            market_id: req.market_id,
            side: req.side,
            price: req.price,
            size: req.size,
            filled_size: 0.0,
            status: OrderStatus::Open,
            created_ts: now_ms,
            reduce_only: req.reduce_only,
            strategy: req.strategy,
        };
        let mut state = self.state.lock().await;
        state.orders.insert(order_id, order.clone());
        info!(order_id, market_id = %order.market_id, side = ?order.side, price = order.price, size = order.size, "order.placed");
        Ok(order)
    }

    async fn cancel(&self, order_id: u64) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        if let Some(order) = state.orders.get_mut(&order_id) {
            if order.status == OrderStatus::Open {
                order.status = OrderStatus::Cancelled;
            }
        }
        Ok(())
    }

    async fn cancel_all_market(&self, market_id: &str) -> EngineResult<()> {
        let mut state = self.state.lock().await;
        for order in state.orders.values_mut() {
            if order.market_id == market_id && order.status == OrderStatus::Open {
                order.status = OrderStatus::Cancelled;
            }
        }
        Ok(())
    }

    async fn list_orders(&self, market_id: &str) -> Vec<Order> {
        let state = self.state.lock().await;
        state
            .orders
            .values()
            .filter(|o| o.market_id == market_id)
            .cloned()
            .collect()
    }

    async fn on_book(&self, market_id: &str, tob: TopOfBook) -> Vec<Fill> {
        let mut state = self.state.lock().await;
        let prev_tob = state.prev_tob.get(market_id).copied();
        let mut fills = Vec::new();

        let open_ids: Vec<u64> = state
            .orders
            .values()
            .filter(|o| o.market_id == market_id && o.status == OrderStatus::Open)
            .map(|o| o.order_id)
            .collect();

        for id in open_ids {
            let order = state.orders.get_mut(&id).expect("order present");
            if !self.rested_long_enough(order, tob.ts) {
                continue;
            }

            if self.fill_model == FillModel::OnBookCross {
                let crossed = match order.side {
                    Side::Buy => tob.best_ask.map(|ask| ask <= order.price),
                    Side::Sell => tob.best_bid.map(|bid| bid >= order.price),
                };
                if crossed == Some(true) {
                    // Fills at the touch if the order strictly crossed on
                    // entry against the current book, else at its own
                    // limit price.
                    let price = match order.side {
                        Side::Buy => {
                            let ask = tob.best_ask.unwrap();
                            if order.price > ask { ask } else { order.price }
                        }
                        Side::Sell => {
                            let bid = tob.best_bid.unwrap();
                            if order.price < bid { bid } else { order.price }
                        }
                    };
                    let fill = self.fill(order, price, tob.ts, FillModel::OnBookCross);
                    fills.push(fill);
                    continue;
                }
            }

            if self.fill_model == FillModel::MakerTouch {
                if let Some(prev) = prev_tob {
                    let touched_and_receded = match order.side {
                        Side::Buy => match (prev.best_ask, tob.best_ask) {
                            (Some(prev_ask), Some(ask)) => {
                                (prev_ask - order.price).abs() < TOUCH_EPS && ask > order.price
                            }
                            _ => false,
                        },
                        Side::Sell => match (prev.best_bid, tob.best_bid) {
                            (Some(prev_bid), Some(bid)) => {
                                (prev_bid - order.price).abs() < TOUCH_EPS && bid < order.price
                            }
                            _ => false,
                        },
                    };
                    if touched_and_receded {
                        let fill = self.fill(order, order.price, tob.ts, FillModel::MakerTouch);
                        fills.push(fill);
                    }
                }
            }
        }

        state.prev_tob.insert(market_id.to_string(), tob);
        fills
    }

    async fn on_trade(&self, market_id: &str, trade: TradeTick) -> Vec<Fill> {
        if self.fill_model != FillModel::TradeThrough {
            return Vec::new();
        }
        let mut state = self.state.lock().await;
        let open_ids: Vec<u64> = state
            .orders
            .values()
            .filter(|o| o.market_id == market_id && o.status == OrderStatus::Open)
            .map(|o| o.order_id)
            .collect();

        let mut fills = Vec::new();
        for id in open_ids {
            let order = state.orders.get_mut(&id).expect("order present");
            if !self.rested_long_enough(order, trade.ts) {
                continue;
            }
            let traded_through = match order.side {
                Side::Buy => trade.side == Side::Sell && trade.price <= order.price,
                Side::Sell => trade.side == Side::Buy && trade.price >= order.price,
            };
            if traded_through {
                let fill = self.fill(order, order.price, trade.ts, FillModel::TradeThrough);
                fills.push(fill);
            }
        }
        fills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tob(bid: f64, ask: f64, ts: i64) -> TopOfBook {
        TopOfBook {
            best_bid: Some(bid),
            best_bid_size: Some(10.0),
            best_ask: Some(ask),
            best_ask_size: Some(10.0),
            ts,
        }
    }

    /// Scenario: a buy limit placed above the current ask crosses on
    /// entry against a wider book.
    /// Expected: it fills at the touch (best_ask), not its own limit.
    #[tokio::test]
    async fn on_book_cross_fills_at_touch_when_order_strictly_crossed_on_entry() {
        let broker = PaperBroker::new(FillModel::OnBookCross, 0);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.52,
                    size: 10.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let fills = broker.on_book("m1", tob(0.49, 0.50, 2_000)).await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 0.50);
        assert_eq!(fills[0].meta.fill_model, FillModel::OnBookCross);
    }

    /// Scenario: a buy limit exactly at the ask (not strictly crossed).
    /// Expected: it fills at its own limit price.
    #[tokio::test]
    async fn on_book_cross_fills_at_own_price_when_not_strictly_crossed() {
        let broker = PaperBroker::new(FillModel::OnBookCross, 0);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.50,
                    size: 10.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let fills = broker.on_book("m1", tob(0.40, 0.50, 2_000)).await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 0.50);
    }

    /// Scenario: a broker configured for maker_touch sees a crossing book.
    /// Expected: on_book_cross logic never runs, so no fill is produced.
    #[tokio::test]
    async fn non_configured_fill_model_does_not_run() {
        let broker = PaperBroker::new(FillModel::MakerTouch, 0);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.50,
                    size: 10.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let fills = broker.on_book("m1", tob(0.40, 0.45, 2_000)).await;
        assert!(fills.is_empty());
    }

    /// Scenario: a buy limit sits at the touch, then the ask moves away.
    /// Expected: maker_touch fills it once the ask recedes past the limit.
    #[tokio::test]
    async fn maker_touch_fills_resting_order_when_touch_recedes() {
        let broker = PaperBroker::new(FillModel::MakerTouch, 0);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.45,
                    size: 5.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let fills_first = broker.on_book("m1", tob(0.40, 0.45, 2_000)).await;
        assert!(fills_first.is_empty());

        let fills_second = broker.on_book("m1", tob(0.41, 0.46, 3_000)).await;
        assert_eq!(fills_second.len(), 1);
        assert_eq!(fills_second[0].meta.fill_model, FillModel::MakerTouch);
    }

    /// Scenario: a resting sell order; a buy trade prints at or above it.
    /// Expected: trade_through fills the sell at its own limit price.
    #[tokio::test]
    async fn trade_through_fills_resting_sell_on_opposite_side_print() {
        let broker = PaperBroker::new(FillModel::TradeThrough, 0);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Sell,
                    price: 0.60,
                    size: 5.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let fills = broker
            .on_trade(
                "m1",
                TradeTick {
                    price: 0.62,
                    size: 20.0,
                    side: Side::Buy,
                    ts: 2_000,
                },
            )
            .await;
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, 0.60);
        assert_eq!(fills[0].meta.fill_model, FillModel::TradeThrough);
    }

    /// Scenario: an order has not yet rested for min_rest_ms when a
    /// crossing book arrives.
    /// Expected: it is skipped until it has rested long enough.
    #[tokio::test]
    async fn min_rest_ms_delays_eligibility() {
        let broker = PaperBroker::new(FillModel::OnBookCross, 5_000);
        broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.50,
                    size: 10.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();

        let too_soon = broker.on_book("m1", tob(0.40, 0.45, 2_000)).await;
        assert!(too_soon.is_empty());

        let rested = broker.on_book("m1", tob(0.40, 0.45, 6_500)).await;
        assert_eq!(rested.len(), 1);
    }

    /// Scenario: cancel an open order then feed a crossing book.
    /// Expected: no fill is produced for the cancelled order.
    #[tokio::test]
    async fn cancelled_order_does_not_fill() {
        let broker = PaperBroker::new(FillModel::OnBookCross, 0);
        let order = broker
            .place_limit(
                NewOrderRequest {
                    market_id: "m1".into(),
                    side: Side::Buy,
                    price: 0.50,
                    size: 5.0,
                    reduce_only: false,
                    strategy: "test",
                },
                1_000,
            )
            .await
            .unwrap();
        broker.cancel(order.order_id).await.unwrap();
        let fills = broker.on_book("m1", tob(0.40, 0.45, 2_000)).await;
        assert!(fills.is_empty());
    }
}
