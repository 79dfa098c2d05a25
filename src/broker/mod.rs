mod live;
mod paper;

pub use live::LiveBroker;
pub use paper::PaperBroker;

use async_trait::async_trait;

use crate::errors::EngineResult;
use crate::types::{Fill, Order, Side, TopOfBook, TradeTick};

/// Request to place a new resting limit order. The broker assigns the
/// order id and initial `Open` status.
#[derive(Clone, Debug)]
pub struct NewOrderRequest {
    pub market_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub reduce_only: bool,
    pub strategy: &'static str,
}

/// Capability set any order-execution backend must provide. The engine
/// only ever talks to this trait, never to a concrete broker, so paper
/// simulation and a real venue connection are interchangeable.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn place_limit(&self, req: NewOrderRequest, now_ms: i64) -> EngineResult<Order>;
    async fn cancel(&self, order_id: u64) -> EngineResult<()>;
    async fn cancel_all_market(&self, market_id: &str) -> EngineResult<()>;
    async fn list_orders(&self, market_id: &str) -> Vec<Order>;

    /// Feed a fresh top-of-book observation for `market_id` into the
    /// broker's fill simulation, returning any fills it produced.
    async fn on_book(&self, market_id: &str, tob: TopOfBook) -> Vec<Fill>;

    /// Feed a printed trade into the broker's fill simulation.
    async fn on_trade(&self, market_id: &str, trade: TradeTick) -> Vec<Fill>;
}
