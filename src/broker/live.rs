use async_trait::async_trait;

use crate::errors::{EngineError, EngineResult};
use crate::types::{Fill, Order, TopOfBook, TradeTick};

use super::{Broker, NewOrderRequest};

/// Placeholder for a real venue connection. Out of scope: placing this
/// repo's strategies against a live order book requires a signed,
/// authenticated CLOB client this crate does not implement. Every call
/// fails with `TransientIO` so callers see a uniform, handled error
/// rather than a panic if `--mode=live` is ever wired up.
pub struct LiveBroker;

impl LiveBroker {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LiveBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for LiveBroker {
    async fn place_limit(&self, _req: NewOrderRequest, _now_ms: i64) -> EngineResult<Order> {
        Err(EngineError::TransientIO("live broker not implemented".into()))
    }

    async fn cancel(&self, _order_id: u64) -> EngineResult<()> {
        Err(EngineError::TransientIO("live broker not implemented".into()))
    }

    async fn cancel_all_market(&self, _market_id: &str) -> EngineResult<()> {
        Err(EngineError::TransientIO("live broker not implemented".into()))
    }

    async fn list_orders(&self, _market_id: &str) -> Vec<Order> {
        Vec::new()
    }

    async fn on_book(&self, _market_id: &str, _tob: TopOfBook) -> Vec<Fill> {
        Vec::new()
    }

    async fn on_trade(&self, _market_id: &str, _trade: TradeTick) -> Vec<Fill> {
        Vec::new()
    }
}
