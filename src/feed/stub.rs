use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::errors::EngineResult;
use crate::types::TopOfBook;

use super::{Feed, FeedEvent};

/// Synthetic book generator for manual smoke testing without a network
/// connection: emits a fixed top-of-book for every watched market once.
/// Never used in production paper/live trading.
pub struct StubFeed<C: Clock> {
    clock: std::sync::Arc<C>,
    best_bid: f64,
    best_ask: f64,
}

impl<C: Clock> StubFeed<C> {
    pub fn new(clock: std::sync::Arc<C>, best_bid: f64, best_ask: f64) -> Self {
        Self {
            clock,
            best_bid,
            best_ask,
        }
    }
}

#[async_trait]
impl<C: Clock> Feed for StubFeed<C> {
    async fn run(&self, market_ids: Vec<String>, tx: mpsc::Sender<FeedEvent>) -> EngineResult<()> {
        for market_id in market_ids {
            let tob = TopOfBook {
                best_bid: Some(self.best_bid),
                best_bid_size: Some(100.0),
                best_ask: Some(self.best_ask),
                best_ask_size: Some(100.0),
                ts: self.clock.now_ms(),
            };
            let _ = tx.send(FeedEvent::Tob { market_id, tob }).await;
        }
        Ok(())
    }
}
