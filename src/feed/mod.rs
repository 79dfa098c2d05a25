mod replay;
mod stub;

pub use replay::ReplayFeed;
pub use stub::StubFeed;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::EngineResult;
use crate::types::{TopOfBook, TradeTick};

#[derive(Clone, Debug)]
pub enum FeedEvent {
    Tob { market_id: String, tob: TopOfBook },
    Trade { market_id: String, trade: TradeTick },
}

/// Transport + normalizer contract for live book/trade data. A real
/// implementation would hold a websocket connection to the exchange and
/// decode its wire format into `FeedEvent`s; that transport is out of
/// scope here. `ReplayFeed` and `StubFeed` satisfy this trait without any
/// network dependency.
#[async_trait]
pub trait Feed: Send + Sync {
    async fn run(&self, market_ids: Vec<String>, tx: mpsc::Sender<FeedEvent>) -> EngineResult<()>;
}
