use async_trait::async_trait;

use crate::errors::EngineResult;
use crate::types::MarketInfo;

/// Contract for finding tradeable markets. A real implementation polls
/// the exchange's discovery HTTP API on a schedule and ranks candidates
/// by liquidity/volume; that HTTP client is out of scope here.
#[async_trait]
pub trait MarketDiscovery: Send + Sync {
    async fn discover(&self) -> EngineResult<Vec<MarketInfo>>;
}

/// Returns a fixed, injectable list of markets. Used for paper trading
/// against a known universe and for tests/backtests where discovery
/// should be deterministic rather than time-of-day dependent.
pub struct StaticMarketDiscovery {
    markets: Vec<MarketInfo>,
}

impl StaticMarketDiscovery {
    pub fn new(markets: Vec<MarketInfo>) -> Self {
        Self { markets }
    }
}

#[async_trait]
impl MarketDiscovery for StaticMarketDiscovery {
    async fn discover(&self) -> EngineResult<Vec<MarketInfo>> {
        Ok(self.markets.clone())
    }
}
