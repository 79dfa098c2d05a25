mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;

use crate::errors::EngineResult;
use crate::types::{Fill, MarketInfo, Order, OrderStatus, Position, TapePayload, TapeRecord, WatchList};

#[derive(Clone, Copy, Debug)]
pub struct PnlSnapshot {
    pub ts: i64,
    pub realized: f64,
    pub unrealized: f64,
}

#[derive(Clone, Debug)]
pub struct PositionSnapshot {
    pub ts: i64,
    pub position: Position,
}

/// Persistence contract. The engine is built and tested against this
/// trait; a production deployment would back it with a real database,
/// but that backend is out of scope here -- `InMemoryStore` is the only
/// concrete implementation and is sufficient to drive paper trading,
/// the unwind loop, position rehydration, and tape-driven backtests.
#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_markets(&self, markets: &[MarketInfo]) -> EngineResult<()>;
    async fn get_market(&self, market_id: &str) -> Option<MarketInfo>;

    async fn insert_order(&self, order: &Order) -> EngineResult<()>;
    async fn update_order_status(&self, order_id: u64, status: OrderStatus, filled_size: f64) -> EngineResult<()>;

    async fn insert_fill(&self, fill: &Fill) -> EngineResult<()>;

    async fn insert_tape(&self, ts: i64, payload: TapePayload) -> EngineResult<TapeRecord>;
    async fn iter_tape(&self, start_ts: i64, end_ts: i64) -> EngineResult<Vec<TapeRecord>>;
    /// Timestamp of the most recently inserted tape record, if any --
    /// used to resume a replay or backtest from where the tape left off.
    async fn fetch_latest_tape_ts(&self) -> EngineResult<Option<i64>>;

    async fn insert_position_snapshot(&self, snapshot: PositionSnapshot) -> EngineResult<()>;
    async fn insert_pnl_snapshot(&self, snapshot: PnlSnapshot) -> EngineResult<()>;
    async fn fetch_latest_positions(&self) -> EngineResult<Vec<Position>>;
    async fn fetch_latest_pnl(&self) -> EngineResult<Option<PnlSnapshot>>;

    async fn update_watchlist(&self, watchlist: WatchList) -> EngineResult<()>;
    async fn get_watchlist(&self) -> EngineResult<WatchList>;
}
