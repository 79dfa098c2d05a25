use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::errors::EngineResult;
use crate::types::{Fill, MarketInfo, Order, OrderStatus, Position, TapePayload, TapeRecord, WatchList};

use super::{PnlSnapshot, PositionSnapshot, Store};

#[derive(Default)]
struct Inner {
    markets: HashMap<String, MarketInfo>,
    orders: HashMap<u64, Order>,
    fills: Vec<Fill>,
    tape: Vec<TapeRecord>,
    next_tape_id: u64,
    position_snapshots: HashMap<String, PositionSnapshot>,
    pnl_snapshots: Vec<PnlSnapshot>,
    watchlist: WatchList,
}

/// Reference `Store` implementation backed entirely by process memory,
/// internally serialized behind one lock like the rest of this crate's
/// shared-state owners. Nothing here survives a restart; that tradeoff
/// is deliberate; see the design notes on the real persistence backend.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_tape_id: 1,
                ..Default::default()
            }),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_markets(&self, markets: &[MarketInfo]) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        for m in markets {
            inner.markets.insert(m.market_id.clone(), m.clone());
        }
        Ok(())
    }

    async fn get_market(&self, market_id: &str) -> Option<MarketInfo> {
        let inner = self.inner.lock().await;
        inner.markets.get(market_id).cloned()
    }

    async fn insert_order(&self, order: &Order) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.orders.insert(order.order_id, order.clone());
        Ok(())
    }

    async fn update_order_status(&self, order_id: u64, status: OrderStatus, filled_size: f64) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.status = status;
            order.filled_size = filled_size;
        }
        Ok(())
    }

    async fn insert_fill(&self, fill: &Fill) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.fills.push(fill.clone());
        Ok(())
    }

    async fn insert_tape(&self, ts: i64, payload: TapePayload) -> EngineResult<TapeRecord> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_tape_id;
        inner.next_tape_id += 1;
        let record = TapeRecord { id, ts, payload };
        inner.tape.push(record.clone());
        Ok(record)
    }

    async fn iter_tape(&self, start_ts: i64, end_ts: i64) -> EngineResult<Vec<TapeRecord>> {
        let inner = self.inner.lock().await;
        let mut records: Vec<TapeRecord> = inner
            .tape
            .iter()
            .filter(|r| r.ts >= start_ts && r.ts <= end_ts)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn fetch_latest_tape_ts(&self) -> EngineResult<Option<i64>> {
        let inner = self.inner.lock().await;
        Ok(inner.tape.iter().map(|r| r.ts).max())
    }

    async fn insert_position_snapshot(&self, snapshot: PositionSnapshot) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .position_snapshots
            .insert(snapshot.position.market_id.clone(), snapshot);
        Ok(())
    }

    async fn insert_pnl_snapshot(&self, snapshot: PnlSnapshot) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.pnl_snapshots.push(snapshot);
        Ok(())
    }

    async fn fetch_latest_positions(&self) -> EngineResult<Vec<Position>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .position_snapshots
            .values()
            .map(|s| s.position.clone())
            .collect())
    }

    async fn fetch_latest_pnl(&self) -> EngineResult<Option<PnlSnapshot>> {
        let inner = self.inner.lock().await;
        Ok(inner.pnl_snapshots.last().copied())
    }

    async fn update_watchlist(&self, watchlist: WatchList) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.watchlist = watchlist;
        Ok(())
    }

    async fn get_watchlist(&self) -> EngineResult<WatchList> {
        let inner = self.inner.lock().await;
        Ok(inner.watchlist.clone())
    }
}
