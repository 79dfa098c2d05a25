use std::collections::HashMap;

use crate::types::{MarketInfo, TopOfBook, TradeTick, WatchList};

/// Shared, lock-guarded state the engine's loops read and update. Owned
/// exclusively by the `Engine`; strategies only ever see a cloned
/// snapshot taken under the lock, never the guard itself across an
/// await point.
#[derive(Default)]
pub struct SharedState {
    pub markets: HashMap<String, MarketInfo>,
    pub watchlist: WatchList,
    pub tob: HashMap<String, TopOfBook>,
    pub last_trade: HashMap<String, TradeTick>,
    pub last_book_update_ts: i64,
    pub last_trade_update_ts: i64,
}

impl SharedState {
    pub fn watched_market_ids(&self) -> Vec<String> {
        self.watchlist.ranked_market_ids()
    }
}
