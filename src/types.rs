use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Side of a resting or filled order. Distinct from a market's own
/// outcome labeling -- every order here is a buy or sell of a single
/// outcome token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Static description of a tradeable binary market, as returned by
/// discovery. `condition_id`/`clob_token_id` are carried for forward
/// compatibility with a real discovery/feed implementation; no core
/// algorithm depends on them being present.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketInfo {
    pub market_id: String,
    pub question: String,
    pub event_id: String,
    pub active: bool,
    pub end_ts: i64,
    pub volume_24h_usd: f64,
    pub liquidity_usd: f64,
    pub condition_id: Option<String>,
    pub clob_token_id: Option<String>,
}

/// Best bid/ask snapshot for a market at a point in time. Either side may
/// be absent (a one-sided book); `ts` is always the local observation
/// time, not a source timestamp.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TopOfBook {
    pub best_bid: Option<f64>,
    pub best_bid_size: Option<f64>,
    pub best_ask: Option<f64>,
    pub best_ask_size: Option<f64>,
    pub ts: i64,
}

impl TopOfBook {
    /// Midpoint, only defined when both sides are present.
    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    /// Spread, only defined when both sides are present.
    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// True only when both sides are present and the book is crossed.
    pub fn is_crossed(&self) -> bool {
        self.spread().map(|s| s < 0.0).unwrap_or(false)
    }

    /// Mark price fallback chain: mid if both sides present, else
    /// whichever single side is present, else `None`.
    pub fn mark_price(&self) -> Option<f64> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }
}

/// A single printed trade on the exchange.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TradeTick {
    pub price: f64,
    pub size: f64,
    pub side: Side,
    pub ts: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// A resting or terminal order known to the paper broker / portfolio.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub market_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub filled_size: f64,
    pub status: OrderStatus,
    pub created_ts: i64,
    pub reduce_only: bool,
    pub strategy: &'static str,
}

impl Order {
    pub fn remaining(&self) -> f64 {
        (self.size - self.filled_size).max(0.0)
    }
}

/// Which fill model produced a given fill, recorded for audit/replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillModel {
    OnBookCross,
    MakerTouch,
    TradeThrough,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FillMeta {
    pub fill_model: FillModel,
    pub detail: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: u64,
    pub order_id: u64,
    pub market_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub ts: i64,
    pub meta: FillMeta,
}

/// Net position in one market. `qty` is signed: positive is long, negative
/// is short. `opened_ts` is `None` while flat and is reset to the
/// triggering fill's timestamp whenever the position opens from flat or
/// flips sign through zero. `last_mark` is the most recent mark price
/// the snapshot loop observed for this market (mid, falling back to
/// whichever book side was available, falling back to `avg_price`); the
/// risk engine's event-exposure and daily-loss gates read it directly
/// rather than re-deriving a mark from a live top-of-book.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Position {
    pub market_id: String,
    pub qty: f64,
    pub avg_price: f64,
    pub realized_pnl: f64,
    pub opened_ts: Option<i64>,
    pub last_mark: Option<f64>,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.qty.abs() < f64::EPSILON
    }

    /// The mark to use for risk/P&L purposes: `last_mark` if set, else
    /// `avg_price`.
    pub fn effective_mark(&self) -> f64 {
        self.last_mark.unwrap_or(self.avg_price)
    }

    /// Unrealized P&L against a live top-of-book: mid if both sides are
    /// present, else whichever side is, else zero if the book is absent
    /// or the position is flat.
    pub fn unrealized_pnl(&self, tob: Option<&TopOfBook>) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        let Some(mark) = tob.and_then(|t| t.mark_price()) else {
            return 0.0;
        };
        (mark - self.avg_price) * self.qty
    }

    /// Unrealized P&L using the persisted `last_mark`/`avg_price`
    /// fallback instead of a live top-of-book, for the risk engine.
    pub fn unrealized_pnl_at_last_mark(&self) -> f64 {
        if self.is_flat() {
            return 0.0;
        }
        (self.effective_mark() - self.avg_price) * self.qty
    }
}

/// Collection of positions across all markets the agent has ever traded,
/// keyed by `market_id`. Mutated only through `Portfolio::apply_fill`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Portfolio {
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn position(&self, market_id: &str) -> Option<&Position> {
        self.positions.get(market_id)
    }

    pub fn total_realized(&self) -> f64 {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    pub fn total_unrealized(&self, tobs: &HashMap<String, TopOfBook>) -> f64 {
        self.positions
            .values()
            .map(|p| p.unrealized_pnl(tobs.get(&p.market_id)))
            .sum()
    }

    pub fn total_unrealized_at_last_mark(&self) -> f64 {
        self.positions.values().map(|p| p.unrealized_pnl_at_last_mark()).sum()
    }
}

/// Tagged-union payload for tape records, so the store encodes/decodes
/// through explicit variants instead of a free-form map.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TapePayload {
    Tob {
        market_id: String,
        best_bid: Option<f64>,
        best_bid_size: Option<f64>,
        best_ask: Option<f64>,
        best_ask_size: Option<f64>,
    },
    Trade {
        market_id: String,
        price: f64,
        size: f64,
        side: Side,
    },
}

impl TapePayload {
    pub fn market_id(&self) -> &str {
        match self {
            TapePayload::Tob { market_id, .. } => market_id,
            TapePayload::Trade { market_id, .. } => market_id,
        }
    }
}

/// A single append-only tape entry. `id` is assigned by the store at
/// insert time and orders tie-breaks for records sharing a `ts`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TapeRecord {
    pub id: u64,
    pub ts: i64,
    pub payload: TapePayload,
}

/// One entry in the scanner's ranked watchlist.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchEntry {
    pub market_id: String,
    pub score: f64,
    pub ts: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WatchList {
    pub entries: Vec<WatchEntry>,
}

impl WatchList {
    pub fn ranked_market_ids(&self) -> Vec<String> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.into_iter().map(|e| e.market_id).collect()
    }
}
