use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::feed::FeedEvent;
use crate::types::{TapePayload, TopOfBook, TradeTick};

use super::Engine;

impl Engine {
    /// Drives the engine from the store's recorded tape instead of a
    /// live feed: for every tape record, update state and run the fill
    /// simulation, evaluate strategies once for the record's market,
    /// and persist a snapshot -- all inline, no periodic loops, so
    /// wall-clock speed is controlled entirely by `speed`.
    pub async fn run_backtest(self: Arc<Self>, start_ts: i64, end_ts: i64, speed: f64) {
        let records = match self.store.iter_tape(start_ts, end_ts).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "backtest.iter_tape failed");
                return;
            }
        };
        info!(count = records.len(), "backtest.start");

        let mut prev_ts: Option<i64> = None;
        let speed = speed.max(f64::MIN_POSITIVE);

        for record in &records {
            if let Some(prev) = prev_ts {
                let gap_ms = (record.ts - prev).max(0) as f64 / speed;
                if gap_ms > 0.0 {
                    tokio::time::sleep(Duration::from_millis(gap_ms as u64)).await;
                }
            }
            prev_ts = Some(record.ts);

            let market_id = record.payload.market_id().to_string();
            let event = match &record.payload {
                TapePayload::Tob {
                    market_id,
                    best_bid,
                    best_bid_size,
                    best_ask,
                    best_ask_size,
                } => FeedEvent::Tob {
                    market_id: market_id.clone(),
                    tob: TopOfBook {
                        best_bid: *best_bid,
                        best_bid_size: *best_bid_size,
                        best_ask: *best_ask,
                        best_ask_size: *best_ask_size,
                        ts: record.ts,
                    },
                },
                TapePayload::Trade {
                    market_id,
                    price,
                    size,
                    side,
                } => FeedEvent::Trade {
                    market_id: market_id.clone(),
                    trade: TradeTick {
                        price: *price,
                        size: *size,
                        side: *side,
                        ts: record.ts,
                    },
                },
            };

            self.handle_feed_event(&event).await;
            self.evaluate_market_maker(&market_id).await;
            self.evaluate_cross_venue(&market_id).await;
            self.persist_snapshots().await;
        }

        let markets: Vec<crate::types::MarketInfo> = {
            let state = self.state.lock().await;
            state.markets.values().cloned().collect()
        };
        for market in &markets {
            self.flatten_market(&market.market_id).await;
        }
        info!("backtest.complete");
    }
}
