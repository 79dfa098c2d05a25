use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::EngineResult;
use crate::store::Store;
use crate::types::TapePayload;

use super::{Feed, FeedEvent};

/// Drives `FeedEvent`s from a store's recorded tape, pacing delivery by
/// the gap between successive records divided by `speed`. Used to run
/// the live engine loops against historical data instead of a network
/// feed.
pub struct ReplayFeed {
    store: Arc<dyn Store>,
    start_ts: i64,
    end_ts: i64,
    speed: f64,
}

impl ReplayFeed {
    pub fn new(store: Arc<dyn Store>, start_ts: i64, end_ts: i64, speed: f64) -> Self {
        Self {
            store,
            start_ts,
            end_ts,
            speed: speed.max(f64::MIN_POSITIVE),
        }
    }
}

#[async_trait]
impl Feed for ReplayFeed {
    async fn run(&self, _market_ids: Vec<String>, tx: mpsc::Sender<FeedEvent>) -> EngineResult<()> {
        let records = self.store.iter_tape(self.start_ts, self.end_ts).await?;
        let mut prev_ts: Option<i64> = None;

        for record in records {
            if let Some(prev) = prev_ts {
                let gap_ms = (record.ts - prev).max(0) as f64 / self.speed;
                if gap_ms > 0.0 {
                    tokio::time::sleep(Duration::from_millis(gap_ms as u64)).await;
                }
            }
            prev_ts = Some(record.ts);

            let event = match record.payload {
                TapePayload::Tob {
                    market_id,
                    best_bid,
                    best_bid_size,
                    best_ask,
                    best_ask_size,
                } => FeedEvent::Tob {
                    market_id,
                    tob: crate::types::TopOfBook {
                        best_bid,
                        best_bid_size,
                        best_ask,
                        best_ask_size,
                        ts: record.ts,
                    },
                },
                TapePayload::Trade {
                    market_id,
                    price,
                    size,
                    side,
                } => FeedEvent::Trade {
                    market_id,
                    trade: crate::types::TradeTick {
                        price,
                        size,
                        side,
                        ts: record.ts,
                    },
                },
            };

            if tx.send(event).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
