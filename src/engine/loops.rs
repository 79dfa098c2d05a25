use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::feed::{Feed, FeedEvent};
use crate::types::{OrderStatus, WatchEntry, WatchList};

use super::Engine;

impl Engine {
    /// Runs the full live/paper pipeline: scanner, feed ingestion,
    /// strategy evaluation, snapshotting, and inventory unwind, each as
    /// its own task, until `halt()` is called.
    pub async fn run_paper(self: Arc<Self>, feed: Arc<dyn Feed>) {
        let scanner = tokio::spawn(self.clone().scanner_loop());
        let feed_task = tokio::spawn(self.clone().feed_loop(feed));
        let strategy = tokio::spawn(self.clone().strategy_loop());
        let snapshot = tokio::spawn(self.clone().snapshot_loop());
        let unwind = tokio::spawn(self.clone().unwind_loop());

        let _ = tokio::join!(scanner, feed_task, strategy, snapshot, unwind);
    }

    pub async fn scanner_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.cfg.scanner_interval_ms.max(1) as u64));
        while !self.is_halted() {
            tick.tick().await;
            match self.discovery.discover().await {
                Ok(markets) => {
                    let entries: Vec<WatchEntry> = markets
                        .iter()
                        .filter(|m| m.active)
                        .map(|m| WatchEntry {
                            market_id: m.market_id.clone(),
                            score: m.volume_24h_usd + m.liquidity_usd,
                            ts: self.clock.now_ms(),
                        })
                        .collect();
                    let watchlist = WatchList { entries };

                    {
                        let mut state = self.state.lock().await;
                        for m in &markets {
                            state.markets.insert(m.market_id.clone(), m.clone());
                        }
                        state.watchlist = watchlist.clone();
                    }

                    if let Err(e) = self.store.upsert_markets(&markets).await {
                        warn!(error = %e, "store.upsert_markets failed");
                    }
                    if let Err(e) = self.store.update_watchlist(watchlist).await {
                        warn!(error = %e, "store.update_watchlist failed");
                    }
                }
                Err(e) => warn!(error = %e, "discovery.discover failed"),
            }
        }
    }

    pub async fn feed_loop(self: Arc<Self>, feed: Arc<dyn Feed>) {
        let market_ids = {
            let state = self.state.lock().await;
            state.watched_market_ids()
        };
        let (tx, mut rx) = mpsc::channel(1024);
        let feed_handle = tokio::spawn(async move {
            if let Err(e) = feed.run(market_ids, tx).await {
                warn!(error = %e, "feed.run failed");
            }
        });

        while let Some(event) = rx.recv().await {
            match &event {
                FeedEvent::Tob { market_id, tob } => self.record_tob_tape(market_id, *tob).await,
                FeedEvent::Trade { market_id, trade } => self.record_trade_tape(market_id, *trade).await,
            }
            self.handle_feed_event(&event).await;
            if self.is_halted() {
                break;
            }
        }
        feed_handle.abort();
    }

    pub async fn strategy_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.cfg.strategy_interval_ms.max(1) as u64));
        while !self.is_halted() {
            tick.tick().await;
            let market_ids = {
                let state = self.state.lock().await;
                state.watched_market_ids()
            };
            for market_id in market_ids {
                self.evaluate_market_maker(&market_id).await;
                self.evaluate_cross_venue(&market_id).await;
            }
        }
    }

    pub(crate) async fn evaluate_market_maker(&self, market_id: &str) {
        let (tob, position_qty) = {
            let state = self.state.lock().await;
            let Some(tob) = state.tob.get(market_id).copied() else {
                return;
            };
            drop(state);
            let portfolio = self.portfolio.lock().await;
            let qty = portfolio.position(market_id).map(|p| p.qty).unwrap_or(0.0);
            (tob, qty)
        };

        let external = self.odds.fair_value(market_id).await;
        let Some((fair, _source)) = self.market_maker.fair_value(&tob, external) else {
            return;
        };
        let Some((bid, ask)) = self.market_maker.desired_quotes(fair, &tob, position_qty) else {
            return;
        };
        let (bid_intent, ask_intent) = self.market_maker.quote_intents(market_id, bid, ask);

        let now_ms = self.clock.now_ms();
        let open_orders = self.broker.list_orders(market_id).await;

        self.ensure_quote(market_id, open_orders.iter().find(|o| {
            o.status == OrderStatus::Open && o.side == crate::types::Side::Buy && o.strategy == "market_maker"
        }), bid_intent, now_ms).await;

        let open_orders = self.broker.list_orders(market_id).await;
        self.ensure_quote(market_id, open_orders.iter().find(|o| {
            o.status == OrderStatus::Open && o.side == crate::types::Side::Sell && o.strategy == "market_maker"
        }), ask_intent, now_ms).await;
    }

    pub(crate) async fn ensure_quote(
        &self,
        market_id: &str,
        existing: Option<&crate::types::Order>,
        intent: crate::strategies::QuoteIntent,
        now_ms: i64,
    ) {
        match existing {
            None => {
                self.try_place(intent).await;
            }
            Some(order) if self.market_maker.should_replace(order, intent.price, now_ms) => {
                if let Err(e) = self.broker.cancel(order.order_id).await {
                    warn!(error = %e, market_id, "broker.cancel failed");
                    return;
                }
                self.try_place(intent).await;
            }
            Some(_) => {}
        }
    }

    pub(crate) async fn evaluate_cross_venue(&self, market_id: &str) {
        let Some(tob) = ({
            let state = self.state.lock().await;
            state.tob.get(market_id).copied()
        }) else {
            return;
        };
        let Some((fair, _source)) = self.odds.fair_value(market_id).await else {
            return;
        };
        let now_ms = self.clock.now_ms();

        let intent = {
            let taker = self.cross_venue.lock().await;
            taker.evaluate(market_id, &tob, fair, now_ms)
        };
        let Some(intent) = intent else {
            return;
        };
        if self.try_place(intent).await.is_some() {
            let mut taker = self.cross_venue.lock().await;
            taker.record_trade(market_id, now_ms);
        }
    }

    pub async fn snapshot_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.cfg.snapshot_interval_ms.max(1) as u64));
        while !self.is_halted() {
            tick.tick().await;
            self.persist_snapshots().await;
        }
    }

    pub async fn unwind_loop(self: Arc<Self>) {
        let mut tick = tokio::time::interval(Duration::from_millis(self.cfg.unwind_interval_ms.max(1) as u64));
        while !self.is_halted() {
            tick.tick().await;
            let now_ms = self.clock.now_ms();

            let aged_markets: Vec<String> = {
                let portfolio = self.portfolio.lock().await;
                portfolio
                    .positions
                    .values()
                    .filter(|p| !p.is_flat())
                    .filter(|p| {
                        p.opened_ts
                            .map(|ts| now_ms - ts >= self.cfg.unwind_max_position_age_ms)
                            .unwrap_or(false)
                    })
                    .map(|p| p.market_id.clone())
                    .collect()
            };
            for market_id in &aged_markets {
                info!(market_id, "engine.unwind_age_triggered");
                self.flatten_market(market_id).await;
            }

            let markets: Vec<crate::types::MarketInfo> = {
                let state = self.state.lock().await;
                state.markets.values().cloned().collect()
            };
            for market in &markets {
                self.maybe_close_before_end(&market.market_id, market, now_ms, self.cfg.unwind_max_position_age_ms.min(60_000)).await;
            }
        }
    }
}
