pub mod backtest;
pub mod loops;
pub mod state;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::broker::{Broker, NewOrderRequest};
use crate::clock::Clock;
use crate::config::Config;
use crate::discovery::MarketDiscovery;
use crate::feed::FeedEvent;
use crate::odds::ExternalOddsProvider;
use crate::portfolio::apply_fill;
use crate::pricing::clamp;
use crate::risk::RiskEngine;
use crate::store::{PnlSnapshot, PositionSnapshot, Store};
use crate::strategies::{CrossVenueTaker, MarketMaker, QuoteIntent};
use crate::types::{Fill, MarketInfo, Order, Portfolio, Side, TapePayload};

use state::SharedState;

pub struct Engine {
    pub cfg: Config,
    pub state: Arc<Mutex<SharedState>>,
    pub portfolio: Arc<Mutex<Portfolio>>,
    pub risk: Arc<Mutex<RiskEngine>>,
    pub store: Arc<dyn Store>,
    pub broker: Arc<dyn Broker>,
    pub discovery: Arc<dyn MarketDiscovery>,
    pub odds: Arc<dyn ExternalOddsProvider>,
    pub clock: Arc<dyn Clock>,
    pub market_maker: MarketMaker,
    pub cross_venue: Mutex<CrossVenueTaker>,
    pub halted: AtomicBool,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: Config,
        store: Arc<dyn Store>,
        broker: Arc<dyn Broker>,
        discovery: Arc<dyn MarketDiscovery>,
        odds: Arc<dyn ExternalOddsProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let market_maker = MarketMaker::new(cfg.market_maker.clone());
        let cross_venue = CrossVenueTaker::new(cfg.cross_venue.clone());
        let risk = RiskEngine::new(cfg.risk.clone());
        Self {
            cfg,
            state: Arc::new(Mutex::new(SharedState::default())),
            portfolio: Arc::new(Mutex::new(Portfolio::default())),
            risk: Arc::new(Mutex::new(risk)),
            store,
            broker,
            discovery,
            odds,
            clock,
            market_maker,
            cross_venue: Mutex::new(cross_venue),
            halted: AtomicBool::new(false),
        }
    }

    /// Rehydrates the portfolio from the store's last persisted position
    /// snapshots, so a restarted paper session resumes from where it left
    /// off instead of trading a flat book it doesn't actually have. Only
    /// meaningful for `RunMode::Paper`, and skipped entirely when
    /// `paper_reset_on_start` asks for a clean slate.
    pub async fn rehydrate(&self) -> crate::errors::EngineResult<()> {
        if self.cfg.run_mode != crate::config::RunMode::Paper || self.cfg.paper_reset_on_start {
            return Ok(());
        }
        let positions = self.store.fetch_latest_positions().await?;
        let mut portfolio = self.portfolio.lock().await;
        for pos in positions {
            portfolio.positions.insert(pos.market_id.clone(), pos);
        }
        info!(count = portfolio.positions.len(), "engine.rehydrated");
        Ok(())
    }

    /// Applies one incoming feed event to shared state, the broker's
    /// fill simulation, and the portfolio, in that order. Grounded on
    /// the principle that the engine is the sole writer of `Portfolio`.
    pub async fn handle_feed_event(&self, event: &FeedEvent) {
        let fills = match event {
            FeedEvent::Tob { market_id, tob } => {
                {
                    let mut state = self.state.lock().await;
                    state.tob.insert(market_id.clone(), *tob);
                    state.last_book_update_ts = tob.ts;
                }
                self.broker.on_book(market_id, *tob).await
            }
            FeedEvent::Trade { market_id, trade } => {
                {
                    let mut state = self.state.lock().await;
                    state.last_trade.insert(market_id.clone(), *trade);
                    state.last_trade_update_ts = trade.ts;
                }
                self.broker.on_trade(market_id, *trade).await
            }
        };
        self.apply_fills(fills).await;
    }

    pub async fn apply_fills(&self, fills: Vec<Fill>) {
        if fills.is_empty() {
            return;
        }
        let mut portfolio = self.portfolio.lock().await;
        for fill in &fills {
            apply_fill(&mut portfolio, fill);
            if let Err(e) = self.store.insert_fill(fill).await {
                warn!(error = %e, "store.insert_fill failed");
            }
            if let Err(e) = self
                .store
                .update_order_status(fill.order_id, crate::types::OrderStatus::Filled, fill.size)
                .await
            {
                warn!(error = %e, "store.update_order_status failed");
            }
        }
    }

    async fn event_exposure(&self, portfolio: &Portfolio, markets: &HashMap<String, MarketInfo>) -> HashMap<String, f64> {
        let mut exposure: HashMap<String, f64> = HashMap::new();
        for pos in portfolio.positions.values() {
            if pos.is_flat() {
                continue;
            }
            let Some(market) = markets.get(&pos.market_id) else {
                continue;
            };
            let mark = clamp(pos.effective_mark(), 0.0, 1.0);
            *exposure.entry(market.event_id.clone()).or_insert(0.0) += pos.qty.abs() * mark;
        }
        exposure
    }

    /// Risk-checks and, if accepted, places a strategy's order intent.
    /// Returns the accepted order, or `None` if risk rejected it.
    pub async fn try_place(&self, intent: QuoteIntent) -> Option<Order> {
        let now_ms = self.clock.now_ms();
        let state = self.state.lock().await;
        let Some(market) = state.markets.get(&intent.market_id).cloned() else {
            return None;
        };
        let tob = state.tob.get(&intent.market_id).copied();
        drop(state);

        let portfolio = self.portfolio.lock().await;
        let open_position_count = portfolio.positions.values().filter(|p| !p.is_flat()).count();
        let state = self.state.lock().await;
        let exposure = self.event_exposure(&portfolio, &state.markets).await;
        drop(state);

        let order = Order {
            order_id: 0,
            market_id: intent.market_id.clone(),
            side: intent.side,
            price: intent.price,
            size: intent.size,
            filled_size: 0.0,
            status: crate::types::OrderStatus::Open,
            created_ts: now_ms,
            reduce_only: intent.reduce_only,
            strategy: intent.strategy,
        };

        let mut risk = self.risk.lock().await;
        let check = risk.pre_trade_check(&order, &market, tob.as_ref(), &portfolio, open_position_count, &exposure, now_ms);
        drop(portfolio);

        if !check.ok {
            let reason = check.reason.unwrap_or("unknown");
            if risk.should_log_rejection(&intent.market_id, reason, now_ms) {
                warn!(market_id = %intent.market_id, reason, "risk.rejected");
            }
            return None;
        }
        drop(risk);

        match self
            .broker
            .place_limit(
                NewOrderRequest {
                    market_id: intent.market_id,
                    side: intent.side,
                    price: intent.price,
                    size: intent.size,
                    reduce_only: intent.reduce_only,
                    strategy: intent.strategy,
                },
                now_ms,
            )
            .await
        {
            Ok(order) => {
                if let Err(e) = self.store.insert_order(&order).await {
                    warn!(error = %e, "store.insert_order failed");
                }
                Some(order)
            }
            Err(e) => {
                warn!(error = %e, "broker.place_limit failed");
                None
            }
        }
    }

    /// Flattens any non-flat position in a market whose window is about
    /// to end, crossing the spread with a reduce_only order so the risk
    /// engine's position caps don't block the unwind.
    pub async fn maybe_close_before_end(&self, market_id: &str, market: &MarketInfo, now_ms: i64, lead_ms: i64) {
        if market.end_ts - now_ms > lead_ms {
            return;
        }
        self.flatten_market(market_id).await;
    }

    pub async fn flatten_market(&self, market_id: &str) {
        let portfolio = self.portfolio.lock().await;
        let Some(pos) = portfolio.position(market_id).cloned() else {
            return;
        };
        drop(portfolio);
        if pos.is_flat() {
            return;
        }
        let state = self.state.lock().await;
        let Some(tob) = state.tob.get(market_id).copied() else {
            return;
        };
        drop(state);

        let (side, price) = if pos.qty > 0.0 {
            let Some(price) = tob.best_bid else {
                return;
            };
            (Side::Sell, price)
        } else {
            let Some(price) = tob.best_ask else {
                return;
            };
            (Side::Buy, price)
        };

        let intent = QuoteIntent {
            market_id: market_id.to_string(),
            side,
            price,
            size: pos.qty.abs(),
            reduce_only: true,
            strategy: "unwind",
        };
        if self.try_place(intent).await.is_some() {
            info!(market_id, "engine.unwind_placed");
        }
    }

    pub async fn persist_snapshots(&self) {
        let mut portfolio = self.portfolio.lock().await;
        let state = self.state.lock().await;
        let now_ms = self.clock.now_ms();

        for pos in portfolio.positions.values_mut() {
            if let Some(mark) = state.tob.get(&pos.market_id).and_then(|t| t.mark_price()) {
                pos.last_mark = Some(mark);
            }
        }

        for pos in portfolio.positions.values() {
            if let Err(e) = self
                .store
                .insert_position_snapshot(PositionSnapshot {
                    ts: now_ms,
                    position: pos.clone(),
                })
                .await
            {
                warn!(error = %e, "store.insert_position_snapshot failed");
            }
        }

        let realized = portfolio.total_realized();
        let unrealized = portfolio.total_unrealized(&state.tob);
        if let Err(e) = self
            .store
            .insert_pnl_snapshot(PnlSnapshot {
                ts: now_ms,
                realized,
                unrealized,
            })
            .await
        {
            warn!(error = %e, "store.insert_pnl_snapshot failed");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    pub async fn record_tob_tape(&self, market_id: &str, tob: crate::types::TopOfBook) {
        let payload = TapePayload::Tob {
            market_id: market_id.to_string(),
            best_bid: tob.best_bid,
            best_bid_size: tob.best_bid_size,
            best_ask: tob.best_ask,
            best_ask_size: tob.best_ask_size,
        };
        if let Err(e) = self.store.insert_tape(tob.ts, payload).await {
            warn!(error = %e, "store.insert_tape failed");
        }
    }

    pub async fn record_trade_tape(&self, market_id: &str, trade: crate::types::TradeTick) {
        let payload = TapePayload::Trade {
            market_id: market_id.to_string(),
            price: trade.price,
            size: trade.size,
            side: trade.side,
        };
        if let Err(e) = self.store.insert_tape(trade.ts, payload).await {
            warn!(error = %e, "store.insert_tape failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::PaperBroker;
    use crate::clock::FakeClock;
    use crate::discovery::StaticMarketDiscovery;
    use crate::odds::DisabledOddsProvider;
    use crate::store::InMemoryStore;
    use crate::types::{FillModel, MarketInfo, TopOfBook};

    fn market(market_id: &str, end_ts: i64) -> MarketInfo {
        MarketInfo {
            market_id: market_id.to_string(),
            question: "will it happen".into(),
            event_id: "event-1".into(),
            active: true,
            end_ts,
            volume_24h_usd: 10_000.0,
            liquidity_usd: 5_000.0,
            condition_id: None,
            clob_token_id: None,
        }
    }

    async fn make_engine() -> (Arc<Engine>, Arc<FakeClock>) {
        let cfg = Config::from_env();
        let store = Arc::new(InMemoryStore::new());
        let broker = Arc::new(PaperBroker::new(FillModel::OnBookCross, 0));
        let discovery = Arc::new(StaticMarketDiscovery::new(Vec::new()));
        let odds = Arc::new(DisabledOddsProvider);
        let clock = Arc::new(FakeClock::new(0));
        let clock_dyn: Arc<dyn Clock> = clock.clone();
        let engine = Arc::new(Engine::new(cfg, store, broker, discovery, odds, clock_dyn));
        (engine, clock)
    }

    /// Scenario: an order intent targets a market with no recorded top of
    /// book yet.
    /// Expected: the circuit breaker rejects with "no_top_of_book" and no
    /// order reaches the broker.
    #[tokio::test]
    async fn try_place_rejects_when_no_top_of_book() {
        let (engine, _clock) = make_engine().await;
        {
            let mut state = engine.state.lock().await;
            state.markets.insert("m1".into(), market("m1", 100_000));
        }

        let result = engine
            .try_place(QuoteIntent {
                market_id: "m1".into(),
                side: Side::Buy,
                price: 0.45,
                size: 10.0,
                reduce_only: false,
                strategy: "test",
            })
            .await;
        assert!(result.is_none());
    }

    /// Scenario: a buy quote is placed, then a crossing top-of-book event
    /// arrives through the usual feed-event handling path.
    /// Expected: the order fills and the portfolio reflects the resulting
    /// long position at the fill price.
    #[tokio::test]
    async fn placed_quote_fills_on_crossing_book_and_updates_portfolio() {
        let (engine, clock) = make_engine().await;
        {
            let mut state = engine.state.lock().await;
            state.markets.insert("m1".into(), market("m1", 100_000));
            state.tob.insert(
                "m1".into(),
                TopOfBook {
                    best_bid: Some(0.40),
                    best_bid_size: Some(10.0),
                    best_ask: Some(0.60),
                    best_ask_size: Some(10.0),
                    ts: 0,
                },
            );
        }

        let order = engine
            .try_place(QuoteIntent {
                market_id: "m1".into(),
                side: Side::Buy,
                price: 0.50,
                size: 10.0,
                reduce_only: false,
                strategy: "test",
            })
            .await;
        assert!(order.is_some());

        clock.advance(1_000);
        let event = FeedEvent::Tob {
            market_id: "m1".into(),
            tob: TopOfBook {
                best_bid: Some(0.45),
                best_bid_size: Some(10.0),
                best_ask: Some(0.48),
                best_ask_size: Some(10.0),
                ts: clock.now_ms(),
            },
        };
        engine.handle_feed_event(&event).await;

        let portfolio = engine.portfolio.lock().await;
        let pos = portfolio.position("m1").expect("position exists");
        assert_eq!(pos.qty, 10.0);
        assert_eq!(pos.avg_price, 0.50);
    }

    /// Scenario: a market's recorded tape is replayed through the backtest
    /// driver with no live feed involved.
    /// Expected: the run completes and leaves a P&L snapshot behind.
    #[tokio::test]
    async fn backtest_replays_tape_and_persists_pnl_snapshot() {
        let cfg = Config::from_env();
        let store = Arc::new(InMemoryStore::new());
        let broker = Arc::new(PaperBroker::new(FillModel::OnBookCross, 0));
        let discovery = Arc::new(StaticMarketDiscovery::new(Vec::new()));
        let odds = Arc::new(DisabledOddsProvider);
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));

        store
            .insert_tape(
                1_000,
                TapePayload::Tob {
                    market_id: "m1".into(),
                    best_bid: Some(0.40),
                    best_bid_size: Some(10.0),
                    best_ask: Some(0.60),
                    best_ask_size: Some(10.0),
                },
            )
            .await
            .unwrap();
        store
            .insert_tape(
                2_000,
                TapePayload::Tob {
                    market_id: "m1".into(),
                    best_bid: Some(0.44),
                    best_bid_size: Some(10.0),
                    best_ask: Some(0.46),
                    best_ask_size: Some(10.0),
                },
            )
            .await
            .unwrap();

        let engine = Arc::new(Engine::new(cfg, store.clone(), broker, discovery, odds, clock));
        {
            let mut state = engine.state.lock().await;
            state.markets.insert("m1".into(), market("m1", 100_000));
        }

        engine.clone().run_backtest(0, 10_000, 1_000_000.0).await;

        let latest = store.fetch_latest_pnl().await.unwrap();
        assert!(latest.is_some());
    }
}
