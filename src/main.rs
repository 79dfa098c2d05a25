use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use predictmarket_agent::broker::PaperBroker;
use predictmarket_agent::clock::{Clock, SystemClock};
use predictmarket_agent::config::{Config, RunMode};
use predictmarket_agent::discovery::StaticMarketDiscovery;
use predictmarket_agent::engine::Engine;
use predictmarket_agent::feed::StubFeed;
use predictmarket_agent::odds::DisabledOddsProvider;
use predictmarket_agent::store::InMemoryStore;

#[derive(Parser)]
#[command(name = "agent")]
struct Cli {
    /// Overrides RUN_MODE: scanner | paper | backtest
    #[arg(long)]
    mode: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::from_filename(".env.local").ok();

    let mut cfg = Config::from_env();
    let cli = Cli::parse();
    if let Some(mode) = cli.mode {
        cfg.run_mode = RunMode::from_str(&mode);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cfg.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = Arc::new(InMemoryStore::new());
    let broker = Arc::new(PaperBroker::new(cfg.paper_fill_model, cfg.paper_min_rest_ms));
    let discovery = Arc::new(StaticMarketDiscovery::new(Vec::new()));
    let odds = Arc::new(DisabledOddsProvider);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let engine = Arc::new(Engine::new(cfg.clone(), store, broker, discovery, odds, clock));
    if let Err(e) = engine.rehydrate().await {
        tracing::warn!(error = %e, "engine.rehydrate failed");
    }

    match cfg.run_mode {
        RunMode::Scanner => {
            engine.scanner_loop().await;
        }
        RunMode::Paper => {
            let feed = Arc::new(StubFeed::new(Arc::new(SystemClock), 0.45, 0.55));
            engine.run_paper(feed).await;
        }
        RunMode::Backtest => {
            engine
                .run_backtest(cfg.backtest_start_ts, cfg.backtest_end_ts, cfg.backtest_speed)
                .await;
        }
    }
}
