use crate::risk::RiskConfig;
use crate::strategies::{CrossVenueConfig, MarketMakerConfig};
use crate::types::FillModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Scanner,
    Paper,
    Backtest,
}

impl RunMode {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "scanner" => RunMode::Scanner,
            "backtest" => RunMode::Backtest,
            _ => RunMode::Paper,
        }
    }
}

/// Top-level engine configuration, loaded from the environment with the
/// same `unwrap_or_else(default)`-per-field style used elsewhere in this
/// codebase's config loading.
#[derive(Clone)]
pub struct Config {
    pub run_mode: RunMode,

    pub scanner_interval_ms: i64,
    pub strategy_interval_ms: i64,
    pub snapshot_interval_ms: i64,
    pub unwind_interval_ms: i64,
    pub unwind_max_position_age_ms: i64,

    pub backtest_start_ts: i64,
    pub backtest_end_ts: i64,
    pub backtest_speed: f64,

    pub risk: RiskConfig,
    pub market_maker: MarketMakerConfig,
    pub cross_venue: CrossVenueConfig,

    pub paper_fill_model: FillModel,
    pub paper_min_rest_ms: i64,
    pub paper_reset_on_start: bool,

    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            run_mode: RunMode::from_str(&std::env::var("RUN_MODE").unwrap_or_else(|_| "paper".into())),

            scanner_interval_ms: env_i64("SCANNER_INTERVAL_MS", 30_000),
            strategy_interval_ms: env_i64("STRATEGY_INTERVAL_MS", 1_000),
            snapshot_interval_ms: env_i64("SNAPSHOT_INTERVAL_MS", 5_000),
            unwind_interval_ms: env_i64("UNWIND_INTERVAL_MS", 10_000),
            unwind_max_position_age_ms: env_i64("UNWIND_MAX_POSITION_AGE_MS", 3_600_000),

            backtest_start_ts: env_i64("BACKTEST_START_TS", 0),
            backtest_end_ts: env_i64("BACKTEST_END_TS", i64::MAX),
            backtest_speed: env_f64("BACKTEST_SPEED", 1.0),

            risk: RiskConfig {
                max_pos_per_market: env_f64("MAX_POS_PER_MARKET", 100.0),
                max_open_positions: env_i64("MAX_OPEN_POSITIONS", 10) as usize,
                max_event_exposure: env_f64("MAX_EVENT_EXPOSURE", 250.0),
                daily_loss_limit: env_f64("DAILY_LOSS_LIMIT", 500.0),
                max_feed_lag_ms: env_i64("MAX_FEED_LAG_MS", 5_000),
                max_spread: env_f64("MAX_SPREAD", 0.15),
                kill_switch: env_bool("KILL_SWITCH", false),
            },

            market_maker: MarketMakerConfig {
                quote_width: env_f64("MM_QUOTE_WIDTH", 0.02),
                inventory_skew: env_f64("MM_INVENTORY_SKEW", 0.5),
                max_pos: env_f64("MAX_POS_PER_MARKET", 100.0),
                tick: clamp_tick(env_f64("MM_TICK", 0.001)),
                min_life_ms: env_i64("MM_MIN_LIFE_MS", 2_000),
                reprice_threshold: env_f64("MM_REPRICE_THRESHOLD", 0.005),
                join_touch: env_bool("MM_JOIN_TOUCH", true),
                size: env_f64("MM_SIZE", 10.0),
                disallow_mock_data: env_bool("DISALLOW_MOCK_DATA", false),
            },

            cross_venue: CrossVenueConfig {
                fees_bps: env_f64("CV_FEES_BPS", 50.0),
                slippage_bps: env_f64("CV_SLIPPAGE_BPS", 10.0),
                latency_bps: env_f64("CV_LATENCY_BPS", 10.0),
                min_edge: env_f64("CV_MIN_EDGE", 0.01),
                size: env_f64("CV_SIZE", 10.0),
                cooldown_ms: env_i64("CV_COOLDOWN_MS", 5_000),
            },

            paper_fill_model: env_fill_model("PAPER_FILL_MODEL", FillModel::OnBookCross),
            paper_min_rest_ms: env_i64("PAPER_MIN_REST_MS", 0),
            paper_reset_on_start: env_bool("PAPER_RESET_ON_START", false),

            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        }
    }
}

fn clamp_tick(tick: f64) -> f64 {
    tick.max(1e-6).min(0.5)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

fn env_fill_model(key: &str, default: FillModel) -> FillModel {
    match std::env::var(key).ok().as_deref() {
        Some("on_book_cross") => FillModel::OnBookCross,
        Some("maker_touch") => FillModel::MakerTouch,
        Some("trade_through") => FillModel::TradeThrough,
        _ => default,
    }
}
