use thiserror::Error;

/// Typed error surface for the engine. Pricing/risk checks use `RiskCheck`
/// (see `risk.rs`) rather than this enum; `EngineError` covers the
/// infrastructure-level failure modes named by the recognized circuit and
/// persistence faults.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("circuit open: {0}")]
    CircuitOpen(&'static str),

    #[error("risk rejected: {0}")]
    RiskRejected(&'static str),

    #[error("transient io: {0}")]
    TransientIO(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
