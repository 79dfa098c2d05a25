use async_trait::async_trait;

/// External fair-value source for the cross-venue strategy. A real
/// implementation would normalize odds from a second venue into a
/// probability; that integration is out of scope here.
#[async_trait]
pub trait ExternalOddsProvider: Send + Sync {
    /// Returns `(fair_probability, source_label)` for the given market,
    /// or `None` if no external quote is available.
    async fn fair_value(&self, market_id: &str) -> Option<(f64, &'static str)>;
}

/// Fixed mock odds for manual testing; never used to gate a real
/// trading decision, only to exercise the cross-venue strategy's
/// wiring end to end.
pub struct MockOddsProvider {
    fair: f64,
}

impl MockOddsProvider {
    pub fn new(fair: f64) -> Self {
        Self { fair }
    }
}

#[async_trait]
impl ExternalOddsProvider for MockOddsProvider {
    async fn fair_value(&self, _market_id: &str) -> Option<(f64, &'static str)> {
        Some((self.fair, "mock"))
    }
}

/// Always reports no external quote; used when the cross-venue strategy
/// should be inert (no second venue configured).
pub struct DisabledOddsProvider;

#[async_trait]
impl ExternalOddsProvider for DisabledOddsProvider {
    async fn fair_value(&self, _market_id: &str) -> Option<(f64, &'static str)> {
        None
    }
}
