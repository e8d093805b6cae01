//! Port for pump and activity persistence (the activity ledger).

use async_trait::async_trait;

use crate::domain::pump::{Pump, PumpActivity, PumpName};
use crate::domain::PinMap;

use super::define_port_error;

define_port_error! {
    /// Errors raised by ledger adapters.
    pub enum PumpRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "pump repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "pump repository query failed: {message}",
        /// The named pump is not provisioned in the ledger.
        NotFound { name: String } =>
            "pump '{name}' not found",
    }
}

/// Offset/limit pagination window for listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    skip: i64,
    limit: i64,
}

/// Validation errors for [`Page`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    #[error("skip must not be negative")]
    NegativeSkip,
    #[error("limit must be positive")]
    NonPositiveLimit,
}

impl Page {
    /// Default listing window when the caller omits `limit`.
    pub const DEFAULT_LIMIT: i64 = 100;
    /// Hard cap applied to caller-supplied limits.
    pub const MAX_LIMIT: i64 = 500;

    /// Build a window from optional query parameters, applying defaults and
    /// clamping oversized limits.
    pub fn new(skip: Option<i64>, limit: Option<i64>) -> Result<Self, PageError> {
        let skip = skip.unwrap_or(0);
        if skip < 0 {
            return Err(PageError::NegativeSkip);
        }
        let limit = limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit <= 0 {
            return Err(PageError::NonPositiveLimit);
        }
        Ok(Self {
            skip,
            limit: limit.min(Self::MAX_LIMIT),
        })
    }

    /// Rows to skip.
    pub fn skip(&self) -> i64 {
        self.skip
    }

    /// Maximum rows to return.
    pub fn limit(&self) -> i64 {
        self.limit
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Outcome of [`PumpRepository::record_on`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOnOutcome {
    /// The open ON activity after the call (fresh or pre-existing).
    pub activity: PumpActivity,
    /// True when an open ON already existed and the call was a no-op.
    pub was_open: bool,
}

/// Port for the activity ledger: the single writer of pump rows.
///
/// `record_on` and `record_off` must be linearizable per pump: adapters
/// guard the read-then-write sequence with a transactional row lock so two
/// concurrent calls can never both observe the same open ON.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PumpRepository: Send + Sync {
    /// Resolve a pump by its wire-level name.
    async fn find_by_name(&self, name: &PumpName)
        -> Result<Option<Pump>, PumpRepositoryError>;

    /// List provisioned pumps ordered by id.
    async fn list_pumps(&self, page: Page) -> Result<Vec<Pump>, PumpRepositoryError>;

    /// List activities, newest first, optionally restricted to one pump.
    async fn list_activities(
        &self,
        pump_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<PumpActivity>, PumpRepositoryError>;

    /// Append an ON activity and mark the pump active. A no-op when an open
    /// ON already exists for the pump.
    async fn record_on(&self, name: &PumpName)
        -> Result<RecordOnOutcome, PumpRepositoryError>;

    /// Append an OFF activity and mark the pump inactive. When an open ON
    /// exists its elapsed time becomes the OFF record's duration; otherwise
    /// the OFF is recorded with no duration (off is always safe to issue).
    async fn record_off(&self, name: &PumpName)
        -> Result<PumpActivity, PumpRepositoryError>;

    /// Reconcile a pin map into the ledger: create missing pumps with their
    /// inferred type, update pins that moved, leave unmapped pumps alone.
    async fn sync_config(&self, map: &PinMap) -> Result<Vec<Pump>, PumpRepositoryError>;

    /// Operational removal of a pump row. Not exercised by command flow.
    async fn delete_pump(&self, pump_id: i32) -> Result<bool, PumpRepositoryError>;
}

mod in_memory;
pub use in_memory::InMemoryPumpRepository;

#[cfg(test)]
mod tests {
    //! Regression coverage for pagination windows.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn defaults_apply_when_parameters_are_omitted() {
        let page = Page::new(None, None).expect("defaults are valid");
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), Page::DEFAULT_LIMIT);
    }

    #[rstest]
    fn oversized_limits_are_clamped() {
        let page = Page::new(Some(10), Some(10_000)).expect("clamped");
        assert_eq!(page.limit(), Page::MAX_LIMIT);
        assert_eq!(page.skip(), 10);
    }

    #[rstest]
    #[case::negative_skip(Some(-1), None, PageError::NegativeSkip)]
    #[case::zero_limit(None, Some(0), PageError::NonPositiveLimit)]
    #[case::negative_limit(None, Some(-5), PageError::NonPositiveLimit)]
    fn invalid_windows_are_rejected(
        #[case] skip: Option<i64>,
        #[case] limit: Option<i64>,
        #[case] expected: PageError,
    ) {
        assert_eq!(Page::new(skip, limit).expect_err("must fail"), expected);
    }
}
