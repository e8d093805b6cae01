//! Driving port for read-only pump and activity listings.

use async_trait::async_trait;

use crate::domain::pump::{Pump, PumpActivity};
use crate::domain::Error;

use super::pump_repository::Page;

/// Port for paginated ledger reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PumpQuery: Send + Sync {
    /// List provisioned pumps ordered by id.
    async fn list_pumps(&self, page: Page) -> Result<Vec<Pump>, Error>;

    /// List activities newest first, optionally for a single pump.
    async fn list_activities(
        &self,
        pump_id: Option<i32>,
        page: Page,
    ) -> Result<Vec<PumpActivity>, Error>;
}
