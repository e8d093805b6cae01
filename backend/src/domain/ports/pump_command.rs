//! Driving port for pump on/off commands.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::pump::{PumpAction, PumpName};
use crate::domain::Error;

/// Result of an accepted pump command. Also the wire body both tiers
/// exchange for command responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpStateChange {
    /// The pump the command addressed.
    pub pump: PumpName,
    /// The state the pump is now in.
    pub state: PumpAction,
}

/// Port for executing pump commands: relay transition plus ledger update.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PumpCommand: Send + Sync {
    /// Turn the named pump on. Idempotent: a pump that is already on is
    /// reported as on without a second physical activation.
    async fn turn_on(&self, name: &PumpName) -> Result<PumpStateChange, Error>;

    /// Turn the named pump off. Always safe to issue, including for pumps
    /// that are already off.
    async fn turn_off(&self, name: &PumpName) -> Result<PumpStateChange, Error>;
}
