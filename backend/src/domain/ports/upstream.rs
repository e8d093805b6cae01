//! Port the front tier uses to reach the hardware tier.

use async_trait::async_trait;

use crate::domain::pump::{PumpAction, PumpName};
use crate::domain::Error;

use super::define_port_error;
use super::pump_command::PumpStateChange;

define_port_error! {
    /// Transport-level failures reaching the hardware tier.
    pub enum UpstreamError {
        /// Connection failed or the response could not be read.
        Transport { message: String } =>
            "error communicating with pump service: {message}",
        /// The forwarding call exceeded its request timeout.
        Timeout { message: String } =>
            "pump service timed out: {message}",
    }
}

/// Outcome of a forwarded pump command that did not succeed.
///
/// The two arms are deliberately distinguishable: a downstream domain error
/// (for example an unknown pump) is relayed verbatim, while a transport
/// failure becomes `UpstreamUnavailable` at the gateway and is never
/// conflated with a pump lookup miss.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamForwardError {
    /// The hardware tier answered with a domain error envelope.
    #[error(transparent)]
    Downstream(Error),
    /// The hardware tier was unreachable or the call timed out.
    #[error(transparent)]
    Transport(UpstreamError),
}

/// Port for forwarding pump commands and health inquiries downstream.
///
/// One inbound request maps to exactly one downstream call: no retries, no
/// fan-out. A retried relay toggle is not idempotent from the physical
/// world's perspective when the first attempt succeeded but its
/// acknowledgment was lost.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UpstreamPumpService: Send + Sync {
    /// Forward an on/off command for the named pump.
    async fn set_state(
        &self,
        name: &PumpName,
        action: PumpAction,
    ) -> Result<PumpStateChange, UpstreamForwardError>;

    /// Query the hardware tier's health endpoint.
    async fn health(&self) -> Result<serde_json::Value, UpstreamError>;
}
