//! Shared HTTP adapter state.
//!
//! Handlers accept these via `actix_web::web::Data` so they only depend on
//! domain ports and remain testable without hardware or a database.

use std::sync::Arc;

use crate::domain::ports::{PumpCommand, PumpQuery, UpstreamPumpService};

/// Dependency bundle for the hardware tier's handlers.
#[derive(Clone)]
pub struct HttpState {
    pub commands: Arc<dyn PumpCommand>,
    pub queries: Arc<dyn PumpQuery>,
}

/// Dependency bundle for the front tier's handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub upstream: Arc<dyn UpstreamPumpService>,
}
