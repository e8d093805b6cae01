//! HTTP adapter: handlers, DTOs, and domain-error mapping.

mod error;
pub mod gateway;
pub mod health;
pub mod pumps;
pub mod state;
mod validation;

pub use error::ApiResult;
pub use validation::parse_pump_name;
