//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **hardware**: MCP23017 expander bus over I2C, plus a simulated bus
//! - **persistence**: PostgreSQL-backed ledger using Diesel
//! - **upstream**: reqwest client the gateway uses to reach the hardware tier
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. They contain no business logic.

pub mod hardware;
pub mod persistence;
pub mod upstream;
