//! Expander bus adapters: the real MCP23017 and a simulated stand-in.

mod simulated;
pub use simulated::{SimulatedBus, SimulatedBusHandle};

#[cfg(feature = "hardware")]
mod mcp23017;
#[cfg(feature = "hardware")]
pub use mcp23017::Mcp23017Bus;
