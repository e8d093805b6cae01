//! Hardware port for the shared I/O-expander bus.
//!
//! The relay controller is the only caller; it serializes access so an
//! implementation never sees concurrent writes.

use super::define_port_error;

/// Logic level on an expander pin. Relays are active-low: `Low` energizes
/// the relay (pump on), `High` de-energizes it (pump off, safe state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    High,
    Low,
}

impl std::fmt::Display for PinLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Low => f.write_str("low"),
        }
    }
}

define_port_error! {
    /// Errors raised by expander bus adapters.
    pub enum ExpanderBusError {
        /// The bus transaction failed (device not acknowledging, I/O error).
        Io { message: String } => "expander bus write failed: {message}",
    }
}

/// Port over the I/O-expander chip. One call maps to one bus transaction.
pub trait ExpanderBus: Send {
    /// Configure a pin as an output.
    fn configure_output(&mut self, pin: u8) -> Result<(), ExpanderBusError>;

    /// Drive a pin to the given level.
    fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), ExpanderBusError>;
}
