//! Transport-agnostic core: pump model, relay state machine, ledger ports,
//! and the command/query services that tie them together.

pub mod error;
pub mod ports;
pub mod pump;
pub mod pump_service;
pub mod relay;

pub use error::{Error, ErrorCode};
pub use pump::{
    PinMap, PinMapError, Pump, PumpActivity, PumpAction, PumpName, PumpNameError, PumpType,
    EXPANDER_PIN_COUNT,
};
pub use pump_service::{PumpCommandService, PumpQueryService};
pub use relay::{PinState, RelayController, RelayError, RelayInitError};
