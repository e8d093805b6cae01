//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod expander_bus;
mod pump_command;
mod pump_query;
mod pump_repository;
mod upstream;

pub use expander_bus::{ExpanderBus, ExpanderBusError, PinLevel};
pub use pump_command::{PumpCommand, PumpStateChange};
pub use pump_query::PumpQuery;
pub use pump_repository::{
    InMemoryPumpRepository, Page, PageError, PumpRepository, PumpRepositoryError,
    RecordOnOutcome,
};
pub use upstream::{UpstreamError, UpstreamForwardError, UpstreamPumpService};

#[cfg(test)]
pub use pump_command::MockPumpCommand;
#[cfg(test)]
pub use pump_query::MockPumpQuery;
#[cfg(test)]
pub use pump_repository::MockPumpRepository;
#[cfg(test)]
pub use upstream::MockUpstreamPumpService;
