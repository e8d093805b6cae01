//! Relay controller: the only component that touches the expander bus.
//!
//! Relays are active-low, so `High` is the de-energized safe state. The bus
//! is one shared resource; a single mutex guards every pin write rather
//! than per-pin locks because the bus transaction itself is the unit of
//! atomicity.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::pump::{PinMap, PumpName};
use crate::domain::ports::{ExpanderBus, PinLevel};

/// Last known level of a pin, as mirrored by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    High,
    Low,
    /// A write to the pin failed; the physical level is unknown until the
    /// next successful write.
    Unknown,
}

impl From<PinLevel> for PinState {
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::High => Self::High,
            PinLevel::Low => Self::Low,
        }
    }
}

/// Errors from relay transitions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RelayError {
    /// The name is not in the configured pin map. No bus write occurred.
    #[error("unknown pump: {name}")]
    UnknownPump { name: PumpName },
    /// The bus transaction failed. The pin's state is now unknown.
    #[error("hardware fault driving pump '{name}' {attempted}: {message}")]
    HardwareFault {
        name: PumpName,
        attempted: PinLevel,
        message: String,
    },
}

/// Initialization failure. Fatal to startup: if not every relay could be
/// driven safely off, the controller must not serve commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to initialize pin {pin} for pump '{name}': {message}")]
pub struct RelayInitError {
    pub name: PumpName,
    pub pin: u8,
    pub message: String,
}

struct RelayInner {
    bus: Box<dyn ExpanderBus>,
    states: HashMap<u8, PinState>,
}

/// Owns the expander behind one mutual-exclusion boundary.
pub struct RelayController {
    map: PinMap,
    inner: Mutex<RelayInner>,
}

impl RelayController {
    /// Configure every mapped pin as an output and drive it HIGH (all
    /// relays off) before accepting any command.
    pub fn new(mut bus: Box<dyn ExpanderBus>, map: PinMap) -> Result<Self, RelayInitError> {
        let mut states = HashMap::with_capacity(map.len());
        for (name, pin) in map.iter() {
            bus.configure_output(pin).map_err(|err| RelayInitError {
                name: name.clone(),
                pin,
                message: err.to_string(),
            })?;
            bus.write(pin, PinLevel::High).map_err(|err| RelayInitError {
                name: name.clone(),
                pin,
                message: err.to_string(),
            })?;
            states.insert(pin, PinState::High);
        }
        debug!(pins = map.len(), "relay controller initialized, all relays off");
        Ok(Self {
            map,
            inner: Mutex::new(RelayInner { bus, states }),
        })
    }

    /// Energize the relay for `name` (drive its pin LOW).
    pub async fn activate(&self, name: &PumpName) -> Result<(), RelayError> {
        self.transition(name, PinLevel::Low).await
    }

    /// De-energize the relay for `name` (drive its pin HIGH).
    pub async fn deactivate(&self, name: &PumpName) -> Result<(), RelayError> {
        self.transition(name, PinLevel::High).await
    }

    /// Best-effort sweep driving every mapped pin HIGH. Individual pin
    /// failures are logged without aborting the sweep; this never fails.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        for (name, pin) in self.map.iter() {
            match inner.bus.write(pin, PinLevel::High) {
                Ok(()) => {
                    inner.states.insert(pin, PinState::High);
                }
                Err(err) => {
                    inner.states.insert(pin, PinState::Unknown);
                    error!(pump = %name, pin, error = %err, "shutdown sweep failed for pin");
                }
            }
        }
        debug!("relay shutdown sweep complete");
    }

    /// Last known state of the pump's pin, if the pump is mapped.
    pub async fn pin_state(&self, name: &PumpName) -> Option<PinState> {
        let pin = self.map.pin_for(name)?;
        let inner = self.inner.lock().await;
        inner.states.get(&pin).copied()
    }

    async fn transition(&self, name: &PumpName, level: PinLevel) -> Result<(), RelayError> {
        let pin = self.map.pin_for(name).ok_or_else(|| RelayError::UnknownPump {
            name: name.clone(),
        })?;
        let mut inner = self.inner.lock().await;
        match inner.bus.write(pin, level) {
            Ok(()) => {
                inner.states.insert(pin, level.into());
                debug!(pump = %name, pin, level = %level, "relay transition");
                Ok(())
            }
            Err(err) => {
                inner.states.insert(pin, PinState::Unknown);
                warn!(pump = %name, pin, level = %level, error = %err, "relay write failed");
                Err(RelayError::HardwareFault {
                    name: name.clone(),
                    attempted: level,
                    message: err.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    //! Relay state machine coverage against the simulated bus.

    use rstest::rstest;

    use super::*;
    use crate::outbound::hardware::SimulatedBus;

    fn pin_map(entries: &[(&str, u16)]) -> PinMap {
        PinMap::new(
            entries
                .iter()
                .map(|(name, pin)| ((*name).to_owned(), *pin)),
        )
        .expect("valid map")
    }

    fn name(raw: &str) -> PumpName {
        PumpName::new(raw).expect("valid name")
    }

    #[rstest]
    fn initialization_drives_every_mapped_pin_high() {
        let bus = SimulatedBus::new();
        let handle = bus.handle();
        let _relay = RelayController::new(
            Box::new(bus),
            pin_map(&[("ph_up", 4), ("flush_1", 6)]),
        )
        .expect("init succeeds");

        assert_eq!(handle.level(4), Some(PinLevel::High));
        assert_eq!(handle.level(6), Some(PinLevel::High));
        assert!(handle.is_output(4));
        assert!(handle.is_output(6));
    }

    #[rstest]
    fn initialization_fails_closed_when_a_pin_write_fails() {
        let bus = SimulatedBus::new();
        bus.handle().fail_next_writes(4, 1);
        let result = RelayController::new(Box::new(bus), pin_map(&[("ph_up", 4)]));
        assert!(result.is_err(), "partial init must not report ready");
    }

    #[rstest]
    #[actix_rt::test]
    async fn activate_then_deactivate_leaves_the_pin_high() {
        let bus = SimulatedBus::new();
        let handle = bus.handle();
        let relay = RelayController::new(Box::new(bus), pin_map(&[("ph_up", 4)]))
            .expect("init succeeds");
        let pump = name("ph_up");

        relay.activate(&pump).await.expect("activate");
        assert_eq!(handle.level(4), Some(PinLevel::Low));
        relay.deactivate(&pump).await.expect("deactivate");
        assert_eq!(handle.level(4), Some(PinLevel::High));
    }

    #[rstest]
    #[actix_rt::test]
    async fn unknown_pumps_fail_without_any_bus_write() {
        let bus = SimulatedBus::new();
        let handle = bus.handle();
        let relay = RelayController::new(Box::new(bus), pin_map(&[("ph_up", 4)]))
            .expect("init succeeds");
        let writes_after_init = handle.write_count();

        let error = relay
            .activate(&name("mystery"))
            .await
            .expect_err("must fail");
        assert!(matches!(error, RelayError::UnknownPump { .. }));
        assert_eq!(handle.write_count(), writes_after_init);
    }

    #[rstest]
    #[actix_rt::test]
    async fn a_failed_write_marks_the_pin_unknown_until_the_next_success() {
        let bus = SimulatedBus::new();
        let handle = bus.handle();
        let relay = RelayController::new(Box::new(bus), pin_map(&[("ph_up", 4)]))
            .expect("init succeeds");
        let pump = name("ph_up");

        handle.fail_next_writes(4, 1);
        let error = relay.activate(&pump).await.expect_err("write fails");
        assert!(matches!(
            error,
            RelayError::HardwareFault {
                attempted: PinLevel::Low,
                ..
            }
        ));
        assert_eq!(relay.pin_state(&pump).await, Some(PinState::Unknown));

        relay.activate(&pump).await.expect("recovers");
        assert_eq!(relay.pin_state(&pump).await, Some(PinState::Low));
    }

    #[rstest]
    #[actix_rt::test]
    async fn shutdown_sweeps_all_pins_high_despite_individual_failures() {
        let bus = SimulatedBus::new();
        let handle = bus.handle();
        let relay = RelayController::new(
            Box::new(bus),
            pin_map(&[("ph_up", 4), ("flush_1", 6)]),
        )
        .expect("init succeeds");

        relay.activate(&name("ph_up")).await.expect("activate");
        relay.activate(&name("flush_1")).await.expect("activate");
        handle.fail_next_writes(4, 1);

        relay.shutdown().await;

        // Pin 4 failed its sweep write but pin 6 still went high.
        assert_eq!(relay.pin_state(&name("ph_up")).await, Some(PinState::Unknown));
        assert_eq!(handle.level(6), Some(PinLevel::High));
    }
}
