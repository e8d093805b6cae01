//! In-memory expander bus for tests and non-Pi builds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::ports::{ExpanderBus, ExpanderBusError, PinLevel};

#[derive(Debug, Default)]
struct SimState {
    levels: HashMap<u8, PinLevel>,
    outputs: HashMap<u8, bool>,
    fail_writes: HashMap<u8, u32>,
    write_count: usize,
}

/// Simulated expander bus. Pin levels start undriven; only writes set them,
/// which lets tests prove that initialization drives every pin HIGH.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<SimState>>,
}

/// Cloneable inspection and fault-injection handle onto a [`SimulatedBus`].
#[derive(Debug, Clone)]
pub struct SimulatedBusHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBus {
    /// Create a bus with all pins undriven.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for observing pin levels and injecting write failures.
    pub fn handle(&self) -> SimulatedBusHandle {
        SimulatedBusHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl SimulatedBusHandle {
    /// Last driven level of a pin, if any write reached it.
    pub fn level(&self, pin: u8) -> Option<PinLevel> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.levels.get(&pin).copied())
    }

    /// Whether the pin was configured as an output.
    pub fn is_output(&self, pin: u8) -> bool {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.outputs.get(&pin).copied())
            .unwrap_or(false)
    }

    /// Total number of successful and failed write transactions.
    pub fn write_count(&self) -> usize {
        self.state.lock().map(|state| state.write_count).unwrap_or(0)
    }

    /// Make the next `count` writes to `pin` fail with an I/O error.
    pub fn fail_next_writes(&self, pin: u8, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_writes.insert(pin, count);
        }
    }
}

impl ExpanderBus for SimulatedBus {
    fn configure_output(&mut self, pin: u8) -> Result<(), ExpanderBusError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ExpanderBusError::io("simulated bus state poisoned"))?;
        state.outputs.insert(pin, true);
        Ok(())
    }

    fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), ExpanderBusError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ExpanderBusError::io("simulated bus state poisoned"))?;
        state.write_count += 1;
        if let Some(remaining) = state.fail_writes.get_mut(&pin) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExpanderBusError::io(format!(
                    "injected failure on pin {pin}"
                )));
            }
        }
        state.levels.insert(pin, level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the fault-injection behavior.

    use rstest::rstest;

    use super::*;

    #[rstest]
    fn injected_failures_expire_after_the_requested_count() {
        let mut bus = SimulatedBus::new();
        let handle = bus.handle();
        handle.fail_next_writes(3, 2);

        assert!(bus.write(3, PinLevel::High).is_err());
        assert!(bus.write(3, PinLevel::High).is_err());
        assert!(bus.write(3, PinLevel::Low).is_ok());
        assert_eq!(handle.level(3), Some(PinLevel::Low));
        assert_eq!(handle.write_count(), 3);
    }

    #[rstest]
    fn failures_on_one_pin_do_not_affect_others() {
        let mut bus = SimulatedBus::new();
        let handle = bus.handle();
        handle.fail_next_writes(3, 1);

        assert!(bus.write(5, PinLevel::Low).is_ok());
        assert_eq!(handle.level(5), Some(PinLevel::Low));
        assert_eq!(handle.level(3), None);
    }
}
