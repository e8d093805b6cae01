//! MCP23017 I/O expander over I2C via rppal.
//!
//! Pins 0-7 map to GPA0-GPA7, pins 8-15 to GPB0-GPB7. Register writes go
//! through the output latch (OLAT) so each relay transition is a single
//! bus transaction.

use rppal::i2c::I2c;

use crate::domain::ports::{ExpanderBus, ExpanderBusError, PinLevel};

const IODIR: [u8; 2] = [0x00, 0x01];
const OLAT: [u8; 2] = [0x14, 0x15];

/// Default I2C address with A0-A2 tied low.
pub const DEFAULT_ADDRESS: u16 = 0x20;

/// rppal-backed MCP23017 adapter.
///
/// Register shadows track what was last written; the power-on reset state
/// is all pins input (IODIR 0xFF) with latches high.
pub struct Mcp23017Bus {
    i2c: I2c,
    iodir: [u8; 2],
    olat: [u8; 2],
}

impl Mcp23017Bus {
    /// Open the default I2C bus and address the expander.
    pub fn new(address: u16) -> Result<Self, ExpanderBusError> {
        let mut i2c = I2c::new().map_err(|err| ExpanderBusError::io(err.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|err| ExpanderBusError::io(err.to_string()))?;
        Ok(Self {
            i2c,
            iodir: [0xFF, 0xFF],
            olat: [0xFF, 0xFF],
        })
    }

    fn bank_and_bit(pin: u8) -> (usize, u8) {
        ((pin / 8) as usize, pin % 8)
    }
}

impl ExpanderBus for Mcp23017Bus {
    fn configure_output(&mut self, pin: u8) -> Result<(), ExpanderBusError> {
        let (bank, bit) = Self::bank_and_bit(pin);
        let next = self.iodir[bank] & !(1 << bit);
        self.i2c
            .smbus_write_byte(IODIR[bank], next)
            .map_err(|err| ExpanderBusError::io(err.to_string()))?;
        self.iodir[bank] = next;
        Ok(())
    }

    fn write(&mut self, pin: u8, level: PinLevel) -> Result<(), ExpanderBusError> {
        let (bank, bit) = Self::bank_and_bit(pin);
        let next = match level {
            PinLevel::High => self.olat[bank] | (1 << bit),
            PinLevel::Low => self.olat[bank] & !(1 << bit),
        };
        self.i2c
            .smbus_write_byte(OLAT[bank], next)
            .map_err(|err| ExpanderBusError::io(err.to_string()))?;
        self.olat[bank] = next;
        Ok(())
    }
}
