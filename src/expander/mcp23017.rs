use embedded_hal::i2c;

use super::PortExpander;

// Register addresses with IOCON.BANK = 0 (the power-on default)
pub const IODIRA: u8 = 0x00;
pub const IODIRB: u8 = 0x01;
pub const GPIOA: u8 = 0x12;
pub const GPIOB: u8 = 0x13;
pub const OLATA: u8 = 0x14;
pub const OLATB: u8 = 0x15;

/// MCP23017 16-bit I2C port expander. The output latches of both ports are shadowed, so setting
/// or clearing bits on a GPIO/OLAT register costs a single I2C write.
pub struct Mcp23017<I2C> {
    i2c: I2C,
    address: u8,
    latch: [u8; 2],
}

impl<I2C> Mcp23017<I2C>
where
    I2C: i2c::I2c,
{
    /// Address with A0-A2 tied low
    pub const DEFAULT_ADDRESS: u8 = 0x20;

    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            latch: [0; 2],
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Configures all 16 pins as outputs and drives them low.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        // sequential addressing writes IODIRA then IODIRB
        self.i2c.write(self.address, &[IODIRA, 0x00, 0x00])?;
        self.i2c.write(self.address, &[OLATA, 0x00, 0x00])?;
        self.latch = [0; 2];
        Ok(())
    }

    /// Hands the bus back. The expander never closes the bus itself.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// returns the i2c object. mostly used for testing
    pub fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    fn latch_index(register: u8) -> Option<usize> {
        match register {
            GPIOA | OLATA => Some(0),
            GPIOB | OLATB => Some(1),
            _ => None,
        }
    }

    fn read_register(&mut self, register: u8) -> Result<u8, I2C::Error> {
        let mut buffer = [0];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)?;
        Ok(buffer[0])
    }

    fn update_register(
        &mut self,
        register: u8,
        update: impl FnOnce(u8) -> u8,
    ) -> Result<(), I2C::Error> {
        let current = match Self::latch_index(register) {
            Some(port) => self.latch[port],
            None => self.read_register(register)?,
        };
        self.write_byte(register, update(current))
    }
}

impl<I2C> PortExpander for Mcp23017<I2C>
where
    I2C: i2c::I2c,
{
    type Error = I2C::Error;

    fn set_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        self.update_register(register, |value| value | mask)
    }

    fn clear_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        self.update_register(register, |value| value & !mask)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(self.address, &[register, value])?;
        if let Some(port) = Self::latch_index(register) {
            self.latch[port] = value;
        }
        Ok(())
    }
}
