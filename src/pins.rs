use crate::ConfigurationFault;

/// Number of GPIO pins on one expander port.
pub const PORT_PIN_COUNT: u8 = 8;

/// Selects the HD44780 register a transfer goes to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterSelect {
    /// Instruction register (RS low)
    Command,
    /// Data register, either CGRAM or DDRAM depending on the last address command (RS high)
    Data,
}

impl RegisterSelect {
    pub const fn is_data(&self) -> bool {
        matches!(self, RegisterSelect::Data)
    }
}

/// Assignment of the HD44780 control and data lines to the pins of one 8-bit expander port.
/// Pins are given as bit positions within the port. `data[0]` drives DB4 and `data[3]` drives DB7,
/// the 4 bit interface does not use DB0-DB3.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinMapping {
    rs: u8,
    enable: u8,
    data: [u8; 4],
}

impl PinMapping {
    /// Creates a pin mapping. All pins must be distinct and within `0..8`.
    pub fn new(rs: u8, enable: u8, data: [u8; 4]) -> Result<Self, ConfigurationFault> {
        let pins = [rs, enable, data[0], data[1], data[2], data[3]];
        let mut seen = 0u8;
        for pin in pins {
            if pin >= PORT_PIN_COUNT {
                return Err(ConfigurationFault::PinOutOfRange);
            }
            if seen & (1 << pin) != 0 {
                return Err(ConfigurationFault::DuplicatePin);
            }
            seen |= 1 << pin;
        }
        Ok(Self { rs, enable, data })
    }

    pub fn rs(&self) -> u8 {
        self.rs
    }

    pub fn enable(&self) -> u8 {
        self.enable
    }

    pub fn data(&self) -> [u8; 4] {
        self.data
    }

    /// Bit mask of the enable line within the port.
    pub fn enable_mask(&self) -> u8 {
        1 << self.enable
    }

    /// Builds the port image presenting `nibble` (low 4 bits) on the data lines, with RS set
    /// according to `mode`. The enable line is always low in the image.
    pub fn pin_image(&self, nibble: u8, mode: RegisterSelect) -> u8 {
        let mut image = if mode.is_data() { 1 << self.rs } else { 0 };
        for (bit, pin) in self.data.iter().enumerate() {
            if nibble & (1 << bit) != 0 {
                image |= 1 << pin;
            }
        }
        image
    }

    /// Recovers the (mode, nibble) pair from a port image. Inverse of `pin_image`.
    pub fn decode_image(&self, image: u8) -> (RegisterSelect, u8) {
        let mode = if image & (1 << self.rs) != 0 {
            RegisterSelect::Data
        } else {
            RegisterSelect::Command
        };
        let mut nibble = 0;
        for (bit, pin) in self.data.iter().enumerate() {
            if image & (1 << pin) != 0 {
                nibble |= 1 << bit;
            }
        }
        (mode, nibble)
    }
}

impl Default for PinMapping {
    /// Wiring of the common MCP23017 character LCD plates on port B:
    /// RS on GPB7, EN on GPB5, DB4-DB7 on GPB4-GPB1 (GPB6 is RW and held low).
    fn default() -> Self {
        Self {
            rs: 7,
            enable: 5,
            data: [4, 3, 2, 1],
        }
    }
}
