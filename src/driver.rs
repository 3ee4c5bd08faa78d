// Nibble transfer engine and byte protocol.
// The DisplayBus owns everything needed to move bytes onto the HD44780 through the expander: the
// expander itself, the register driving the display pins, the pin mapping and the strobe timing.
// The session state machine in `hd44780` builds on top of it.

pub mod hd44780;

use embedded_hal::delay::DelayNs;

use crate::{
    config::Timing,
    expander::PortExpander,
    pins::{PinMapping, RegisterSelect},
    DisplayError,
};

pub struct DisplayBus<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    expander: EXP,
    register: u8,
    pins: PinMapping,
    timing: Timing,
    delay: DELAY,
}

impl<EXP, DELAY> DisplayBus<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    pub fn new(expander: EXP, register: u8, pins: PinMapping, timing: Timing, delay: DELAY) -> Self {
        Self {
            expander,
            register,
            pins,
            timing,
            delay,
        }
    }

    pub fn pins(&self) -> &PinMapping {
        &self.pins
    }

    /// return a mutable reference to the delay object
    pub fn delay(&mut self) -> &mut DELAY {
        &mut self.delay
    }

    /// returns the expander object. mostly used for testing
    pub fn expander(&mut self) -> &mut EXP {
        &mut self.expander
    }

    pub fn release(self) -> (EXP, DELAY) {
        (self.expander, self.delay)
    }

    /// Strobes the enable line. Only the EN bit is touched, so the nibble and RS already latched
    /// on the other pins stay in place while the controller samples them.
    pub fn toggle_enable(&mut self) -> Result<(), DisplayError<EXP::Error>> {
        let enable = self.pins.enable_mask();
        self.expander
            .set_bits(self.register, enable)
            .map_err(DisplayError::BusError)?;
        self.delay.delay_ns(self.timing.enable_hold_ns());
        self.expander
            .clear_bits(self.register, enable)
            .map_err(DisplayError::BusError)?;
        self.delay.delay_ns(self.timing.enable_hold_ns());
        Ok(())
    }

    /// Presents the low nibble of `nibble` and the RS line on the port, then latches it into the
    /// controller. Used directly only during the initialization handshake.
    pub fn send_nibble(
        &mut self,
        nibble: u8,
        mode: RegisterSelect,
    ) -> Result<(), DisplayError<EXP::Error>> {
        let image = self.pins.pin_image(nibble & 0x0F, mode);
        trace!("nibble {=u8:#x} image {=u8:#010b}", nibble & 0x0F, image);
        self.expander
            .write_byte(self.register, image)
            .map_err(DisplayError::BusError)?;
        self.toggle_enable()
    }

    /// writes a full byte in 4 bit mode, high nibble first as the controller expects.
    pub fn write_byte(
        &mut self,
        value: u8,
        mode: RegisterSelect,
    ) -> Result<(), DisplayError<EXP::Error>> {
        self.send_nibble(value >> 4, mode)?;
        self.send_nibble(value & 0x0F, mode)
    }

    pub fn write_command(&mut self, command: u8) -> Result<(), DisplayError<EXP::Error>> {
        self.write_byte(command, RegisterSelect::Command)
    }

    pub fn write_data(&mut self, data: u8) -> Result<(), DisplayError<EXP::Error>> {
        self.write_byte(data, RegisterSelect::Data)
    }

    /// Writes raw character codes. Not atomic with respect to other writers.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), DisplayError<EXP::Error>> {
        for &byte in data {
            self.write_data(byte)?;
        }
        Ok(())
    }

    /// Writes each character as one data byte. Characters outside the controller's 8 bit
    /// character set are truncated to their low byte.
    pub fn write_string(&mut self, text: &str) -> Result<(), DisplayError<EXP::Error>> {
        for c in text.chars() {
            self.write_data(c as u8)?;
        }
        Ok(())
    }
}
