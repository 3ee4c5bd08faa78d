pub mod mcp23017;

/// Trait for the port expander bridging the display's parallel bus. Each call is a single
/// register transaction on the underlying bus and is atomic from the driver's point of view.
pub trait PortExpander {
    /// Error of the underlying bus
    type Error: core::fmt::Debug;

    /// Sets the bits of `mask` in `register`, leaving the other bits untouched.
    fn set_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error>;

    /// Clears the bits of `mask` in `register`, leaving the other bits untouched.
    fn clear_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error>;

    /// Writes a full byte to `register`.
    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;
}

/// Lets a display borrow an expander owned elsewhere.
impl<T> PortExpander for &mut T
where
    T: PortExpander + ?Sized,
{
    type Error = T::Error;

    fn set_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        T::set_bits(self, register, mask)
    }

    fn clear_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        T::clear_bits(self, register, mask)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        T::write_byte(self, register, value)
    }
}
