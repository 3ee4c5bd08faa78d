//! This Rust `embedded-hal`-based library drives a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display wired to an MCP23017 I2C port expander, in an embedded, `no_std` environment.
//! The expander acts as a parallel bus bridge: RS, EN and the four data lines DB4-DB7 of the display sit on the pins of
//! one expander port, and the driver produces the timed sequence of nibble writes and enable strobes the HD44780 expects.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display, with chainable calls
//! - Configurable pin mapping, register and geometry
//! - Support for custom characters, including a ready made set of PacMan glyphs
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Shared access from several jobs through a scoped display lock, with a scrolling ticker and a
//!   two-frame clock as ready made jobs
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! hd44780-mcp23017 = { version = "0.1", features = ["defmt"] }
//! ```
//! The `defmt` feature enables logging through `defmt` and lets the library's errors be formatted with it. The `ufmt` feature
//! allows the `uwriteln!` and `uwrite!` macros to be used. The `std` feature adds the `std::sync::Mutex` display lock and
//! thread based job runners.
//!
//! Create the expander and the display:
//! ```rust
//! use hd44780_mcp23017::{CharacterDisplay, DisplayConfig, LcdDisplayType, Mcp23017};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! let mut expander = Mcp23017::new(i2c, Mcp23017::DEFAULT_ADDRESS);
//! expander.init()?;
//! let mut lcd = CharacterDisplay::new(expander, DisplayConfig::new(LcdDisplayType::Lcd20x4), delay);
//! ```
//! Initialize the display. The function flags are written once here and cannot be changed without `reinitialize`:
//! ```rust
//! use hd44780_mcp23017::{DisplayFlags, EntryFlags, FunctionFlags, MoveFlags};
//!
//! lcd.initialize(
//!     FunctionFlags::new(false, true, false), // 4 bit, 2 lines, 5x8 font
//!     DisplayFlags::new(true, false, false),  // display on, no cursor, no blink
//!     EntryFlags::new(true, false),           // increment, no shift
//!     MoveFlags::new(false, true),            // move cursor right
//! )?;
//! ```
//! Use the display:
//! ```rust
//! lcd.goto(1, 0)?.write_string("Hello, world!")?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "Hello, world!")?;
//! ```
//! Note that `set_display_mode`, `set_entry_mode` and `set_move_mode` clear the display after changing the mode.
//!
//! ### Shared access
//! A display wrapped in a lock implementing `DisplayLock` can be used by several jobs at once. Each cursor move and the
//! write following it happen under one lock acquisition, see `scheduler::write_at`. The `jobs` module has a ticker-tape
//! scroller and a two-frame clock built on top of it.
//!
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod driver;
pub mod expander;
pub mod glyph;
pub mod jobs;
pub mod pins;
pub mod scheduler;

#[cfg(test)]
mod testing;

use core::fmt::Display;

use embedded_hal::delay::DelayNs;

pub use command::{DisplayFlags, EntryFlags, FunctionFlags, ModeState, MoveFlags};
pub use config::{DisplayConfig, Geometry, LcdDisplayType, Timing};
pub use driver::hd44780::SessionState;
pub use expander::{mcp23017::Mcp23017, PortExpander};
pub use glyph::{Glyph, GlyphTable, PACMAN_GLYPHS};
pub use pins::{PinMapping, RegisterSelect};
pub use scheduler::DisplayLock;

use driver::{hd44780::Session, DisplayBus};

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Configuration faults. These are detected before anything is written to the display.
pub enum ConfigurationFault {
    /// A pin index is outside of the expander port
    PinOutOfRange,
    /// Two display lines are mapped to the same pin
    DuplicatePin,
    /// Row or column count is not supported by the HD44780
    UnsupportedGeometry,
    /// The expander only carries DB4-DB7, so the display cannot run an 8 bit bus
    EightBitBus,
    /// Function flags can only be set once per initialization
    FunctionFlagsLocked,
    /// CGRAM holds at most 8 glyphs
    TooManyGlyphs,
    /// Ticker text plus padding does not fit the ticker buffer
    TickerTextTooLong,
    /// Calendar line length exceeds the calendar buffer
    CalendarBufferTooLong,
    /// Calendar format uses an unsupported conversion
    UnsupportedFormat,
    /// Formatted calendar line is longer than its configured length
    CalendarOverflow,
}

impl From<&ConfigurationFault> for &'static str {
    fn from(fault: &ConfigurationFault) -> Self {
        match fault {
            ConfigurationFault::PinOutOfRange => "Pin out of range",
            ConfigurationFault::DuplicatePin => "Duplicate pin",
            ConfigurationFault::UnsupportedGeometry => "Unsupported geometry",
            ConfigurationFault::EightBitBus => "8 bit bus not supported",
            ConfigurationFault::FunctionFlagsLocked => "Function flags locked",
            ConfigurationFault::TooManyGlyphs => "Too many glyphs",
            ConfigurationFault::TickerTextTooLong => "Ticker text too long",
            ConfigurationFault::CalendarBufferTooLong => "Calendar buffer too long",
            ConfigurationFault::UnsupportedFormat => "Unsupported format",
            ConfigurationFault::CalendarOverflow => "Calendar line overflow",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigurationFault {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for ConfigurationFault {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for ConfigurationFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the display. `E` is the error of the port expander.
pub enum DisplayError<E> {
    /// Error returned from the port expander or the bus behind it
    BusError(E),
    /// Cursor position or glyph slot is out of range
    OutOfRange,
    /// Invalid configuration
    ConfigurationError(ConfigurationFault),
    /// The display has not been initialized
    NotInitialized,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<E> From<core::fmt::Error> for DisplayError<E> {
    fn from(err: core::fmt::Error) -> Self {
        DisplayError::FormattingError(err)
    }
}

impl<E> From<ConfigurationFault> for DisplayError<E> {
    fn from(fault: ConfigurationFault) -> Self {
        DisplayError::ConfigurationError(fault)
    }
}

impl<E> From<&DisplayError<E>> for &'static str {
    fn from(err: &DisplayError<E>) -> Self {
        match err {
            DisplayError::BusError(_) => "Bus error",
            DisplayError::OutOfRange => "Out of range",
            DisplayError::ConfigurationError(fault) => From::from(fault),
            DisplayError::NotInitialized => "Display not initialized",
            DisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for DisplayError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for DisplayError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<E> Display for DisplayError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// HD44780 character display behind a port expander.
pub struct CharacterDisplay<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    bus: DisplayBus<EXP, DELAY>,
    session: Session,
}

impl<EXP, DELAY> CharacterDisplay<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    /// Create a new display. Nothing is written until `initialize` is called.
    pub fn new(expander: EXP, config: DisplayConfig, delay: DELAY) -> Self {
        Self {
            bus: DisplayBus::new(
                expander,
                config.register,
                config.pins,
                config.timing,
                delay,
            ),
            session: Session::new(config.geometry),
        }
    }

    /// Initialize the display. This must be called before using the display.
    pub fn initialize(
        &mut self,
        function: FunctionFlags,
        display: DisplayFlags,
        entry: EntryFlags,
        movement: MoveFlags,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session
            .initialize(&mut self.bus, function, display, entry, movement)?;
        Ok(self)
    }

    /// Run the full initialization again, possibly with different function flags.
    pub fn reinitialize(
        &mut self,
        function: FunctionFlags,
        display: DisplayFlags,
        entry: EntryFlags,
        movement: MoveFlags,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session
            .reinitialize(&mut self.bus, function, display, entry, movement)?;
        Ok(self)
    }

    /// returns the current session state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// returns the mode flags last written to the display
    pub fn modes(&self) -> &ModeState {
        self.session.modes()
    }

    pub fn geometry(&self) -> &Geometry {
        self.session.geometry()
    }

    /// returns the expander object. mostly used for testing
    pub fn expander(&mut self) -> &mut EXP {
        self.bus.expander()
    }

    /// Give back the expander and the delay. The bus behind the expander is never closed by the display.
    pub fn release(self) -> (EXP, DELAY) {
        self.bus.release()
    }

    //--------------------------------------------------------------------------------------------------
    // raw transfers, usable in any state
    //--------------------------------------------------------------------------------------------------

    /// Writes a command byte to the display. Normally users do not need to call this directly.
    pub fn write_command(
        &mut self,
        command: u8,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.bus.write_command(command)?;
        Ok(self)
    }

    /// Writes a data byte to the display at the current address.
    pub fn write_data(
        &mut self,
        data: u8,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.bus.write_data(data)?;
        Ok(self)
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Prints a string at the current cursor position.
    pub fn write_string(&mut self, text: &str) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.ensure_ready()?;
        self.bus.write_string(text)?;
        Ok(self)
    }

    /// Writes raw character codes at the current cursor position. Codes 0-7 show the custom glyphs.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.ensure_ready()?;
        self.bus.write_bytes(data)?;
        Ok(self)
    }

    /// Set the cursor position at specified row and column. Rows and columns are zero-indexed.
    pub fn goto(&mut self, row: u8, col: u8) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.goto(&mut self.bus, row, col)?;
        Ok(self)
    }

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.clear(&mut self.bus)?;
        Ok(self)
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.home(&mut self.bus)?;
        Ok(self)
    }

    /// Set the entry mode. The display is cleared afterwards.
    pub fn set_entry_mode(
        &mut self,
        entry: EntryFlags,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.set_entry_mode(&mut self.bus, entry)?;
        Ok(self)
    }

    /// Set display visibility, cursor and blink. The display is cleared afterwards.
    pub fn set_display_mode(
        &mut self,
        display: DisplayFlags,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.set_display_mode(&mut self.bus, display)?;
        Ok(self)
    }

    /// Shift the cursor or the display. The display is cleared afterwards.
    pub fn set_move_mode(
        &mut self,
        movement: MoveFlags,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.set_move_mode(&mut self.bus, movement)?;
        Ok(self)
    }

    /// Load a glyph table into CGRAM. Glyph `i` is shown for character code `i`.
    pub fn load_glyphs(
        &mut self,
        table: &GlyphTable,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.load_glyphs(&mut self.bus, table)?;
        Ok(self)
    }

    /// Create a single custom character in slot `location` (0-7).
    pub fn create_glyph(
        &mut self,
        location: u8,
        glyph: &Glyph,
    ) -> Result<&mut Self, DisplayError<EXP::Error>> {
        self.session.create_glyph(&mut self.bus, location, glyph)?;
        Ok(self)
    }

    fn ensure_ready(&self) -> Result<(), DisplayError<EXP::Error>> {
        if self.session.state() != SessionState::Ready {
            return Err(DisplayError::NotInitialized);
        }
        Ok(())
    }
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the `write!` macro.
impl<EXP, DELAY> core::fmt::Write for CharacterDisplay<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.write_string(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
impl<EXP, DELAY> ufmt::uWrite for CharacterDisplay<EXP, DELAY>
where
    EXP: PortExpander,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), DisplayError<EXP::Error>> {
        self.write_string(s)?;
        Ok(())
    }

    type Error = DisplayError<EXP::Error>;
}
