use core::fmt::Display;

use crate::{expander::mcp23017, pins::PinMapping, ConfigurationFault};

/// Maximum number of rows an HD44780 controller can address.
pub const MAX_ROWS: usize = 4;
/// Maximum number of columns per row on a single HD44780 controller.
pub const MAX_COLUMNS: usize = 40;

/// Shortest enable pulse the HD44780 accepts (PW_EH).
pub const MIN_ENABLE_PULSE_NS: u32 = 450;
/// Reference enable hold time, used on both edges of the strobe.
pub const DEFAULT_ENABLE_HOLD_NS: u32 = 5_000_000;

#[derive(Debug, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// The type of LCD display. This is used to determine the number of rows and columns, and the row offsets.
pub enum LcdDisplayType {
    /// 20x4 display
    Lcd20x4,
    /// 20x2 display
    Lcd20x2,
    /// 16x2 display
    Lcd16x2,
    /// 16x4 display
    Lcd16x4,
    /// 8x2 display
    Lcd8x2,
    /// 40x2 display
    Lcd40x2,
}

impl From<&LcdDisplayType> for &'static str {
    fn from(display_type: &LcdDisplayType) -> Self {
        match display_type {
            LcdDisplayType::Lcd20x4 => "20x4",
            LcdDisplayType::Lcd20x2 => "20x2",
            LcdDisplayType::Lcd16x2 => "16x2",
            LcdDisplayType::Lcd16x4 => "16x4",
            LcdDisplayType::Lcd8x2 => "8x2",
            LcdDisplayType::Lcd40x2 => "40x2",
        }
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdDisplayType {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdDisplayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

impl LcdDisplayType {
    /// Get the number of rows for the display type
    pub const fn rows(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd20x4 => 4,
            LcdDisplayType::Lcd20x2 => 2,
            LcdDisplayType::Lcd16x2 => 2,
            LcdDisplayType::Lcd16x4 => 4,
            LcdDisplayType::Lcd8x2 => 2,
            LcdDisplayType::Lcd40x2 => 2,
        }
    }

    /// Get the number of columns for the display type
    pub const fn cols(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd20x4 => 20,
            LcdDisplayType::Lcd20x2 => 20,
            LcdDisplayType::Lcd16x2 => 16,
            LcdDisplayType::Lcd16x4 => 16,
            LcdDisplayType::Lcd8x2 => 8,
            LcdDisplayType::Lcd40x2 => 40,
        }
    }

    /// Get the row offsets for the display type. This always returns an array of length 4.
    /// For displays with less than 4 rows, the unused rows will be set to offsets offscreen.
    pub const fn row_offsets(&self) -> [u8; MAX_ROWS] {
        match self {
            LcdDisplayType::Lcd20x4 => [0x00, 0x40, 0x14, 0x54],
            LcdDisplayType::Lcd20x2 => [0x00, 0x40, 0x00, 0x40],
            LcdDisplayType::Lcd16x2 => [0x00, 0x40, 0x10, 0x50],
            LcdDisplayType::Lcd16x4 => [0x00, 0x40, 0x10, 0x50],
            LcdDisplayType::Lcd8x2 => [0x00, 0x40, 0x00, 0x40],
            LcdDisplayType::Lcd40x2 => [0x00, 0x40, 0x00, 0x40],
        }
    }
}

/// Row/column geometry of a display and the DDRAM start address of each row. The row start
/// addresses depend on the physical module and are configuration, not protocol.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    rows: u8,
    cols: u8,
    row_offsets: [u8; MAX_ROWS],
}

impl Geometry {
    pub fn new(
        rows: u8,
        cols: u8,
        row_offsets: [u8; MAX_ROWS],
    ) -> Result<Self, ConfigurationFault> {
        if rows == 0 || rows as usize > MAX_ROWS || cols == 0 || cols as usize > MAX_COLUMNS {
            return Err(ConfigurationFault::UnsupportedGeometry);
        }
        Ok(Self {
            rows,
            cols,
            row_offsets,
        })
    }

    pub fn rows(&self) -> u8 {
        self.rows
    }

    pub fn cols(&self) -> u8 {
        self.cols
    }

    pub fn row_offsets(&self) -> [u8; MAX_ROWS] {
        self.row_offsets
    }

    /// DDRAM address of a cell, or `None` when the cell is outside the geometry.
    pub fn ddram_address(&self, row: u8, col: u8) -> Option<u8> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.row_offsets[row as usize]
            .checked_add(col)
            .filter(|address| *address < 0x80)
    }
}

impl From<LcdDisplayType> for Geometry {
    fn from(display_type: LcdDisplayType) -> Self {
        Self {
            rows: display_type.rows(),
            cols: display_type.cols(),
            row_offsets: display_type.row_offsets(),
        }
    }
}

/// Timing of the enable strobe.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    enable_hold_ns: u32,
}

impl Timing {
    /// Creates a timing with the given enable hold time. Values below the HD44780 minimum
    /// enable pulse width are raised to that minimum.
    pub fn new(enable_hold_ns: u32) -> Self {
        Self {
            enable_hold_ns: enable_hold_ns.max(MIN_ENABLE_PULSE_NS),
        }
    }

    pub fn enable_hold_ns(&self) -> u32 {
        self.enable_hold_ns
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new(DEFAULT_ENABLE_HOLD_NS)
    }
}

/// Static configuration of one display: how it is wired to the expander and its geometry.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    pub pins: PinMapping,
    /// Expander register that drives the display pins (the output latch of the port)
    pub register: u8,
    pub geometry: Geometry,
    pub timing: Timing,
}

impl DisplayConfig {
    /// Configuration with the default pin mapping on MCP23017 port B.
    pub fn new(geometry: impl Into<Geometry>) -> Self {
        Self {
            pins: PinMapping::default(),
            register: mcp23017::GPIOB,
            geometry: geometry.into(),
            timing: Timing::default(),
        }
    }

    pub fn with_pins(mut self, pins: PinMapping) -> Self {
        self.pins = pins;
        self
    }

    pub fn with_register(mut self, register: u8) -> Self {
        self.register = register;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }
}
