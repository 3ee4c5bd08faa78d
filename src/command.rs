use bitfield::bitfield;

// commands
pub(crate) const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
pub(crate) const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
pub(crate) const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
pub(crate) const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
pub(crate) const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor or the display
pub(crate) const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
pub(crate) const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
pub(crate) const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// handshake nibbles sent while the controller may still be in 8 bit mode
pub(crate) const LCD_NIBBLE_FUNCTION_8BIT: u8 = 0x03;
pub(crate) const LCD_NIBBLE_FUNCTION_4BIT: u8 = 0x02;

// flags for function set
bitfield! {
    /// Function set flags. Sent once during initialization and locked afterwards.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct FunctionFlags(u8);
    impl Debug;
    /// `true` selects an 8 bit data bus, `false` the 4 bit bus
    pub eight_bit, set_eight_bit: 4;
    /// `true` selects 2 line mode, `false` 1 line mode
    pub two_lines, set_two_lines: 3;
    /// `true` selects the 5x10 dot font, `false` the 5x8 dot font
    pub large_font, set_large_font: 2;
}

impl FunctionFlags {
    pub fn new(eight_bit: bool, two_lines: bool, large_font: bool) -> Self {
        let mut flags = Self(0);
        flags.set_eight_bit(eight_bit);
        flags.set_two_lines(two_lines);
        flags.set_large_font(large_font);
        flags
    }

    /// The full function set command byte
    pub fn command(&self) -> u8 {
        LCD_CMD_FUNCTIONSET | self.0
    }
}

// flags for display on/off control
bitfield! {
    /// Display on/off control flags.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct DisplayFlags(u8);
    impl Debug;
    pub display_on, set_display_on: 2;
    pub cursor_on, set_cursor_on: 1;
    pub blink_on, set_blink_on: 0;
}

impl DisplayFlags {
    pub fn new(display_on: bool, cursor_on: bool, blink_on: bool) -> Self {
        let mut flags = Self(0);
        flags.set_display_on(display_on);
        flags.set_cursor_on(cursor_on);
        flags.set_blink_on(blink_on);
        flags
    }

    pub fn command(&self) -> u8 {
        LCD_CMD_DISPLAYCONTROL | self.0
    }
}

// flags for display entry mode
bitfield! {
    /// Entry mode flags: address counter direction and display shift on write.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags(u8);
    impl Debug;
    /// `true` increments the address counter after each write (text flows left to right)
    pub increment, set_increment: 1;
    /// `true` shifts the whole display on each write
    pub shift, set_shift: 0;
}

impl EntryFlags {
    pub fn new(increment: bool, shift: bool) -> Self {
        let mut flags = Self(0);
        flags.set_increment(increment);
        flags.set_shift(shift);
        flags
    }

    pub fn command(&self) -> u8 {
        LCD_CMD_ENTRYMODESET | self.0
    }
}

// flags for display/cursor shift
bitfield! {
    /// Cursor/display shift flags.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveFlags(u8);
    impl Debug;
    /// `true` shifts the display, `false` moves the cursor
    pub display_move, set_display_move: 3;
    /// `true` moves right, `false` moves left
    pub move_right, set_move_right: 2;
}

impl MoveFlags {
    pub fn new(display_move: bool, move_right: bool) -> Self {
        let mut flags = Self(0);
        flags.set_display_move(display_move);
        flags.set_move_right(move_right);
        flags
    }

    pub fn command(&self) -> u8 {
        LCD_CMD_CURSORSHIFT | self.0
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FunctionFlags {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "FunctionFlags({=u8:#04x})", self.0);
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayFlags {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "DisplayFlags({=u8:#04x})", self.0);
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EntryFlags {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "EntryFlags({=u8:#04x})", self.0);
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MoveFlags {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "MoveFlags({=u8:#04x})", self.0);
    }
}

/// Mode flags of one display. The function flags are `None` until the display
/// has been initialized and never change afterwards without a re-initialization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeState {
    pub function: Option<FunctionFlags>,
    pub display: DisplayFlags,
    pub entry: EntryFlags,
    pub movement: MoveFlags,
}
