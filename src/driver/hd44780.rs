// HD44780 session
// This module owns the protocol level state of one display: where it is in the initialization
// handshake and which mode flags are active. All bus traffic goes through a DisplayBus passed in
// by the caller, the same way the public CharacterDisplay hands its bus to the session.
//
// Session states:
//      Uninitialized -> HandshakeIn8Bit -> FunctionLocked -> Ready
//
// Function flags are written exactly once, when leaving HandshakeIn8Bit. Changing them afterwards
// needs a full re-initialization.

use embedded_hal::delay::DelayNs;

use crate::{
    command::{
        DisplayFlags, EntryFlags, FunctionFlags, ModeState, MoveFlags, LCD_CMD_CLEARDISPLAY,
        LCD_CMD_RETURNHOME, LCD_CMD_SETCGRAMADDR, LCD_CMD_SETDDRAMADDR, LCD_NIBBLE_FUNCTION_4BIT,
        LCD_NIBBLE_FUNCTION_8BIT,
    },
    config::Geometry,
    driver::DisplayBus,
    expander::PortExpander,
    glyph::{Glyph, GlyphTable, MAX_GLYPHS},
    pins::RegisterSelect,
    ConfigurationFault, DisplayError,
};

// mandated waits, all with some margin over the datasheet minimum
const STARTUP_DELAY_MS: u32 = 42; // >40ms after Vcc rises to 2.7V
const PROBE_DELAYS_US: [u32; 3] = [4_200, 150, 150]; // >4.1ms, >100us, >100us
const FOUR_BIT_SWITCH_DELAY_US: u32 = 50; // >37us
const CLEAR_HOME_DELAY_US: u32 = 1_600; // >1.52ms, the datasheet gives no value for clear

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    #[default]
    Uninitialized,
    HandshakeIn8Bit,
    FunctionLocked,
    Ready,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    modes: ModeState,
    geometry: Geometry,
}

impl Session {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            state: SessionState::Uninitialized,
            modes: ModeState::default(),
            geometry,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn modes(&self) -> &ModeState {
        &self.modes
    }

    fn ensure_ready<E>(&self) -> Result<(), DisplayError<E>> {
        if self.state != SessionState::Ready {
            return Err(DisplayError::NotInitialized);
        }
        Ok(())
    }

    /// Runs the power-on handshake and sets all mode flags. Fails with `FunctionFlagsLocked`
    /// once the function flags have been written; use `reinitialize` to start over.
    pub fn initialize<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        function: FunctionFlags,
        display: DisplayFlags,
        entry: EntryFlags,
        movement: MoveFlags,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        if matches!(
            self.state,
            SessionState::FunctionLocked | SessionState::Ready
        ) {
            warn!("function flags already locked, re-initialization required");
            return Err(DisplayError::ConfigurationError(
                ConfigurationFault::FunctionFlagsLocked,
            ));
        }
        // the expander only carries DB4-DB7
        if function.eight_bit() {
            return Err(DisplayError::ConfigurationError(
                ConfigurationFault::EightBitBus,
            ));
        }

        debug!("starting 8 bit handshake");
        self.state = SessionState::HandshakeIn8Bit;
        bus.delay().delay_ms(STARTUP_DELAY_MS);

        // The controller may be in 8 bit mode or halfway through a 4 bit transfer, so only single
        // nibbles are sent until it is known to be in 4 bit mode.
        for delay_us in PROBE_DELAYS_US {
            bus.send_nibble(LCD_NIBBLE_FUNCTION_8BIT, RegisterSelect::Command)?;
            bus.delay().delay_us(delay_us);
        }
        bus.send_nibble(LCD_NIBBLE_FUNCTION_4BIT, RegisterSelect::Command)?;
        bus.delay().delay_us(FOUR_BIT_SWITCH_DELAY_US);

        bus.write_command(function.command())?;
        self.modes.function = Some(function);
        self.state = SessionState::FunctionLocked;
        debug!("function flags locked: {}", function);

        bus.write_command(DisplayFlags::default().command())?;
        bus.write_command(entry.command())?;
        self.modes.entry = entry;
        bus.write_command(display.command())?;
        self.modes.display = display;
        bus.write_command(movement.command())?;
        self.modes.movement = movement;
        bus.write_command(LCD_CMD_SETDDRAMADDR)?;
        self.clear_unchecked(bus)?;

        self.state = SessionState::Ready;
        info!("display initialized");
        Ok(())
    }

    /// Forgets the current session and runs the full initialization again. This is the only way
    /// to change the function flags.
    pub fn reinitialize<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        function: FunctionFlags,
        display: DisplayFlags,
        entry: EntryFlags,
        movement: MoveFlags,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.state = SessionState::Uninitialized;
        self.modes = ModeState::default();
        self.initialize(bus, function, display, entry, movement)
    }

    fn clear_unchecked<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        bus.write_command(LCD_CMD_CLEARDISPLAY)?;
        bus.delay().delay_us(CLEAR_HOME_DELAY_US);
        Ok(())
    }

    pub fn clear<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        self.clear_unchecked(bus)
    }

    pub fn home<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        bus.write_command(LCD_CMD_RETURNHOME)?;
        bus.delay().delay_us(CLEAR_HOME_DELAY_US);
        Ok(())
    }

    /// Sets the entry mode. Clears the display as a side effect.
    pub fn set_entry_mode<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        entry: EntryFlags,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        bus.write_command(entry.command())?;
        self.modes.entry = entry;
        debug!("entry mode {}", entry);
        self.clear_unchecked(bus)
    }

    /// Sets display on/off, cursor and blink. Clears the display as a side effect.
    pub fn set_display_mode<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        display: DisplayFlags,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        bus.write_command(display.command())?;
        self.modes.display = display;
        debug!("display mode {}", display);
        self.clear_unchecked(bus)
    }

    /// Shifts the cursor or the display. Clears the display as a side effect.
    pub fn set_move_mode<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        movement: MoveFlags,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        bus.write_command(movement.command())?;
        self.modes.movement = movement;
        debug!("move mode {}", movement);
        self.clear_unchecked(bus)
    }

    /// Moves the cursor to `row`, `col`. Rows beyond the first are accepted even when the
    /// function flags select 1 line mode.
    pub fn goto<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        row: u8,
        col: u8,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        let address = self
            .geometry
            .ddram_address(row, col)
            .ok_or(DisplayError::OutOfRange)?;
        bus.write_command(LCD_CMD_SETDDRAMADDR | address)
    }

    /// Streams a glyph table into CGRAM from address 0 and switches back to DDRAM address 0.
    /// Glyph `i` is then shown for character code `i`.
    pub fn load_glyphs<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        table: &GlyphTable,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        bus.write_command(LCD_CMD_SETCGRAMADDR)?;
        for glyph in table.iter() {
            bus.write_bytes(glyph)?;
        }
        bus.write_command(LCD_CMD_SETDDRAMADDR)?;
        debug!("loaded {} glyphs", table.len());
        Ok(())
    }

    /// Writes one glyph to CGRAM slot `location` and switches back to DDRAM address 0.
    pub fn create_glyph<EXP, DELAY>(
        &mut self,
        bus: &mut DisplayBus<EXP, DELAY>,
        location: u8,
        glyph: &Glyph,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        self.ensure_ready()?;
        if location as usize >= MAX_GLYPHS {
            return Err(DisplayError::OutOfRange);
        }
        bus.write_command(LCD_CMD_SETCGRAMADDR | (location << 3))?;
        bus.write_bytes(glyph)?;
        bus.write_command(LCD_CMD_SETDDRAMADDR)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::{
        config::{LcdDisplayType, Timing},
        expander::mcp23017::GPIOB,
        pins::PinMapping,
        testing::{bytes, event_log, nibbles, Event, RecordingExpander, VirtualDelay},
    };
    use embedded_hal::i2c::ErrorKind;

    use RegisterSelect::{Command, Data};

    fn recording_bus(log: &crate::testing::EventLog) -> DisplayBus<RecordingExpander, VirtualDelay> {
        DisplayBus::new(
            RecordingExpander::new(log.clone()),
            GPIOB,
            PinMapping::default(),
            Timing::default(),
            VirtualDelay::new(log.clone()),
        )
    }

    fn default_flags() -> (FunctionFlags, DisplayFlags, EntryFlags, MoveFlags) {
        (
            FunctionFlags::new(false, true, false),
            DisplayFlags::new(true, false, false),
            EntryFlags::new(true, false),
            MoveFlags::new(false, true),
        )
    }

    fn ready_session(
        log: &crate::testing::EventLog,
    ) -> (Session, DisplayBus<RecordingExpander, VirtualDelay>) {
        let mut bus = recording_bus(log);
        let mut session = Session::new(LcdDisplayType::Lcd20x4.into());
        let (function, display, entry, movement) = default_flags();
        session
            .initialize(&mut bus, function, display, entry, movement)
            .unwrap();
        log.lock().unwrap().clear();
        (session, bus)
    }

    fn waits(log: &crate::testing::EventLog) -> std::vec::Vec<u32> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                Event::Delay(ns) => Some(*ns),
                _ => None,
            })
            .filter(|ns| *ns != 5_000_000)
            .collect()
    }

    #[test]
    fn test_initialize_sequence() {
        let log = event_log();
        let mut bus = recording_bus(&log);
        let mut session = Session::new(LcdDisplayType::Lcd20x4.into());
        let (function, display, entry, movement) = default_flags();
        session
            .initialize(&mut bus, function, display, entry, movement)
            .unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.modes().function, Some(function));

        let events = log.lock().unwrap().clone();
        let transfers = nibbles(&events, &PinMapping::default());
        // handshake: three 8 bit probes and the switch to 4 bit, as single nibbles
        assert_eq!(
            &transfers[..4],
            &[(Command, 0x3), (Command, 0x3), (Command, 0x3), (Command, 0x2)]
        );
        assert_eq!(
            bytes(&transfers[4..]),
            std::vec![
                (Command, 0x28), // function set: 4 bit, 2 lines, 5x8
                (Command, 0x08), // display off
                (Command, 0x06), // entry mode: increment, no shift
                (Command, 0x0C), // display on
                (Command, 0x14), // cursor move right
                (Command, 0x80), // DDRAM address 0
                (Command, 0x01), // clear
            ]
        );

        // startup, probe, 4 bit switch and clear waits, enable holds filtered out
        assert_eq!(
            waits(&log),
            std::vec![42_000_000, 4_200_000, 150_000, 150_000, 50_000, 1_600_000]
        );
    }

    #[test]
    fn test_initialize_twice_is_rejected() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);
        let (function, display, entry, movement) = default_flags();

        assert_eq!(
            session.initialize(&mut bus, function, display, entry, movement),
            Err(DisplayError::ConfigurationError(
                ConfigurationFault::FunctionFlagsLocked
            ))
        );
        assert!(log.lock().unwrap().is_empty());

        // a full re-initialization may change the function flags
        let one_line = FunctionFlags::new(false, false, true);
        session
            .reinitialize(&mut bus, one_line, display, entry, movement)
            .unwrap();
        assert_eq!(session.modes().function, Some(one_line));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_initialize_rejects_eight_bit_bus() {
        let log = event_log();
        let mut bus = recording_bus(&log);
        let mut session = Session::new(LcdDisplayType::Lcd16x2.into());
        let (_, display, entry, movement) = default_flags();

        assert_eq!(
            session.initialize(
                &mut bus,
                FunctionFlags::new(true, true, false),
                display,
                entry,
                movement
            ),
            Err(DisplayError::ConfigurationError(ConfigurationFault::EightBitBus))
        );
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_handshake_can_be_retried() {
        let log = event_log();
        let mut bus = DisplayBus::new(
            RecordingExpander::failing_after(log.clone(), 0),
            GPIOB,
            PinMapping::default(),
            Timing::default(),
            VirtualDelay::new(log.clone()),
        );
        let mut session = Session::new(LcdDisplayType::Lcd16x2.into());
        let (function, display, entry, movement) = default_flags();

        assert_eq!(
            session.initialize(&mut bus, function, display, entry, movement),
            Err(DisplayError::BusError(ErrorKind::Other))
        );
        assert_eq!(session.state(), SessionState::HandshakeIn8Bit);
        assert_eq!(session.modes().function, None);

        // not locked yet, so a retry is a protocol-level fresh start
        let mut bus = recording_bus(&log);
        assert!(session
            .initialize(&mut bus, function, display, entry, movement)
            .is_ok());
    }

    #[test]
    fn test_operations_require_ready() {
        let log = event_log();
        let mut bus = recording_bus(&log);
        let mut session = Session::new(LcdDisplayType::Lcd16x2.into());

        assert_eq!(session.goto(&mut bus, 0, 0), Err(DisplayError::NotInitialized));
        assert_eq!(session.clear(&mut bus), Err(DisplayError::NotInitialized));
        assert_eq!(
            session.load_glyphs(&mut bus, &GlyphTable::new()),
            Err(DisplayError::NotInitialized)
        );
        assert_eq!(
            session.set_display_mode(&mut bus, DisplayFlags::default()),
            Err(DisplayError::NotInitialized)
        );
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_and_home_request_execution_delay() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);

        session.clear(&mut bus).unwrap();
        session.home(&mut bus).unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            bytes(&nibbles(&events, &PinMapping::default())),
            std::vec![(Command, 0x01), (Command, 0x02)]
        );
        // each command is followed by the 1.6ms execution wait before anything else
        let clear_end = events
            .iter()
            .position(|event| *event == Event::Delay(1_600_000))
            .unwrap();
        assert_eq!(clear_end, 10);
        assert_eq!(events.last(), Some(&Event::Delay(1_600_000)));
        assert_eq!(waits(&log), std::vec![1_600_000, 1_600_000]);
    }

    #[test]
    fn test_mode_changes_end_with_clear() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);

        session
            .set_display_mode(&mut bus, DisplayFlags::new(true, true, true))
            .unwrap();
        session
            .set_entry_mode(&mut bus, EntryFlags::new(false, true))
            .unwrap();
        session
            .set_move_mode(&mut bus, MoveFlags::new(true, false))
            .unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            bytes(&nibbles(&events, &PinMapping::default())),
            std::vec![
                (Command, 0x0F),
                (Command, 0x01),
                (Command, 0x05),
                (Command, 0x01),
                (Command, 0x18),
                (Command, 0x01),
            ]
        );
        assert_eq!(session.modes().display, DisplayFlags::new(true, true, true));
        assert_eq!(session.modes().entry, EntryFlags::new(false, true));
        assert_eq!(session.modes().movement, MoveFlags::new(true, false));
    }

    #[test]
    fn test_goto_addresses() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);

        session.goto(&mut bus, 0, 0).unwrap();
        session.goto(&mut bus, 1, 3).unwrap();
        session.goto(&mut bus, 2, 19).unwrap();
        session.goto(&mut bus, 3, 10).unwrap();

        let events = log.lock().unwrap().clone();
        assert_eq!(
            bytes(&nibbles(&events, &PinMapping::default())),
            std::vec![
                (Command, 0x80),
                (Command, 0x80 | 0x43),
                (Command, 0x80 | 0x27),
                (Command, 0x80 | 0x5E),
            ]
        );
    }

    #[test]
    fn test_goto_out_of_range_writes_nothing() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);

        assert_eq!(session.goto(&mut bus, 4, 0), Err(DisplayError::OutOfRange));
        assert_eq!(session.goto(&mut bus, 0, 20), Err(DisplayError::OutOfRange));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_goto_does_not_check_line_mode() {
        let log = event_log();
        let mut bus = recording_bus(&log);
        let mut session = Session::new(LcdDisplayType::Lcd16x2.into());
        let (_, display, entry, movement) = default_flags();
        session
            .initialize(
                &mut bus,
                FunctionFlags::new(false, false, false),
                display,
                entry,
                movement,
            )
            .unwrap();
        log.lock().unwrap().clear();

        assert!(session.goto(&mut bus, 1, 0).is_ok());
        let events = log.lock().unwrap().clone();
        assert_eq!(
            bytes(&nibbles(&events, &PinMapping::default())),
            std::vec![(Command, 0xC0)]
        );
    }

    #[test]
    fn test_load_full_glyph_table() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);
        let mut table = GlyphTable::new();
        for i in 0..8u8 {
            table.push([i; 8]).unwrap();
        }

        session.load_glyphs(&mut bus, &table).unwrap();

        let events = log.lock().unwrap().clone();
        let transfers = bytes(&nibbles(&events, &PinMapping::default()));
        assert_eq!(transfers.len(), 66);
        assert_eq!(transfers[0], (Command, 0x40));
        assert_eq!(transfers[65], (Command, 0x80));
        assert!(transfers[1..65].iter().all(|(mode, _)| *mode == Data));
        assert_eq!(transfers[1], (Data, 0));
        assert_eq!(transfers[64], (Data, 7));
    }

    #[test]
    fn test_create_glyph_in_slot() {
        let log = event_log();
        let (mut session, mut bus) = ready_session(&log);
        let heart: Glyph = [0x00, 0x0A, 0x1F, 0x1F, 0x1F, 0x0E, 0x04, 0x00];

        session.create_glyph(&mut bus, 3, &heart).unwrap();
        assert_eq!(
            session.create_glyph(&mut bus, 8, &heart),
            Err(DisplayError::OutOfRange)
        );

        let events = log.lock().unwrap().clone();
        let transfers = bytes(&nibbles(&events, &PinMapping::default()));
        assert_eq!(transfers.len(), 10);
        assert_eq!(transfers[0], (Command, 0x40 | (3 << 3)));
        assert_eq!(transfers[3], (Data, 0x1F));
        assert_eq!(transfers[9], (Command, 0x80));
    }
}
