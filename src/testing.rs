// Recording doubles for unit tests. The expander and the delay share one event log, so tests can
// check both the bus traffic and the waits requested between transfers.
extern crate std;

use std::sync::{Arc, Mutex};
use std::vec::Vec;

use embedded_hal::{delay::DelayNs, i2c::ErrorKind};

use crate::{
    command::{DisplayFlags, EntryFlags, FunctionFlags, MoveFlags},
    config::{DisplayConfig, Geometry},
    expander::PortExpander,
    pins::{PinMapping, RegisterSelect},
    CharacterDisplay,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    WriteByte(u8, u8),
    SetBits(u8, u8),
    ClearBits(u8, u8),
    Delay(u32),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub struct RecordingExpander {
    log: EventLog,
    operations: usize,
    fail_after: Option<usize>,
}

impl RecordingExpander {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            operations: 0,
            fail_after: None,
        }
    }

    /// Every bus operation after the first `operations` fails with `ErrorKind::Other`.
    pub fn failing_after(log: EventLog, operations: usize) -> Self {
        Self {
            log,
            operations: 0,
            fail_after: Some(operations),
        }
    }

    fn record(&mut self, event: Event) -> Result<(), ErrorKind> {
        if let Some(limit) = self.fail_after {
            if self.operations >= limit {
                return Err(ErrorKind::Other);
            }
        }
        self.operations += 1;
        self.log.lock().unwrap().push(event);
        Ok(())
    }
}

impl PortExpander for RecordingExpander {
    type Error = ErrorKind;

    fn set_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        self.record(Event::SetBits(register, mask))
    }

    fn clear_bits(&mut self, register: u8, mask: u8) -> Result<(), Self::Error> {
        self.record(Event::ClearBits(register, mask))
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.record(Event::WriteByte(register, value))
    }
}

/// Virtual clock: records requested waits instead of sleeping.
pub struct VirtualDelay {
    log: EventLog,
}

impl VirtualDelay {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl DelayNs for VirtualDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.lock().unwrap().push(Event::Delay(ns));
    }
}

/// Reconstructs the nibble transfers from a log. A transfer is a pin image write followed by the
/// enable strobe; anything else in between means the transfer engine misbehaved.
pub fn nibbles(events: &[Event], pins: &PinMapping) -> Vec<(RegisterSelect, u8)> {
    let enable = pins.enable_mask();
    let bus: Vec<Event> = events
        .iter()
        .copied()
        .filter(|event| !matches!(event, Event::Delay(_)))
        .collect();
    let mut transfers = Vec::new();
    for chunk in bus.chunks(3) {
        match chunk {
            [Event::WriteByte(_, image), Event::SetBits(_, set), Event::ClearBits(_, clear)]
                if *set == enable && *clear == enable =>
            {
                transfers.push(pins.decode_image(*image));
            }
            other => panic!("malformed nibble transfer: {:?}", other),
        }
    }
    transfers
}

/// Pairs nibbles into bytes, high nibble first.
pub fn bytes(nibbles: &[(RegisterSelect, u8)]) -> Vec<(RegisterSelect, u8)> {
    assert!(nibbles.len() % 2 == 0, "odd number of nibbles");
    nibbles
        .chunks(2)
        .map(|pair| {
            assert_eq!(pair[0].0, pair[1].0, "register select changed inside a byte");
            (pair[0].0, (pair[0].1 << 4) | pair[1].1)
        })
        .collect()
}

/// Byte level view of a log taken while the display is in 4 bit mode.
pub fn transferred_bytes(log: &EventLog) -> Vec<(RegisterSelect, u8)> {
    let events = log.lock().unwrap().clone();
    bytes(&nibbles(&events, &PinMapping::default()))
}

pub type RecordingDisplay = CharacterDisplay<RecordingExpander, VirtualDelay>;

pub fn recording_display(geometry: impl Into<Geometry>) -> (RecordingDisplay, EventLog) {
    let log = event_log();
    let display = CharacterDisplay::new(
        RecordingExpander::new(log.clone()),
        DisplayConfig::new(geometry),
        VirtualDelay::new(log.clone()),
    );
    (display, log)
}

/// An initialized display with an empty log.
pub fn ready_display(geometry: impl Into<Geometry>) -> (RecordingDisplay, EventLog) {
    let (mut display, log) = recording_display(geometry);
    display
        .initialize(
            FunctionFlags::new(false, true, false),
            DisplayFlags::new(true, false, false),
            EntryFlags::new(true, false),
            MoveFlags::new(false, true),
        )
        .unwrap();
    log.lock().unwrap().clear();
    (display, log)
}
