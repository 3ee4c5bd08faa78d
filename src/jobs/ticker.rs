use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use super::rotate_left;
use crate::{
    expander::PortExpander, scheduler::DisplayLock, CharacterDisplay, ConfigurationFault,
    DisplayError,
};

/// Default capacity of the ticker text, padding included
pub const TEXT_MAX_LENGTH: usize = 100;

/// Scrolls a line of text across one display row like a ticker tape. The text is padded once with
/// spaces at construction and then rotated left after every frame. Each frame shows the first
/// `columns` characters of the rotated text.
#[derive(Debug, Clone)]
pub struct TickerJob<const N: usize = TEXT_MAX_LENGTH> {
    text: Vec<u8, N>,
    row: u8,
    delay_ms: u32,
    increment: usize,
}

impl<const N: usize> TickerJob<N> {
    pub fn new(
        text: &str,
        row: u8,
        delay_ms: u32,
        increment: usize,
        padding: usize,
    ) -> Result<Self, ConfigurationFault> {
        let length = text.chars().count();
        if length.checked_add(padding).map_or(true, |total| total > N) {
            warn!("ticker text of {} chars plus {} padding does not fit", length, padding);
            return Err(ConfigurationFault::TickerTextTooLong);
        }
        let mut buffer = Vec::new();
        for byte in text
            .chars()
            .map(|c| c as u8)
            .chain(core::iter::repeat(b' ').take(padding))
        {
            buffer
                .push(byte)
                .map_err(|_| ConfigurationFault::TickerTextTooLong)?;
        }
        Ok(Self {
            text: buffer,
            row,
            delay_ms,
            increment,
        })
    }

    /// The padded text in its current rotation.
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Shows the current frame: moves to the start of the row and writes a window as wide as the
    /// display, all under one lock acquisition.
    pub fn tick<L, EXP, DELAY>(&self, lock: &L) -> Result<(), DisplayError<EXP::Error>>
    where
        L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + ?Sized,
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        lock.with_display(|display| {
            let width = self.text.len().min(display.geometry().cols() as usize);
            display.goto(self.row, 0)?.write_bytes(&self.text[..width])?;
            Ok(())
        })
    }

    /// Rotates the text for the next frame.
    pub fn advance(&mut self) {
        rotate_left(&mut self.text, self.increment);
    }

    /// Shows frames until `stop` is set. A failed write ends the job and is returned.
    pub fn run<L, EXP, DELAY>(
        &mut self,
        lock: &L,
        sleep: &mut impl DelayNs,
        stop: &AtomicBool,
    ) -> Result<(), DisplayError<EXP::Error>>
    where
        L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + ?Sized,
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        info!("ticker started on row {}", self.row);
        while !stop.load(Ordering::Acquire) {
            if let Err(err) = self.tick(lock) {
                warn!("ticker on row {} failed: {}", self.row, err);
                return Err(err);
            }
            sleep.delay_ms(self.delay_ms);
            self.advance();
        }
        info!("ticker on row {} stopped", self.row);
        Ok(())
    }
}
