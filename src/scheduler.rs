// Shared access to one display.
// A display used by more than one job lives behind a lock. The lock is only ever taken for the
// duration of a closure, so the guard cannot leak past an early return or an error.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embedded_hal::delay::DelayNs;

use crate::{expander::PortExpander, CharacterDisplay, DisplayError};

/// Scoped exclusive access to a display. Not reentrant: calling `with_display` from inside the
/// closure on the same lock deadlocks or panics, depending on the implementation.
pub trait DisplayLock {
    type Display;

    fn with_display<R>(&self, f: impl FnOnce(&mut Self::Display) -> R) -> R;
}

impl<M, T> DisplayLock for Mutex<M, RefCell<T>>
where
    M: RawMutex,
{
    type Display = T;

    fn with_display<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.lock(|cell| f(&mut *cell.borrow_mut()))
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> DisplayLock for std::sync::Mutex<T> {
    type Display = T;

    fn with_display<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // a panicked holder only leaves the cursor position undefined
        let mut display = self
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut *display)
    }
}

impl<L> DisplayLock for &L
where
    L: DisplayLock + ?Sized,
{
    type Display = L::Display;

    fn with_display<R>(&self, f: impl FnOnce(&mut Self::Display) -> R) -> R {
        L::with_display(self, f)
    }
}

#[cfg(any(test, feature = "std"))]
impl<L> DisplayLock for std::sync::Arc<L>
where
    L: DisplayLock + ?Sized,
{
    type Display = L::Display;

    fn with_display<R>(&self, f: impl FnOnce(&mut Self::Display) -> R) -> R {
        L::with_display(self, f)
    }
}

/// Moves the cursor and writes `data` while holding the lock once. Other writers can never slip
/// between the cursor move and the write.
pub fn write_at<L, EXP, DELAY>(
    lock: &L,
    row: u8,
    col: u8,
    data: &[u8],
) -> Result<(), DisplayError<EXP::Error>>
where
    L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + ?Sized,
    EXP: PortExpander,
    DELAY: DelayNs,
{
    lock.with_display(|display| {
        display.goto(row, col)?.write_bytes(data)?;
        Ok(())
    })
}
