//! Animation jobs sharing one display.
//!
//! A job owns its own buffers and only touches the display through a `DisplayLock`, one cursor move
//! plus write per lock acquisition. Jobs can be driven step by step with `tick`/`advance`, or with
//! `run`, which loops until the stop flag is set or a write fails. With the `std` feature,
//! `start_ticker` and `start_calendar` run them on their own threads.

pub mod calendar;
pub mod ticker;

#[cfg(any(test, feature = "std"))]
mod threaded;

pub use calendar::{CalendarJob, CalendarTime, Clock, CALENDAR_BUFFER_LENGTH};
pub use ticker::{TickerJob, TEXT_MAX_LENGTH};

#[cfg(any(test, feature = "std"))]
pub use threaded::{start_calendar, start_ticker, JobHandle};

/// Rotates `buffer` left by `increment` places using three in-place reversals. The increment is
/// taken modulo the buffer length; an empty buffer is left alone.
pub fn rotate_left(buffer: &mut [u8], increment: usize) {
    if buffer.is_empty() {
        return;
    }
    let increment = increment % buffer.len();
    buffer[..increment].reverse();
    buffer[increment..].reverse();
    buffer.reverse();
}
