// Thread based job runners. Each job gets its own thread and its own sleep, the display is shared
// through the lock.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use embedded_hal::delay::DelayNs;

use super::{CalendarJob, Clock, TickerJob};
use crate::{expander::PortExpander, scheduler::DisplayLock, CharacterDisplay, DisplayError};

/// A running job. Dropping the handle detaches the job; use `stop` to end it.
pub struct JobHandle<E> {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Result<(), DisplayError<E>>>,
}

impl<E> JobHandle<E> {
    /// Asks the job to stop after its current frame without waiting for it.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// True once the job has stopped, either on request or because of an error.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stops the job and waits for it. Returns how the job ended, or the panic payload if the job
    /// panicked.
    pub fn stop(self) -> thread::Result<Result<(), DisplayError<E>>> {
        self.request_stop();
        self.thread.join()
    }
}

fn spawn<E, F>(job: F) -> JobHandle<E>
where
    E: Send + 'static,
    F: FnOnce(&AtomicBool) -> Result<(), DisplayError<E>> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    let thread = thread::spawn(move || job(&flag));
    JobHandle { stop, thread }
}

/// Starts a ticker on `row`. Fails before anything is written when text and padding do not fit
/// the ticker buffer.
pub fn start_ticker<L, EXP, DELAY, S>(
    lock: Arc<L>,
    mut sleep: S,
    text: &str,
    row: u8,
    delay_ms: u32,
    increment: usize,
    padding: usize,
) -> Result<JobHandle<EXP::Error>, DisplayError<EXP::Error>>
where
    L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + Send + Sync + 'static + ?Sized,
    EXP: PortExpander,
    EXP::Error: Send + 'static,
    DELAY: DelayNs,
    S: DelayNs + Send + 'static,
{
    let mut ticker: TickerJob = TickerJob::new(text, row, delay_ms, increment, padding)?;
    Ok(spawn(move |stop| ticker.run(&*lock, &mut sleep, stop)))
}

/// Starts a clock at `row`, `col` alternating between the two `formats`.
pub fn start_calendar<L, EXP, DELAY, S, C>(
    lock: Arc<L>,
    mut sleep: S,
    clock: C,
    formats: [&'static str; 2],
    row: u8,
    col: u8,
    delay: Duration,
) -> Result<JobHandle<EXP::Error>, DisplayError<EXP::Error>>
where
    L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + Send + Sync + 'static + ?Sized,
    EXP: PortExpander,
    EXP::Error: Send + 'static,
    DELAY: DelayNs,
    S: DelayNs + Send + 'static,
    C: Clock + Send + 'static,
{
    let mut calendar = CalendarJob::new(clock, formats, row, col, delay)?;
    Ok(spawn(move |stop| calendar.run(&*lock, &mut sleep, stop)))
}
