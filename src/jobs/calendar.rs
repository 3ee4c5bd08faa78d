use core::{
    fmt::Write,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use embedded_hal::delay::DelayNs;
use heapless::String;

use crate::{
    expander::PortExpander,
    scheduler::{write_at, DisplayLock},
    CharacterDisplay, ConfigurationFault, DisplayError,
};

/// Longest line the calendar can show
pub const CALENDAR_BUFFER_LENGTH: usize = 20;

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Broken down wall clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    pub year: u16,
    /// 1-12
    pub month: u8,
    /// 1-31
    pub day: u8,
    /// 0-23
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// days since Sunday, 0-6
    pub weekday: u8,
}

/// Source of the current wall clock time.
pub trait Clock {
    fn now(&mut self) -> CalendarTime;
}

impl<F> Clock for F
where
    F: FnMut() -> CalendarTime,
{
    fn now(&mut self) -> CalendarTime {
        self()
    }
}

fn name(names: &'static [&'static str], index: usize) -> &'static str {
    names.get(index).copied().unwrap_or("?")
}

fn abbreviated(name: &str) -> &str {
    name.get(..3).unwrap_or(name)
}

fn twelve_hour(hour: u8) -> u8 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

/// Writes `time` into `line` following a `strftime` style `format`. Supported conversions are
/// `%Y %y %m %d %e %H %I %M %S %p %a %A %b %B %%`.
pub fn format_time<const N: usize>(
    format: &str,
    time: &CalendarTime,
    line: &mut String<N>,
) -> Result<(), ConfigurationFault> {
    let overflow = |_| ConfigurationFault::CalendarOverflow;
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            line.push(c).map_err(overflow)?;
            continue;
        }
        let weekday = name(&WEEKDAYS, time.weekday as usize);
        let month = name(&MONTHS, (time.month as usize).wrapping_sub(1));
        match chars.next() {
            Some('Y') => write!(line, "{:04}", time.year),
            Some('y') => write!(line, "{:02}", time.year % 100),
            Some('m') => write!(line, "{:02}", time.month),
            Some('d') => write!(line, "{:02}", time.day),
            Some('e') => write!(line, "{:>2}", time.day),
            Some('H') => write!(line, "{:02}", time.hour),
            Some('I') => write!(line, "{:02}", twelve_hour(time.hour)),
            Some('M') => write!(line, "{:02}", time.minute),
            Some('S') => write!(line, "{:02}", time.second),
            Some('p') => line.write_str(if time.hour < 12 { "AM" } else { "PM" }),
            Some('a') => line.write_str(abbreviated(weekday)),
            Some('A') => line.write_str(weekday),
            Some('b') => line.write_str(abbreviated(month)),
            Some('B') => line.write_str(month),
            Some('%') => line.write_char('%'),
            _ => return Err(ConfigurationFault::UnsupportedFormat),
        }
        .map_err(|_| ConfigurationFault::CalendarOverflow)?;
    }
    Ok(())
}

/// Sleeps for `delay`. Delays below one second run on the fine nanosecond timer; from one second
/// on, only whole seconds are slept and any fraction is dropped.
pub fn calendar_sleep(sleep: &mut impl DelayNs, delay: Duration) {
    if delay < Duration::from_secs(1) {
        sleep.delay_ns(delay.subsec_nanos());
    } else {
        let ms = delay.as_secs().saturating_mul(1000);
        sleep.delay_ms(u32::try_from(ms).unwrap_or(u32::MAX));
    }
}

/// Shows the time at a fixed position, alternating between two formats on every frame. Using two
/// formats that differ in one place, such as a blinking colon, gives a simple animation.
pub struct CalendarJob<'a, C> {
    clock: C,
    formats: [&'a str; 2],
    row: u8,
    col: u8,
    length: usize,
    delay: Duration,
    frame: usize,
}

impl<'a, C> CalendarJob<'a, C>
where
    C: Clock,
{
    /// Creates the job. Both formats are checked up front, so a bad conversion is reported here
    /// rather than from the running job.
    pub fn new(
        clock: C,
        formats: [&'a str; 2],
        row: u8,
        col: u8,
        delay: Duration,
    ) -> Result<Self, ConfigurationFault> {
        let probe = CalendarTime::default();
        for format in formats {
            // overflow depends on the actual date and is only reported per frame
            let mut line: String<CALENDAR_BUFFER_LENGTH> = String::new();
            if let Err(ConfigurationFault::UnsupportedFormat) =
                format_time(format, &probe, &mut line)
            {
                return Err(ConfigurationFault::UnsupportedFormat);
            }
        }
        Ok(Self {
            clock,
            formats,
            row,
            col,
            length: CALENDAR_BUFFER_LENGTH,
            delay,
            frame: 0,
        })
    }

    /// Limits the line to `length` characters. A longer line ends the job with `CalendarOverflow`.
    pub fn with_length(mut self, length: usize) -> Result<Self, ConfigurationFault> {
        if length > CALENDAR_BUFFER_LENGTH {
            return Err(ConfigurationFault::CalendarBufferTooLong);
        }
        self.length = length;
        Ok(self)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Index of the format the next frame uses.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Formats the current time with the current frame's format and shows it. Switches to the other
    /// format afterwards, also when the write failed.
    pub fn tick<L, EXP, DELAY>(&mut self, lock: &L) -> Result<(), DisplayError<EXP::Error>>
    where
        L: DisplayLock<Display = CharacterDisplay<EXP, DELAY>> + ?Sized,
        EXP: PortExpander,
        DELAY: DelayNs,
    {
        let time = self.clock.now();
        let mut line: String<CALENDAR_BUFFER_LENGTH> = String::new();
        let format = self.formats[self.frame];
        self.frame ^= 1;

        format_time(format, &time, &mut line)?;
        if line.len() > self.length {
            return Err(ConfigurationFault::CalendarOverflow.into());
        }
        write_at(lock, self.row, self.col, line.as_bytes())
    }

    /// Shows frames until `stop` is set. A failed frame ends the job and is returned.
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
        info!("calendar started at {},{}", self.row, self.col);
        while !stop.load(Ordering::Acquire) {
            if let Err(err) = self.tick(lock) {
                warn!("calendar at {},{} failed: {}", self.row, self.col, err);
                return Err(err);
            }
            calendar_sleep(sleep, self.delay);
        }
        info!("calendar at {},{} stopped", self.row, self.col);
        Ok(())
    }
}
