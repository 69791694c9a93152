use chrono::{DateTime, TimeDelta, Utc};

// Default window length: one hour
pub const WINDOW_SIZE_SECS: i64 = 60 * 60;

/// Fixed-window math shared by admission and reporting.
///
/// A window is the half-open interval `[start, start + size)`. Everything here
/// is a pure function of its inputs so callers can test without waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    size: TimeDelta,
}

impl Default for FixedWindow {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(WINDOW_SIZE_SECS))
    }
}

impl FixedWindow {
    pub fn new(size: TimeDelta) -> Self {
        Self { size }
    }

    // Build from a whole number of seconds (CLI input), at least one second
    pub fn from_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX / 1_000).clamp(1, i64::MAX / 1_000);
        Self::new(TimeDelta::seconds(secs))
    }

    pub fn size(&self) -> TimeDelta {
        self.size
    }

    /// The window is over once strictly more than `size` has elapsed.
    pub fn expired(&self, now: DateTime<Utc>, window_start: DateTime<Utc>) -> bool {
        now - window_start > self.size
    }

    pub fn window_end(&self, window_start: DateTime<Utc>) -> DateTime<Utc> {
        window_start + self.size
    }

    /// Whole minutes until the window closes, rounded up, never negative.
    pub fn minutes_until_reset(&self, now: DateTime<Utc>, window_start: DateTime<Utc>) -> u64 {
        let left_ms = (self.window_end(window_start) - now).num_milliseconds();
        if left_ms <= 0 {
            return 0;
        }
        (left_ms as u64).div_ceil(60_000)
    }

    // "hour", "30 minutes", "45 seconds" - used in rejection messages
    pub fn describe(&self) -> String {
        let secs = self.size.num_seconds();
        match secs {
            3600 => "hour".to_string(),
            60 => "minute".to_string(),
            s if s % 3600 == 0 => format!("{} hours", s / 3600),
            s if s % 60 == 0 => format!("{} minutes", s / 60),
            s => format!("{} seconds", s),
        }
    }
}
