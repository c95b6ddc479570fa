//! Fixed-width integer timestamps as browsers store them.
//!
//! Browsers keep creation, access and expiry times as large decimal integers
//! counted from a fixed epoch. Chromium uses micro-seconds since 1601, Firefox
//! micro-seconds (or seconds, for expiry) since 1970. Both are produced here by
//! rendering the elapsed micro-seconds and truncating or zero-padding the
//! digits to a fixed length.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use crate::error::{CookieError, Result};

/// Offset between 1601-01-01 and 1970-01-01 in micro-seconds.
pub const WINDOWS_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// Attempts made to produce a timestamp that differs from the previous one.
pub const GUARD_RETRIES: u32 = 10;

/// Pause between two attempts.
pub const GUARD_WAIT: Duration = Duration::from_millis(1);

static GUARD: TimestampGuard = TimestampGuard::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epoch {
    /// 1970-01-01 00:00:00 UTC
    Unix,
    /// 1601-01-01 00:00:00 UTC
    Windows,
}

impl Epoch {
    fn offset_micros(&self) -> i64 {
        match self {
            Epoch::Unix => 0,
            Epoch::Windows => WINDOWS_EPOCH_OFFSET_MICROS,
        }
    }

    fn elapsed_micros(&self, extra: chrono::Duration) -> i64 {
        let extra = extra.num_microseconds().unwrap_or(i64::MAX);
        Utc::now()
            .timestamp_micros()
            .saturating_add(self.offset_micros())
            .saturating_add(extra)
    }
}

/// Truncate or right-pad `value` with zeros so it has exactly `length` digits.
pub fn fixed_width(value: i64, length: u32) -> i64 {
    let value = value.max(0);
    let digits = value.checked_ilog10().map_or(1, |d| d + 1);
    if digits > length {
        value / 10i64.pow(digits - length)
    } else {
        value.saturating_mul(10i64.saturating_pow(length - digits))
    }
}

/// Remembers the last timestamp handed out so the next one can differ.
#[derive(Debug, Default)]
pub struct TimestampGuard {
    last: Mutex<Option<i64>>,
}

impl TimestampGuard {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    /// First `length`-digit reading of `clock` that differs from the previous
    /// value handed out by this guard.
    pub fn next(&self, clock: impl Fn() -> i64, length: u32) -> Result<i64> {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        for attempt in 1..=GUARD_RETRIES {
            let value = fixed_width(clock(), length);
            if *last != Some(value) {
                *last = Some(value);
                return Ok(value);
            }
            debug!("Timestamp collision on attempt {}: {}", attempt, value);
            std::thread::sleep(GUARD_WAIT);
        }

        Err(CookieError::TimestampGeneration(GUARD_RETRIES))
    }
}

/// Current time since `epoch` as a `length`-digit integer.
///
/// Two calls within the same process never return the same value: on a
/// collision the call waits [`GUARD_WAIT`] and tries again, giving up after
/// [`GUARD_RETRIES`] attempts.
pub fn current_time(epoch: Epoch, length: u32) -> Result<i64> {
    GUARD.next(|| epoch.elapsed_micros(chrono::Duration::zero()), length)
}

/// Time `expires_in` from now since `epoch` as a `length`-digit integer.
pub fn expire_time(epoch: Epoch, length: u32, expires_in: chrono::Duration) -> i64 {
    fixed_width(epoch.elapsed_micros(expires_in), length)
}

/// Read a fixed-width integer back as seconds, with the decimal point placed
/// after `period_placement` digits.
pub fn int_time_to_secs(int_time: i64, period_placement: u32) -> f64 {
    let digits = int_time.max(0).checked_ilog10().map_or(1, |d| d + 1);
    if digits <= period_placement {
        return int_time as f64;
    }
    int_time as f64 / 10f64.powi((digits - period_placement) as i32)
}

/// Micro-seconds since an epoch as float seconds since the same epoch.
pub fn micros_to_secs(micros: i64) -> f64 {
    micros as f64 / 1_000_000.0
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_fixed_width_has_requested_digits(value in 1i64..i64::MAX / 10, length in 1u32..=18) {
            let encoded = fixed_width(value, length);
            prop_assert_eq!(encoded.to_string().len() as u32, length);
        }

        #[test]
        fn prop_fixed_width_preserves_order(a in 1_000_000_000i64..9_999_999_999, b in 1_000_000_000i64..9_999_999_999, length in 1u32..=18) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(fixed_width(low, length) <= fixed_width(high, length));
        }
    }
}
