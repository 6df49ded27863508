//! Injected wall clock.
//!
//! Every write stamps `created_at`, `updated_at`, `valid_from` and
//! `recorded_at` from a [`Clock`] instead of reading the system time
//! directly, so tests can pin instants and move time forward explicitly.

use std::sync::Mutex;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
///
/// Instants are truncated to microseconds, the resolution of a
/// `PostgreSQL` `TIMESTAMPTZ`, so a value read back from the database
/// compares equal to the value that was written.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an arbitrary instant (backwards jumps are allowed).
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = instant;
    }

    /// Move the clock forward by `delta` and return the new instant.
    ///
    /// Saturates at the current instant if the addition would leave
    /// chrono's representable range.
    pub fn advance(&self, delta: TimeDelta) -> DateTime<Utc> {
        let mut guard = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(next) = guard.checked_add_signed(delta) {
            *guard = next;
        }
        *guard
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Timelike};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn system_clock_has_microsecond_resolution() {
        let now = SystemClock.now();
        assert_eq!(now.nanosecond() % 1_000, 0);
    }

    #[test]
    fn manual_clock_is_frozen_until_moved() {
        let clock = ManualClock::new(t0());
        assert_eq!(clock.now(), t0());
        assert_eq!(clock.now(), t0());

        let later = clock.advance(TimeDelta::days(2));
        assert_eq!(later, t0() + TimeDelta::days(2));
        assert_eq!(clock.now(), later);

        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }

    #[test]
    fn shared_clock_sees_the_same_instant() {
        let clock = Arc::new(ManualClock::new(t0()));
        let shared: Arc<ManualClock> = Arc::clone(&clock);
        clock.advance(TimeDelta::hours(1));
        assert_eq!(shared.now(), t0() + TimeDelta::hours(1));
    }
}
