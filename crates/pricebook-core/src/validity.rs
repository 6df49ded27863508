//! Validity-interval policy for history snapshots.
//!
//! A snapshot captured at `now` is valid from `now` for a fixed
//! [`RetentionWindow`]. Both bounds are inclusive. Snapshots of one product
//! must be appended in non-decreasing `valid_from` order, so if the clock
//! reports an instant earlier than the product's latest `valid_from`, the
//! new snapshot starts at that latest `valid_from` instead.

use chrono::{DateTime, TimeDelta, Utc};

/// Default retention window, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Errors produced while computing validity bounds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidityError {
    /// The retention window is zero or negative, which would produce an
    /// empty interval.
    #[error("retention window must be positive, got {seconds}s")]
    NonPositiveWindow {
        /// The rejected window length in seconds.
        seconds: i64,
    },

    /// `valid_from + window` is not representable.
    #[error("validity interval starting at {valid_from} overflows the timestamp range")]
    OutOfRange {
        /// The start of the interval that could not be closed.
        valid_from: DateTime<Utc>,
    },
}

/// How long a captured snapshot stays valid.
///
/// Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionWindow(TimeDelta);

impl RetentionWindow {
    /// Wrap a window length.
    ///
    /// # Errors
    ///
    /// Returns [`ValidityError::NonPositiveWindow`] if `window <= 0`.
    pub fn new(window: TimeDelta) -> Result<Self, ValidityError> {
        if window <= TimeDelta::zero() {
            return Err(ValidityError::NonPositiveWindow {
                seconds: window.num_seconds(),
            });
        }
        Ok(Self(window))
    }

    /// A window of whole days.
    ///
    /// # Errors
    ///
    /// Returns [`ValidityError::NonPositiveWindow`] if `days` is 0.
    pub fn from_days(days: u32) -> Result<Self, ValidityError> {
        let window = TimeDelta::try_days(i64::from(days)).unwrap_or(TimeDelta::MAX);
        Self::new(window)
    }

    /// The window length.
    pub const fn as_delta(self) -> TimeDelta {
        self.0
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self(TimeDelta::days(i64::from(DEFAULT_RETENTION_DAYS)))
    }
}

/// The `[valid_from, valid_to]` bounds for a snapshot about to be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotBounds {
    /// Inclusive lower bound.
    pub valid_from: DateTime<Utc>,
    /// Inclusive upper bound, strictly after `valid_from`.
    pub valid_to: DateTime<Utc>,
}

/// Compute the bounds of a snapshot captured at `now`.
///
/// `latest_valid_from` is the greatest `valid_from` already in the
/// product's ledger, if any. The new interval never starts before it.
///
/// # Errors
///
/// Returns [`ValidityError::OutOfRange`] if the upper bound overflows.
pub fn snapshot_bounds(
    now: DateTime<Utc>,
    latest_valid_from: Option<DateTime<Utc>>,
    window: RetentionWindow,
) -> Result<SnapshotBounds, ValidityError> {
    let valid_from = latest_valid_from.map_or(now, |latest| latest.max(now));
    if valid_from > now {
        tracing::warn!(
            %now,
            %valid_from,
            "clock is behind the ledger, clamping snapshot start"
        );
    }

    let valid_to = valid_from
        .checked_add_signed(window.as_delta())
        .ok_or(ValidityError::OutOfRange { valid_from })?;

    Ok(SnapshotBounds {
        valid_from,
        valid_to,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn default_window_is_seven_days() {
        assert_eq!(RetentionWindow::default().as_delta(), TimeDelta::days(7));
        assert_eq!(
            RetentionWindow::from_days(DEFAULT_RETENTION_DAYS).ok(),
            Some(RetentionWindow::default())
        );
    }

    #[test]
    fn empty_or_negative_window_is_rejected() {
        assert_eq!(
            RetentionWindow::from_days(0),
            Err(ValidityError::NonPositiveWindow { seconds: 0 })
        );
        assert!(RetentionWindow::new(TimeDelta::seconds(-5)).is_err());
        assert!(RetentionWindow::new(TimeDelta::microseconds(1)).is_ok());
    }

    #[test]
    fn bounds_start_now_and_span_the_window() {
        let bounds = snapshot_bounds(t0(), None, RetentionWindow::default());
        assert_eq!(
            bounds,
            Ok(SnapshotBounds {
                valid_from: t0(),
                valid_to: t0() + TimeDelta::days(7),
            })
        );
    }

    #[test]
    fn bounds_never_start_before_latest_snapshot() {
        let latest = t0() + TimeDelta::hours(3);
        let window = RetentionWindow::from_days(1).unwrap_or_default();
        let bounds = snapshot_bounds(t0(), Some(latest), window);
        assert_eq!(
            bounds.map(|b| (b.valid_from, b.valid_to)),
            Ok((latest, latest + TimeDelta::days(1)))
        );
    }

    #[test]
    fn later_clock_wins_over_older_snapshot() {
        let earlier = t0() - TimeDelta::days(30);
        let bounds = snapshot_bounds(t0(), Some(earlier), RetentionWindow::default());
        assert_eq!(bounds.map(|b| b.valid_from), Ok(t0()));
    }

    #[test]
    fn overflowing_upper_bound_is_an_error() {
        let bounds = snapshot_bounds(DateTime::<Utc>::MAX_UTC, None, RetentionWindow::default());
        assert!(matches!(bounds, Err(ValidityError::OutOfRange { .. })));
    }
}
