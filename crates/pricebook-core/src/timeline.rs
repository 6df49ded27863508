//! Temporal queries over one product's history ledger.
//!
//! These are the selection rules every ledger backend must agree on. The
//! in-memory store evaluates them directly; the `PostgreSQL` store encodes
//! the same orderings in SQL.
//!
//! | query | rule |
//! |---|---|
//! | chronological order | `valid_from` asc, then `history_id` asc |
//! | interval order | `valid_from` asc, `valid_to` asc, `history_id` asc |
//! | longest held | greatest `valid_to - valid_from`, then price, then `history_id` |
//! | state at instant | `valid_from <= t <= valid_to`, greatest `valid_from`, then `history_id` |

use chrono::{DateTime, Utc};
use pricebook_types::{HistoryRecord, PriceDuration, ValidityInterval};

/// Sort records into chronological order.
pub fn sort_chronologically(records: &mut [HistoryRecord]) {
    records.sort_by(|a, b| {
        a.valid_from
            .cmp(&b.valid_from)
            .then(a.history_id.cmp(&b.history_id))
    });
}

/// The price timeline, ordered by `valid_from` then `valid_to`.
pub fn validity_intervals(records: &[HistoryRecord]) -> Vec<ValidityInterval> {
    let mut ordered: Vec<&HistoryRecord> = records.iter().collect();
    ordered.sort_by(|a, b| {
        a.valid_from
            .cmp(&b.valid_from)
            .then(a.valid_to.cmp(&b.valid_to))
            .then(a.history_id.cmp(&b.history_id))
    });
    ordered.into_iter().map(HistoryRecord::interval).collect()
}

/// The record whose validity interval is longest.
///
/// Ties go to the higher price; remaining ties to the most recently
/// appended record.
pub fn longest_held(records: &[HistoryRecord]) -> Option<&HistoryRecord> {
    records.iter().max_by(|a, b| {
        a.duration()
            .cmp(&b.duration())
            .then(a.price.cmp(&b.price))
            .then(a.history_id.cmp(&b.history_id))
    })
}

/// Price and whole-second duration of the longest-held record.
pub fn highest_price_duration(records: &[HistoryRecord]) -> Option<PriceDuration> {
    longest_held(records).map(|record| PriceDuration {
        price: record.price,
        duration_secs: record.duration().num_seconds(),
    })
}

/// The record that was the historical state at `instant`.
///
/// If several intervals contain the instant, the one that started most
/// recently wins.
pub fn state_at(records: &[HistoryRecord], instant: DateTime<Utc>) -> Option<&HistoryRecord> {
    records
        .iter()
        .filter(|record| record.contains(instant))
        .max_by(|a, b| {
            a.valid_from
                .cmp(&b.valid_from)
                .then(a.history_id.cmp(&b.history_id))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};
    use pricebook_types::{HistoryId, ProductId};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn record(id: i64, from: TimeDelta, len: TimeDelta, price: i64) -> HistoryRecord {
        let valid_from = t0() + from;
        HistoryRecord {
            history_id: HistoryId(id),
            product_id: ProductId(1),
            name: format!("v{id}"),
            description: String::new(),
            price,
            valid_from,
            valid_to: valid_from + len,
            recorded_at: valid_from,
        }
    }

    fn week() -> TimeDelta {
        TimeDelta::days(7)
    }

    #[test]
    fn chronological_sort_breaks_ties_by_append_order() {
        let mut records = vec![
            record(3, TimeDelta::days(2), week(), 300),
            record(2, TimeDelta::zero(), week(), 200),
            record(1, TimeDelta::zero(), week(), 100),
        ];
        sort_chronologically(&mut records);
        let ids: Vec<i64> = records.iter().map(|r| r.history_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn intervals_order_by_start_then_end() {
        let records = vec![
            record(1, TimeDelta::days(1), week(), 10),
            record(2, TimeDelta::zero(), TimeDelta::days(9), 20),
            record(3, TimeDelta::zero(), TimeDelta::days(3), 30),
        ];
        let prices: Vec<i64> = validity_intervals(&records)
            .iter()
            .map(|i| i.price)
            .collect();
        assert_eq!(prices, vec![30, 20, 10]);
    }

    #[test]
    fn intervals_of_empty_ledger_are_empty() {
        assert!(validity_intervals(&[]).is_empty());
    }

    #[test]
    fn longest_interval_wins_regardless_of_price() {
        let records = vec![
            record(1, TimeDelta::zero(), week(), 900),
            record(2, TimeDelta::days(1), TimeDelta::days(10), 50),
        ];
        assert_eq!(
            highest_price_duration(&records),
            Some(PriceDuration {
                price: 50,
                duration_secs: TimeDelta::days(10).num_seconds(),
            })
        );
    }

    #[test]
    fn equal_durations_pick_the_higher_price() {
        let records = vec![
            record(1, TimeDelta::zero(), week(), 100),
            record(2, TimeDelta::days(2), week(), 150),
        ];
        assert_eq!(highest_price_duration(&records).map(|p| p.price), Some(150));
    }

    #[test]
    fn equal_duration_and_price_pick_latest_record() {
        let records = vec![
            record(1, TimeDelta::zero(), week(), 100),
            record(2, TimeDelta::days(2), week(), 100),
        ];
        assert_eq!(longest_held(&records).map(|r| r.history_id.0), Some(2));
    }

    #[test]
    fn longest_held_of_empty_ledger_is_none() {
        assert_eq!(highest_price_duration(&[]), None);
    }

    #[test]
    fn state_at_includes_both_bounds() {
        let r = record(1, TimeDelta::zero(), week(), 100);
        let records = vec![r.clone()];
        assert_eq!(state_at(&records, r.valid_from).map(|s| s.price), Some(100));
        assert_eq!(state_at(&records, r.valid_to).map(|s| s.price), Some(100));
        assert!(state_at(&records, r.valid_from - TimeDelta::microseconds(1)).is_none());
        assert!(state_at(&records, r.valid_to + TimeDelta::microseconds(1)).is_none());
    }

    #[test]
    fn overlapping_intervals_resolve_to_latest_start() {
        let records = vec![
            record(1, TimeDelta::zero(), week(), 100),
            record(2, TimeDelta::days(2), week(), 150),
        ];
        assert_eq!(
            state_at(&records, t0() + TimeDelta::days(1)).map(|r| r.price),
            Some(100)
        );
        assert_eq!(
            state_at(&records, t0() + TimeDelta::days(3)).map(|r| r.price),
            Some(150)
        );
        assert_eq!(
            state_at(&records, t0() + TimeDelta::days(8)).map(|r| r.price),
            Some(150)
        );
    }
}
