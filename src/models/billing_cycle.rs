//! Billing cycle model.
//!
//! This module contains the [`BillingCycle`] type: the inclusive date range a
//! single bill/payroll pair covers for one contract.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// The date range covered by one bill/payroll pair.
///
/// Both bounds are inclusive.
///
/// # Example
///
/// ```
/// use placement_billing::models::BillingCycle;
/// use chrono::NaiveDate;
///
/// let cycle = BillingCycle::new(
///     NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
/// );
///
/// assert_eq!(cycle.days(), 31);
/// assert!(cycle.contains_date(NaiveDate::from_ymd_opt(2025, 10, 15).unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingCycle {
    /// The first day of the cycle (inclusive).
    pub start_date: NaiveDate,
    /// The last day of the cycle (inclusive).
    pub end_date: NaiveDate,
}

impl BillingCycle {
    /// Creates a cycle from its inclusive bounds.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Number of calendar days in the cycle, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Checks if a given date falls within this cycle (inclusive).
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the cycle's end date falls in the given month.
    ///
    /// Cycles that straddle two months settle in the later one.
    pub fn settles_in(&self, year: i32, month: u32) -> bool {
        self.end_date.year() == year && self.end_date.month() == month
    }

    /// Returns true if the two cycles share at least one day.
    pub fn overlaps(&self, other: &BillingCycle) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_counts_both_ends() {
        let cycle = BillingCycle::new(date(2025, 11, 1), date(2025, 11, 30));
        assert_eq!(cycle.days(), 30);

        let single = BillingCycle::new(date(2025, 11, 5), date(2025, 11, 5));
        assert_eq!(single.days(), 1);
    }

    #[test]
    fn test_contains_date_bounds() {
        let cycle = BillingCycle::new(date(2025, 10, 1), date(2025, 10, 31));
        assert!(cycle.contains_date(cycle.start_date));
        assert!(cycle.contains_date(cycle.end_date));
        assert!(!cycle.contains_date(date(2025, 9, 30)));
        assert!(!cycle.contains_date(date(2025, 11, 1)));
    }

    #[test]
    fn test_cross_month_cycle_settles_in_later_month() {
        let cycle = BillingCycle::new(date(2025, 10, 20), date(2025, 11, 14));
        assert!(cycle.settles_in(2025, 11));
        assert!(!cycle.settles_in(2025, 10));
    }

    #[test]
    fn test_overlaps() {
        let a = BillingCycle::new(date(2025, 10, 1), date(2025, 10, 26));
        let b = BillingCycle::new(date(2025, 10, 27), date(2025, 11, 21));
        let c = BillingCycle::new(date(2025, 10, 26), date(2025, 11, 1));
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
    }

    #[test]
    fn test_serialize_cycle() {
        let cycle = BillingCycle::new(date(2025, 10, 1), date(2025, 10, 31));
        let json = serde_json::to_string(&cycle).unwrap();
        assert!(json.contains("\"start_date\":\"2025-10-01\""));
        assert!(json.contains("\"end_date\":\"2025-10-31\""));
    }
}
