//! Attendance facts for one contract cycle.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BillingCycle;

/// Days worked, overtime and absences for one (contract, cycle start).
///
/// Owned by the attendance subsystem. The engine only reads these records,
/// creating a full-attendance default when none exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// The contract the record belongs to.
    pub contract_id: Uuid,
    /// First day of the cycle.
    pub cycle_start_date: NaiveDate,
    /// Last day of the cycle.
    pub cycle_end_date: NaiveDate,
    /// Days the worker was on duty.
    pub total_days_worked: Decimal,
    /// Extra days worked beyond the contract schedule.
    pub overtime_days: Decimal,
    /// Days worked away from the customer's home city.
    #[serde(default)]
    pub out_of_area_days: Decimal,
    /// Days of leave taken.
    #[serde(default)]
    pub leave_days: Decimal,
    /// Days worked that fell on statutory holidays.
    #[serde(default)]
    pub statutory_holiday_days: Decimal,
}

impl AttendanceRecord {
    /// Builds the default record assumed when the attendance subsystem has
    /// nothing for the cycle: every day worked, capped at `working_days`,
    /// and no overtime or absences.
    ///
    /// # Example
    ///
    /// ```
    /// use placement_billing::models::{AttendanceRecord, BillingCycle};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    /// use uuid::Uuid;
    ///
    /// let cycle = BillingCycle::new(
    ///     NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
    /// );
    /// let record = AttendanceRecord::full_attendance(Uuid::nil(), &cycle, 26);
    /// assert_eq!(record.total_days_worked, Decimal::from(26));
    /// assert_eq!(record.overtime_days, Decimal::ZERO);
    /// ```
    pub fn full_attendance(contract_id: Uuid, cycle: &BillingCycle, working_days: u32) -> Self {
        let days = cycle.days().clamp(0, i64::from(working_days));
        Self {
            contract_id,
            cycle_start_date: cycle.start_date,
            cycle_end_date: cycle.end_date,
            total_days_worked: Decimal::from(days),
            overtime_days: Decimal::ZERO,
            out_of_area_days: Decimal::ZERO,
            leave_days: Decimal::ZERO,
            statutory_holiday_days: Decimal::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_attendance_caps_at_working_days() {
        let cycle = BillingCycle::new(date(2025, 10, 1), date(2025, 10, 31));
        let record = AttendanceRecord::full_attendance(Uuid::nil(), &cycle, 26);
        assert_eq!(record.total_days_worked, Decimal::from(26));
    }

    #[test]
    fn test_full_attendance_short_cycle_uses_calendar_days() {
        let cycle = BillingCycle::new(date(2025, 10, 15), date(2025, 10, 31));
        let record = AttendanceRecord::full_attendance(Uuid::nil(), &cycle, 26);
        assert_eq!(record.total_days_worked, Decimal::from(17));
        assert_eq!(record.cycle_start_date, date(2025, 10, 15));
        assert_eq!(record.cycle_end_date, date(2025, 10, 31));
    }

    #[test]
    fn test_deserialize_without_optional_counters() {
        let json = r#"{
            "contract_id": "00000000-0000-0000-0000-000000000000",
            "cycle_start_date": "2025-10-01",
            "cycle_end_date": "2025-10-26",
            "total_days_worked": "24",
            "overtime_days": "2"
        }"#;
        let record: AttendanceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.total_days_worked, Decimal::from(24));
        assert_eq!(record.leave_days, Decimal::ZERO);
        assert_eq!(record.statutory_holiday_days, Decimal::ZERO);
    }
}
