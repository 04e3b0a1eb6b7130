//! Substitute worker records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BillingCycle;

/// A temporary replacement worker on a main contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstituteRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// The contract being covered.
    pub main_contract_id: Uuid,
    /// The replacement worker.
    pub substitute_employee_id: Uuid,
    /// First day covered (inclusive).
    pub start_date: NaiveDate,
    /// Last day covered (inclusive).
    pub end_date: NaiveDate,
    /// The substitute's monthly salary.
    pub substitute_salary: Decimal,
    /// The agency's commission rate on the substitute.
    pub management_fee_rate: Decimal,
    /// Management fee charged for days past the main contract's end.
    #[serde(default)]
    pub substitute_management_fee: Decimal,
    /// Bill generated for the substitute period.
    #[serde(default)]
    pub generated_bill_id: Option<Uuid>,
    /// Payroll generated for the substitute worker.
    #[serde(default)]
    pub generated_payroll_id: Option<Uuid>,
}

impl SubstituteRecord {
    /// The covered period as a cycle.
    pub fn period(&self) -> BillingCycle {
        BillingCycle::new(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_spans_record_dates() {
        let record = SubstituteRecord {
            id: Uuid::nil(),
            main_contract_id: Uuid::nil(),
            substitute_employee_id: Uuid::nil(),
            start_date: NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
            substitute_salary: Decimal::from(5200),
            management_fee_rate: Decimal::new(10, 2),
            substitute_management_fee: Decimal::ZERO,
            generated_bill_id: None,
            generated_payroll_id: None,
        };
        assert_eq!(record.period().days(), 11);
    }
}
