//! Customer bill and employee payroll records.
//!
//! Exactly one [`CustomerBill`] and one [`EmployeePayroll`] exist per
//! (contract, cycle start, substitute flag). Both are recomputed in place,
//! never duplicated.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BillingCycle, CalculationDetails};

/// Settlement status derived from the amount due and the amount settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Nothing settled yet.
    Unpaid,
    /// Some, but not all, of the amount settled.
    PartiallyPaid,
    /// Settled exactly.
    Paid,
    /// Settled beyond the amount due.
    Overpaid,
}

/// Payroll side uses the same states as bills.
pub type PayoutStatus = PaymentStatus;

impl PaymentStatus {
    /// Derives the status from the amount due and the amount settled.
    ///
    /// # Example
    ///
    /// ```
    /// use placement_billing::models::PaymentStatus;
    /// use rust_decimal::Decimal;
    ///
    /// let due = Decimal::from(7200);
    /// assert_eq!(PaymentStatus::from_amounts(due, Decimal::ZERO), PaymentStatus::Unpaid);
    /// assert_eq!(PaymentStatus::from_amounts(due, Decimal::from(1000)), PaymentStatus::PartiallyPaid);
    /// assert_eq!(PaymentStatus::from_amounts(due, due), PaymentStatus::Paid);
    /// assert_eq!(PaymentStatus::from_amounts(due, Decimal::from(8000)), PaymentStatus::Overpaid);
    /// assert_eq!(PaymentStatus::from_amounts(Decimal::ZERO, Decimal::ZERO), PaymentStatus::Paid);
    /// ```
    pub fn from_amounts(due: Decimal, settled: Decimal) -> Self {
        if settled == due {
            PaymentStatus::Paid
        } else if settled > due {
            PaymentStatus::Overpaid
        } else if settled <= Decimal::ZERO {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::PartiallyPaid
        }
    }
}

/// What the customer owes for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerBill {
    /// Unique identifier.
    pub id: Uuid,
    /// The contract billed.
    pub contract_id: Uuid,
    /// First day of the cycle (part of the uniqueness key).
    pub cycle_start_date: NaiveDate,
    /// Last day of the cycle.
    pub cycle_end_date: NaiveDate,
    /// True for bills generated for a substitute worker.
    pub is_substitute: bool,
    /// The substitute record that generated this bill.
    #[serde(default)]
    pub substitute_record_id: Option<Uuid>,
    /// Computed amount owed.
    pub total_due: Decimal,
    /// Sum of payment records.
    pub total_paid: Decimal,
    /// Derived from `total_due` and `total_paid`.
    pub payment_status: PaymentStatus,
    /// Inputs and formula trace of the last calculation.
    #[serde(default)]
    pub calculation_details: Option<CalculationDetails>,
    /// Set once the balance has been transferred to a successor bill.
    pub is_merged: bool,
}

impl CustomerBill {
    /// Creates an empty, unpaid bill for a cycle.
    pub fn new(contract_id: Uuid, cycle: &BillingCycle, is_substitute: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            cycle_start_date: cycle.start_date,
            cycle_end_date: cycle.end_date,
            is_substitute,
            substitute_record_id: None,
            total_due: Decimal::ZERO,
            total_paid: Decimal::ZERO,
            payment_status: PaymentStatus::from_amounts(Decimal::ZERO, Decimal::ZERO),
            calculation_details: None,
            is_merged: false,
        }
    }

    /// The cycle this bill covers.
    pub fn cycle(&self) -> BillingCycle {
        BillingCycle::new(self.cycle_start_date, self.cycle_end_date)
    }

    /// Amount still owed (negative when the customer is in credit).
    pub fn outstanding(&self) -> Decimal {
        self.total_due - self.total_paid
    }

    /// Returns true if a previous calculation left a log on the bill.
    pub fn has_calculation_log(&self) -> bool {
        self.calculation_details
            .as_ref()
            .is_some_and(|d| !d.log.is_empty())
    }

    /// Refreshes the payment status from the current totals.
    pub fn refresh_status(&mut self) {
        self.payment_status = PaymentStatus::from_amounts(self.total_due, self.total_paid);
    }
}

/// What the worker is paid for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeePayroll {
    /// Unique identifier.
    pub id: Uuid,
    /// The contract the work was done under.
    pub contract_id: Uuid,
    /// The worker paid.
    pub employee_id: Option<Uuid>,
    /// First day of the cycle (part of the uniqueness key).
    pub cycle_start_date: NaiveDate,
    /// Last day of the cycle.
    pub cycle_end_date: NaiveDate,
    /// True for payrolls generated for a substitute worker.
    pub is_substitute: bool,
    /// The substitute record that generated this payroll.
    #[serde(default)]
    pub substitute_record_id: Option<Uuid>,
    /// Computed amount payable.
    pub total_payable: Decimal,
    /// Sum of payout records.
    pub total_paid_out: Decimal,
    /// Derived from `total_payable` and `total_paid_out`.
    pub payout_status: PayoutStatus,
    /// Inputs and formula trace of the last calculation.
    #[serde(default)]
    pub calculation_details: Option<CalculationDetails>,
    /// Set once the balance has been transferred to a successor payroll.
    pub is_merged: bool,
}

impl EmployeePayroll {
    /// Creates an empty, unpaid payroll for a cycle.
    pub fn new(
        contract_id: Uuid,
        employee_id: Option<Uuid>,
        cycle: &BillingCycle,
        is_substitute: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            employee_id,
            cycle_start_date: cycle.start_date,
            cycle_end_date: cycle.end_date,
            is_substitute,
            substitute_record_id: None,
            total_payable: Decimal::ZERO,
            total_paid_out: Decimal::ZERO,
            payout_status: PaymentStatus::from_amounts(Decimal::ZERO, Decimal::ZERO),
            calculation_details: None,
            is_merged: false,
        }
    }

    /// The cycle this payroll covers.
    pub fn cycle(&self) -> BillingCycle {
        BillingCycle::new(self.cycle_start_date, self.cycle_end_date)
    }

    /// Amount still to be paid out (negative when the worker was overpaid).
    pub fn outstanding(&self) -> Decimal {
        self.total_payable - self.total_paid_out
    }

    /// Refreshes the payout status from the current totals.
    pub fn refresh_status(&mut self) {
        self.payout_status = PaymentStatus::from_amounts(self.total_payable, self.total_paid_out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn create_cycle() -> BillingCycle {
        BillingCycle::new(
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
        )
    }

    #[test]
    fn test_negative_due_with_nothing_paid_is_overpaid() {
        assert_eq!(
            PaymentStatus::from_amounts(dec("-150.00"), Decimal::ZERO),
            PaymentStatus::Overpaid
        );
    }

    #[test]
    fn test_new_bill_is_empty() {
        let bill = CustomerBill::new(Uuid::nil(), &create_cycle(), false);
        assert_eq!(bill.total_due, Decimal::ZERO);
        assert!(!bill.has_calculation_log());
        assert!(!bill.is_merged);
        assert_eq!(bill.cycle(), create_cycle());
    }

    #[test]
    fn test_bill_outstanding_and_status() {
        let mut bill = CustomerBill::new(Uuid::nil(), &create_cycle(), false);
        bill.total_due = dec("7200.00");
        bill.total_paid = dec("2000.00");
        bill.refresh_status();
        assert_eq!(bill.outstanding(), dec("5200.00"));
        assert_eq!(bill.payment_status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_payroll_outstanding_and_status() {
        let mut payroll = EmployeePayroll::new(Uuid::nil(), None, &create_cycle(), false);
        payroll.total_payable = dec("5400.00");
        payroll.total_paid_out = dec("5400.00");
        payroll.refresh_status();
        assert_eq!(payroll.outstanding(), Decimal::ZERO);
        assert_eq!(payroll.payout_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_serialize_status_snake_case() {
        let json = serde_json::to_string(&PaymentStatus::PartiallyPaid).unwrap();
        assert_eq!(json, "\"partially_paid\"");
    }
}
