//! Financial adjustment model.
//!
//! An adjustment is a typed delta on a contract, bill or payroll. Its amount
//! is always non-negative; the [`AdjustmentType`] decides which side of the
//! ledger it moves and in which direction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The purpose of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Extra charge to the customer.
    CustomerIncrease,
    /// Reduction of the customer's charge.
    CustomerDecrease,
    /// Discount granted to the customer.
    CustomerDiscount,
    /// Deposit collected through a bill.
    Deposit,
    /// One-off introduction fee.
    IntroductionFee,
    /// Fee carried over from an earlier cycle.
    DeferredFee,
    /// Extra pay to the worker.
    EmployeeIncrease,
    /// Deduction from the worker's pay.
    EmployeeDecrease,
    /// Agency commission withheld from the worker.
    EmployeeCommission,
    /// Cancels an [`AdjustmentType::EmployeeCommission`].
    EmployeeCommissionOffset,
    /// Salary the agency paid on the customer's behalf.
    CompanyPaidSalary,
    /// Salary paid out of the customer's deposit.
    DepositPaidSalary,
    /// Management fee for a substitute working past the contract end.
    SubstituteManagementFee,
}

/// Direction an adjustment moves a bill or payroll total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentEffect {
    /// Raises the bill total.
    CustomerIncrease,
    /// Lowers the bill total.
    CustomerDecrease,
    /// Raises the payroll total.
    EmployeeIncrease,
    /// Lowers the payroll total.
    EmployeeDecrease,
}

impl AdjustmentEffect {
    /// True for effects on the customer bill.
    pub fn is_customer(self) -> bool {
        matches!(
            self,
            AdjustmentEffect::CustomerIncrease | AdjustmentEffect::CustomerDecrease
        )
    }

    /// +1 for increases, -1 for decreases.
    pub fn sign(self) -> Decimal {
        match self {
            AdjustmentEffect::CustomerIncrease | AdjustmentEffect::EmployeeIncrease => {
                Decimal::ONE
            }
            AdjustmentEffect::CustomerDecrease | AdjustmentEffect::EmployeeDecrease => {
                Decimal::NEGATIVE_ONE
            }
        }
    }

    /// The effect on the same side in the other direction.
    pub fn opposite(self) -> Self {
        match self {
            AdjustmentEffect::CustomerIncrease => AdjustmentEffect::CustomerDecrease,
            AdjustmentEffect::CustomerDecrease => AdjustmentEffect::CustomerIncrease,
            AdjustmentEffect::EmployeeIncrease => AdjustmentEffect::EmployeeDecrease,
            AdjustmentEffect::EmployeeDecrease => AdjustmentEffect::EmployeeIncrease,
        }
    }

    /// The plain adjustment type carrying this effect.
    pub fn plain_type(self) -> AdjustmentType {
        match self {
            AdjustmentEffect::CustomerIncrease => AdjustmentType::CustomerIncrease,
            AdjustmentEffect::CustomerDecrease => AdjustmentType::CustomerDecrease,
            AdjustmentEffect::EmployeeIncrease => AdjustmentType::EmployeeIncrease,
            AdjustmentEffect::EmployeeDecrease => AdjustmentType::EmployeeDecrease,
        }
    }
}

impl AdjustmentType {
    /// Classifies the type into one of the four netting buckets.
    ///
    /// # Example
    ///
    /// ```
    /// use placement_billing::models::{AdjustmentEffect, AdjustmentType};
    ///
    /// assert_eq!(AdjustmentType::Deposit.effect(), AdjustmentEffect::CustomerIncrease);
    /// assert_eq!(AdjustmentType::EmployeeCommission.effect(), AdjustmentEffect::EmployeeDecrease);
    /// ```
    pub fn effect(self) -> AdjustmentEffect {
        match self {
            AdjustmentType::CustomerIncrease
            | AdjustmentType::Deposit
            | AdjustmentType::IntroductionFee
            | AdjustmentType::DeferredFee
            | AdjustmentType::SubstituteManagementFee => AdjustmentEffect::CustomerIncrease,
            AdjustmentType::CustomerDecrease
            | AdjustmentType::CustomerDiscount
            | AdjustmentType::DepositPaidSalary => AdjustmentEffect::CustomerDecrease,
            AdjustmentType::EmployeeIncrease
            | AdjustmentType::EmployeeCommissionOffset
            | AdjustmentType::CompanyPaidSalary => AdjustmentEffect::EmployeeIncrease,
            AdjustmentType::EmployeeDecrease | AdjustmentType::EmployeeCommission => {
                AdjustmentEffect::EmployeeDecrease
            }
        }
    }

    /// Salary-substitution types that never carry forward on merge.
    pub fn is_salary_cover(self) -> bool {
        matches!(
            self,
            AdjustmentType::CompanyPaidSalary | AdjustmentType::DepositPaidSalary
        )
    }
}

/// Settlement state of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStatus {
    /// Recorded, not yet on a bill.
    Pending,
    /// Included in a bill or payroll.
    Billed,
    /// Money has moved.
    Paid,
}

impl AdjustmentStatus {
    /// True once money has moved.
    pub fn is_settled(self) -> bool {
        self == AdjustmentStatus::Paid
    }
}

/// Why an adjustment exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentOrigin {
    /// Entered by staff.
    #[default]
    Manual,
    /// Zeroes a merged bill's balance.
    MergeOffset,
    /// Receives a merged bill's balance.
    MergeTransferIn,
    /// Management-fee refund on early termination.
    TerminationRefund,
    /// Cancels a refund moved to a successor contract.
    TransferOffset,
    /// Receives a refund from a predecessor contract.
    TransferIn,
}

/// The record an adjustment is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AdjustmentTarget {
    /// A contract-level adjustment (not netted into any cycle).
    Contract(Uuid),
    /// A customer bill.
    Bill(Uuid),
    /// An employee payroll.
    Payroll(Uuid),
}

/// A typed money delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialAdjustment {
    /// Unique identifier.
    pub id: Uuid,
    /// The record adjusted.
    pub target: AdjustmentTarget,
    /// Purpose, which fixes the direction.
    pub adjustment_type: AdjustmentType,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Settlement state.
    pub status: AdjustmentStatus,
    /// Why the adjustment exists.
    #[serde(default)]
    pub origin: AdjustmentOrigin,
    /// Human-readable description.
    pub description: String,
    /// Settlement date as entered, parsed leniently when settling.
    #[serde(default)]
    pub settlement_date: Option<String>,
    /// Payment or payout record created on settlement.
    #[serde(default)]
    pub linked_record_id: Option<Uuid>,
    /// Provenance, e.g. `{"linked_bill_id": ...}`.
    #[serde(default)]
    pub details: serde_json::Value,
    /// Who created it.
    pub created_by: String,
}

impl FinancialAdjustment {
    /// Creates a pending manual adjustment.
    ///
    /// # Example
    ///
    /// ```
    /// use placement_billing::models::{AdjustmentTarget, AdjustmentType, FinancialAdjustment};
    /// use rust_decimal::Decimal;
    /// use uuid::Uuid;
    ///
    /// let adj = FinancialAdjustment::new(
    ///     AdjustmentTarget::Bill(Uuid::nil()),
    ///     AdjustmentType::CustomerDiscount,
    ///     Decimal::from(300),
    ///     "Holiday discount",
    ///     "ops@agency",
    /// );
    /// assert_eq!(adj.signed_amount(), Decimal::from(-300));
    /// ```
    pub fn new(
        target: AdjustmentTarget,
        adjustment_type: AdjustmentType,
        amount: Decimal,
        description: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            adjustment_type,
            amount,
            status: AdjustmentStatus::Pending,
            origin: AdjustmentOrigin::Manual,
            description: description.into(),
            settlement_date: None,
            linked_record_id: None,
            details: serde_json::Value::Null,
            created_by: actor.into(),
        }
    }

    /// Sets the origin.
    pub fn with_origin(mut self, origin: AdjustmentOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the provenance details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// The netting bucket of this adjustment.
    pub fn effect(&self) -> AdjustmentEffect {
        self.adjustment_type.effect()
    }

    /// Amount signed by direction: increases positive, decreases negative.
    pub fn signed_amount(&self) -> Decimal {
        self.amount * self.effect().sign()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_every_customer_type_is_customer_side() {
        for t in [
            AdjustmentType::CustomerIncrease,
            AdjustmentType::CustomerDecrease,
            AdjustmentType::CustomerDiscount,
            AdjustmentType::Deposit,
            AdjustmentType::IntroductionFee,
            AdjustmentType::DeferredFee,
            AdjustmentType::DepositPaidSalary,
            AdjustmentType::SubstituteManagementFee,
        ] {
            assert!(t.effect().is_customer(), "{:?}", t);
        }
    }

    #[test]
    fn test_every_employee_type_is_employee_side() {
        for t in [
            AdjustmentType::EmployeeIncrease,
            AdjustmentType::EmployeeDecrease,
            AdjustmentType::EmployeeCommission,
            AdjustmentType::EmployeeCommissionOffset,
            AdjustmentType::CompanyPaidSalary,
        ] {
            assert!(!t.effect().is_customer(), "{:?}", t);
        }
    }

    #[test]
    fn test_commission_and_offset_cancel() {
        let target = AdjustmentTarget::Payroll(Uuid::nil());
        let commission = FinancialAdjustment::new(
            target,
            AdjustmentType::EmployeeCommission,
            dec("450.00"),
            "commission",
            "system",
        );
        let offset = FinancialAdjustment::new(
            target,
            AdjustmentType::EmployeeCommissionOffset,
            dec("450.00"),
            "commission offset",
            "system",
        );
        assert_eq!(commission.signed_amount() + offset.signed_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_opposite_round_trips() {
        for e in [
            AdjustmentEffect::CustomerIncrease,
            AdjustmentEffect::CustomerDecrease,
            AdjustmentEffect::EmployeeIncrease,
            AdjustmentEffect::EmployeeDecrease,
        ] {
            assert_eq!(e.opposite().opposite(), e);
            assert_eq!(e.plain_type().effect(), e);
            assert_eq!(e.sign() + e.opposite().sign(), Decimal::ZERO);
        }
    }

    #[test]
    fn test_salary_cover_types() {
        assert!(AdjustmentType::CompanyPaidSalary.is_salary_cover());
        assert!(AdjustmentType::DepositPaidSalary.is_salary_cover());
        assert!(!AdjustmentType::EmployeeIncrease.is_salary_cover());
    }

    #[test]
    fn test_serialize_target() {
        let json = serde_json::to_value(AdjustmentTarget::Bill(Uuid::nil())).unwrap();
        assert_eq!(json["kind"], "bill");
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_deserialize_manual_adjustment_defaults() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "target": {"kind": "payroll", "id": "00000000-0000-0000-0000-000000000002"},
            "adjustment_type": "employee_increase",
            "amount": "120.50",
            "status": "pending",
            "description": "Travel reimbursement",
            "created_by": "ops"
        }"#;
        let adj: FinancialAdjustment = serde_json::from_str(json).unwrap();
        assert_eq!(adj.origin, AdjustmentOrigin::Manual);
        assert_eq!(adj.amount, dec("120.50"));
        assert_eq!(adj.linked_record_id, None);
        assert!(adj.details.is_null());
    }
}
