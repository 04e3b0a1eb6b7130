//! Append-only settlement events and activity logs.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Money received from (positive) or refunded to (negative) a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// The bill settled.
    pub bill_id: Uuid,
    /// Signed amount.
    pub amount: Decimal,
    /// Settlement date.
    pub paid_on: NaiveDate,
    /// The adjustment whose settlement created this record.
    #[serde(default)]
    pub adjustment_id: Option<Uuid>,
    /// Who recorded it.
    pub recorded_by: String,
}

/// Money paid to (positive) or recovered from (negative) a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// The payroll settled.
    pub payroll_id: Uuid,
    /// Signed amount.
    pub amount: Decimal,
    /// Settlement date.
    pub paid_on: NaiveDate,
    /// The adjustment whose settlement created this record.
    #[serde(default)]
    pub adjustment_id: Option<Uuid>,
    /// Who recorded it.
    pub recorded_by: String,
}

/// An audit entry describing something the engine did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Unique identifier.
    pub id: Uuid,
    /// The contract concerned.
    pub contract_id: Uuid,
    /// The bill concerned, if any.
    #[serde(default)]
    pub bill_id: Option<Uuid>,
    /// The payroll concerned, if any.
    #[serde(default)]
    pub payroll_id: Option<Uuid>,
    /// Who triggered it.
    pub actor: String,
    /// Machine-readable action, e.g. `"bill_recalculated"`.
    pub action: String,
    /// Human-readable message.
    pub message: String,
    /// When it happened.
    pub at: DateTime<Utc>,
}

impl ActivityLog {
    /// Creates an entry timestamped now.
    pub fn new(
        contract_id: Uuid,
        actor: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            bill_id: None,
            payroll_id: None,
            actor: actor.into(),
            action: action.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Attaches the entry to a bill.
    pub fn for_bill(mut self, bill_id: Uuid) -> Self {
        self.bill_id = Some(bill_id);
        self
    }

    /// Attaches the entry to a payroll.
    pub fn for_payroll(mut self, payroll_id: Uuid) -> Self {
        self.payroll_id = Some(payroll_id);
        self
    }
}
