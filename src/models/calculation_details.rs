//! Calculation detail models.
//!
//! This module contains the [`CalculationDetails`] stored on every bill and
//! payroll: the inputs that went into a cycle's computation, the money
//! breakdown, and a human-readable [`CalculationLog`] with one formula per
//! line item.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::BillingCycle;

/// The category of a money line in a fee breakdown.
///
/// # Example
///
/// ```
/// use placement_billing::models::FeeCategory;
///
/// let category = FeeCategory::ManagementFee;
/// assert_eq!(serde_json::to_string(&category).unwrap(), "\"management_fee\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    /// Flat or prorated monthly base fee charged to the customer.
    BaseFee,
    /// Daily-rate labor fee charged to the customer.
    LaborFee,
    /// Overtime charged to the customer.
    Overtime,
    /// Agency management fee.
    ManagementFee,
    /// Pro-rata refund of a prepaid management fee.
    ManagementFeeRefund,
    /// Management fee for a substitute working past the contract end.
    SubstituteManagementFee,
    /// Net customer increases from adjustments.
    CustomerIncrease,
    /// Net customer decreases from adjustments.
    CustomerDecrease,
    /// Daily-rate pay for days worked.
    BasePayout,
    /// Overtime paid to the worker.
    WorkerOvertime,
    /// Tier bonus paid to the worker.
    Bonus,
    /// Net employee increases from adjustments.
    EmployeeIncrease,
    /// Net employee decreases from adjustments.
    EmployeeDecrease,
    /// Service fee withheld from the worker's first cycle.
    FirstCycleDeduction,
}

impl FeeCategory {
    /// The snake_case name used in calculation logs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            FeeCategory::BaseFee => "base_fee",
            FeeCategory::LaborFee => "labor_fee",
            FeeCategory::Overtime => "overtime",
            FeeCategory::ManagementFee => "management_fee",
            FeeCategory::ManagementFeeRefund => "management_fee_refund",
            FeeCategory::SubstituteManagementFee => "substitute_management_fee",
            FeeCategory::CustomerIncrease => "customer_increase",
            FeeCategory::CustomerDecrease => "customer_decrease",
            FeeCategory::BasePayout => "base_payout",
            FeeCategory::WorkerOvertime => "worker_overtime",
            FeeCategory::Bonus => "bonus",
            FeeCategory::EmployeeIncrease => "employee_increase",
            FeeCategory::EmployeeDecrease => "employee_decrease",
            FeeCategory::FirstCycleDeduction => "first_cycle_deduction",
        }
    }
}

/// Which side of the ledger a [`FeeLine`] lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSide {
    /// Owed by the customer.
    Customer,
    /// Owed to the worker.
    Employee,
}

/// A signed money line in a fee breakdown.
///
/// Deductions carry a negative amount so that the bill or payroll total is
/// the plain sum of its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLine {
    /// The side this line is charged to.
    pub side: LedgerSide,
    /// The category of the line.
    pub category: FeeCategory,
    /// The signed amount, quantized to 2 decimal places.
    pub amount: Decimal,
}

/// One entry in a calculation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Line-item name, e.g. `"overtime_fee"`.
    pub item: String,
    /// Formula with the actual numbers used.
    pub formula: String,
}

/// Ordered `(line item, formula)` trace of a calculation.
///
/// # Example
///
/// ```
/// use placement_billing::models::CalculationLog;
///
/// let mut log = CalculationLog::default();
/// log.push("overtime_fee", "daily_rate(200.0000) × overtime_days(3) = 600.00");
///
/// assert_eq!(
///     log.get("overtime_fee"),
///     Some("daily_rate(200.0000) × overtime_days(3) = 600.00")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculationLog {
    entries: Vec<LogEntry>,
}

impl CalculationLog {
    /// Appends an entry.
    pub fn push(&mut self, item: impl Into<String>, formula: impl Into<String>) {
        self.entries.push(LogEntry {
            item: item.into(),
            formula: formula.into(),
        });
    }

    /// Returns the formula logged for `item`, if any.
    pub fn get(&self, item: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.item == item)
            .map(|e| e.formula.as_str())
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Returns true if nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Everything a reporting layer needs to render an auditable breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationDetails {
    /// Which calculator produced this (e.g. `"nanny"`).
    pub variant: String,
    /// The cycle that was calculated.
    pub cycle: BillingCycle,
    /// Every input value used, keyed by name.
    pub inputs: serde_json::Value,
    /// The signed money lines.
    pub lines: Vec<FeeLine>,
    /// The formula trace.
    pub log: CalculationLog,
    /// The resulting bill total.
    pub bill_total: Decimal,
    /// The resulting payroll total.
    pub payroll_total: Decimal,
}

impl CalculationDetails {
    /// Sum of the lines charged to one side.
    pub fn side_total(&self, side: LedgerSide) -> Decimal {
        self.lines
            .iter()
            .filter(|l| l.side == side)
            .map(|l| l.amount)
            .sum()
    }

    /// The amount of the first line in `category`, if present.
    pub fn line(&self, category: FeeCategory) -> Option<Decimal> {
        self.lines
            .iter()
            .find(|l| l.category == category)
            .map(|l| l.amount)
    }
}
