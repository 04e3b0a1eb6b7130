//! Fee calculation entry point.
//!
//! This module provides [`calculate_fees`], a pure function that dispatches on
//! the kind of placement being billed and returns a [`FeeBreakdown`]: signed
//! money lines, an ordered calculation log, and the bill and payroll totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdjustmentEffect, AttendanceRecord, BillingCycle, CalculationDetails, CalculationLog, Contract,
    ContractKind, FeeCategory, FeeLine, FinancialAdjustment, LedgerSide, SubstituteRecord,
};

use super::maternity_nurse::calculate_maternity_nurse_fees;
use super::nanny::calculate_nanny_fees;
use super::rounding::round_money;
use super::simple_rate::calculate_simple_rate_fees;
use super::substitute_fee::calculate_substitute_fees;

/// Net adjustment amounts for one bill/payroll pair, split by effect.
///
/// All four amounts are non-negative; the direction is carried by the field.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::AdjustmentTotals;
/// use placement_billing::models::{AdjustmentTarget, AdjustmentType, FinancialAdjustment};
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let bill = AdjustmentTarget::Bill(Uuid::nil());
/// let adjustments = vec![
///     FinancialAdjustment::new(bill, AdjustmentType::Deposit, Decimal::from(500), "Deposit", "ops"),
///     FinancialAdjustment::new(bill, AdjustmentType::CustomerDiscount, Decimal::from(200), "Discount", "ops"),
/// ];
///
/// let totals = AdjustmentTotals::from_adjustments(&adjustments);
/// assert_eq!(totals.customer_increase, Decimal::from(500));
/// assert_eq!(totals.customer_decrease, Decimal::from(200));
/// assert_eq!(totals.customer_net(), Decimal::from(300));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentTotals {
    /// Sum of customer-increase adjustments.
    pub customer_increase: Decimal,
    /// Sum of customer-decrease adjustments.
    pub customer_decrease: Decimal,
    /// Sum of employee-increase adjustments.
    pub employee_increase: Decimal,
    /// Sum of employee-decrease adjustments.
    pub employee_decrease: Decimal,
}

impl AdjustmentTotals {
    /// Folds adjustments into the four netting buckets by type.
    pub fn from_adjustments<'a, I>(adjustments: I) -> Self
    where
        I: IntoIterator<Item = &'a FinancialAdjustment>,
    {
        adjustments
            .into_iter()
            .fold(Self::default(), |mut totals, adj| {
                match adj.effect() {
                    AdjustmentEffect::CustomerIncrease => totals.customer_increase += adj.amount,
                    AdjustmentEffect::CustomerDecrease => totals.customer_decrease += adj.amount,
                    AdjustmentEffect::EmployeeIncrease => totals.employee_increase += adj.amount,
                    AdjustmentEffect::EmployeeDecrease => totals.employee_decrease += adj.amount,
                }
                totals
            })
    }

    /// Customer increases minus customer decreases.
    pub fn customer_net(&self) -> Decimal {
        self.customer_increase - self.customer_decrease
    }

    /// Employee increases minus employee decreases.
    pub fn employee_net(&self) -> Decimal {
        self.employee_increase - self.employee_decrease
    }
}

/// What is being billed.
#[derive(Debug, Clone, Copy)]
pub enum FeeSubject<'a> {
    /// A regular contract cycle.
    Contract {
        /// The contract.
        contract: &'a Contract,
        /// Attendance for the cycle.
        attendance: &'a AttendanceRecord,
    },
    /// A substitute covering for the main contract's worker.
    Substitute {
        /// The substitute record.
        record: &'a SubstituteRecord,
        /// The main contract.
        contract: &'a Contract,
    },
}

/// Everything the fee calculator reads.
#[derive(Debug, Clone, Copy)]
pub struct FeeInput<'a> {
    /// The contract cycle or substitute being billed.
    pub subject: FeeSubject<'a>,
    /// The cycle bounds.
    pub cycle: BillingCycle,
    /// Net adjustments already attached to the bill and payroll.
    pub adjustments: AdjustmentTotals,
    /// Rates and divisors.
    pub config: &'a EngineConfig,
}

/// The result of a fee calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Which calculator produced this.
    pub variant: String,
    /// The cycle that was calculated.
    pub cycle: BillingCycle,
    /// Every input value used.
    pub inputs: serde_json::Value,
    /// Signed money lines, customer and employee.
    pub lines: Vec<FeeLine>,
    /// Ordered formula trace.
    pub log: CalculationLog,
    /// Amount owed by the customer.
    pub bill_total: Decimal,
    /// Amount owed to the worker.
    pub payroll_total: Decimal,
}

impl FeeBreakdown {
    /// The amount of the first line in `category`, or zero.
    pub fn amount(&self, category: FeeCategory) -> Decimal {
        self.lines
            .iter()
            .find(|l| l.category == category)
            .map(|l| l.amount)
            .unwrap_or(Decimal::ZERO)
    }

    /// Converts the breakdown into the details stored on a bill or payroll.
    pub fn into_details(self) -> CalculationDetails {
        CalculationDetails {
            variant: self.variant,
            cycle: self.cycle,
            inputs: self.inputs,
            lines: self.lines,
            log: self.log,
            bill_total: self.bill_total,
            payroll_total: self.payroll_total,
        }
    }
}

/// Calculates the bill and payroll for one cycle.
///
/// # Errors
///
/// Returns a validation error if attendance counters are negative or the
/// cycle ends before it starts.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::{AdjustmentTotals, FeeInput, FeeSubject, calculate_fees};
/// use placement_billing::config::EngineConfig;
/// use placement_billing::models::{AttendanceRecord, BillingCycle, Contract, ContractKind, ContractStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let contract = Contract {
///     id: Uuid::new_v4(),
///     customer_id: Uuid::new_v4(),
///     employee_id: Some(Uuid::new_v4()),
///     level: Decimal::from(6000),
///     start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2025, 11, 30).unwrap(),
///     status: ContractStatus::Active,
///     management_fee_rate: Decimal::new(10, 2),
///     deposit_amount: Decimal::ZERO,
///     security_deposit_amount: Decimal::ZERO,
///     termination_date: None,
///     previous_contract_id: None,
///     next_contract_id: None,
///     kind: ContractKind::Nanny { auto_renew: false },
/// };
/// let cycle = BillingCycle::new(
///     NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 10, 31).unwrap(),
/// );
/// let attendance = AttendanceRecord::full_attendance(contract.id, &cycle, 26);
/// let config = EngineConfig::default();
///
/// let breakdown = calculate_fees(&FeeInput {
///     subject: FeeSubject::Contract { contract: &contract, attendance: &attendance },
///     cycle,
///     adjustments: AdjustmentTotals::default(),
///     config: &config,
/// })
/// .unwrap();
/// assert_eq!(breakdown.bill_total.to_string(), "7200.00");
/// ```
pub fn calculate_fees(input: &FeeInput<'_>) -> EngineResult<FeeBreakdown> {
    if input.cycle.start_date > input.cycle.end_date {
        return Err(EngineError::InvalidDateRange {
            start: input.cycle.start_date,
            end: input.cycle.end_date,
        });
    }

    match input.subject {
        FeeSubject::Contract {
            contract,
            attendance,
        } => {
            validate_attendance(attendance)?;
            let breakdown = match &contract.kind {
                ContractKind::Nanny { auto_renew } => {
                    calculate_nanny_fees(input, contract, attendance, *auto_renew)
                }
                ContractKind::MaternityNurse { .. } => {
                    calculate_maternity_nurse_fees(input, contract, attendance)?
                }
                ContractKind::Trial { trial_daily_rate } => {
                    calculate_simple_rate_fees(input, contract, attendance, *trial_daily_rate, None)
                }
                ContractKind::ExternalSubstitution {
                    management_fee_amount,
                } => calculate_simple_rate_fees(
                    input,
                    contract,
                    attendance,
                    None,
                    *management_fee_amount,
                ),
            };
            Ok(breakdown)
        }
        FeeSubject::Substitute { record, contract } => {
            calculate_substitute_fees(input, record, contract)
        }
    }
}

fn validate_attendance(attendance: &AttendanceRecord) -> EngineResult<()> {
    let counters = [
        ("total_days_worked", attendance.total_days_worked),
        ("overtime_days", attendance.overtime_days),
        ("statutory_holiday_days", attendance.statutory_holiday_days),
    ];
    for (field, value) in counters {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(EngineError::validation(field, format!("{} is negative", value)));
        }
    }
    Ok(())
}

/// Accumulates lines and log entries for one calculation.
pub(crate) struct BreakdownBuilder {
    variant: String,
    cycle: BillingCycle,
    inputs: serde_json::Value,
    lines: Vec<FeeLine>,
    log: CalculationLog,
}

impl BreakdownBuilder {
    pub(crate) fn new(variant: &str, cycle: BillingCycle, inputs: serde_json::Value) -> Self {
        Self {
            variant: variant.to_string(),
            cycle,
            inputs,
            lines: Vec::new(),
            log: CalculationLog::default(),
        }
    }

    /// Logs an intermediate value that is not itself a money line.
    pub(crate) fn note(&mut self, item: &str, formula: impl Into<String>) {
        self.log.push(item, formula);
    }

    /// Adds a signed money line and logs its formula under the line's name.
    pub(crate) fn line(
        &mut self,
        side: LedgerSide,
        category: FeeCategory,
        amount: Decimal,
        formula: impl Into<String>,
    ) {
        self.lines.push(FeeLine {
            side,
            category,
            amount: round_money(amount),
        });
        self.log.push(category.as_str(), formula);
    }

    /// Appends adjustment lines and both totals.
    pub(crate) fn finish(mut self, adjustments: &AdjustmentTotals) -> FeeBreakdown {
        let buckets = [
            (
                LedgerSide::Customer,
                FeeCategory::CustomerIncrease,
                adjustments.customer_increase,
            ),
            (
                LedgerSide::Customer,
                FeeCategory::CustomerDecrease,
                -adjustments.customer_decrease,
            ),
            (
                LedgerSide::Employee,
                FeeCategory::EmployeeIncrease,
                adjustments.employee_increase,
            ),
            (
                LedgerSide::Employee,
                FeeCategory::EmployeeDecrease,
                -adjustments.employee_decrease,
            ),
        ];
        for (side, category, amount) in buckets {
            if !amount.is_zero() {
                let rounded = round_money(amount);
                self.line(
                    side,
                    category,
                    rounded,
                    format!("net adjustments = {}", rounded),
                );
            }
        }

        let bill_total = self.total(LedgerSide::Customer, "bill_total");
        let payroll_total = self.total(LedgerSide::Employee, "payroll_total");

        FeeBreakdown {
            variant: self.variant,
            cycle: self.cycle,
            inputs: self.inputs,
            lines: self.lines,
            log: self.log,
            bill_total,
            payroll_total,
        }
    }

    fn total(&mut self, side: LedgerSide, item: &str) -> Decimal {
        let mut formula = String::new();
        let mut total = Decimal::ZERO;
        for line in self.lines.iter().filter(|l| l.side == side) {
            total += line.amount;
            let name = line.category.as_str();
            let magnitude = line.amount.abs();
            match (formula.is_empty(), line.amount.is_sign_negative() && !line.amount.is_zero()) {
                (true, false) => formula.push_str(&format!("{}({})", name, magnitude)),
                (true, true) => formula.push_str(&format!("−{}({})", name, magnitude)),
                (false, false) => formula.push_str(&format!(" + {}({})", name, magnitude)),
                (false, true) => formula.push_str(&format!(" − {}({})", name, magnitude)),
            }
        }
        let total = round_money(total);
        if formula.is_empty() {
            formula.push_str("no lines");
        }
        self.log.push(item, format!("{} = {}", formula, total));
        total
    }
}
