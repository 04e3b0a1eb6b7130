//! Bill and payroll rows for one cycle.
//!
//! [`write_cycle`] is the single write path: it finds or creates the
//! bill/payroll pair for a cycle, decides whether an existing calculation
//! may be reused, runs the fee calculator, and writes totals, details,
//! settlement status and an activity entry back in one go.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::calculation::{FeeBreakdown, FeeInput, FeeSubject, calculate_fees};
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::models::{ActivityLog, BillingCycle, Contract, CustomerBill, EmployeePayroll};
use crate::store::BillingStore;

use super::adjustments::net_adjustments;
use super::attendance::get_or_create_attendance;

/// Why a cycle was left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The bill already carries a calculation and recompute was not forced.
    AlreadyCalculated,
    /// The bill was merged into a successor and is frozen.
    Merged,
}

/// What happened to one cycle's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Rows were created and calculated.
    Created,
    /// Existing rows were recalculated in place.
    Updated,
    /// Existing rows were left as they were.
    Skipped(SkipReason),
}

/// The result of writing one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleWrite {
    /// The cycle's bill.
    pub bill_id: Uuid,
    /// The cycle's payroll.
    pub payroll_id: Uuid,
    /// The cycle written.
    pub cycle: BillingCycle,
    /// Whether rows were created, updated or skipped.
    #[serde(flatten)]
    pub outcome: WriteOutcome,
    /// Bill total after the write.
    pub bill_total: Decimal,
    /// Payroll total after the write.
    pub payroll_total: Decimal,
}

/// The bill/payroll pair for one cycle.
#[derive(Debug, Clone)]
pub(crate) struct LedgerRows {
    pub(crate) bill: CustomerBill,
    pub(crate) payroll: EmployeePayroll,
    pub(crate) created: bool,
}

impl LedgerRows {
    pub(crate) fn skip_reason(&self, force: bool) -> Option<SkipReason> {
        if self.bill.is_merged || self.payroll.is_merged {
            return Some(SkipReason::Merged);
        }
        if !self.created && !force && self.bill.has_calculation_log() {
            return Some(SkipReason::AlreadyCalculated);
        }
        None
    }

    pub(crate) fn skipped(&self, reason: SkipReason) -> CycleWrite {
        CycleWrite {
            bill_id: self.bill.id,
            payroll_id: self.payroll.id,
            cycle: self.bill.cycle(),
            outcome: WriteOutcome::Skipped(reason),
            bill_total: self.bill.total_due,
            payroll_total: self.payroll.total_payable,
        }
    }
}

/// Finds the bill/payroll pair for (contract, cycle start, substitute flag),
/// creating whichever is missing.
pub(crate) fn ensure_ledger_rows<S: BillingStore + ?Sized>(
    store: &mut S,
    contract_id: Uuid,
    employee_id: Option<Uuid>,
    cycle: &BillingCycle,
    is_substitute: bool,
) -> EngineResult<LedgerRows> {
    let mut created = false;

    let bill = match store.find_bill(contract_id, cycle.start_date, is_substitute) {
        Some(bill) => bill,
        None => {
            let bill = CustomerBill::new(contract_id, cycle, is_substitute);
            store.insert_bill(bill.clone())?;
            created = true;
            bill
        }
    };
    let payroll = match store.find_payroll(contract_id, cycle.start_date, is_substitute) {
        Some(payroll) => payroll,
        None => {
            let payroll = EmployeePayroll::new(contract_id, employee_id, cycle, is_substitute);
            store.insert_payroll(payroll.clone())?;
            created = true;
            payroll
        }
    };

    Ok(LedgerRows {
        bill,
        payroll,
        created,
    })
}

/// Writes a breakdown onto the rows and refreshes their settlement status.
pub(crate) fn apply_breakdown<S: BillingStore + ?Sized>(
    store: &mut S,
    rows: LedgerRows,
    breakdown: FeeBreakdown,
    actor: &str,
) -> EngineResult<CycleWrite> {
    let LedgerRows {
        mut bill,
        mut payroll,
        created,
    } = rows;
    let cycle = breakdown.cycle;
    let details = breakdown.into_details();

    bill.cycle_end_date = cycle.end_date;
    bill.total_due = details.bill_total;
    bill.total_paid = store
        .payment_records(bill.id)
        .iter()
        .map(|r| r.amount)
        .sum::<Decimal>();
    bill.refresh_status();
    bill.calculation_details = Some(details.clone());

    payroll.cycle_end_date = cycle.end_date;
    payroll.total_payable = details.payroll_total;
    payroll.total_paid_out = store
        .payout_records(payroll.id)
        .iter()
        .map(|r| r.amount)
        .sum::<Decimal>();
    payroll.refresh_status();
    payroll.calculation_details = Some(details);

    store.update_bill(bill.clone())?;
    store.update_payroll(payroll.clone())?;

    let (action, outcome) = if created {
        ("bill_created", WriteOutcome::Created)
    } else {
        ("bill_recalculated", WriteOutcome::Updated)
    };
    store.append_activity(
        ActivityLog::new(
            bill.contract_id,
            actor,
            action,
            format!(
                "Cycle {} to {}: bill {}, payroll {}",
                cycle.start_date, cycle.end_date, bill.total_due, payroll.total_payable
            ),
        )
        .for_bill(bill.id)
        .for_payroll(payroll.id),
    )?;

    debug!(
        bill_id = %bill.id,
        cycle_start = %cycle.start_date,
        bill_total = %bill.total_due,
        payroll_total = %payroll.total_payable,
        action = action,
        "Cycle written"
    );

    Ok(CycleWrite {
        bill_id: bill.id,
        payroll_id: payroll.id,
        cycle,
        outcome,
        bill_total: bill.total_due,
        payroll_total: payroll.total_payable,
    })
}

/// Calculates one regular contract cycle and writes it.
///
/// Existing rows that already carry a calculation are skipped unless `force`
/// is set; merged rows are always skipped.
pub(crate) fn write_cycle<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract: &Contract,
    cycle: &BillingCycle,
    force: bool,
    actor: &str,
) -> EngineResult<CycleWrite> {
    contract.validate_for_billing()?;
    let rows = ensure_ledger_rows(store, contract.id, contract.employee_id, cycle, false)?;
    if let Some(reason) = rows.skip_reason(force) {
        debug!(
            contract_id = %contract.id,
            cycle_start = %cycle.start_date,
            reason = ?reason,
            "Skipping cycle"
        );
        return Ok(rows.skipped(reason));
    }

    let attendance = get_or_create_attendance(store, contract, cycle, config)?;
    let adjustments = net_adjustments(&*store, Some(rows.bill.id), Some(rows.payroll.id));
    let breakdown = calculate_fees(&FeeInput {
        subject: FeeSubject::Contract {
            contract,
            attendance: &attendance,
        },
        cycle: *cycle,
        adjustments,
        config,
    })?;

    apply_breakdown(store, rows, breakdown, actor)
}
