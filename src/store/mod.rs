//! Persistence boundary for the billing engine.
//!
//! The engine reads contracts, attendance and substitute records and writes
//! bills, payrolls, adjustments, settlement records and activity logs through
//! the [`BillingStore`] trait. [`InMemoryStore`] is the bundled
//! implementation; a database-backed store implements the same trait.

mod memory;

pub use memory::InMemoryStore;

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::models::{
    ActivityLog, AdjustmentTarget, AttendanceRecord, Contract, CustomerBill, EmployeePayroll,
    FinancialAdjustment, PaymentRecord, PayoutRecord, SubstituteRecord,
};

/// Storage for every record the engine reads or writes.
///
/// ## Transaction Semantics
///
/// Mutations made between [`begin`](BillingStore::begin) and
/// [`commit`](BillingStore::commit) become visible together;
/// [`rollback`](BillingStore::rollback) discards all of them. Transactions
/// nest: an inner rollback only discards the inner transaction's changes.
/// Use [`in_transaction`] rather than calling the three methods directly.
///
/// ## Uniqueness
///
/// At most one bill and one payroll exist per (contract, cycle start,
/// substitute flag). Inserting a second one returns
/// [`EngineError::DuplicateCycle`](crate::error::EngineError::DuplicateCycle).
pub trait BillingStore {
    // ── Transactions ─────────────────────────────────────────────────────────

    /// Starts a transaction.
    fn begin(&mut self) -> EngineResult<()>;

    /// Commits the innermost open transaction.
    fn commit(&mut self) -> EngineResult<()>;

    /// Rolls back the innermost open transaction.
    fn rollback(&mut self) -> EngineResult<()>;

    // ── Contracts ────────────────────────────────────────────────────────────

    /// Reads a contract.
    ///
    /// Returns `Err(EngineError::ContractNotFound)` if it does not exist.
    fn contract(&self, id: Uuid) -> EngineResult<Contract>;

    /// Lists every contract.
    fn contracts(&self) -> Vec<Contract>;

    /// Inserts or replaces a contract.
    fn save_contract(&mut self, contract: Contract) -> EngineResult<()>;

    // ── Attendance ───────────────────────────────────────────────────────────

    /// Reads the attendance record for a contract cycle, if one exists.
    fn attendance(&self, contract_id: Uuid, cycle_start: NaiveDate) -> Option<AttendanceRecord>;

    /// Inserts or replaces an attendance record.
    fn save_attendance(&mut self, record: AttendanceRecord) -> EngineResult<()>;

    // ── Bills ────────────────────────────────────────────────────────────────

    /// Reads a bill.
    ///
    /// Returns `Err(EngineError::BillNotFound)` if it does not exist.
    fn bill(&self, id: Uuid) -> EngineResult<CustomerBill>;

    /// Finds the bill for (contract, cycle start, substitute flag).
    fn find_bill(
        &self,
        contract_id: Uuid,
        cycle_start: NaiveDate,
        is_substitute: bool,
    ) -> Option<CustomerBill>;

    /// Lists a contract's bills ordered by cycle start.
    fn bills_for_contract(&self, contract_id: Uuid) -> Vec<CustomerBill>;

    /// Inserts a new bill, enforcing uniqueness.
    fn insert_bill(&mut self, bill: CustomerBill) -> EngineResult<()>;

    /// Replaces an existing bill.
    fn update_bill(&mut self, bill: CustomerBill) -> EngineResult<()>;

    /// Deletes a bill.
    fn delete_bill(&mut self, id: Uuid) -> EngineResult<()>;

    // ── Payrolls ─────────────────────────────────────────────────────────────

    /// Reads a payroll.
    ///
    /// Returns `Err(EngineError::PayrollNotFound)` if it does not exist.
    fn payroll(&self, id: Uuid) -> EngineResult<EmployeePayroll>;

    /// Finds the payroll for (contract, cycle start, substitute flag).
    fn find_payroll(
        &self,
        contract_id: Uuid,
        cycle_start: NaiveDate,
        is_substitute: bool,
    ) -> Option<EmployeePayroll>;

    /// Lists a contract's payrolls ordered by cycle start.
    fn payrolls_for_contract(&self, contract_id: Uuid) -> Vec<EmployeePayroll>;

    /// Inserts a new payroll, enforcing uniqueness.
    fn insert_payroll(&mut self, payroll: EmployeePayroll) -> EngineResult<()>;

    /// Replaces an existing payroll.
    fn update_payroll(&mut self, payroll: EmployeePayroll) -> EngineResult<()>;

    /// Deletes a payroll.
    fn delete_payroll(&mut self, id: Uuid) -> EngineResult<()>;

    // ── Adjustments ──────────────────────────────────────────────────────────

    /// Reads an adjustment.
    ///
    /// Returns `Err(EngineError::AdjustmentNotFound)` if it does not exist.
    fn adjustment(&self, id: Uuid) -> EngineResult<FinancialAdjustment>;

    /// Lists the adjustments attached to a record.
    fn adjustments_for(&self, target: AdjustmentTarget) -> Vec<FinancialAdjustment>;

    /// Inserts or replaces an adjustment.
    fn save_adjustment(&mut self, adjustment: FinancialAdjustment) -> EngineResult<()>;

    /// Deletes an adjustment.
    fn delete_adjustment(&mut self, id: Uuid) -> EngineResult<()>;

    // ── Settlement records ───────────────────────────────────────────────────

    /// Lists the payment records of a bill.
    fn payment_records(&self, bill_id: Uuid) -> Vec<PaymentRecord>;

    /// Appends a payment record.
    fn insert_payment_record(&mut self, record: PaymentRecord) -> EngineResult<()>;

    /// Deletes a payment record.
    fn delete_payment_record(&mut self, id: Uuid) -> EngineResult<()>;

    /// Lists the payout records of a payroll.
    fn payout_records(&self, payroll_id: Uuid) -> Vec<PayoutRecord>;

    /// Appends a payout record.
    fn insert_payout_record(&mut self, record: PayoutRecord) -> EngineResult<()>;

    /// Deletes a payout record.
    fn delete_payout_record(&mut self, id: Uuid) -> EngineResult<()>;

    // ── Substitutes ──────────────────────────────────────────────────────────

    /// Reads a substitute record.
    ///
    /// Returns `Err(EngineError::SubstituteNotFound)` if it does not exist.
    fn substitute(&self, id: Uuid) -> EngineResult<SubstituteRecord>;

    /// Lists the substitute records attached to a contract.
    fn substitutes_for_contract(&self, contract_id: Uuid) -> Vec<SubstituteRecord>;

    /// Inserts or replaces a substitute record.
    fn save_substitute(&mut self, record: SubstituteRecord) -> EngineResult<()>;

    // ── Activity ─────────────────────────────────────────────────────────────

    /// Appends an activity log entry.
    fn append_activity(&mut self, entry: ActivityLog) -> EngineResult<()>;

    /// Lists a contract's activity in insertion order.
    fn activity_for_contract(&self, contract_id: Uuid) -> Vec<ActivityLog>;

    /// Deletes the activity attached to a bill or payroll.
    fn delete_activity_for(&mut self, bill_id: Option<Uuid>, payroll_id: Option<Uuid>)
    -> EngineResult<()>;
}

/// Runs `f` inside a transaction, committing on success and rolling back on
/// error.
///
/// # Example
///
/// ```
/// use placement_billing::error::EngineError;
/// use placement_billing::store::{BillingStore, InMemoryStore, in_transaction};
/// use uuid::Uuid;
///
/// let mut store = InMemoryStore::new();
/// let result: Result<(), _> = in_transaction(&mut store, |store| {
///     store.contract(Uuid::nil()).map(|_| ())
/// });
/// assert!(matches!(result, Err(EngineError::ContractNotFound { .. })));
/// ```
pub fn in_transaction<S, T, F>(store: &mut S, f: F) -> EngineResult<T>
where
    S: BillingStore + ?Sized,
    F: FnOnce(&mut S) -> EngineResult<T>,
{
    store.begin()?;
    match f(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = store.rollback() {
                warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}
