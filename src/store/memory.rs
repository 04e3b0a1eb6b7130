//! In-memory [`BillingStore`] with snapshot transactions.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    ActivityLog, AdjustmentTarget, AttendanceRecord, Contract, CustomerBill, EmployeePayroll,
    FinancialAdjustment, PaymentRecord, PayoutRecord, SubstituteRecord,
};

use super::BillingStore;

#[derive(Debug, Clone, Default)]
struct Tables {
    contracts: BTreeMap<Uuid, Contract>,
    attendance: BTreeMap<(Uuid, NaiveDate), AttendanceRecord>,
    bills: BTreeMap<Uuid, CustomerBill>,
    payrolls: BTreeMap<Uuid, EmployeePayroll>,
    adjustments: BTreeMap<Uuid, FinancialAdjustment>,
    payments: BTreeMap<Uuid, PaymentRecord>,
    payouts: BTreeMap<Uuid, PayoutRecord>,
    substitutes: BTreeMap<Uuid, SubstituteRecord>,
    activity: Vec<ActivityLog>,
}

/// A [`BillingStore`] held entirely in memory.
///
/// `begin` pushes a copy of every table; `rollback` restores it and `commit`
/// drops it.
///
/// # Example
///
/// ```
/// use placement_billing::store::{BillingStore, InMemoryStore};
///
/// let mut store = InMemoryStore::new();
/// store.begin().unwrap();
/// store.rollback().unwrap();
/// assert!(store.contracts().is_empty());
/// assert_eq!(store.open_transactions(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Tables,
    snapshots: Vec<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions currently open.
    pub fn open_transactions(&self) -> usize {
        self.snapshots.len()
    }

    /// Every adjustment in the store.
    pub fn all_adjustments(&self) -> Vec<FinancialAdjustment> {
        self.tables.adjustments.values().cloned().collect()
    }

    fn no_transaction() -> EngineError {
        EngineError::Storage {
            message: "no open transaction".to_string(),
        }
    }
}

fn sorted_by_cycle<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by_key(key);
    rows
}

impl BillingStore for InMemoryStore {
    fn begin(&mut self) -> EngineResult<()> {
        self.snapshots.push(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> EngineResult<()> {
        self.snapshots.pop().map(|_| ()).ok_or_else(Self::no_transaction)
    }

    fn rollback(&mut self) -> EngineResult<()> {
        let snapshot = self.snapshots.pop().ok_or_else(Self::no_transaction)?;
        self.tables = snapshot;
        Ok(())
    }

    fn contract(&self, id: Uuid) -> EngineResult<Contract> {
        self.tables
            .contracts
            .get(&id)
            .cloned()
            .ok_or(EngineError::ContractNotFound { id })
    }

    fn contracts(&self) -> Vec<Contract> {
        self.tables.contracts.values().cloned().collect()
    }

    fn save_contract(&mut self, contract: Contract) -> EngineResult<()> {
        self.tables.contracts.insert(contract.id, contract);
        Ok(())
    }

    fn attendance(&self, contract_id: Uuid, cycle_start: NaiveDate) -> Option<AttendanceRecord> {
        self.tables
            .attendance
            .get(&(contract_id, cycle_start))
            .cloned()
    }

    fn save_attendance(&mut self, record: AttendanceRecord) -> EngineResult<()> {
        self.tables
            .attendance
            .insert((record.contract_id, record.cycle_start_date), record);
        Ok(())
    }

    fn bill(&self, id: Uuid) -> EngineResult<CustomerBill> {
        self.tables
            .bills
            .get(&id)
            .cloned()
            .ok_or(EngineError::BillNotFound { id })
    }

    fn find_bill(
        &self,
        contract_id: Uuid,
        cycle_start: NaiveDate,
        is_substitute: bool,
    ) -> Option<CustomerBill> {
        self.tables
            .bills
            .values()
            .find(|b| {
                b.contract_id == contract_id
                    && b.cycle_start_date == cycle_start
                    && b.is_substitute == is_substitute
            })
            .cloned()
    }

    fn bills_for_contract(&self, contract_id: Uuid) -> Vec<CustomerBill> {
        let rows: Vec<CustomerBill> = self
            .tables
            .bills
            .values()
            .filter(|b| b.contract_id == contract_id)
            .cloned()
            .collect();
        sorted_by_cycle(rows, |b: &CustomerBill| (b.cycle_start_date, b.is_substitute))
    }

    fn insert_bill(&mut self, bill: CustomerBill) -> EngineResult<()> {
        if self
            .find_bill(bill.contract_id, bill.cycle_start_date, bill.is_substitute)
            .is_some()
        {
            return Err(EngineError::DuplicateCycle {
                record: "bill".to_string(),
                contract_id: bill.contract_id,
                cycle_start: bill.cycle_start_date,
            });
        }
        self.tables.bills.insert(bill.id, bill);
        Ok(())
    }

    fn update_bill(&mut self, bill: CustomerBill) -> EngineResult<()> {
        if !self.tables.bills.contains_key(&bill.id) {
            return Err(EngineError::BillNotFound { id: bill.id });
        }
        self.tables.bills.insert(bill.id, bill);
        Ok(())
    }

    fn delete_bill(&mut self, id: Uuid) -> EngineResult<()> {
        self.tables
            .bills
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::BillNotFound { id })
    }

    fn payroll(&self, id: Uuid) -> EngineResult<EmployeePayroll> {
        self.tables
            .payrolls
            .get(&id)
            .cloned()
            .ok_or(EngineError::PayrollNotFound { id })
    }

    fn find_payroll(
        &self,
        contract_id: Uuid,
        cycle_start: NaiveDate,
        is_substitute: bool,
    ) -> Option<EmployeePayroll> {
        self.tables
            .payrolls
            .values()
            .find(|p| {
                p.contract_id == contract_id
                    && p.cycle_start_date == cycle_start
                    && p.is_substitute == is_substitute
            })
            .cloned()
    }

    fn payrolls_for_contract(&self, contract_id: Uuid) -> Vec<EmployeePayroll> {
        let rows: Vec<EmployeePayroll> = self
            .tables
            .payrolls
            .values()
            .filter(|p| p.contract_id == contract_id)
            .cloned()
            .collect();
        sorted_by_cycle(rows, |p: &EmployeePayroll| {
            (p.cycle_start_date, p.is_substitute)
        })
    }

    fn insert_payroll(&mut self, payroll: EmployeePayroll) -> EngineResult<()> {
        if self
            .find_payroll(
                payroll.contract_id,
                payroll.cycle_start_date,
                payroll.is_substitute,
            )
            .is_some()
        {
            return Err(EngineError::DuplicateCycle {
                record: "payroll".to_string(),
                contract_id: payroll.contract_id,
                cycle_start: payroll.cycle_start_date,
            });
        }
        self.tables.payrolls.insert(payroll.id, payroll);
        Ok(())
    }

    fn update_payroll(&mut self, payroll: EmployeePayroll) -> EngineResult<()> {
        if !self.tables.payrolls.contains_key(&payroll.id) {
            return Err(EngineError::PayrollNotFound { id: payroll.id });
        }
        self.tables.payrolls.insert(payroll.id, payroll);
        Ok(())
    }

    fn delete_payroll(&mut self, id: Uuid) -> EngineResult<()> {
        self.tables
            .payrolls
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::PayrollNotFound { id })
    }

    fn adjustment(&self, id: Uuid) -> EngineResult<FinancialAdjustment> {
        self.tables
            .adjustments
            .get(&id)
            .cloned()
            .ok_or(EngineError::AdjustmentNotFound { id })
    }

    fn adjustments_for(&self, target: AdjustmentTarget) -> Vec<FinancialAdjustment> {
        self.tables
            .adjustments
            .values()
            .filter(|a| a.target == target)
            .cloned()
            .collect()
    }

    fn save_adjustment(&mut self, adjustment: FinancialAdjustment) -> EngineResult<()> {
        self.tables.adjustments.insert(adjustment.id, adjustment);
        Ok(())
    }

    fn delete_adjustment(&mut self, id: Uuid) -> EngineResult<()> {
        self.tables
            .adjustments
            .remove(&id)
            .map(|_| ())
            .ok_or(EngineError::AdjustmentNotFound { id })
    }

    fn payment_records(&self, bill_id: Uuid) -> Vec<PaymentRecord> {
        self.tables
            .payments
            .values()
            .filter(|r| r.bill_id == bill_id)
            .cloned()
            .collect()
    }

    fn insert_payment_record(&mut self, record: PaymentRecord) -> EngineResult<()> {
        self.tables.payments.insert(record.id, record);
        Ok(())
    }

    fn delete_payment_record(&mut self, id: Uuid) -> EngineResult<()> {
        self.tables.payments.remove(&id);
        Ok(())
    }

    fn payout_records(&self, payroll_id: Uuid) -> Vec<PayoutRecord> {
        self.tables
            .payouts
            .values()
            .filter(|r| r.payroll_id == payroll_id)
            .cloned()
            .collect()
    }

    fn insert_payout_record(&mut self, record: PayoutRecord) -> EngineResult<()> {
        self.tables.payouts.insert(record.id, record);
        Ok(())
    }

    fn delete_payout_record(&mut self, id: Uuid) -> EngineResult<()> {
        self.tables.payouts.remove(&id);
        Ok(())
    }

    fn substitute(&self, id: Uuid) -> EngineResult<SubstituteRecord> {
        self.tables
            .substitutes
            .get(&id)
            .cloned()
            .ok_or(EngineError::SubstituteNotFound { id })
    }

    fn substitutes_for_contract(&self, contract_id: Uuid) -> Vec<SubstituteRecord> {
        let rows: Vec<SubstituteRecord> = self
            .tables
            .substitutes
            .values()
            .filter(|s| s.main_contract_id == contract_id)
            .cloned()
            .collect();
        sorted_by_cycle(rows, |s: &SubstituteRecord| s.start_date)
    }

    fn save_substitute(&mut self, record: SubstituteRecord) -> EngineResult<()> {
        self.tables.substitutes.insert(record.id, record);
        Ok(())
    }

    fn append_activity(&mut self, entry: ActivityLog) -> EngineResult<()> {
        self.tables.activity.push(entry);
        Ok(())
    }

    fn activity_for_contract(&self, contract_id: Uuid) -> Vec<ActivityLog> {
        self.tables
            .activity
            .iter()
            .filter(|a| a.contract_id == contract_id)
            .cloned()
            .collect()
    }

    fn delete_activity_for(
        &mut self,
        bill_id: Option<Uuid>,
        payroll_id: Option<Uuid>,
    ) -> EngineResult<()> {
        self.tables.activity.retain(|a| {
            let on_bill = bill_id.is_some() && a.bill_id == bill_id;
            let on_payroll = payroll_id.is_some() && a.payroll_id == payroll_id;
            !(on_bill || on_payroll)
        });
        Ok(())
    }
}
