//! The billing engine facade.
//!
//! [`BillingEngine`] owns a store and the engine configuration and exposes
//! every job the trigger layer can run. Each job runs inside a store
//! transaction; batch jobs open one transaction per contract so a failing
//! contract is rolled back and reported without stopping the batch.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::{all_cycles, cycles_in_month, month_bounds};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AdjustmentStatus, AdjustmentTarget, AttendanceRecord, BillingCycle, Contract, ContractKind,
    CustomerBill, EmployeePayroll, FinancialAdjustment, SubstituteRecord,
};
use crate::store::{BillingStore, in_transaction};

use super::adjustments;
use super::ledger::{CycleWrite, write_cycle};
use super::merge::{MergeReport, merge_bill};
use super::substitute::write_substitute;
use super::termination::{TerminationReport, TerminationRequest, terminate_contract};

/// A contract that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    /// The contract that failed.
    pub contract_id: Uuid,
    /// The error, rendered.
    pub error: String,
}

/// The outcome of calculating every contract for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Year calculated.
    pub year: i32,
    /// Month calculated.
    pub month: u32,
    /// Every cycle written or skipped.
    pub written: Vec<CycleWrite>,
    /// Contracts that were rolled back.
    pub failures: Vec<BatchFailure>,
}

/// Billing engine over a [`BillingStore`].
///
/// # Example
///
/// ```
/// use placement_billing::billing::BillingEngine;
/// use placement_billing::config::EngineConfig;
/// use placement_billing::models::{Contract, ContractKind, ContractStatus};
/// use placement_billing::store::InMemoryStore;
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
///
/// let mut engine = BillingEngine::new(InMemoryStore::new(), EngineConfig::default());
/// engine.save_contract(contract.clone()).unwrap();
///
/// let writes = engine.calculate_for_month(contract.id, 2025, 11, false, "system").unwrap();
/// assert_eq!(writes.len(), 1);
/// assert_eq!(writes[0].bill_total.to_string(), "6000.00");
/// ```
#[derive(Debug)]
pub struct BillingEngine<S: BillingStore> {
    store: S,
    config: EngineConfig,
}

impl<S: BillingStore> BillingEngine<S> {
    /// Creates an engine over `store`.
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The underlying store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Inserts or replaces a contract.
    pub fn save_contract(&mut self, contract: Contract) -> EngineResult<()> {
        in_transaction(&mut self.store, |store| store.save_contract(contract))
    }

    /// Inserts or replaces an attendance record.
    pub fn save_attendance(&mut self, record: AttendanceRecord) -> EngineResult<()> {
        if record.cycle_start_date > record.cycle_end_date {
            return Err(EngineError::InvalidDateRange {
                start: record.cycle_start_date,
                end: record.cycle_end_date,
            });
        }
        in_transaction(&mut self.store, |store| {
            store.contract(record.contract_id)?;
            store.save_attendance(record)
        })
    }

    /// Inserts or replaces a substitute record.
    ///
    /// A replacement keeps the generated bill/payroll links of the stored
    /// record when it carries none, so a later calculation updates those rows.
    pub fn save_substitute(&mut self, mut record: SubstituteRecord) -> EngineResult<()> {
        if record.start_date > record.end_date {
            return Err(EngineError::InvalidDateRange {
                start: record.start_date,
                end: record.end_date,
            });
        }
        in_transaction(&mut self.store, |store| {
            store.contract(record.main_contract_id)?;
            if let Ok(existing) = store.substitute(record.id) {
                record.generated_bill_id = record.generated_bill_id.or(existing.generated_bill_id);
                record.generated_payroll_id =
                    record.generated_payroll_id.or(existing.generated_payroll_id);
            }
            store.save_substitute(record)
        })
    }

    /// Calculates every cycle of a contract settling in the given month.
    ///
    /// Returns an empty list for pending contracts and for maternity-nurse
    /// contracts that have not started yet.
    pub fn calculate_for_month(
        &mut self,
        contract_id: Uuid,
        year: i32,
        month: u32,
        force: bool,
        actor: &str,
    ) -> EngineResult<Vec<CycleWrite>> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            calculate_month(store, config, contract_id, year, month, force, actor)
        })
    }

    /// Calculates every billable contract for the given month.
    ///
    /// A failing contract is rolled back, logged and reported; the batch
    /// continues with the next one.
    ///
    /// # Errors
    ///
    /// Only an invalid month fails the whole batch.
    pub fn calculate_all_for_month(
        &mut self,
        year: i32,
        month: u32,
        force: bool,
        actor: &str,
    ) -> EngineResult<BatchReport> {
        month_bounds(year, month)?;
        let mut report = BatchReport {
            year,
            month,
            written: Vec::new(),
            failures: Vec::new(),
        };

        let contract_ids: Vec<Uuid> = self
            .store
            .contracts()
            .into_iter()
            .filter(Contract::is_billable)
            .map(|c| c.id)
            .collect();
        let config = &self.config;

        for contract_id in contract_ids {
            let result = in_transaction(&mut self.store, |store| {
                calculate_month(store, config, contract_id, year, month, force, actor)
            });
            match result {
                Ok(writes) => report.written.extend(writes),
                Err(error) => {
                    warn!(
                        contract_id = %contract_id,
                        error = %error,
                        "Contract failed during batch calculation"
                    );
                    report.failures.push(BatchFailure {
                        contract_id,
                        error: error.to_string(),
                    });
                }
            }
        }

        info!(
            year = year,
            month = month,
            written = report.written.len(),
            failed = report.failures.len(),
            "Batch calculation completed"
        );
        Ok(report)
    }

    /// Force-recalculates one bill and its payroll.
    pub fn recalculate_bill(&mut self, bill_id: Uuid, actor: &str) -> EngineResult<CycleWrite> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            recompute_bill(store, config, bill_id, actor)
        })
    }

    /// Creates the bill and payroll for every cycle of a contract's lifespan.
    ///
    /// Open-ended contracts are generated up to the cycle containing
    /// `horizon`. Cycles already calculated are left as they are.
    pub fn generate_all_cycles(
        &mut self,
        contract_id: Uuid,
        horizon: NaiveDate,
        actor: &str,
    ) -> EngineResult<Vec<CycleWrite>> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            let contract = store.contract(contract_id)?;
            contract.validate_for_billing()?;
            if contract.onboarding_date().is_none() {
                return Err(EngineError::MissingOnboardingDate { contract_id });
            }
            let writes = all_cycles(&contract, horizon, config)
                .iter()
                .map(|cycle| write_cycle(store, config, &contract, cycle, false, actor))
                .collect::<EngineResult<Vec<_>>>()?;
            info!(
                contract_id = %contract_id,
                cycles = writes.len(),
                "Generated contract cycles"
            );
            Ok(writes)
        })
    }

    /// Calculates the bill and payroll for a substitute record.
    pub fn calculate_substitute(
        &mut self,
        substitute_id: Uuid,
        actor: &str,
    ) -> EngineResult<CycleWrite> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            write_substitute(store, config, substitute_id, true, actor)
        })
    }

    /// Transfers a bill's outstanding balances to a successor contract's
    /// first cycle and freezes the bill.
    pub fn merge_bill(
        &mut self,
        source_bill_id: Uuid,
        target_contract_id: Uuid,
        actor: &str,
    ) -> EngineResult<MergeReport> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            merge_bill(store, config, source_bill_id, target_contract_id, actor)
        })
    }

    /// Terminates a contract early and settles its final cycle.
    pub fn terminate_contract(
        &mut self,
        contract_id: Uuid,
        request: TerminationRequest,
        actor: &str,
    ) -> EngineResult<TerminationReport> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            terminate_contract(store, config, contract_id, &request, actor)
        })
    }

    /// Attaches an adjustment and recalculates the cycle it affects.
    pub fn add_adjustment(
        &mut self,
        adjustment: FinancialAdjustment,
        actor: &str,
        today: NaiveDate,
    ) -> EngineResult<FinancialAdjustment> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            let adjustment = adjustments::add_adjustment(store, adjustment, actor, today)?;
            recompute_target(store, config, adjustment.target, actor)?;
            Ok(adjustment)
        })
    }

    /// Moves an adjustment to a new settlement status.
    pub fn set_adjustment_status(
        &mut self,
        adjustment_id: Uuid,
        status: AdjustmentStatus,
        settlement_date: Option<String>,
        actor: &str,
        today: NaiveDate,
    ) -> EngineResult<FinancialAdjustment> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            let adjustment = adjustments::set_adjustment_status(
                store,
                adjustment_id,
                status,
                settlement_date,
                actor,
                today,
            )?;
            recompute_target(store, config, adjustment.target, actor)?;
            Ok(adjustment)
        })
    }

    /// Deletes an adjustment and recalculates the cycle it affected.
    pub fn delete_adjustment(
        &mut self,
        adjustment_id: Uuid,
        actor: &str,
    ) -> EngineResult<FinancialAdjustment> {
        let config = &self.config;
        in_transaction(&mut self.store, |store| {
            let adjustment = adjustments::delete_adjustment(store, adjustment_id, actor)?;
            recompute_target(store, config, adjustment.target, actor)?;
            Ok(adjustment)
        })
    }
}

fn calculate_month<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract_id: Uuid,
    year: i32,
    month: u32,
    force: bool,
    actor: &str,
) -> EngineResult<Vec<CycleWrite>> {
    month_bounds(year, month)?;
    let contract = store.contract(contract_id)?;
    if !contract.is_billable() {
        debug!(contract_id = %contract_id, status = ?contract.status, "Contract not billable");
        return Ok(Vec::new());
    }
    contract.validate_for_billing()?;

    let cycles = cycles_in_month(&contract, year, month, config)?;
    if cycles.is_empty() {
        debug!(
            contract_id = %contract_id,
            year = year,
            month = month,
            "No cycle settles in month"
        );
    }
    cycles
        .iter()
        .map(|cycle| write_cycle(store, config, &contract, cycle, force, actor))
        .collect()
}

/// Force-recalculates the bill `bill_id` and its payroll, dispatching
/// substitute bills to their substitute record.
pub(crate) fn recompute_bill<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    bill_id: Uuid,
    actor: &str,
) -> EngineResult<CycleWrite> {
    let bill = store.bill(bill_id)?;
    if bill.is_substitute {
        let substitute_id = bill.substitute_record_id.ok_or_else(|| EngineError::Consistency {
            message: format!("substitute bill {} has no substitute record", bill.id),
        })?;
        return write_substitute(store, config, substitute_id, true, actor);
    }

    let contract = store.contract(bill.contract_id)?;
    let cycle = current_cycle(&contract, &bill, config);
    write_cycle(store, config, &contract, &cycle, true, actor)
}

/// The contract's first regular bill and payroll, generating the first cycle
/// when none exists yet.
pub(crate) fn first_rows<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract: &Contract,
    actor: &str,
) -> EngineResult<(CustomerBill, EmployeePayroll)> {
    let existing = store
        .bills_for_contract(contract.id)
        .into_iter()
        .find(|b| !b.is_substitute);
    let bill = match existing {
        Some(bill) => bill,
        None => {
            let cycle = all_cycles(contract, contract.start_date, config)
                .into_iter()
                .next()
                .ok_or(EngineError::SuccessorBillNotFound {
                    contract_id: contract.id,
                })?;
            let write = write_cycle(store, config, contract, &cycle, false, actor)?;
            store.bill(write.bill_id)?
        }
    };
    let payroll = store
        .find_payroll(contract.id, bill.cycle_start_date, false)
        .ok_or_else(|| EngineError::Consistency {
            message: format!("bill {} has no matching payroll", bill.id),
        })?;
    Ok((bill, payroll))
}

/// The cycle a bill covers under the contract's current terms.
///
/// A termination may have shortened the cycle since the bill was written.
fn current_cycle(contract: &Contract, bill: &CustomerBill, config: &EngineConfig) -> BillingCycle {
    let horizon = match contract.kind {
        ContractKind::Nanny { auto_renew: true } | ContractKind::ExternalSubstitution { .. } => {
            bill.cycle_start_date
        }
        _ => bill.cycle_end_date,
    };
    all_cycles(contract, horizon, config)
        .into_iter()
        .find(|c| c.start_date == bill.cycle_start_date)
        .unwrap_or_else(|| bill.cycle())
}

fn recompute_target<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    target: AdjustmentTarget,
    actor: &str,
) -> EngineResult<()> {
    let bill_id = match target {
        AdjustmentTarget::Contract(_) => return Ok(()),
        AdjustmentTarget::Bill(id) => id,
        AdjustmentTarget::Payroll(id) => {
            let payroll = store.payroll(id)?;
            match store.find_bill(
                payroll.contract_id,
                payroll.cycle_start_date,
                payroll.is_substitute,
            ) {
                Some(bill) => bill.id,
                None => return Ok(()),
            }
        }
    };
    recompute_bill(store, config, bill_id, actor).map(|_| ())
}
