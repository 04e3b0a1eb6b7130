//! Substitute worker billing.
//!
//! A substitute record bills as its own cycle covering the record's date
//! range, flagged as a substitute bill/payroll on the main contract.

use tracing::{debug, info};
use uuid::Uuid;

use crate::calculation::{FeeInput, FeeSubject, calculate_fees};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{BillingCycle, FeeCategory, SubstituteRecord};
use crate::store::BillingStore;

use super::adjustments::net_adjustments;
use super::ledger::{CycleWrite, apply_breakdown, ensure_ledger_rows};

/// Calculates the bill and payroll for a substitute record and stores the
/// resulting management fee and row ids back on the record.
pub(crate) fn write_substitute<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    substitute_id: Uuid,
    force: bool,
    actor: &str,
) -> EngineResult<CycleWrite> {
    let mut record = store.substitute(substitute_id)?;
    let contract = store.contract(record.main_contract_id)?;
    let period = record.period();

    let moved = move_generated_rows(store, &record, &period)?;
    let force = force || moved;

    let mut rows = ensure_ledger_rows(
        store,
        contract.id,
        Some(record.substitute_employee_id),
        &period,
        true,
    )?;
    if let Some(reason) = rows.skip_reason(force) {
        debug!(substitute_id = %record.id, reason = ?reason, "Skipping substitute");
        return Ok(rows.skipped(reason));
    }
    rows.bill.substitute_record_id = Some(record.id);
    rows.payroll.substitute_record_id = Some(record.id);

    let adjustments = net_adjustments(&*store, Some(rows.bill.id), Some(rows.payroll.id));
    let breakdown = calculate_fees(&FeeInput {
        subject: FeeSubject::Substitute {
            record: &record,
            contract: &contract,
        },
        cycle: period,
        adjustments,
        config,
    })?;
    let fee = breakdown.amount(FeeCategory::SubstituteManagementFee);

    let write = apply_breakdown(store, rows, breakdown, actor)?;

    record.substitute_management_fee = fee;
    record.generated_bill_id = Some(write.bill_id);
    record.generated_payroll_id = Some(write.payroll_id);
    store.save_substitute(record)?;

    info!(
        substitute_id = %substitute_id,
        contract_id = %contract.id,
        substitute_management_fee = %fee,
        "Substitute calculated"
    );
    Ok(write)
}

/// Re-keys the bill/payroll generated for `record` onto `period` when the
/// record's dates were edited since the last calculation. Returns whether
/// anything moved.
fn move_generated_rows<S: BillingStore + ?Sized>(
    store: &mut S,
    record: &SubstituteRecord,
    period: &BillingCycle,
) -> EngineResult<bool> {
    let bill = store
        .bills_for_contract(record.main_contract_id)
        .into_iter()
        .find(|b| {
            b.is_substitute
                && (Some(b.id) == record.generated_bill_id
                    || b.substitute_record_id == Some(record.id))
        });
    let payroll = store
        .payrolls_for_contract(record.main_contract_id)
        .into_iter()
        .find(|p| {
            p.is_substitute
                && (Some(p.id) == record.generated_payroll_id
                    || p.substitute_record_id == Some(record.id))
        });

    let stale_bill = bill.filter(|b| b.cycle_start_date != period.start_date);
    let stale_payroll = payroll.filter(|p| p.cycle_start_date != period.start_date);
    if stale_bill.is_none() && stale_payroll.is_none() {
        return Ok(false);
    }

    if let Some(bill) = &stale_bill {
        if bill.is_merged {
            return Err(EngineError::AlreadyMerged { bill_id: bill.id });
        }
        if store
            .find_bill(record.main_contract_id, period.start_date, true)
            .is_some()
        {
            return Err(EngineError::DuplicateCycle {
                record: "bill".to_string(),
                contract_id: record.main_contract_id,
                cycle_start: period.start_date,
            });
        }
    }
    if stale_payroll.is_some()
        && store
            .find_payroll(record.main_contract_id, period.start_date, true)
            .is_some()
    {
        return Err(EngineError::DuplicateCycle {
            record: "payroll".to_string(),
            contract_id: record.main_contract_id,
            cycle_start: period.start_date,
        });
    }

    if let Some(mut bill) = stale_bill {
        debug!(
            bill_id = %bill.id,
            from = %bill.cycle_start_date,
            to = %period.start_date,
            "Moving substitute bill"
        );
        bill.cycle_start_date = period.start_date;
        bill.cycle_end_date = period.end_date;
        store.update_bill(bill)?;
    }
    if let Some(mut payroll) = stale_payroll {
        payroll.cycle_start_date = period.start_date;
        payroll.cycle_end_date = period.end_date;
        store.update_payroll(payroll)?;
    }
    Ok(true)
}

/// Force-recalculates every substitute record on a contract.
pub(crate) fn recompute_substitutes<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract_id: Uuid,
    actor: &str,
) -> EngineResult<Vec<CycleWrite>> {
    store
        .substitutes_for_contract(contract_id)
        .into_iter()
        .map(|record| write_substitute(store, config, record.id, true, actor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::ledger::WriteOutcome;
    use crate::models::{Contract, ContractKind, ContractStatus, SubstituteRecord};
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup(auto_renew: bool) -> (InMemoryStore, Contract, SubstituteRecord) {
        let mut store = InMemoryStore::new();
        let contract = Contract {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            employee_id: Some(Uuid::new_v4()),
            level: Decimal::from(6000),
            start_date: date(2025, 9, 1),
            end_date: date(2025, 10, 31),
            status: ContractStatus::Active,
            management_fee_rate: Decimal::new(10, 2),
            deposit_amount: Decimal::ZERO,
            security_deposit_amount: Decimal::ZERO,
            termination_date: None,
            previous_contract_id: None,
            next_contract_id: None,
            kind: ContractKind::Nanny { auto_renew },
        };
        let record = SubstituteRecord {
            id: Uuid::new_v4(),
            main_contract_id: contract.id,
            substitute_employee_id: Uuid::new_v4(),
            start_date: date(2025, 11, 5),
            end_date: date(2025, 11, 15),
            substitute_salary: Decimal::from(5200),
            management_fee_rate: Decimal::new(10, 2),
            substitute_management_fee: Decimal::ZERO,
            generated_bill_id: None,
            generated_payroll_id: None,
        };
        store.save_contract(contract.clone()).unwrap();
        store.save_substitute(record.clone()).unwrap();
        (store, contract, record)
    }

    #[test]
    fn test_substitute_bill_after_contract_end() {
        let (mut store, contract, record) = setup(false);
        let config = EngineConfig::default();

        let write = write_substitute(&mut store, &config, record.id, false, "system").unwrap();
        assert_eq!(write.outcome, WriteOutcome::Created);
        assert_eq!(write.bill_total, dec("1906.67"));

        let bill = store.bill(write.bill_id).unwrap();
        assert!(bill.is_substitute);
        assert_eq!(bill.substitute_record_id, Some(record.id));
        assert_eq!(bill.cycle_start_date, date(2025, 11, 5));

        let payroll = store.payroll(write.payroll_id).unwrap();
        assert_eq!(payroll.employee_id, Some(record.substitute_employee_id));

        let saved = store.substitute(record.id).unwrap();
        assert_eq!(saved.substitute_management_fee, dec("1906.67"));
        assert_eq!(saved.generated_bill_id, Some(write.bill_id));
        assert_eq!(saved.generated_payroll_id, Some(write.payroll_id));
        assert!(store.find_bill(contract.id, date(2025, 11, 5), false).is_none());
    }

    #[test]
    fn test_edited_period_moves_existing_rows() {
        let (mut store, contract, record) = setup(false);
        let config = EngineConfig::default();
        let first = write_substitute(&mut store, &config, record.id, false, "system").unwrap();

        let mut edited = store.substitute(record.id).unwrap();
        edited.start_date = date(2025, 11, 7);
        store.save_substitute(edited).unwrap();
        let second = write_substitute(&mut store, &config, record.id, false, "system").unwrap();

        assert_eq!(second.outcome, WriteOutcome::Updated);
        assert_eq!(second.bill_id, first.bill_id);
        assert_eq!(second.payroll_id, first.payroll_id);
        // 5200 × 9 ÷ 30
        assert_eq!(second.bill_total, dec("1560.00"));

        let bills: Vec<_> = store
            .bills_for_contract(contract.id)
            .into_iter()
            .filter(|b| b.is_substitute)
            .collect();
        let payrolls: Vec<_> = store
            .payrolls_for_contract(contract.id)
            .into_iter()
            .filter(|p| p.is_substitute)
            .collect();
        assert_eq!(bills.len(), 1);
        assert_eq!(payrolls.len(), 1);
        assert_eq!(bills[0].cycle(), BillingCycle::new(date(2025, 11, 7), date(2025, 11, 15)));
        assert_eq!(payrolls[0].cycle_start_date, date(2025, 11, 7));
    }

    #[test]
    fn test_edited_period_without_links_still_moves_rows() {
        let (mut store, contract, record) = setup(false);
        let config = EngineConfig::default();
        let first = write_substitute(&mut store, &config, record.id, false, "system").unwrap();

        let mut edited = record.clone();
        edited.start_date = date(2025, 11, 7);
        edited.generated_bill_id = None;
        edited.generated_payroll_id = None;
        store.save_substitute(edited).unwrap();
        let second = write_substitute(&mut store, &config, record.id, false, "system").unwrap();

        assert_eq!(second.bill_id, first.bill_id);
        assert!(store.find_bill(contract.id, date(2025, 11, 5), true).is_none());
        assert!(store.find_payroll(contract.id, date(2025, 11, 5), true).is_none());
    }

    #[test]
    fn test_open_ended_contract_has_no_substitute_fee() {
        let (mut store, _, record) = setup(true);
        let config = EngineConfig::default();

        let write = write_substitute(&mut store, &config, record.id, false, "system").unwrap();
        assert_eq!(write.bill_total, dec("0.00"));
        assert_eq!(store.substitute(record.id).unwrap().substitute_management_fee, dec("0.00"));
    }

    #[test]
    fn test_recompute_follows_termination() {
        let (mut store, mut contract, record) = setup(true);
        let config = EngineConfig::default();
        write_substitute(&mut store, &config, record.id, false, "system").unwrap();

        contract.termination_date = Some(date(2025, 11, 10));
        contract.status = ContractStatus::Terminated;
        store.save_contract(contract.clone()).unwrap();

        let writes = recompute_substitutes(&mut store, &config, contract.id, "system").unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].outcome, WriteOutcome::Updated);
        // 5200 × 5 ÷ 30
        assert_eq!(writes[0].bill_total, dec("866.67"));
    }
}
