//! Bill merge and balance transfer.
//!
//! Merging freezes a bill and its payroll and carries their outstanding
//! balances into the first cycle of a successor contract. Every balance moves
//! as a pair of adjustments: an offset on the source that zeroes it and a
//! transfer-in on the target that receives it. Each pair sums to zero, so no
//! money is created or lost.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ActivityLog, AdjustmentEffect, AdjustmentOrigin, AdjustmentStatus, AdjustmentTarget,
    AdjustmentType, FinancialAdjustment, LedgerSide,
};
use crate::store::BillingStore;

use super::engine::{first_rows, recompute_bill};
use super::ledger::CycleWrite;

/// One balance carried from the source to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceTransfer {
    /// Customer bill or worker payroll.
    pub side: LedgerSide,
    /// Signed outstanding balance moved (negative for a credit).
    pub balance: Decimal,
    /// Adjustment zeroing the source.
    pub offset_adjustment_id: Uuid,
    /// Adjustment receiving the balance on the target.
    pub transfer_adjustment_id: Uuid,
}

/// The result of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// The frozen bill.
    pub source_bill_id: Uuid,
    /// The frozen payroll.
    pub source_payroll_id: Uuid,
    /// The bill that received the balance.
    pub target_bill_id: Uuid,
    /// The payroll that received the balance.
    pub target_payroll_id: Uuid,
    /// Pending salary-cover adjustments dropped from the source.
    pub removed_salary_covers: usize,
    /// Pending commissions moved to the target payroll.
    pub transferred_commissions: usize,
    /// Balances moved.
    pub transfers: Vec<BalanceTransfer>,
    /// The target cycle after recalculation.
    pub target: CycleWrite,
}

pub(crate) fn merge_bill<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    source_bill_id: Uuid,
    target_contract_id: Uuid,
    actor: &str,
) -> EngineResult<MergeReport> {
    let source_bill = store.bill(source_bill_id)?;
    if source_bill.is_merged {
        return Err(EngineError::AlreadyMerged {
            bill_id: source_bill_id,
        });
    }
    let source_payroll = store
        .find_payroll(
            source_bill.contract_id,
            source_bill.cycle_start_date,
            source_bill.is_substitute,
        )
        .ok_or_else(|| EngineError::Consistency {
            message: format!("bill {} has no matching payroll", source_bill.id),
        })?;

    let target_contract = store.contract(target_contract_id)?;
    let (target_bill, target_payroll) = first_rows(store, config, &target_contract, actor)?;
    if target_bill.id == source_bill.id {
        return Err(EngineError::Consistency {
            message: format!("bill {} cannot be merged into itself", source_bill.id),
        });
    }
    if target_bill.is_merged {
        return Err(EngineError::AlreadyMerged {
            bill_id: target_bill.id,
        });
    }

    let source_targets = [
        AdjustmentTarget::Bill(source_bill.id),
        AdjustmentTarget::Payroll(source_payroll.id),
    ];

    let mut removed_salary_covers = 0;
    for target in source_targets {
        for adjustment in store.adjustments_for(target) {
            if adjustment.adjustment_type.is_salary_cover()
                && adjustment.status == AdjustmentStatus::Pending
            {
                store.delete_adjustment(adjustment.id)?;
                removed_salary_covers += 1;
            }
        }
    }

    let mut transferred_commissions = 0;
    for target in source_targets {
        for commission in store.adjustments_for(target) {
            if commission.adjustment_type != AdjustmentType::EmployeeCommission
                || commission.status != AdjustmentStatus::Pending
            {
                continue;
            }
            let offset = FinancialAdjustment::new(
                target,
                AdjustmentType::EmployeeCommissionOffset,
                commission.amount,
                format!("Commission moved on merge: {}", commission.description),
                actor,
            )
            .with_origin(AdjustmentOrigin::MergeOffset);
            let moved = FinancialAdjustment::new(
                AdjustmentTarget::Payroll(target_payroll.id),
                AdjustmentType::EmployeeCommission,
                commission.amount,
                commission.description.clone(),
                actor,
            )
            .with_origin(AdjustmentOrigin::MergeTransferIn);
            save_pair(store, offset, moved, source_bill.id, Some(commission.id))?;
            transferred_commissions += 1;
        }
    }

    recompute_bill(store, config, source_bill.id, actor)?;
    let bill_balance = store.bill(source_bill.id)?.outstanding();
    let payroll_balance = store.payroll(source_payroll.id)?.outstanding();

    let mut transfers = Vec::new();
    let balances = [
        (
            LedgerSide::Customer,
            bill_balance,
            AdjustmentTarget::Bill(source_bill.id),
            AdjustmentTarget::Bill(target_bill.id),
        ),
        (
            LedgerSide::Employee,
            payroll_balance,
            AdjustmentTarget::Payroll(source_payroll.id),
            AdjustmentTarget::Payroll(target_payroll.id),
        ),
    ];
    for (side, balance, from, to) in balances {
        if balance.is_zero() {
            continue;
        }
        let transfer_effect = match (side, balance > Decimal::ZERO) {
            (LedgerSide::Customer, true) => AdjustmentEffect::CustomerIncrease,
            (LedgerSide::Customer, false) => AdjustmentEffect::CustomerDecrease,
            (LedgerSide::Employee, true) => AdjustmentEffect::EmployeeIncrease,
            (LedgerSide::Employee, false) => AdjustmentEffect::EmployeeDecrease,
        };
        let amount = balance.abs();
        let offset = FinancialAdjustment::new(
            from,
            transfer_effect.opposite().plain_type(),
            amount,
            format!(
                "Balance {} transferred to contract {}",
                balance, target_contract.id
            ),
            actor,
        )
        .with_origin(AdjustmentOrigin::MergeOffset);
        let transfer_in = FinancialAdjustment::new(
            to,
            transfer_effect.plain_type(),
            amount,
            format!(
                "Balance {} transferred from bill {}",
                balance, source_bill.id
            ),
            actor,
        )
        .with_origin(AdjustmentOrigin::MergeTransferIn);

        transfers.push(BalanceTransfer {
            side,
            balance,
            offset_adjustment_id: offset.id,
            transfer_adjustment_id: transfer_in.id,
        });
        save_pair(store, offset, transfer_in, source_bill.id, None)?;
    }

    recompute_bill(store, config, source_bill.id, actor)?;
    let mut frozen_bill = store.bill(source_bill.id)?;
    frozen_bill.is_merged = true;
    store.update_bill(frozen_bill)?;
    let mut frozen_payroll = store.payroll(source_payroll.id)?;
    frozen_payroll.is_merged = true;
    store.update_payroll(frozen_payroll)?;

    let target = recompute_bill(store, config, target_bill.id, actor)?;

    store.append_activity(
        ActivityLog::new(
            source_bill.contract_id,
            actor,
            "bill_merged",
            format!(
                "Merged into bill {} of contract {}: customer {}, worker {}",
                target_bill.id, target_contract.id, bill_balance, payroll_balance
            ),
        )
        .for_bill(source_bill.id)
        .for_payroll(source_payroll.id),
    )?;
    store.append_activity(
        ActivityLog::new(
            target_contract.id,
            actor,
            "balance_transferred_in",
            format!("Received balances from bill {}", source_bill.id),
        )
        .for_bill(target_bill.id)
        .for_payroll(target_payroll.id),
    )?;

    info!(
        source_bill_id = %source_bill.id,
        target_bill_id = %target_bill.id,
        customer_balance = %bill_balance,
        worker_balance = %payroll_balance,
        actor = %actor,
        "Bill merged"
    );

    Ok(MergeReport {
        source_bill_id: source_bill.id,
        source_payroll_id: source_payroll.id,
        target_bill_id: target_bill.id,
        target_payroll_id: target_payroll.id,
        removed_salary_covers,
        transferred_commissions,
        transfers,
        target,
    })
}

/// Saves an offset/transfer-in pair with each side linking the other.
fn save_pair<S: BillingStore + ?Sized>(
    store: &mut S,
    offset: FinancialAdjustment,
    transfer_in: FinancialAdjustment,
    source_bill_id: Uuid,
    replaces: Option<Uuid>,
) -> EngineResult<()> {
    let offset_id = offset.id;
    let transfer_id = transfer_in.id;
    debug!(
        offset_id = %offset_id,
        transfer_id = %transfer_id,
        amount = %offset.amount,
        "Saving merge adjustment pair"
    );
    store.save_adjustment(offset.with_details(json!({
        "linked_adjustment_id": transfer_id,
        "source_bill_id": source_bill_id,
        "replaces_adjustment_id": replaces,
    })))?;
    store.save_adjustment(transfer_in.with_details(json!({
        "linked_adjustment_id": offset_id,
        "source_bill_id": source_bill_id,
        "replaces_adjustment_id": replaces,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::ledger::write_cycle;
    use crate::models::{
        BillingCycle, Contract, ContractKind, ContractStatus, PaymentRecord, PaymentStatus,
    };
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_contract(start: NaiveDate, end: NaiveDate) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            employee_id: Some(Uuid::new_v4()),
            level: Decimal::from(6000),
            start_date: start,
            end_date: end,
            status: ContractStatus::Active,
            management_fee_rate: Decimal::new(10, 2),
            deposit_amount: Decimal::ZERO,
            security_deposit_amount: Decimal::ZERO,
            termination_date: None,
            previous_contract_id: None,
            next_contract_id: None,
            kind: ContractKind::Nanny { auto_renew: false },
        }
    }

    /// Old contract billed for October with 2000 paid; new contract from
    /// November.
    fn setup() -> (InMemoryStore, Contract, Contract, CycleWrite) {
        let mut store = InMemoryStore::new();
        let config = EngineConfig::default();
        let old = create_contract(date(2025, 10, 1), date(2025, 10, 31));
        let new = create_contract(date(2025, 11, 1), date(2026, 10, 31));
        store.save_contract(old.clone()).unwrap();
        store.save_contract(new.clone()).unwrap();

        let october = BillingCycle::new(date(2025, 10, 1), date(2025, 10, 31));
        let write = write_cycle(&mut store, &config, &old, &october, false, "system").unwrap();
        store
            .insert_payment_record(PaymentRecord {
                id: Uuid::new_v4(),
                bill_id: write.bill_id,
                amount: dec("2000"),
                paid_on: date(2025, 10, 5),
                adjustment_id: None,
                recorded_by: "finance".to_string(),
            })
            .unwrap();
        (store, old, new, write)
    }

    #[test]
    fn test_merge_moves_outstanding_balance() {
        let (mut store, _, new, source) = setup();
        let config = EngineConfig::default();
        // October: 6000 + 600 management fee = 6600, 2000 paid.
        assert_eq!(source.bill_total, dec("6600.00"));

        let report = merge_bill(&mut store, &config, source.bill_id, new.id, "ops").unwrap();

        let bill = store.bill(source.bill_id).unwrap();
        assert!(bill.is_merged);
        assert_eq!(bill.outstanding(), Decimal::ZERO);
        assert_eq!(bill.total_due, dec("2000.00"));
        assert_eq!(bill.payment_status, PaymentStatus::Paid);

        let customer = report
            .transfers
            .iter()
            .find(|t| t.side == LedgerSide::Customer)
            .unwrap();
        assert_eq!(customer.balance, dec("4600.00"));

        let target = store.bill(report.target_bill_id).unwrap();
        assert_eq!(target.contract_id, new.id);
        assert_eq!(target.cycle_start_date, date(2025, 11, 1));
        // 6000 + 12 months × 600 + 4600 carried.
        assert_eq!(target.total_due, dec("17800.00"));
    }

    #[test]
    fn test_merge_adjustments_sum_to_zero() {
        let (mut store, _, new, source) = setup();
        let config = EngineConfig::default();
        let before = store.all_adjustments().len();

        merge_bill(&mut store, &config, source.bill_id, new.id, "ops").unwrap();

        let created: Vec<_> = store
            .all_adjustments()
            .into_iter()
            .filter(|a| a.origin != AdjustmentOrigin::Manual)
            .collect();
        assert_eq!(created.len() - before, 4);
        let net: Decimal = created.iter().map(|a| a.signed_amount()).sum();
        assert_eq!(net, Decimal::ZERO);
        for adjustment in &created {
            assert!(adjustment.details["linked_adjustment_id"].is_string());
        }
    }

    #[test]
    fn test_merge_twice_is_rejected() {
        let (mut store, _, new, source) = setup();
        let config = EngineConfig::default();
        merge_bill(&mut store, &config, source.bill_id, new.id, "ops").unwrap();
        let result = merge_bill(&mut store, &config, source.bill_id, new.id, "ops");
        assert!(matches!(result, Err(EngineError::AlreadyMerged { .. })));
    }

    #[test]
    fn test_merge_drops_salary_cover_and_moves_commission() {
        let (mut store, _, new, source) = setup();
        let config = EngineConfig::default();
        let payroll_target = AdjustmentTarget::Payroll(source.payroll_id);
        store
            .save_adjustment(FinancialAdjustment::new(
                payroll_target,
                AdjustmentType::CompanyPaidSalary,
                dec("1000"),
                "Agency paid salary",
                "ops",
            ))
            .unwrap();
        let mut settled_cover = FinancialAdjustment::new(
            payroll_target,
            AdjustmentType::DepositPaidSalary,
            dec("100"),
            "Paid from deposit",
            "ops",
        );
        settled_cover.status = AdjustmentStatus::Paid;
        store.save_adjustment(settled_cover.clone()).unwrap();
        store
            .save_adjustment(FinancialAdjustment::new(
                payroll_target,
                AdjustmentType::EmployeeCommission,
                dec("300"),
                "Placement commission",
                "ops",
            ))
            .unwrap();

        let report = merge_bill(&mut store, &config, source.bill_id, new.id, "ops").unwrap();
        assert_eq!(report.removed_salary_covers, 1);
        assert_eq!(report.transferred_commissions, 1);
        assert!(store.adjustment(settled_cover.id).is_ok());

        let moved: Vec<_> = store
            .adjustments_for(AdjustmentTarget::Payroll(report.target_payroll_id))
            .into_iter()
            .filter(|a| a.adjustment_type == AdjustmentType::EmployeeCommission)
            .collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].amount, dec("300"));
        assert_eq!(store.payroll(source.payroll_id).unwrap().outstanding(), Decimal::ZERO);
    }

    #[test]
    fn test_target_without_cycles_is_not_found() {
        let (mut store, _, _, source) = setup();
        let config = EngineConfig::default();
        let mut nurse = create_contract(date(2025, 11, 1), date(2026, 1, 31));
        nurse.kind = ContractKind::MaternityNurse {
            actual_onboarding_date: None,
            expected_offboarding_date: None,
            actual_offboarding_date: None,
        };
        store.save_contract(nurse.clone()).unwrap();

        let result = merge_bill(&mut store, &config, source.bill_id, nurse.id, "ops");
        assert!(matches!(result, Err(EngineError::SuccessorBillNotFound { .. })));
    }
}
