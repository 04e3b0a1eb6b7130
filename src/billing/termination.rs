//! Early termination settlement.
//!
//! Terminating a contract drops the bills of cycles that start after the
//! termination date, recalculates the now-shortened final cycle, refunds the
//! unused part of any prepaid management fee on the final bill, optionally
//! carries that refund over to a successor contract, and recalculates the
//! contract's substitute records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::calculation::{ManagementFeeRefund, all_cycles, management_fee_refund};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ActivityLog, AdjustmentOrigin, AdjustmentTarget, AdjustmentType, Contract, ContractStatus,
    FinancialAdjustment,
};
use crate::store::BillingStore;

use super::adjustments::{delete_adjustment, purge_adjustments};
use super::engine::{first_rows, recompute_bill};
use super::ledger::{CycleWrite, ensure_ledger_rows, write_cycle};
use super::substitute::recompute_substitutes;

/// Parameters of an early termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRequest {
    /// Last day of service.
    pub termination_date: NaiveDate,
    /// Whether the termination day itself is charged.
    #[serde(default)]
    pub charge_termination_day: bool,
    /// Successor contract receiving the management-fee refund.
    #[serde(default)]
    pub transfer_to_contract_id: Option<Uuid>,
}

/// A refund carried over to a successor contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefundTransfer {
    /// The successor contract.
    pub target_contract_id: Uuid,
    /// The successor's first bill.
    pub target_bill_id: Uuid,
    /// Customer increase cancelling the refund on the final bill.
    pub offset_adjustment_id: Uuid,
    /// Customer decrease crediting the refund on the successor bill.
    pub transfer_adjustment_id: Uuid,
}

/// The result of a termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    /// The terminated contract.
    pub contract_id: Uuid,
    /// Last day of service.
    pub termination_date: NaiveDate,
    /// Bills of cycles after the termination date that were deleted.
    pub removed_bill_ids: Vec<Uuid>,
    /// Payrolls of cycles after the termination date that were deleted.
    pub removed_payroll_ids: Vec<Uuid>,
    /// The recalculated final cycle, if the contract has one.
    pub final_cycle: Option<CycleWrite>,
    /// The management-fee refund, if any was owed.
    pub refund: Option<ManagementFeeRefund>,
    /// The customer decrease carrying the refund.
    pub refund_adjustment_id: Option<Uuid>,
    /// The refund transfer to a successor contract.
    pub transfer: Option<RefundTransfer>,
    /// Substitute records recalculated against the new end.
    pub substitutes: Vec<CycleWrite>,
}

pub(crate) fn terminate_contract<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract_id: Uuid,
    request: &TerminationRequest,
    actor: &str,
) -> EngineResult<TerminationReport> {
    let termination_date = request.termination_date;
    let mut contract = store.contract(contract_id)?;
    validate_termination(&contract, request)?;
    let cleared = clear_previous_settlement(store, contract_id, actor)?;

    contract.status = ContractStatus::Terminated;
    contract.termination_date = Some(termination_date);
    store.save_contract(contract.clone())?;

    let (removed_bill_ids, removed_payroll_ids) =
        remove_future_cycles(store, contract_id, termination_date)?;

    let final_cycle = all_cycles(&contract, termination_date, config).into_iter().last();
    let final_rows = match final_cycle {
        Some(cycle) => Some(ensure_ledger_rows(
            store,
            contract.id,
            contract.employee_id,
            &cycle,
            false,
        )?),
        None => None,
    };

    let refund = management_fee_refund(
        &contract,
        termination_date,
        request.charge_termination_day,
        config,
    )
    .filter(|r| r.amount > Decimal::ZERO);

    let mut refund_adjustment_id = None;
    let mut transfer = None;
    if let (Some(refund), Some(rows)) = (&refund, &final_rows) {
        let final_bill = AdjustmentTarget::Bill(rows.bill.id);
        let adjustment = FinancialAdjustment::new(
            final_bill,
            AdjustmentType::CustomerDecrease,
            refund.amount,
            format!("Management fee refund for termination on {}", termination_date),
            actor,
        )
        .with_origin(AdjustmentOrigin::TerminationRefund)
        .with_details(json!({
            "termination_date": termination_date,
            "unused_days": refund.unused_days,
            "formula": refund.formula,
        }));
        refund_adjustment_id = Some(save_unless_present(store, adjustment)?);

        if let Some(successor_id) = request.transfer_to_contract_id {
            transfer = Some(transfer_refund(
                store,
                config,
                &mut contract,
                successor_id,
                rows.bill.id,
                refund,
                actor,
            )?);
        }
    } else if let Some(successor_id) = request.transfer_to_contract_id {
        link_successor(store, &mut contract, successor_id)?;
    }

    let final_write = match final_cycle {
        Some(cycle) => Some(write_cycle(store, config, &contract, &cycle, true, actor)?),
        None => None,
    };
    for cycle in all_cycles(&contract, termination_date, config) {
        if Some(cycle) == final_cycle {
            continue;
        }
        let touched = store
            .find_bill(contract.id, cycle.start_date, false)
            .is_some_and(|b| cleared.own_bills.contains(&b.id));
        if touched {
            write_cycle(store, config, &contract, &cycle, true, actor)?;
        }
    }
    for bill_id in cleared.other_bills {
        let already_recomputed = transfer.as_ref().is_some_and(|t| t.target_bill_id == bill_id);
        if !already_recomputed && store.bill(bill_id).is_ok() {
            recompute_bill(store, config, bill_id, actor)?;
        }
    }
    let substitutes = recompute_substitutes(store, config, contract.id, actor)?;

    store.append_activity(ActivityLog::new(
        contract.id,
        actor,
        "contract_terminated",
        format!(
            "Terminated on {}: {} future bill(s) removed, refund {}",
            termination_date,
            removed_bill_ids.len(),
            refund
                .as_ref()
                .map(|r| r.amount.to_string())
                .unwrap_or_else(|| "none".to_string())
        ),
    ))?;

    info!(
        contract_id = %contract.id,
        termination_date = %termination_date,
        removed_bills = removed_bill_ids.len(),
        refund = ?refund.as_ref().map(|r| r.amount),
        actor = %actor,
        "Contract terminated"
    );

    Ok(TerminationReport {
        contract_id: contract.id,
        termination_date,
        removed_bill_ids,
        removed_payroll_ids,
        final_cycle: final_write,
        refund,
        refund_adjustment_id,
        transfer,
        substitutes,
    })
}

/// Bills whose refund or transfer adjustments were removed by
/// [`clear_previous_settlement`].
#[derive(Debug, Default)]
struct ClearedSettlement {
    own_bills: Vec<Uuid>,
    other_bills: Vec<Uuid>,
}

/// Deletes the refund and refund-transfer adjustments an earlier termination
/// of the contract left behind, including the transferred-in credit on a
/// successor's bill.
fn clear_previous_settlement<S: BillingStore + ?Sized>(
    store: &mut S,
    contract_id: Uuid,
    actor: &str,
) -> EngineResult<ClearedSettlement> {
    let mut cleared = ClearedSettlement::default();
    for bill in store.bills_for_contract(contract_id) {
        for adjustment in store.adjustments_for(AdjustmentTarget::Bill(bill.id)) {
            match adjustment.origin {
                AdjustmentOrigin::TerminationRefund => {}
                AdjustmentOrigin::TransferOffset => {
                    let linked = adjustment.details["linked_adjustment_id"]
                        .as_str()
                        .and_then(|id| Uuid::parse_str(id).ok())
                        .and_then(|id| store.adjustment(id).ok())
                        .filter(|a| a.origin == AdjustmentOrigin::TransferIn);
                    if let Some(transfer_in) = linked {
                        if let AdjustmentTarget::Bill(target_bill) = transfer_in.target {
                            if !cleared.other_bills.contains(&target_bill) {
                                cleared.other_bills.push(target_bill);
                            }
                        }
                        delete_adjustment(store, transfer_in.id, actor)?;
                    }
                }
                _ => continue,
            }
            debug!(
                adjustment_id = %adjustment.id,
                bill_id = %bill.id,
                "Removing earlier termination adjustment"
            );
            delete_adjustment(store, adjustment.id, actor)?;
            if !cleared.own_bills.contains(&bill.id) {
                cleared.own_bills.push(bill.id);
            }
        }
    }
    Ok(cleared)
}

fn validate_termination(contract: &Contract, request: &TerminationRequest) -> EngineResult<()> {
    if request.termination_date < contract.start_date {
        return Err(EngineError::InvalidDateRange {
            start: contract.start_date,
            end: request.termination_date,
        });
    }
    if !contract.is_auto_renew() && request.termination_date > contract.end_date {
        return Err(EngineError::validation(
            "termination_date",
            format!(
                "{} is after the contract end {}",
                request.termination_date, contract.end_date
            ),
        ));
    }
    if request.transfer_to_contract_id == Some(contract.id) {
        return Err(EngineError::validation(
            "transfer_to_contract_id",
            "a contract cannot transfer to itself",
        ));
    }
    Ok(())
}

/// Deletes the regular bills and payrolls of cycles starting after
/// `termination_date`, with their adjustments and activity.
fn remove_future_cycles<S: BillingStore + ?Sized>(
    store: &mut S,
    contract_id: Uuid,
    termination_date: NaiveDate,
) -> EngineResult<(Vec<Uuid>, Vec<Uuid>)> {
    let bills: Vec<_> = store
        .bills_for_contract(contract_id)
        .into_iter()
        .filter(|b| !b.is_substitute && b.cycle_start_date > termination_date)
        .collect();
    let payrolls: Vec<_> = store
        .payrolls_for_contract(contract_id)
        .into_iter()
        .filter(|p| !p.is_substitute && p.cycle_start_date > termination_date)
        .collect();

    for bill in &bills {
        if !store.payment_records(bill.id).is_empty() {
            return Err(EngineError::Consistency {
                message: format!(
                    "bill {} for cycle starting {} already has payments",
                    bill.id, bill.cycle_start_date
                ),
            });
        }
    }
    for payroll in &payrolls {
        if !store.payout_records(payroll.id).is_empty() {
            return Err(EngineError::Consistency {
                message: format!(
                    "payroll {} for cycle starting {} already has payouts",
                    payroll.id, payroll.cycle_start_date
                ),
            });
        }
    }

    for bill in &bills {
        purge_adjustments(store, AdjustmentTarget::Bill(bill.id))?;
        store.delete_activity_for(Some(bill.id), None)?;
        store.delete_bill(bill.id)?;
        debug!(bill_id = %bill.id, cycle_start = %bill.cycle_start_date, "Removed future bill");
    }
    for payroll in &payrolls {
        purge_adjustments(store, AdjustmentTarget::Payroll(payroll.id))?;
        store.delete_activity_for(None, Some(payroll.id))?;
        store.delete_payroll(payroll.id)?;
    }

    Ok((
        bills.into_iter().map(|b| b.id).collect(),
        payrolls.into_iter().map(|p| p.id).collect(),
    ))
}

fn link_successor<S: BillingStore + ?Sized>(
    store: &mut S,
    contract: &mut Contract,
    successor_id: Uuid,
) -> EngineResult<Contract> {
    let mut successor = store.contract(successor_id)?;
    successor.previous_contract_id = Some(contract.id);
    contract.next_contract_id = Some(successor_id);
    store.save_contract(successor.clone())?;
    store.save_contract(contract.clone())?;
    Ok(successor)
}

fn transfer_refund<S: BillingStore + ?Sized>(
    store: &mut S,
    config: &EngineConfig,
    contract: &mut Contract,
    successor_id: Uuid,
    final_bill_id: Uuid,
    refund: &ManagementFeeRefund,
    actor: &str,
) -> EngineResult<RefundTransfer> {
    let successor = link_successor(store, contract, successor_id)?;
    let (target_bill, _) = first_rows(store, config, &successor, actor)?;

    let offset = FinancialAdjustment::new(
        AdjustmentTarget::Bill(final_bill_id),
        AdjustmentType::CustomerIncrease,
        refund.amount,
        format!("Management fee refund transferred to contract {}", successor_id),
        actor,
    )
    .with_origin(AdjustmentOrigin::TransferOffset);
    let transfer_in = FinancialAdjustment::new(
        AdjustmentTarget::Bill(target_bill.id),
        AdjustmentType::CustomerDecrease,
        refund.amount,
        format!("Management fee refund transferred from contract {}", contract.id),
        actor,
    )
    .with_origin(AdjustmentOrigin::TransferIn);

    let offset_id = offset.id;
    let transfer_id = transfer_in.id;
    let offset_adjustment_id = save_unless_present(
        store,
        offset.with_details(json!({
            "linked_adjustment_id": transfer_id,
            "target_contract_id": successor_id,
        })),
    )?;
    let transfer_adjustment_id = save_unless_present(
        store,
        transfer_in.with_details(json!({
            "linked_adjustment_id": offset_id,
            "source_contract_id": contract.id,
        })),
    )?;

    recompute_bill(store, config, target_bill.id, actor)?;

    Ok(RefundTransfer {
        target_contract_id: successor_id,
        target_bill_id: target_bill.id,
        offset_adjustment_id,
        transfer_adjustment_id,
    })
}

/// Saves `adjustment` unless its target already carries one with the same
/// description; returns the id of whichever is kept.
fn save_unless_present<S: BillingStore + ?Sized>(
    store: &mut S,
    adjustment: FinancialAdjustment,
) -> EngineResult<Uuid> {
    if let Some(existing) = store
        .adjustments_for(adjustment.target)
        .into_iter()
        .find(|a| a.description == adjustment.description)
    {
        debug!(adjustment_id = %existing.id, "Adjustment already present");
        return Ok(existing.id);
    }
    let id = adjustment.id;
    store.save_adjustment(adjustment)?;
    Ok(id)
}
