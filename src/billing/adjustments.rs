//! Adjustment netting and settlement.
//!
//! Adjustments are folded into four netting buckets for the fee calculator.
//! Settling an adjustment (moving it to `paid`) appends a signed payment or
//! payout record linked back to the adjustment; un-settling or deleting it
//! removes that record. The paid totals and statuses of the affected bill or
//! payroll are refreshed after every change.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calculation::AdjustmentTotals;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    ActivityLog, AdjustmentStatus, AdjustmentTarget, CustomerBill, EmployeePayroll,
    FinancialAdjustment, PaymentRecord, PayoutRecord,
};
use crate::store::BillingStore;

/// Nets every adjustment on a bill and/or payroll by effect.
///
/// Adjustments count regardless of settlement status.
pub fn net_adjustments<S: BillingStore + ?Sized>(
    store: &S,
    bill_id: Option<Uuid>,
    payroll_id: Option<Uuid>,
) -> AdjustmentTotals {
    let mut adjustments = Vec::new();
    if let Some(id) = bill_id {
        adjustments.extend(store.adjustments_for(AdjustmentTarget::Bill(id)));
    }
    if let Some(id) = payroll_id {
        adjustments.extend(store.adjustments_for(AdjustmentTarget::Payroll(id)));
    }
    AdjustmentTotals::from_adjustments(&adjustments)
}

/// Recomputes a bill's paid total and status from its payment records.
pub fn refresh_bill_settlement<S: BillingStore + ?Sized>(
    store: &mut S,
    bill_id: Uuid,
) -> EngineResult<CustomerBill> {
    let mut bill = store.bill(bill_id)?;
    bill.total_paid = store
        .payment_records(bill_id)
        .iter()
        .map(|r| r.amount)
        .sum::<Decimal>();
    bill.refresh_status();
    store.update_bill(bill.clone())?;
    Ok(bill)
}

/// Recomputes a payroll's paid-out total and status from its payout records.
pub fn refresh_payroll_settlement<S: BillingStore + ?Sized>(
    store: &mut S,
    payroll_id: Uuid,
) -> EngineResult<EmployeePayroll> {
    let mut payroll = store.payroll(payroll_id)?;
    payroll.total_paid_out = store
        .payout_records(payroll_id)
        .iter()
        .map(|r| r.amount)
        .sum::<Decimal>();
    payroll.refresh_status();
    store.update_payroll(payroll.clone())?;
    Ok(payroll)
}

/// Parses a raw settlement date, falling back to `today`.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps. Anything else is logged and
/// replaced by `today`.
///
/// # Example
///
/// ```
/// use placement_billing::billing::parse_settlement_date;
/// use chrono::NaiveDate;
///
/// let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
/// assert_eq!(
///     parse_settlement_date(Some("2025-11-03"), today),
///     NaiveDate::from_ymd_opt(2025, 11, 3).unwrap()
/// );
/// assert_eq!(parse_settlement_date(Some("03/11/2025"), today), today);
/// assert_eq!(parse_settlement_date(None, today), today);
/// ```
pub fn parse_settlement_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return today;
    };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return timestamp.date_naive();
    }
    warn!(raw = %raw, fallback = %today, "Unparseable settlement date, using today");
    today
}

/// Attaches a new adjustment to a contract, bill or payroll.
///
/// An adjustment created as `paid` is settled immediately.
///
/// # Errors
///
/// Returns a validation error for a negative amount and a not-found error if
/// the target does not exist.
pub fn add_adjustment<S: BillingStore + ?Sized>(
    store: &mut S,
    mut adjustment: FinancialAdjustment,
    actor: &str,
    today: NaiveDate,
) -> EngineResult<FinancialAdjustment> {
    if adjustment.amount.is_sign_negative() && !adjustment.amount.is_zero() {
        return Err(EngineError::validation(
            "amount",
            format!("{} is negative", adjustment.amount),
        ));
    }
    let contract_id = target_contract_id(store, adjustment.target)?;

    if adjustment.status.is_settled() {
        create_settlement_record(store, &mut adjustment, actor, today)?;
    }
    store.save_adjustment(adjustment.clone())?;
    refresh_target(store, adjustment.target)?;
    log_activity(
        store,
        contract_id,
        &adjustment,
        actor,
        "adjustment_created",
        format!(
            "{:?} of {} created: {}",
            adjustment.adjustment_type, adjustment.amount, adjustment.description
        ),
    )?;

    debug!(adjustment_id = %adjustment.id, contract_id = %contract_id, "Adjustment created");
    Ok(adjustment)
}

/// Moves an adjustment to a new settlement status.
///
/// Pending or billed → paid appends a signed settlement record dated from
/// `settlement_date` (or the adjustment's stored raw date). Paid → pending or
/// billed deletes it.
pub fn set_adjustment_status<S: BillingStore + ?Sized>(
    store: &mut S,
    adjustment_id: Uuid,
    status: AdjustmentStatus,
    settlement_date: Option<String>,
    actor: &str,
    today: NaiveDate,
) -> EngineResult<FinancialAdjustment> {
    let mut adjustment = store.adjustment(adjustment_id)?;
    let contract_id = target_contract_id(store, adjustment.target)?;
    let previous = adjustment.status;
    if settlement_date.is_some() {
        adjustment.settlement_date = settlement_date;
    }

    match (previous.is_settled(), status.is_settled()) {
        (false, true) => create_settlement_record(store, &mut adjustment, actor, today)?,
        (true, false) => remove_settlement_record(store, &mut adjustment)?,
        _ => {}
    }
    adjustment.status = status;
    store.save_adjustment(adjustment.clone())?;
    refresh_target(store, adjustment.target)?;
    log_activity(
        store,
        contract_id,
        &adjustment,
        actor,
        "adjustment_status_changed",
        format!("Adjustment {} moved from {:?} to {:?}", adjustment.id, previous, status),
    )?;

    info!(
        adjustment_id = %adjustment.id,
        from = ?previous,
        to = ?status,
        actor = %actor,
        "Adjustment status changed"
    );
    Ok(adjustment)
}

/// Deletes an adjustment together with its settlement record.
pub fn delete_adjustment<S: BillingStore + ?Sized>(
    store: &mut S,
    adjustment_id: Uuid,
    actor: &str,
) -> EngineResult<FinancialAdjustment> {
    let mut adjustment = store.adjustment(adjustment_id)?;
    let contract_id = target_contract_id(store, adjustment.target)?;
    remove_settlement_record(store, &mut adjustment)?;
    store.delete_adjustment(adjustment_id)?;
    refresh_target(store, adjustment.target)?;
    log_activity(
        store,
        contract_id,
        &adjustment,
        actor,
        "adjustment_deleted",
        format!(
            "{:?} of {} deleted: {}",
            adjustment.adjustment_type, adjustment.amount, adjustment.description
        ),
    )?;
    Ok(adjustment)
}

/// Deletes every adjustment on a bill or payroll with its settlement record,
/// without logging. Used when the record itself is being removed.
pub(crate) fn purge_adjustments<S: BillingStore + ?Sized>(
    store: &mut S,
    target: AdjustmentTarget,
) -> EngineResult<usize> {
    let adjustments = store.adjustments_for(target);
    let count = adjustments.len();
    for mut adjustment in adjustments {
        remove_settlement_record(store, &mut adjustment)?;
        store.delete_adjustment(adjustment.id)?;
    }
    Ok(count)
}

/// The contract an adjustment target belongs to.
pub(crate) fn target_contract_id<S: BillingStore + ?Sized>(
    store: &S,
    target: AdjustmentTarget,
) -> EngineResult<Uuid> {
    match target {
        AdjustmentTarget::Contract(id) => store.contract(id).map(|c| c.id),
        AdjustmentTarget::Bill(id) => store.bill(id).map(|b| b.contract_id),
        AdjustmentTarget::Payroll(id) => store.payroll(id).map(|p| p.contract_id),
    }
}

fn refresh_target<S: BillingStore + ?Sized>(
    store: &mut S,
    target: AdjustmentTarget,
) -> EngineResult<()> {
    match target {
        AdjustmentTarget::Bill(id) => refresh_bill_settlement(store, id).map(|_| ()),
        AdjustmentTarget::Payroll(id) => refresh_payroll_settlement(store, id).map(|_| ()),
        AdjustmentTarget::Contract(_) => Ok(()),
    }
}

fn create_settlement_record<S: BillingStore + ?Sized>(
    store: &mut S,
    adjustment: &mut FinancialAdjustment,
    actor: &str,
    today: NaiveDate,
) -> EngineResult<()> {
    let paid_on = parse_settlement_date(adjustment.settlement_date.as_deref(), today);
    let amount = adjustment.signed_amount();

    match adjustment.target {
        AdjustmentTarget::Bill(bill_id) => {
            let record = PaymentRecord {
                id: Uuid::new_v4(),
                bill_id,
                amount,
                paid_on,
                adjustment_id: Some(adjustment.id),
                recorded_by: actor.to_string(),
            };
            adjustment.linked_record_id = Some(record.id);
            store.insert_payment_record(record)?;
        }
        AdjustmentTarget::Payroll(payroll_id) => {
            let record = PayoutRecord {
                id: Uuid::new_v4(),
                payroll_id,
                amount,
                paid_on,
                adjustment_id: Some(adjustment.id),
                recorded_by: actor.to_string(),
            };
            adjustment.linked_record_id = Some(record.id);
            store.insert_payout_record(record)?;
        }
        AdjustmentTarget::Contract(contract_id) => {
            debug!(
                adjustment_id = %adjustment.id,
                contract_id = %contract_id,
                "Contract-level adjustment settled without a settlement record"
            );
        }
    }
    Ok(())
}

fn remove_settlement_record<S: BillingStore + ?Sized>(
    store: &mut S,
    adjustment: &mut FinancialAdjustment,
) -> EngineResult<()> {
    let Some(record_id) = adjustment.linked_record_id.take() else {
        return Ok(());
    };
    match adjustment.target {
        AdjustmentTarget::Bill(_) => store.delete_payment_record(record_id),
        AdjustmentTarget::Payroll(_) => store.delete_payout_record(record_id),
        AdjustmentTarget::Contract(_) => Ok(()),
    }
}

fn log_activity<S: BillingStore + ?Sized>(
    store: &mut S,
    contract_id: Uuid,
    adjustment: &FinancialAdjustment,
    actor: &str,
    action: &str,
    message: String,
) -> EngineResult<()> {
    let mut entry = ActivityLog::new(contract_id, actor, action, message);
    match adjustment.target {
        AdjustmentTarget::Bill(id) => entry = entry.for_bill(id),
        AdjustmentTarget::Payroll(id) => entry = entry.for_payroll(id),
        AdjustmentTarget::Contract(_) => {}
    }
    store.append_activity(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdjustmentType, BillingCycle, PaymentStatus};
    use crate::store::InMemoryStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 11, 30)
    }

    fn store_with_bill(total_due: &str) -> (InMemoryStore, CustomerBill, EmployeePayroll) {
        let mut store = InMemoryStore::new();
        let contract_id = Uuid::new_v4();
        let cycle = BillingCycle::new(date(2025, 11, 1), date(2025, 11, 30));
        let mut bill = CustomerBill::new(contract_id, &cycle, false);
        bill.total_due = dec(total_due);
        bill.refresh_status();
        let mut payroll = EmployeePayroll::new(contract_id, Some(Uuid::new_v4()), &cycle, false);
        payroll.total_payable = dec("5400");
        payroll.refresh_status();
        store.insert_bill(bill.clone()).unwrap();
        store.insert_payroll(payroll.clone()).unwrap();
        (store, bill, payroll)
    }

    fn adjustment(target: AdjustmentTarget, t: AdjustmentType, amount: &str) -> FinancialAdjustment {
        FinancialAdjustment::new(target, t, dec(amount), "test adjustment", "ops")
    }

    #[test]
    fn test_net_adjustments_combines_bill_and_payroll() {
        let (mut store, bill, payroll) = store_with_bill("6000");
        let bill_target = AdjustmentTarget::Bill(bill.id);
        let payroll_target = AdjustmentTarget::Payroll(payroll.id);
        for adj in [
            adjustment(bill_target, AdjustmentType::Deposit, "500"),
            adjustment(bill_target, AdjustmentType::CustomerDiscount, "100"),
            adjustment(payroll_target, AdjustmentType::EmployeeCommission, "300"),
            adjustment(payroll_target, AdjustmentType::CompanyPaidSalary, "50"),
        ] {
            add_adjustment(&mut store, adj, "ops", today()).unwrap();
        }

        let totals = net_adjustments(&store, Some(bill.id), Some(payroll.id));
        assert_eq!(totals.customer_increase, dec("500"));
        assert_eq!(totals.customer_decrease, dec("100"));
        assert_eq!(totals.employee_increase, dec("50"));
        assert_eq!(totals.employee_decrease, dec("300"));
    }

    #[test]
    fn test_settling_creates_linked_payment() {
        let (mut store, bill, _) = store_with_bill("500");
        let adj = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::Deposit, "500"),
            "ops",
            today(),
        )
        .unwrap();

        let settled = set_adjustment_status(
            &mut store,
            adj.id,
            AdjustmentStatus::Paid,
            Some("2025-11-03".to_string()),
            "finance",
            today(),
        )
        .unwrap();

        let records = store.payment_records(bill.id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, dec("500"));
        assert_eq!(records[0].paid_on, date(2025, 11, 3));
        assert_eq!(records[0].recorded_by, "finance");
        assert_eq!(settled.linked_record_id, Some(records[0].id));

        let bill = store.bill(bill.id).unwrap();
        assert_eq!(bill.total_paid, dec("500"));
        assert_eq!(bill.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_customer_decrease_settles_negative() {
        let (mut store, bill, _) = store_with_bill("6000");
        let adj = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::CustomerDiscount, "200"),
            "ops",
            today(),
        )
        .unwrap();
        set_adjustment_status(&mut store, adj.id, AdjustmentStatus::Paid, None, "ops", today())
            .unwrap();

        let records = store.payment_records(bill.id);
        assert_eq!(records[0].amount, dec("-200"));
        assert_eq!(records[0].paid_on, today());
    }

    #[test]
    fn test_unsettling_deletes_record() {
        let (mut store, _, payroll) = store_with_bill("6000");
        let adj = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Payroll(payroll.id), AdjustmentType::EmployeeIncrease, "100"),
            "ops",
            today(),
        )
        .unwrap();
        set_adjustment_status(&mut store, adj.id, AdjustmentStatus::Paid, None, "ops", today())
            .unwrap();
        assert_eq!(store.payout_records(payroll.id).len(), 1);
        assert_eq!(store.payroll(payroll.id).unwrap().total_paid_out, dec("100"));

        let reverted =
            set_adjustment_status(&mut store, adj.id, AdjustmentStatus::Billed, None, "ops", today())
                .unwrap();
        assert!(store.payout_records(payroll.id).is_empty());
        assert_eq!(reverted.linked_record_id, None);
        assert_eq!(store.payroll(payroll.id).unwrap().total_paid_out, Decimal::ZERO);
    }

    #[test]
    fn test_deleting_settled_adjustment_deletes_record() {
        let (mut store, bill, _) = store_with_bill("6000");
        let mut adj = adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::CustomerIncrease, "250");
        adj.status = AdjustmentStatus::Paid;
        let adj = add_adjustment(&mut store, adj, "ops", today()).unwrap();
        assert_eq!(store.payment_records(bill.id).len(), 1);

        delete_adjustment(&mut store, adj.id, "ops").unwrap();
        assert!(store.payment_records(bill.id).is_empty());
        assert!(matches!(
            store.adjustment(adj.id),
            Err(EngineError::AdjustmentNotFound { .. })
        ));
        assert_eq!(store.bill(bill.id).unwrap().payment_status, PaymentStatus::Unpaid);
    }

    #[test]
    fn test_unparseable_date_falls_back_to_today() {
        let (mut store, bill, _) = store_with_bill("6000");
        let adj = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::Deposit, "100"),
            "ops",
            today(),
        )
        .unwrap();
        set_adjustment_status(
            &mut store,
            adj.id,
            AdjustmentStatus::Paid,
            Some("not a date".to_string()),
            "ops",
            today(),
        )
        .unwrap();
        assert_eq!(store.payment_records(bill.id)[0].paid_on, today());
    }

    #[test]
    fn test_rfc3339_settlement_date() {
        assert_eq!(
            parse_settlement_date(Some("2025-11-03T10:15:00+08:00"), today()),
            date(2025, 11, 3)
        );
    }

    #[test]
    fn test_negative_amount_rejected() {
        let (mut store, bill, _) = store_with_bill("6000");
        let result = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::Deposit, "-1"),
            "ops",
            today(),
        );
        assert!(matches!(result, Err(EngineError::Validation { .. })));
    }

    #[test]
    fn test_missing_target_rejected() {
        let mut store = InMemoryStore::new();
        let result = add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(Uuid::new_v4()), AdjustmentType::Deposit, "1"),
            "ops",
            today(),
        );
        assert!(matches!(result, Err(EngineError::BillNotFound { .. })));
    }

    #[test]
    fn test_activity_logged_with_actor() {
        let (mut store, bill, _) = store_with_bill("6000");
        add_adjustment(
            &mut store,
            adjustment(AdjustmentTarget::Bill(bill.id), AdjustmentType::Deposit, "100"),
            "alice",
            today(),
        )
        .unwrap();
        let activity = store.activity_for_contract(bill.contract_id);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].actor, "alice");
        assert_eq!(activity[0].bill_id, Some(bill.id));
    }
}
