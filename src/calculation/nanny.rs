//! Nanny fee calculation.
//!
//! Customer side: a flat monthly base fee (prorated on short cycles),
//! overtime at the daily rate, and the agency management fee. Auto-renewing
//! contracts pay the management fee every cycle. Fixed-term contracts prepay
//! the whole term's fee in their first cycle and get the unused days of a
//! partial last window refunded when the contract ends naturally.
//!
//! Worker side: daily rate × days worked plus overtime, less a one-off
//! service fee on the first cycle of a new placement.

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::models::{AttendanceRecord, BillingCycle, Contract, FeeCategory, LedgerSide};

use super::cycle::{last_of_month, monthly_windows};
use super::fee::{BreakdownBuilder, FeeBreakdown, FeeInput};
use super::rounding::{daily_rate, percent, round_money};

pub(crate) fn calculate_nanny_fees(
    input: &FeeInput<'_>,
    contract: &Contract,
    attendance: &AttendanceRecord,
    auto_renew: bool,
) -> FeeBreakdown {
    let rates = &input.config.nanny;
    let cycle = input.cycle;
    let level = contract.level;
    let working_days = rates.working_days_per_month;
    let daily = daily_rate(level, working_days);
    let monthly_fee = level * rates.management_fee_rate;

    let window = nominal_window(contract, cycle, auto_renew);
    let full_window = window == Some(cycle);

    let mut builder = BreakdownBuilder::new(
        contract.variant_name(),
        cycle,
        serde_json::json!({
            "level": level.normalize().to_string(),
            "auto_renew": auto_renew,
            "cycle_days": cycle.days(),
            "days_worked": attendance.total_days_worked.normalize().to_string(),
            "overtime_days": attendance.overtime_days.normalize().to_string(),
            "management_fee_rate": rates.management_fee_rate.normalize().to_string(),
            "working_days_per_month": working_days,
            "has_predecessor": contract.previous_contract_id.is_some(),
        }),
    );
    builder.note(
        "daily_rate",
        format!("level({}) ÷ {} = {}", round_money(level), working_days, daily),
    );

    // Customer side
    if full_window {
        let base = round_money(level);
        builder.line(
            LedgerSide::Customer,
            FeeCategory::BaseFee,
            base,
            format!("level({}) = {}", base, base),
        );
    } else {
        let billable_days = cycle.days().min(i64::from(working_days));
        let base = round_money(daily * Decimal::from(billable_days));
        builder.line(
            LedgerSide::Customer,
            FeeCategory::BaseFee,
            base,
            format!(
                "daily_rate({}) × min(cycle_days({}), {}) = {}",
                daily,
                cycle.days(),
                working_days,
                base
            ),
        );
    }

    let overtime = round_money(daily * attendance.overtime_days);
    builder.line(
        LedgerSide::Customer,
        FeeCategory::Overtime,
        overtime,
        format!(
            "daily_rate({}) × overtime_days({}) = {}",
            daily,
            attendance.overtime_days.normalize(),
            overtime
        ),
    );

    if auto_renew {
        let fee = round_money(monthly_fee);
        builder.line(
            LedgerSide::Customer,
            FeeCategory::ManagementFee,
            fee,
            format!(
                "{} × level({}) = {}",
                percent(rates.management_fee_rate),
                round_money(level),
                fee
            ),
        );
    } else {
        fixed_term_management_fee(&mut builder, contract, cycle, monthly_fee, rates.management_fee_rate);
    }

    // Worker side
    let base_payout = round_money(daily * attendance.total_days_worked);
    builder.line(
        LedgerSide::Employee,
        FeeCategory::BasePayout,
        base_payout,
        format!(
            "daily_rate({}) × days_worked({}) = {}",
            daily,
            attendance.total_days_worked.normalize(),
            base_payout
        ),
    );
    builder.line(
        LedgerSide::Employee,
        FeeCategory::WorkerOvertime,
        overtime,
        format!(
            "daily_rate({}) × overtime_days({}) = {}",
            daily,
            attendance.overtime_days.normalize(),
            overtime
        ),
    );

    let first_cycle = cycle.start_date == contract.start_date;
    if first_cycle && contract.previous_contract_id.is_none() {
        let service_fee = round_money(level * rates.first_cycle_service_fee_rate);
        let payout = (base_payout + overtime).max(Decimal::ZERO);
        let deduction = service_fee.min(payout);
        builder.line(
            LedgerSide::Employee,
            FeeCategory::FirstCycleDeduction,
            -deduction,
            format!(
                "min({} × level({}) = {}, payout({})) = {}",
                percent(rates.first_cycle_service_fee_rate),
                round_money(level),
                service_fee,
                round_money(payout),
                deduction
            ),
        );
    }

    builder.finish(&input.adjustments)
}

/// The full one-month window the cycle was cut from.
fn nominal_window(contract: &Contract, cycle: BillingCycle, auto_renew: bool) -> Option<BillingCycle> {
    if auto_renew {
        let first = cycle.start_date.with_day(1)?;
        return Some(BillingCycle::new(first, last_of_month(first)?));
    }
    monthly_windows(contract.start_date, cycle.start_date)
        .into_iter()
        .find(|w| w.contains_date(cycle.start_date))
}

fn fixed_term_management_fee(
    builder: &mut BreakdownBuilder,
    contract: &Contract,
    cycle: BillingCycle,
    monthly_fee: Decimal,
    rate: Decimal,
) {
    let windows = monthly_windows(contract.start_date, contract.end_date);
    let months = windows.len();

    if cycle.start_date == contract.start_date {
        let fee = round_money(monthly_fee * Decimal::from(months));
        builder.line(
            LedgerSide::Customer,
            FeeCategory::ManagementFee,
            fee,
            format!(
                "{} × level({}) × months({}) = {}",
                percent(rate),
                round_money(contract.level),
                months,
                fee
            ),
        );
    } else {
        builder.line(
            LedgerSide::Customer,
            FeeCategory::ManagementFee,
            Decimal::ZERO,
            "charged in first cycle = 0.00",
        );
    }

    if contract.is_terminated() || cycle.end_date != contract.end_date {
        return;
    }
    let Some(last) = windows.last() else {
        return;
    };
    if last.end_date <= contract.end_date {
        return;
    }
    let unused_days = (last.end_date - contract.end_date).num_days();
    let refund = round_money(monthly_fee * Decimal::from(unused_days) / Decimal::from(last.days()));
    builder.line(
        LedgerSide::Customer,
        FeeCategory::ManagementFeeRefund,
        -refund,
        format!(
            "monthly_fee({}) × unused_days({}) ÷ window_days({}) = {}",
            round_money(monthly_fee),
            unused_days,
            last.days(),
            refund
        ),
    );
}
