//! Single-rate fee calculation for trial and external-substitution
//! placements.
//!
//! One daily rate covers labor and overtime alike. There are no overtime
//! tiers, no bonus and no first-cycle deduction.

use rust_decimal::Decimal;

use crate::models::{AttendanceRecord, Contract, FeeCategory, LedgerSide};

use super::fee::{BreakdownBuilder, FeeBreakdown, FeeInput};
use super::rounding::{daily_rate, percent, round_money, round_rate};

pub(crate) fn calculate_simple_rate_fees(
    input: &FeeInput<'_>,
    contract: &Contract,
    attendance: &AttendanceRecord,
    rate_override: Option<Decimal>,
    flat_management_fee: Option<Decimal>,
) -> FeeBreakdown {
    let working_days = input.config.nanny.working_days_per_month;
    let rate = match rate_override {
        Some(rate) => round_rate(rate),
        None => daily_rate(contract.level, working_days),
    };

    let mut builder = BreakdownBuilder::new(
        contract.variant_name(),
        input.cycle,
        serde_json::json!({
            "level": contract.level.normalize().to_string(),
            "daily_rate_override": rate_override.map(|r| r.normalize().to_string()),
            "management_fee_rate": contract.management_fee_rate.normalize().to_string(),
            "management_fee_amount": flat_management_fee.map(|f| f.normalize().to_string()),
            "cycle_days": input.cycle.days(),
            "days_worked": attendance.total_days_worked.normalize().to_string(),
            "overtime_days": attendance.overtime_days.normalize().to_string(),
        }),
    );
    match rate_override {
        Some(_) => builder.note("daily_rate", format!("trial daily rate = {}", rate)),
        None => builder.note(
            "daily_rate",
            format!(
                "level({}) ÷ {} = {}",
                round_money(contract.level),
                working_days,
                rate
            ),
        ),
    }

    let labor = round_money(rate * attendance.total_days_worked);
    let labor_formula = format!(
        "daily_rate({}) × days_worked({}) = {}",
        rate,
        attendance.total_days_worked.normalize(),
        labor
    );
    let overtime = round_money(rate * attendance.overtime_days);
    let overtime_formula = format!(
        "daily_rate({}) × overtime_days({}) = {}",
        rate,
        attendance.overtime_days.normalize(),
        overtime
    );

    builder.line(
        LedgerSide::Customer,
        FeeCategory::LaborFee,
        labor,
        labor_formula.clone(),
    );
    builder.line(
        LedgerSide::Customer,
        FeeCategory::Overtime,
        overtime,
        overtime_formula.clone(),
    );

    match flat_management_fee {
        Some(amount) => {
            let fee = round_money(amount);
            builder.line(
                LedgerSide::Customer,
                FeeCategory::ManagementFee,
                fee,
                format!("flat management fee = {}", fee),
            );
        }
        None => {
            let fee = round_money(labor * contract.management_fee_rate);
            builder.line(
                LedgerSide::Customer,
                FeeCategory::ManagementFee,
                fee,
                format!(
                    "labor_fee({}) × {} = {}",
                    labor,
                    percent(contract.management_fee_rate),
                    fee
                ),
            );
        }
    }

    builder.line(
        LedgerSide::Employee,
        FeeCategory::BasePayout,
        labor,
        labor_formula,
    );
    builder.line(
        LedgerSide::Employee,
        FeeCategory::WorkerOvertime,
        overtime,
        overtime_formula,
    );

    builder.finish(&input.adjustments)
}
