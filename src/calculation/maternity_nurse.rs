//! Maternity-nurse fee calculation.
//!
//! The customer pays labor at level / 26 per day worked, a management fee on
//! top of labor, and overtime at the same daily rate. Statutory holidays
//! worked count as extra overtime-equivalent days.
//!
//! The nurse is paid at level × (1 − management-fee rate) / 26 per day, with
//! holidays moved from base days into overtime, plus a tier bonus when the
//! contract's management-fee rate equals the configured bonus tier.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{AttendanceRecord, Contract, FeeCategory, LedgerSide};

use super::fee::{BreakdownBuilder, FeeBreakdown, FeeInput};
use super::rounding::{daily_rate, percent, round_money, round_rate};

pub(crate) fn calculate_maternity_nurse_fees(
    input: &FeeInput<'_>,
    contract: &Contract,
    attendance: &AttendanceRecord,
) -> EngineResult<FeeBreakdown> {
    let rates = &input.config.maternity_nurse;
    let level = contract.level;
    let rate = contract.management_fee_rate;
    let working_days = rates.working_days_per_cycle;
    let days_worked = attendance.total_days_worked;
    let holidays = attendance.statutory_holiday_days;

    if holidays > days_worked {
        return Err(EngineError::validation(
            "statutory_holiday_days",
            format!(
                "{} exceeds days worked ({})",
                holidays.normalize(),
                days_worked.normalize()
            ),
        ));
    }

    let daily = daily_rate(level, working_days);
    let overtime_equivalent =
        attendance.overtime_days + holidays * rates.holiday_overtime_multiplier;

    let mut builder = BreakdownBuilder::new(
        contract.variant_name(),
        input.cycle,
        serde_json::json!({
            "level": level.normalize().to_string(),
            "management_fee_rate": rate.normalize().to_string(),
            "cycle_days": input.cycle.days(),
            "days_worked": days_worked.normalize().to_string(),
            "overtime_days": attendance.overtime_days.normalize().to_string(),
            "statutory_holiday_days": holidays.normalize().to_string(),
            "working_days_per_cycle": working_days,
            "bonus_tier_rate": rates.bonus_tier_rate.normalize().to_string(),
        }),
    );
    builder.note(
        "daily_rate",
        format!("level({}) ÷ {} = {}", round_money(level), working_days, daily),
    );
    builder.note(
        "overtime_equivalent_days",
        format!(
            "overtime_days({}) + {} × holiday_days({}) = {}",
            attendance.overtime_days.normalize(),
            rates.holiday_overtime_multiplier.normalize(),
            holidays.normalize(),
            overtime_equivalent.normalize()
        ),
    );

    let labor = round_money(daily * days_worked);
    builder.line(
        LedgerSide::Customer,
        FeeCategory::LaborFee,
        labor,
        format!(
            "daily_rate({}) × days_worked({}) = {}",
            daily,
            days_worked.normalize(),
            labor
        ),
    );

    let overtime = round_money(daily * overtime_equivalent);
    builder.line(
        LedgerSide::Customer,
        FeeCategory::Overtime,
        overtime,
        format!(
            "daily_rate({}) × overtime_equivalent_days({}) = {}",
            daily,
            overtime_equivalent.normalize(),
            overtime
        ),
    );

    let management_fee = round_money(labor * rate);
    builder.line(
        LedgerSide::Customer,
        FeeCategory::ManagementFee,
        management_fee,
        format!("labor_fee({}) × {} = {}", labor, percent(rate), management_fee),
    );

    let worker_daily = round_rate(level * (Decimal::ONE - rate) / Decimal::from(working_days));
    builder.note(
        "worker_daily_rate",
        format!(
            "level({}) × (1 − {}) ÷ {} = {}",
            round_money(level),
            percent(rate),
            working_days,
            worker_daily
        ),
    );

    let base_days = days_worked - holidays;
    let base_payout = round_money(worker_daily * base_days);
    builder.line(
        LedgerSide::Employee,
        FeeCategory::BasePayout,
        base_payout,
        format!(
            "worker_daily_rate({}) × (days_worked({}) − holiday_days({})) = {}",
            worker_daily,
            days_worked.normalize(),
            holidays.normalize(),
            base_payout
        ),
    );

    let worker_overtime = round_money(worker_daily * overtime_equivalent);
    builder.line(
        LedgerSide::Employee,
        FeeCategory::WorkerOvertime,
        worker_overtime,
        format!(
            "worker_daily_rate({}) × overtime_equivalent_days({}) = {}",
            worker_daily,
            overtime_equivalent.normalize(),
            worker_overtime
        ),
    );

    if rate == rates.bonus_tier_rate {
        let bonus = round_money(level * rates.bonus_rate);
        builder.line(
            LedgerSide::Employee,
            FeeCategory::Bonus,
            bonus,
            format!(
                "{} × level({}) = {}",
                percent(rates.bonus_rate),
                round_money(level),
                bonus
            ),
        );
    } else {
        builder.line(
            LedgerSide::Employee,
            FeeCategory::Bonus,
            Decimal::ZERO,
            format!(
                "rate {} is not the bonus tier {} = 0.00",
                percent(rate),
                percent(rates.bonus_tier_rate)
            ),
        );
    }

    Ok(builder.finish(&input.adjustments))
}
