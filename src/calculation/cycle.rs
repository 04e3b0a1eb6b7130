//! Billing cycle resolution.
//!
//! This module maps a contract and a calendar month to the billing cycles
//! that settle in that month:
//!
//! | Variant | Cycle shape | Settles in |
//! |---------|-------------|------------|
//! | Nanny, auto-renewing | calendar month ∩ active range | that month |
//! | Nanny, fixed-term | one-month windows anchored on the start date | month the window starts |
//! | Maternity nurse | 26-day windows from actual onboarding | month of the cycle end |
//! | Trial | whole trial range | month of the trial end |
//! | External substitution | calendar month ∩ contract range | that month |
//!
//! Every cycle is clamped to the contract's effective end.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{BillingCycle, Contract, ContractKind};

/// Returns the earliest cycle of `contract` settling in the given month.
///
/// Returns `Ok(None)` when the contract has no cycle in that month, including
/// a maternity-nurse contract that has not been onboarded yet.
///
/// # Errors
///
/// Returns a validation error if `month` is not between 1 and 12.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::resolve_cycle;
/// use placement_billing::config::EngineConfig;
/// use placement_billing::models::{Contract, ContractKind, ContractStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use uuid::Uuid;
///
/// let contract = Contract {
///     id: Uuid::new_v4(),
///     customer_id: Uuid::new_v4(),
///     employee_id: Some(Uuid::new_v4()),
///     level: Decimal::from(6000),
///     start_date: NaiveDate::from_ymd_opt(2025, 10, 15).unwrap(),
///     end_date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
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
/// let cycle = resolve_cycle(&contract, 2025, 11, &EngineConfig::default())
///     .unwrap()
///     .unwrap();
/// assert_eq!(cycle.start_date, NaiveDate::from_ymd_opt(2025, 11, 15).unwrap());
/// assert_eq!(cycle.end_date, NaiveDate::from_ymd_opt(2025, 12, 14).unwrap());
/// ```
pub fn resolve_cycle(
    contract: &Contract,
    year: i32,
    month: u32,
    config: &EngineConfig,
) -> EngineResult<Option<BillingCycle>> {
    Ok(cycles_in_month(contract, year, month, config)?
        .into_iter()
        .next())
}

/// Returns every cycle of `contract` settling in the given month, earliest
/// first.
///
/// A 31-day month can hold the ends of two 26-day maternity-nurse cycles.
pub fn cycles_in_month(
    contract: &Contract,
    year: i32,
    month: u32,
    config: &EngineConfig,
) -> EngineResult<Vec<BillingCycle>> {
    let (first, last) = month_bounds(year, month)?;

    let cycles = match &contract.kind {
        ContractKind::Nanny { auto_renew: true } | ContractKind::ExternalSubstitution { .. } => {
            calendar_cycle(contract, first, last).into_iter().collect()
        }
        ContractKind::Nanny { auto_renew: false } => {
            anchored_cycle(contract, first).into_iter().collect()
        }
        ContractKind::MaternityNurse { .. } => nurse_cycles(contract, config, last)
            .into_iter()
            .filter(|c| c.settles_in(year, month))
            .collect(),
        ContractKind::Trial { .. } => trial_cycle(contract)
            .filter(|c| c.settles_in(year, month))
            .into_iter()
            .collect(),
    };
    Ok(cycles)
}

/// Enumerates every cycle of `contract` in order.
///
/// Contracts with no effective end (an auto-renewing nanny contract that has
/// not been terminated) are enumerated up to and including the cycle
/// containing `horizon`.
pub fn all_cycles(contract: &Contract, horizon: NaiveDate, config: &EngineConfig) -> Vec<BillingCycle> {
    let limit = contract.effective_end().unwrap_or(horizon);

    match &contract.kind {
        ContractKind::Nanny { auto_renew: true } | ContractKind::ExternalSubstitution { .. } => {
            let mut cycles = Vec::new();
            let mut first = first_of_month(contract.start_date);
            while first <= limit {
                let Some(last) = last_of_month(first) else {
                    break;
                };
                cycles.extend(calendar_cycle(contract, first, last));
                let Some(next) = first.checked_add_months(Months::new(1)) else {
                    break;
                };
                first = next;
            }
            cycles
        }
        ContractKind::Nanny { auto_renew: false } => {
            let mut cycles = Vec::new();
            let mut k = 0;
            while let Some(window) = monthly_window(contract.start_date, k) {
                if window.start_date > limit {
                    break;
                }
                cycles.extend(clamp_to_end(contract, window));
                k += 1;
            }
            cycles
        }
        ContractKind::MaternityNurse { .. } => nurse_cycles(contract, config, limit),
        ContractKind::Trial { .. } => trial_cycle(contract).into_iter().collect(),
    }
}

/// The one-month windows anchored on `anchor` whose start is on or before
/// `through`, unclamped.
///
/// Window `k` runs from `anchor + k months` to the day before
/// `anchor + (k + 1) months`, so windows never drift when the anchor falls on
/// the 29th to 31st.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::monthly_windows;
/// use chrono::NaiveDate;
///
/// let windows = monthly_windows(
///     NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
/// );
/// assert_eq!(windows.len(), 3);
/// assert_eq!(windows[1].start_date, NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
/// assert_eq!(windows[2].start_date, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
/// ```
pub fn monthly_windows(anchor: NaiveDate, through: NaiveDate) -> Vec<BillingCycle> {
    let mut windows = Vec::new();
    let mut k = 0;
    while let Some(window) = monthly_window(anchor, k) {
        if window.start_date > through {
            break;
        }
        windows.push(window);
        k += 1;
    }
    windows
}

/// First and last day of a calendar month.
///
/// # Errors
///
/// Returns a validation error if `month` is not between 1 and 12.
pub fn month_bounds(year: i32, month: u32) -> EngineResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(EngineError::validation(
            "month",
            format!("{} must be between 1 and 12", month),
        ));
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| EngineError::validation("year", format!("{} is out of range", year)))?;
    let last = last_of_month(first)
        .ok_or_else(|| EngineError::validation("year", format!("{} is out of range", year)))?;
    Ok((first, last))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub(crate) fn last_of_month(date: NaiveDate) -> Option<NaiveDate> {
    first_of_month(date)
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

fn monthly_window(anchor: NaiveDate, k: u32) -> Option<BillingCycle> {
    let start = anchor.checked_add_months(Months::new(k))?;
    let end = anchor.checked_add_months(Months::new(k + 1))?.pred_opt()?;
    Some(BillingCycle::new(start, end))
}

fn clamp_to_end(contract: &Contract, window: BillingCycle) -> Option<BillingCycle> {
    let end = match contract.effective_end() {
        Some(effective_end) => window.end_date.min(effective_end),
        None => window.end_date,
    };
    (window.start_date <= end).then(|| BillingCycle::new(window.start_date, end))
}

fn calendar_cycle(contract: &Contract, first: NaiveDate, last: NaiveDate) -> Option<BillingCycle> {
    let start = first.max(contract.start_date);
    clamp_to_end(contract, BillingCycle::new(start, last))
}

fn anchored_cycle(contract: &Contract, first_of_target: NaiveDate) -> Option<BillingCycle> {
    let anchor = contract.start_date;
    let offset = (first_of_target.year() - anchor.year()) * 12 + first_of_target.month() as i32
        - anchor.month() as i32;
    let k = u32::try_from(offset).ok()?;
    clamp_to_end(contract, monthly_window(anchor, k)?)
}

fn nurse_cycles(contract: &Contract, config: &EngineConfig, limit: NaiveDate) -> Vec<BillingCycle> {
    let Some(onboarding) = contract.onboarding_date() else {
        return Vec::new();
    };
    let end = contract.effective_end().unwrap_or(limit);
    let length = u64::from(config.maternity_nurse.cycle_length_days.max(1));

    let mut cycles = Vec::new();
    let mut start = onboarding;
    while start <= end && start <= limit {
        let Some(nominal_end) = start.checked_add_days(Days::new(length - 1)) else {
            break;
        };
        cycles.push(BillingCycle::new(start, nominal_end.min(end)));
        let Some(next) = nominal_end.succ_opt() else {
            break;
        };
        start = next;
    }
    cycles
}

fn trial_cycle(contract: &Contract) -> Option<BillingCycle> {
    clamp_to_end(contract, BillingCycle::new(contract.start_date, contract.end_date))
}
