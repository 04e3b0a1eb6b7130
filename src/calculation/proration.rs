//! Management-fee refunds on early termination.
//!
//! Nanny management fees are charged per one-month window. When a contract
//! ends early, the unused part of every window is refunded at
//! `monthly fee × unused days / window days`, using the window's own calendar
//! length as the day count.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::models::{BillingCycle, Contract, ContractKind};

use super::cycle::{last_of_month, monthly_windows};
use super::rounding::round_money;

/// A computed management-fee refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagementFeeRefund {
    /// Refund amount, positive, quantized to 2 decimal places.
    pub amount: Decimal,
    /// Total unused days across all windows.
    pub unused_days: i64,
    /// Formula with the actual numbers used.
    pub formula: String,
}

/// The first day the customer is no longer charged for.
///
/// When the termination day itself is chargeable, refunding starts the day
/// after.
pub fn first_unused_day(termination_date: NaiveDate, charge_termination_day: bool) -> NaiveDate {
    if charge_termination_day {
        termination_date.succ_opt().unwrap_or(termination_date)
    } else {
        termination_date
    }
}

/// Refund for an auto-renewing contract: the unused rest of the termination
/// month.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::auto_renew_refund;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// // Terminated on 2025-11-20, day charged: 10 unused days of 30.
/// let refund = auto_renew_refund(
///     Decimal::from(600),
///     NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
///     true,
/// );
/// assert_eq!(refund.amount.to_string(), "200.00");
/// assert_eq!(refund.unused_days, 10);
/// ```
pub fn auto_renew_refund(
    monthly_fee: Decimal,
    termination_date: NaiveDate,
    charge_termination_day: bool,
) -> ManagementFeeRefund {
    let first_unused = first_unused_day(termination_date, charge_termination_day);
    let month_start = termination_date.with_day(1).unwrap_or(termination_date);
    let month_end = last_of_month(termination_date).unwrap_or(termination_date);
    let month = BillingCycle::new(month_start, month_end);

    let unused_days = unused_in(&month, first_unused);
    let amount = round_money(
        monthly_fee * Decimal::from(unused_days) / Decimal::from(month.days()),
    );
    ManagementFeeRefund {
        amount,
        unused_days,
        formula: format!(
            "monthly_fee({}) × unused_days({}) ÷ days_in_month({}) = {}",
            round_money(monthly_fee),
            unused_days,
            month.days(),
            amount
        ),
    }
}

/// Refund for a fixed-term contract across every one-month window of its
/// nominal term.
///
/// Windows entirely after the first unused day refund a whole monthly fee.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::fixed_term_refund;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// // Term Oct 1 – Dec 31, terminated Nov 15 (not charged):
/// // 16/30 of November plus all of December.
/// let refund = fixed_term_refund(
///     Decimal::from(600),
///     NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
///     false,
/// );
/// assert_eq!(refund.amount.to_string(), "920.00");
/// ```
pub fn fixed_term_refund(
    monthly_fee: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    termination_date: NaiveDate,
    charge_termination_day: bool,
) -> ManagementFeeRefund {
    let first_unused = first_unused_day(termination_date, charge_termination_day);

    let mut total = Decimal::ZERO;
    let mut unused_total = 0;
    let mut parts = Vec::new();
    for window in monthly_windows(start_date, end_date) {
        let unused = unused_in(&window, first_unused);
        if unused == 0 {
            continue;
        }
        unused_total += unused;
        total += monthly_fee * Decimal::from(unused) / Decimal::from(window.days());
        parts.push(format!("{}/{}", unused, window.days()));
    }

    let amount = round_money(total);
    let formula = if parts.is_empty() {
        format!("no unused days = {}", amount)
    } else {
        format!(
            "monthly_fee({}) × ({}) = {}",
            round_money(monthly_fee),
            parts.join(" + "),
            amount
        )
    };
    ManagementFeeRefund {
        amount,
        unused_days: unused_total,
        formula,
    }
}

/// The management-fee refund owed when `contract` terminates early.
///
/// Returns `None` for contract variants that do not prepay a management fee.
pub fn management_fee_refund(
    contract: &Contract,
    termination_date: NaiveDate,
    charge_termination_day: bool,
    config: &EngineConfig,
) -> Option<ManagementFeeRefund> {
    let ContractKind::Nanny { auto_renew } = &contract.kind else {
        return None;
    };
    let monthly_fee = contract.level * config.nanny.management_fee_rate;
    let refund = if *auto_renew {
        auto_renew_refund(monthly_fee, termination_date, charge_termination_day)
    } else {
        fixed_term_refund(
            monthly_fee,
            contract.start_date,
            contract.end_date,
            termination_date,
            charge_termination_day,
        )
    };
    Some(refund)
}

fn unused_in(window: &BillingCycle, first_unused: NaiveDate) -> i64 {
    if first_unused > window.end_date {
        return 0;
    }
    (window.end_date - first_unused.max(window.start_date)).num_days() + 1
}
