//! Pure calculation logic for the billing engine.
//!
//! This module contains everything that can be computed without touching a
//! store: billing cycle resolution for each contract variant, the fee
//! calculators for customer bills and worker payrolls, substitute fees,
//! termination refunds, and the rounding policy they all share.

mod cycle;
mod fee;
mod maternity_nurse;
mod nanny;
mod proration;
mod rounding;
mod simple_rate;
mod substitute_fee;

pub use cycle::{all_cycles, cycles_in_month, month_bounds, monthly_windows, resolve_cycle};
pub use fee::{AdjustmentTotals, FeeBreakdown, FeeInput, FeeSubject, calculate_fees};
pub use proration::{
    ManagementFeeRefund, auto_renew_refund, first_unused_day, fixed_term_refund,
    management_fee_refund,
};
pub use rounding::{MONEY_DP, RATE_DP, daily_rate, percent, round_money, round_rate};
pub use substitute_fee::{substitute_fee_days, substitute_management_fee};
