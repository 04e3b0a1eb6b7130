//! Stateful billing jobs.
//!
//! Everything here reads and writes through a [`BillingStore`]: attendance
//! lookup, adjustment netting and settlement, the bill/payroll write path,
//! substitute billing, bill merges and early termination. [`BillingEngine`]
//! wraps them in store transactions.
//!
//! [`BillingStore`]: crate::store::BillingStore

mod adjustments;
mod attendance;
mod engine;
mod ledger;
mod merge;
mod substitute;
mod termination;

pub use adjustments::{
    add_adjustment, delete_adjustment, net_adjustments, parse_settlement_date,
    refresh_bill_settlement, refresh_payroll_settlement, set_adjustment_status,
};
pub use attendance::{default_working_days, get_or_create_attendance};
pub use engine::{BatchFailure, BatchReport, BillingEngine};
pub use ledger::{CycleWrite, SkipReason, WriteOutcome};
pub use merge::{BalanceTransfer, MergeReport};
pub use termination::{RefundTransfer, TerminationReport, TerminationRequest};
