//! Core data models for the placement billing engine.
//!
//! This module contains all the domain records the engine reads and writes.

mod adjustment;
mod attendance;
mod bill;
mod billing_cycle;
mod calculation_details;
mod contract;
mod settlement;
mod substitute;

pub use adjustment::{
    AdjustmentEffect, AdjustmentOrigin, AdjustmentStatus, AdjustmentTarget, AdjustmentType,
    FinancialAdjustment,
};
pub use attendance::AttendanceRecord;
pub use bill::{CustomerBill, EmployeePayroll, PaymentStatus, PayoutStatus};
pub use billing_cycle::BillingCycle;
pub use calculation_details::{
    CalculationDetails, CalculationLog, FeeCategory, FeeLine, LedgerSide, LogEntry,
};
pub use contract::{Contract, ContractKind, ContractStatus};
pub use settlement::{ActivityLog, PaymentRecord, PayoutRecord};
pub use substitute::SubstituteRecord;
