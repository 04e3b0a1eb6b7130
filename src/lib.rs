//! Billing and payroll engine for domestic-staffing placements
//!
//! This crate resolves billing cycles for nanny, maternity-nurse, trial and
//! external-substitution contracts, computes each cycle's customer bill and
//! employee payroll from the contract's level, attendance and financial
//! adjustments, and keeps the two ledgers consistent through forced
//! recalculation, bill merges, early termination and substitute coverage.

#![warn(missing_docs)]

pub mod api;
pub mod billing;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
