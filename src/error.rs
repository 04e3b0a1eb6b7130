//! Error types for the placement billing engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while computing, merging or
//! settling bills and payrolls.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Broad classification of an [`EngineError`].
///
/// Callers (the trigger router, batch loops) use the kind to decide how an
/// error is surfaced: validation errors are the caller's fault, not-found
/// errors map to 404, consistency errors mean the operation was refused
/// without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input failed validation.
    Validation,
    /// A referenced record does not exist.
    NotFound,
    /// The operation would break a ledger invariant.
    Consistency,
    /// Engine configuration could not be loaded.
    Config,
    /// Internal calculation or storage failure.
    Internal,
}

/// The main error type for the billing engine.
///
/// # Example
///
/// ```
/// use placement_billing::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A field on an input record was invalid.
    #[error("Invalid field '{field}': {message}")]
    Validation {
        /// The field that was invalid.
        field: String,
        /// A description of what made the field invalid.
        message: String,
    },

    /// The contract has no worker assigned, so nothing can be billed.
    #[error("Contract {contract_id} has no employee assigned")]
    MissingEmployee {
        /// The contract missing its worker.
        contract_id: Uuid,
    },

    /// A maternity-nurse contract has no actual onboarding date yet.
    #[error("Contract {contract_id} has no actual onboarding date")]
    MissingOnboardingDate {
        /// The contract awaiting onboarding.
        contract_id: Uuid,
    },

    /// A date range ends before it starts.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// The start of the range.
        start: NaiveDate,
        /// The end of the range.
        end: NaiveDate,
    },

    /// Contract was not found.
    #[error("Contract not found: {id}")]
    ContractNotFound {
        /// The missing contract id.
        id: Uuid,
    },

    /// Customer bill was not found.
    #[error("Customer bill not found: {id}")]
    BillNotFound {
        /// The missing bill id.
        id: Uuid,
    },

    /// Employee payroll was not found.
    #[error("Employee payroll not found: {id}")]
    PayrollNotFound {
        /// The missing payroll id.
        id: Uuid,
    },

    /// Financial adjustment was not found.
    #[error("Financial adjustment not found: {id}")]
    AdjustmentNotFound {
        /// The missing adjustment id.
        id: Uuid,
    },

    /// Substitute record was not found.
    #[error("Substitute record not found: {id}")]
    SubstituteNotFound {
        /// The missing substitute record id.
        id: Uuid,
    },

    /// A successor contract has no bill to receive transferred balances.
    #[error("No bill found for successor contract {contract_id}")]
    SuccessorBillNotFound {
        /// The successor contract.
        contract_id: Uuid,
    },

    /// The bill has already been merged into a successor.
    #[error("Bill {bill_id} has already been merged")]
    AlreadyMerged {
        /// The merged bill.
        bill_id: Uuid,
    },

    /// A bill or payroll already exists for the cycle.
    #[error("Duplicate {record} for contract {contract_id} cycle starting {cycle_start}")]
    DuplicateCycle {
        /// Which record type collided ("bill" or "payroll").
        record: String,
        /// The contract.
        contract_id: Uuid,
        /// The cycle start date.
        cycle_start: NaiveDate,
    },

    /// The operation would leave the ledger in an inconsistent state.
    #[error("Consistency error: {message}")]
    Consistency {
        /// A description of the violated invariant.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },

    /// The backing store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// A description of the storage failure.
        message: String,
    },
}

impl EngineError {
    /// Returns the broad kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ErrorKind::Config
            }
            EngineError::Validation { .. }
            | EngineError::MissingEmployee { .. }
            | EngineError::MissingOnboardingDate { .. }
            | EngineError::InvalidDateRange { .. } => ErrorKind::Validation,
            EngineError::ContractNotFound { .. }
            | EngineError::BillNotFound { .. }
            | EngineError::PayrollNotFound { .. }
            | EngineError::AdjustmentNotFound { .. }
            | EngineError::SubstituteNotFound { .. }
            | EngineError::SuccessorBillNotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyMerged { .. }
            | EngineError::DuplicateCycle { .. }
            | EngineError::Consistency { .. } => ErrorKind::Consistency,
            EngineError::CalculationError { .. } | EngineError::Storage { .. } => {
                ErrorKind::Internal
            }
        }
    }

    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
