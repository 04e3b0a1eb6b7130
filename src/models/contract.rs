//! Contract model and related types.
//!
//! A [`Contract`] is a placement agreement between a customer and a worker.
//! The fields shared by every placement live on the struct; the fields that
//! only one variant carries live on [`ContractKind`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Signed but not yet started.
    Pending,
    /// In service.
    Active,
    /// Ended before its nominal term.
    Terminated,
    /// Ran to its nominal end.
    Finished,
    /// Trial placement in progress.
    TrialActive,
    /// Trial placement converted into a regular contract.
    TrialSucceeded,
}

/// Variant-specific contract data.
///
/// # Example
///
/// ```
/// use placement_billing::models::ContractKind;
///
/// let kind: ContractKind = serde_json::from_str(r#"{"type":"nanny","auto_renew":true}"#).unwrap();
/// assert_eq!(kind, ContractKind::Nanny { auto_renew: true });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContractKind {
    /// Live-in or day nanny, billed monthly.
    Nanny {
        /// Auto-renewing contracts bill calendar months with no fixed end.
        auto_renew: bool,
    },
    /// Maternity nurse, billed in 26-day cycles from actual onboarding.
    MaternityNurse {
        /// The day the nurse actually started. Cycles are deferred until set.
        actual_onboarding_date: Option<NaiveDate>,
        /// The planned last day.
        expected_offboarding_date: Option<NaiveDate>,
        /// The real last day, once known.
        actual_offboarding_date: Option<NaiveDate>,
    },
    /// Short trial placement.
    Trial {
        /// Overrides the level-derived daily rate when set.
        #[serde(default)]
        trial_daily_rate: Option<Decimal>,
    },
    /// Placement covering for a worker from outside the agency.
    ExternalSubstitution {
        /// Flat per-cycle management fee replacing the rate-based one.
        #[serde(default)]
        management_fee_amount: Option<Decimal>,
    },
}

/// A placement agreement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// Unique identifier.
    pub id: Uuid,
    /// The paying customer.
    pub customer_id: Uuid,
    /// The placed worker, once assigned.
    pub employee_id: Option<Uuid>,
    /// Contracted monthly base rate.
    pub level: Decimal,
    /// First day of service.
    pub start_date: NaiveDate,
    /// Nominal last day of service.
    pub end_date: NaiveDate,
    /// Lifecycle status.
    pub status: ContractStatus,
    /// Agency commission rate (e.g. 0.15).
    pub management_fee_rate: Decimal,
    /// Deposit collected from the customer.
    #[serde(default)]
    pub deposit_amount: Decimal,
    /// Security deposit collected from the customer.
    #[serde(default)]
    pub security_deposit_amount: Decimal,
    /// Early termination date, if terminated.
    #[serde(default)]
    pub termination_date: Option<NaiveDate>,
    /// The contract this one continues.
    #[serde(default)]
    pub previous_contract_id: Option<Uuid>,
    /// The contract that continues this one.
    #[serde(default)]
    pub next_contract_id: Option<Uuid>,
    /// Variant-specific data.
    pub kind: ContractKind,
}

impl Contract {
    /// Short name of the contract variant, used in calculation logs.
    pub fn variant_name(&self) -> &'static str {
        match self.kind {
            ContractKind::Nanny { .. } => "nanny",
            ContractKind::MaternityNurse { .. } => "maternity_nurse",
            ContractKind::Trial { .. } => "trial",
            ContractKind::ExternalSubstitution { .. } => "external_substitution",
        }
    }

    /// Returns true for auto-renewing nanny contracts.
    pub fn is_auto_renew(&self) -> bool {
        matches!(self.kind, ContractKind::Nanny { auto_renew: true })
    }

    /// Returns true if the contract has been terminated early.
    pub fn is_terminated(&self) -> bool {
        self.status == ContractStatus::Terminated || self.termination_date.is_some()
    }

    /// Returns true if the contract should be billed at all.
    pub fn is_billable(&self) -> bool {
        self.status != ContractStatus::Pending
    }

    /// The last day the contract is in force.
    ///
    /// Early termination wins over every other bound. An auto-renewing nanny
    /// contract that has not been terminated has no effective end. Maternity
    /// nurse contracts end on their offboarding date when one is known.
    ///
    /// # Example
    ///
    /// ```
    /// use placement_billing::models::{Contract, ContractKind, ContractStatus};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    /// use uuid::Uuid;
    ///
    /// let mut contract = Contract {
    ///     id: Uuid::new_v4(),
    ///     customer_id: Uuid::new_v4(),
    ///     employee_id: Some(Uuid::new_v4()),
    ///     level: Decimal::from(6000),
    ///     start_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
    ///     end_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
    ///     status: ContractStatus::Active,
    ///     management_fee_rate: Decimal::new(10, 2),
    ///     deposit_amount: Decimal::ZERO,
    ///     security_deposit_amount: Decimal::ZERO,
    ///     termination_date: None,
    ///     previous_contract_id: None,
    ///     next_contract_id: None,
    ///     kind: ContractKind::Nanny { auto_renew: true },
    /// };
    /// assert_eq!(contract.effective_end(), None);
    ///
    /// contract.termination_date = NaiveDate::from_ymd_opt(2025, 12, 15);
    /// assert_eq!(contract.effective_end(), NaiveDate::from_ymd_opt(2025, 12, 15));
    /// ```
    pub fn effective_end(&self) -> Option<NaiveDate> {
        let natural_end = match &self.kind {
            ContractKind::Nanny { auto_renew: true } => None,
            ContractKind::MaternityNurse {
                expected_offboarding_date,
                actual_offboarding_date,
                ..
            } => Some(
                actual_offboarding_date
                    .or(*expected_offboarding_date)
                    .unwrap_or(self.end_date),
            ),
            _ => Some(self.end_date),
        };

        match (self.termination_date, natural_end) {
            (Some(terminated), Some(end)) => Some(terminated.min(end)),
            (Some(terminated), None) => Some(terminated),
            (None, end) => end,
        }
    }

    /// The actual onboarding date for maternity-nurse contracts.
    pub fn onboarding_date(&self) -> Option<NaiveDate> {
        match &self.kind {
            ContractKind::MaternityNurse {
                actual_onboarding_date,
                ..
            } => *actual_onboarding_date,
            _ => Some(self.start_date),
        }
    }

    /// Checks the fields every billing pass depends on.
    pub fn validate_for_billing(&self) -> EngineResult<()> {
        if self.employee_id.is_none() {
            return Err(EngineError::MissingEmployee {
                contract_id: self.id,
            });
        }
        if self.start_date > self.end_date {
            return Err(EngineError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.level < Decimal::ZERO {
            return Err(EngineError::validation("level", "must not be negative"));
        }
        if self.management_fee_rate < Decimal::ZERO || self.management_fee_rate >= Decimal::ONE {
            return Err(EngineError::validation(
                "management_fee_rate",
                format!("{} is outside [0, 1)", self.management_fee_rate),
            ));
        }
        Ok(())
    }
}
