//! Request types for the billing trigger API.
//!
//! Contracts, attendance and substitute records are posted in their model
//! form. The job endpoints take the small bodies below; every one of them
//! accepts an optional `actor`, defaulting to `"system"`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::billing::TerminationRequest;
use crate::models::{
    AdjustmentStatus, AdjustmentTarget, AdjustmentType, FinancialAdjustment,
};

fn default_actor() -> String {
    "system".to_string()
}

/// Identifies who triggered a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Body of the month calculation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateMonthRequest {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1 to 12.
    pub month: u32,
    /// Recalculate cycles that already carry a calculation.
    #[serde(default)]
    pub force: bool,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Body of `POST /contracts/:id/cycles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateCyclesRequest {
    /// Last date to generate open-ended contracts up to.
    pub horizon: NaiveDate,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Body of `POST /bills/:id/merge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeRequest {
    /// The contract whose first cycle receives the balance.
    pub target_contract_id: uuid::Uuid,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Body of `POST /contracts/:id/terminate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateRequest {
    /// Termination parameters.
    #[serde(flatten)]
    pub termination: TerminationRequest,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

/// Body of `POST /adjustments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    /// The record adjusted.
    pub target: AdjustmentTarget,
    /// Purpose of the adjustment.
    pub adjustment_type: AdjustmentType,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// Initial status, pending when omitted.
    #[serde(default)]
    pub status: Option<AdjustmentStatus>,
    /// Settlement date as entered.
    #[serde(default)]
    pub settlement_date: Option<String>,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl AdjustmentRequest {
    /// Builds the adjustment this request describes.
    pub fn to_adjustment(&self) -> FinancialAdjustment {
        let mut adjustment = FinancialAdjustment::new(
            self.target,
            self.adjustment_type,
            self.amount,
            self.description.clone(),
            self.actor.clone(),
        );
        if let Some(status) = self.status {
            adjustment.status = status;
        }
        adjustment.settlement_date = self.settlement_date.clone();
        adjustment
    }
}

/// Body of `POST /adjustments/:id/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentStatusRequest {
    /// The new settlement status.
    pub status: AdjustmentStatus,
    /// Settlement date as entered; parsed leniently.
    #[serde(default)]
    pub settlement_date: Option<String>,
    /// The triggering user or service.
    #[serde(default = "default_actor")]
    pub actor: String,
}
