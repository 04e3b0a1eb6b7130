//! Configuration types for the billing engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from `engine.yaml`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Metadata identifying a rate schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    /// Human-readable schedule name.
    pub name: String,
    /// Version or effective date of the schedule.
    pub version: String,
}

/// Rates for nanny placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NannyRates {
    /// Divisor turning the monthly level into a daily rate.
    pub working_days_per_month: u32,
    /// Management fee as a share of level, per month.
    pub management_fee_rate: Decimal,
    /// Share of level withheld from the worker's first cycle.
    pub first_cycle_service_fee_rate: Decimal,
}

/// Rates for maternity-nurse placements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaternityNurseRates {
    /// Length of one billing cycle in days.
    pub cycle_length_days: u32,
    /// Divisor turning the level into a daily rate.
    pub working_days_per_cycle: u32,
    /// Management-fee rate that earns the worker a bonus.
    pub bonus_tier_rate: Decimal,
    /// Bonus as a share of level.
    pub bonus_rate: Decimal,
    /// Extra overtime-equivalent days per statutory holiday worked.
    pub holiday_overtime_multiplier: Decimal,
}

/// Rates for substitute workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstituteRates {
    /// Divisor turning the salary into the daily management fee.
    pub fee_day_divisor: u32,
    /// Divisor turning the salary into the substitute's daily pay.
    pub salary_day_divisor: u32,
}

/// The complete engine configuration.
///
/// # Example
///
/// ```
/// use placement_billing::config::EngineConfig;
/// use rust_decimal::Decimal;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.nanny.working_days_per_month, 26);
/// assert_eq!(config.nanny.management_fee_rate, Decimal::new(10, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Schedule metadata.
    pub schedule: ScheduleMetadata,
    /// Nanny rates.
    pub nanny: NannyRates,
    /// Maternity-nurse rates.
    pub maternity_nurse: MaternityNurseRates,
    /// Substitute rates.
    pub substitute: SubstituteRates,
}

impl Default for EngineConfig {
    /// Mirrors `config/default/engine.yaml`.
    fn default() -> Self {
        Self {
            schedule: ScheduleMetadata {
                name: "Default placement schedule".to_string(),
                version: "2025-01-01".to_string(),
            },
            nanny: NannyRates {
                working_days_per_month: 26,
                management_fee_rate: Decimal::new(10, 2),
                first_cycle_service_fee_rate: Decimal::new(10, 2),
            },
            maternity_nurse: MaternityNurseRates {
                cycle_length_days: 26,
                working_days_per_cycle: 26,
                bonus_tier_rate: Decimal::new(20, 2),
                bonus_rate: Decimal::new(5, 2),
                holiday_overtime_multiplier: Decimal::TWO,
            },
            substitute: SubstituteRates {
                fee_day_divisor: 30,
                salary_day_divisor: 26,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_engine_config() {
        let yaml = r#"
schedule:
  name: Test schedule
  version: "2025-07-01"
nanny:
  working_days_per_month: 26
  management_fee_rate: "0.10"
  first_cycle_service_fee_rate: "0.10"
maternity_nurse:
  cycle_length_days: 26
  working_days_per_cycle: 26
  bonus_tier_rate: "0.15"
  bonus_rate: "0.05"
  holiday_overtime_multiplier: "2"
substitute:
  fee_day_divisor: 30
  salary_day_divisor: 26
"#;
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.schedule.name, "Test schedule");
        assert_eq!(config.maternity_nurse.bonus_tier_rate, Decimal::new(15, 2));
        assert_eq!(config.substitute.fee_day_divisor, 30);
    }

    #[test]
    fn test_default_substitute_divisors() {
        let config = EngineConfig::default();
        assert_eq!(config.substitute.fee_day_divisor, 30);
        assert_eq!(config.substitute.salary_day_divisor, 26);
        assert_eq!(config.maternity_nurse.holiday_overtime_multiplier, Decimal::TWO);
    }
}
