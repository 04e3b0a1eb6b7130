//! Substitute worker fees.
//!
//! A substitute covering for the main worker is paid from the substitute's
//! own salary. The main contract's customer is charged a management fee only
//! for the substitute days that fall after the main contract's effective end.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{Contract, FeeCategory, LedgerSide, SubstituteRecord};

use super::fee::{BreakdownBuilder, FeeBreakdown, FeeInput};
use super::rounding::{daily_rate, percent, round_money, round_rate};

/// Number of substitute days strictly after the contract's effective end.
///
/// Returns 0 when the contract has no effective end.
///
/// # Example
///
/// ```
/// use placement_billing::calculation::substitute_fee_days;
/// use chrono::NaiveDate;
///
/// let end = NaiveDate::from_ymd_opt(2025, 10, 31);
/// let start = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
/// let finish = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
///
/// assert_eq!(substitute_fee_days(start, finish, end), 11);
/// assert_eq!(substitute_fee_days(start, finish, None), 0);
/// ```
pub fn substitute_fee_days(
    start_date: NaiveDate,
    end_date: NaiveDate,
    effective_end: Option<NaiveDate>,
) -> i64 {
    let Some(contract_end) = effective_end else {
        return 0;
    };
    let whole_period_after = i64::from(start_date > contract_end);
    ((end_date - contract_end.max(start_date)).num_days() + whole_period_after).max(0)
}

/// Management fee for `days` substitute days at `salary / divisor` per day.
///
/// The salary is multiplied out before dividing so that repeating daily
/// rates do not lose precision.
pub fn substitute_management_fee(salary: Decimal, days: i64, divisor: u32) -> Decimal {
    round_money(salary * Decimal::from(days) / Decimal::from(divisor))
}

pub(crate) fn calculate_substitute_fees(
    input: &FeeInput<'_>,
    record: &SubstituteRecord,
    contract: &Contract,
) -> EngineResult<FeeBreakdown> {
    if record.start_date > record.end_date {
        return Err(EngineError::InvalidDateRange {
            start: record.start_date,
            end: record.end_date,
        });
    }
    if record.substitute_salary.is_sign_negative() && !record.substitute_salary.is_zero() {
        return Err(EngineError::validation("substitute_salary", "must not be negative"));
    }

    let rates = &input.config.substitute;
    let effective_end = contract.effective_end();
    let salary = record.substitute_salary;
    let sub_rate = record.management_fee_rate;

    let mut builder = BreakdownBuilder::new(
        "substitute",
        input.cycle,
        serde_json::json!({
            "substitute_record_id": record.id,
            "substitute_salary": salary.normalize().to_string(),
            "substitute_management_fee_rate": sub_rate.normalize().to_string(),
            "substitute_start": record.start_date,
            "substitute_end": record.end_date,
            "contract_effective_end": effective_end,
            "fee_day_divisor": rates.fee_day_divisor,
            "salary_day_divisor": rates.salary_day_divisor,
        }),
    );

    let fee_days = substitute_fee_days(record.start_date, record.end_date, effective_end);
    let fee = substitute_management_fee(salary, fee_days, rates.fee_day_divisor);
    let fee_formula = match effective_end {
        Some(_) => format!(
            "salary({}) ÷ {} × days_after_end({}) = {}",
            round_money(salary),
            rates.fee_day_divisor,
            fee_days,
            fee
        ),
        None => "contract has no effective end = 0.00".to_string(),
    };
    builder.note(
        "substitute_daily_fee",
        format!(
            "salary({}) ÷ {} = {}",
            round_money(salary),
            rates.fee_day_divisor,
            daily_rate(salary, rates.fee_day_divisor)
        ),
    );
    builder.line(
        LedgerSide::Customer,
        FeeCategory::SubstituteManagementFee,
        fee,
        fee_formula,
    );

    let worker_daily =
        round_rate(salary * (Decimal::ONE - sub_rate) / Decimal::from(rates.salary_day_divisor));
    let days = input.cycle.days();
    let payout = round_money(worker_daily * Decimal::from(days));
    builder.note(
        "worker_daily_rate",
        format!(
            "salary({}) × (1 − {}) ÷ {} = {}",
            round_money(salary),
            percent(sub_rate),
            rates.salary_day_divisor,
            worker_daily
        ),
    );
    builder.line(
        LedgerSide::Employee,
        FeeCategory::BasePayout,
        payout,
        format!(
            "worker_daily_rate({}) × substitute_days({}) = {}",
            worker_daily, days, payout
        ),
    );

    Ok(builder.finish(&input.adjustments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{AdjustmentTotals, FeeSubject};
    use crate::config::EngineConfig;
    use crate::models::{BillingCycle, ContractKind, ContractStatus};
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_contract(auto_renew: bool) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            employee_id: Some(Uuid::new_v4()),
            level: dec("5200"),
            start_date: date(2025, 8, 1),
            end_date: date(2025, 10, 31),
            status: ContractStatus::Active,
            management_fee_rate: dec("0.10"),
            deposit_amount: Decimal::ZERO,
            security_deposit_amount: Decimal::ZERO,
            termination_date: None,
            previous_contract_id: None,
            next_contract_id: None,
            kind: ContractKind::Nanny { auto_renew },
        }
    }

    fn create_record(contract: &Contract, start: NaiveDate, end: NaiveDate) -> SubstituteRecord {
        SubstituteRecord {
            id: Uuid::new_v4(),
            main_contract_id: contract.id,
            substitute_employee_id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            substitute_salary: dec("5200"),
            management_fee_rate: dec("0.10"),
            substitute_management_fee: Decimal::ZERO,
            generated_bill_id: None,
            generated_payroll_id: None,
        }
    }

    fn calculate(contract: &Contract, record: &SubstituteRecord) -> FeeBreakdown {
        let config = EngineConfig::default();
        let input = FeeInput {
            subject: FeeSubject::Substitute { record, contract },
            cycle: record.period(),
            adjustments: AdjustmentTotals::default(),
            config: &config,
        };
        calculate_substitute_fees(&input, record, contract).unwrap()
    }

    #[test]
    fn test_whole_period_after_end() {
        assert_eq!(
            substitute_fee_days(date(2025, 11, 5), date(2025, 11, 15), Some(date(2025, 10, 31))),
            11
        );
    }

    #[test]
    fn test_period_straddling_end_counts_days_after() {
        assert_eq!(
            substitute_fee_days(date(2025, 10, 25), date(2025, 11, 3), Some(date(2025, 10, 31))),
            3
        );
        assert_eq!(
            substitute_fee_days(date(2025, 10, 31), date(2025, 11, 3), Some(date(2025, 10, 31))),
            3
        );
    }

    #[test]
    fn test_period_before_end_has_no_fee_days() {
        assert_eq!(
            substitute_fee_days(date(2025, 10, 1), date(2025, 10, 10), Some(date(2025, 10, 31))),
            0
        );
        assert_eq!(
            substitute_fee_days(date(2025, 10, 1), date(2025, 10, 31), Some(date(2025, 10, 31))),
            0
        );
    }

    #[test]
    fn test_substitute_fee_after_contract_end() {
        let contract = create_test_contract(false);
        let record = create_record(&contract, date(2025, 11, 5), date(2025, 11, 15));
        let result = calculate(&contract, &record);

        assert_eq!(result.amount(FeeCategory::SubstituteManagementFee), dec("1906.67"));
        assert_eq!(result.bill_total, dec("1906.67"));
        assert_eq!(
            result.log.get("substitute_management_fee"),
            Some("salary(5200.00) ÷ 30 × days_after_end(11) = 1906.67")
        );
    }

    #[test]
    fn test_auto_renew_contract_without_end_charges_nothing() {
        let contract = create_test_contract(true);
        let record = create_record(&contract, date(2025, 11, 5), date(2025, 11, 15));
        let result = calculate(&contract, &record);
        assert_eq!(result.amount(FeeCategory::SubstituteManagementFee), Decimal::ZERO);
    }

    #[test]
    fn test_substitute_payout_uses_salary_divisor() {
        let contract = create_test_contract(false);
        let record = create_record(&contract, date(2025, 10, 1), date(2025, 10, 13));
        let result = calculate(&contract, &record);

        // 5200 × 0.90 / 26 = 180.0000 × 13 days
        assert_eq!(result.amount(FeeCategory::BasePayout), dec("2340.00"));
        assert_eq!(result.payroll_total, dec("2340.00"));
        assert_eq!(result.bill_total, dec("0.00"));
    }

    #[test]
    fn test_inverted_record_dates_rejected() {
        let contract = create_test_contract(false);
        let record = create_record(&contract, date(2025, 11, 15), date(2025, 11, 5));
        let config = EngineConfig::default();
        let input = FeeInput {
            subject: FeeSubject::Substitute {
                record: &record,
                contract: &contract,
            },
            cycle: BillingCycle::new(record.end_date, record.start_date),
            adjustments: AdjustmentTotals::default(),
            config: &config,
        };
        assert!(matches!(
            calculate_substitute_fees(&input, &record, &contract),
            Err(EngineError::InvalidDateRange { .. })
        ));
    }
}
