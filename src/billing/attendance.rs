//! Attendance lookup with a full-attendance default.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::models::{AttendanceRecord, BillingCycle, Contract, ContractKind};
use crate::store::BillingStore;

/// Working days assumed for a cycle when no attendance was recorded.
pub fn default_working_days(contract: &Contract, config: &EngineConfig) -> u32 {
    match contract.kind {
        ContractKind::MaternityNurse { .. } => config.maternity_nurse.working_days_per_cycle,
        _ => config.nanny.working_days_per_month,
    }
}

/// Returns the attendance for a contract cycle, creating a full-attendance
/// record when none exists.
///
/// A stored record whose cycle was later shortened (for example by early
/// termination) has its days worked capped at the new cycle length in the
/// returned copy; the stored record is left as recorded.
pub fn get_or_create_attendance<S: BillingStore + ?Sized>(
    store: &mut S,
    contract: &Contract,
    cycle: &BillingCycle,
    config: &EngineConfig,
) -> EngineResult<AttendanceRecord> {
    if let Some(mut record) = store.attendance(contract.id, cycle.start_date) {
        let cycle_days = Decimal::from(cycle.days());
        if record.total_days_worked > cycle_days {
            debug!(
                contract_id = %contract.id,
                cycle_start = %cycle.start_date,
                recorded = %record.total_days_worked,
                capped = %cycle_days,
                "Capping days worked at cycle length"
            );
            record.total_days_worked = cycle_days;
        }
        record.cycle_end_date = cycle.end_date;
        return Ok(record);
    }

    let record =
        AttendanceRecord::full_attendance(contract.id, cycle, default_working_days(contract, config));
    debug!(
        contract_id = %contract.id,
        cycle_start = %cycle.start_date,
        days_worked = %record.total_days_worked,
        "Created default attendance"
    );
    store.save_attendance(record.clone())?;
    Ok(record)
}
