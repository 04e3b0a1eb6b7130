//! End-to-end scenarios against the billing engine over an in-memory store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use placement_billing::billing::{BillingEngine, TerminationRequest, WriteOutcome};
use placement_billing::config::EngineConfig;
use placement_billing::error::EngineError;
use placement_billing::models::{
    AdjustmentOrigin, AdjustmentStatus, AdjustmentTarget, AdjustmentType, Contract, ContractKind,
    ContractStatus, FinancialAdjustment, PaymentRecord,
};
use placement_billing::store::{BillingStore, InMemoryStore};

// =============================================================================
// Test Helpers
// =============================================================================

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn create_contract(kind: ContractKind, level: &str, start: NaiveDate, end: NaiveDate) -> Contract {
    Contract {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        employee_id: Some(Uuid::new_v4()),
        level: dec(level),
        start_date: start,
        end_date: end,
        status: ContractStatus::Active,
        management_fee_rate: dec("0.10"),
        deposit_amount: Decimal::ZERO,
        security_deposit_amount: Decimal::ZERO,
        termination_date: None,
        previous_contract_id: None,
        next_contract_id: None,
        kind,
    }
}

fn fixed_term(start: NaiveDate, end: NaiveDate) -> Contract {
    create_contract(ContractKind::Nanny { auto_renew: false }, "6000", start, end)
}

fn engine_with(contracts: &[&Contract]) -> BillingEngine<InMemoryStore> {
    let mut engine = BillingEngine::new(InMemoryStore::new(), EngineConfig::default());
    for contract in contracts {
        engine.save_contract((*contract).clone()).unwrap();
    }
    engine
}

fn customer_outstanding(engine: &BillingEngine<InMemoryStore>, contract_id: Uuid) -> Decimal {
    engine
        .store()
        .bills_for_contract(contract_id)
        .iter()
        .map(|bill| bill.outstanding())
        .sum()
}

fn payroll_outstanding(engine: &BillingEngine<InMemoryStore>, contract_id: Uuid) -> Decimal {
    engine
        .store()
        .payrolls_for_contract(contract_id)
        .iter()
        .map(|payroll| payroll.outstanding())
        .sum()
}

// =============================================================================
// Contract Variants
// =============================================================================

#[test]
fn test_trial_contract_billed_in_end_month() {
    let contract = create_contract(
        ContractKind::Trial {
            trial_daily_rate: None,
        },
        "5200",
        date(2025, 10, 6),
        date(2025, 10, 12),
    );
    let mut engine = engine_with(&[&contract]);

    let writes = engine
        .calculate_for_month(contract.id, 2025, 10, false, "system")
        .unwrap();

    assert_eq!(writes.len(), 1);
    // 5200 ÷ 26 = 200 a day for 7 days, plus 10%
    assert_eq!(writes[0].bill_total, dec("1540.00"));
    assert_eq!(writes[0].payroll_total, dec("1400.00"));
    assert!(
        engine
            .calculate_for_month(contract.id, 2025, 11, false, "system")
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_external_substitution_uses_flat_fee() {
    let contract = create_contract(
        ContractKind::ExternalSubstitution {
            management_fee_amount: Some(dec("500")),
        },
        "5200",
        date(2025, 10, 1),
        date(2025, 11, 30),
    );
    let mut engine = engine_with(&[&contract]);

    let writes = engine
        .calculate_for_month(contract.id, 2025, 10, false, "system")
        .unwrap();

    assert_eq!(writes[0].bill_total, dec("5700.00"));
    assert_eq!(writes[0].payroll_total, dec("5200.00"));
}

#[test]
fn test_nurse_awaiting_onboarding_is_deferred() {
    let contract = create_contract(
        ContractKind::MaternityNurse {
            actual_onboarding_date: None,
            expected_offboarding_date: None,
            actual_offboarding_date: None,
        },
        "5200",
        date(2025, 10, 1),
        date(2025, 12, 31),
    );
    let mut engine = engine_with(&[&contract]);

    let writes = engine
        .calculate_for_month(contract.id, 2025, 10, false, "system")
        .unwrap();

    assert!(writes.is_empty());
    assert!(engine.store().bills_for_contract(contract.id).is_empty());
}

// =============================================================================
// Recalculation
// =============================================================================

#[test]
fn test_forced_recalculation_is_stable() {
    let contract = fixed_term(date(2025, 10, 1), date(2025, 11, 30));
    let mut engine = engine_with(&[&contract]);
    let first = engine
        .calculate_for_month(contract.id, 2025, 10, false, "system")
        .unwrap();

    let forced = engine
        .calculate_for_month(contract.id, 2025, 10, true, "system")
        .unwrap();

    assert_eq!(forced[0].outcome, WriteOutcome::Updated);
    assert_eq!(forced[0].bill_id, first[0].bill_id);
    assert_eq!(forced[0].bill_total, first[0].bill_total);
    assert_eq!(forced[0].payroll_total, first[0].payroll_total);
    assert_eq!(engine.store().bills_for_contract(contract.id).len(), 1);

    let actions: Vec<String> = engine
        .store()
        .activity_for_contract(contract.id)
        .into_iter()
        .map(|entry| entry.action)
        .collect();
    assert_eq!(actions, vec!["bill_created", "bill_recalculated"]);
}

#[test]
fn test_settled_adjustment_counts_toward_paid() {
    let contract = fixed_term(date(2025, 10, 1), date(2025, 11, 30));
    let mut engine = engine_with(&[&contract]);
    let writes = engine
        .calculate_for_month(contract.id, 2025, 11, false, "system")
        .unwrap();
    let bill_id = writes[0].bill_id;

    let mut payment = FinancialAdjustment::new(
        AdjustmentTarget::Bill(bill_id),
        AdjustmentType::CustomerIncrease,
        dec("250"),
        "Late fee",
        "finance",
    );
    payment.status = AdjustmentStatus::Paid;
    payment.settlement_date = Some("2025-11-20".to_string());
    engine
        .add_adjustment(payment, "finance", date(2025, 11, 30))
        .unwrap();

    let bill = engine.store().bill(bill_id).unwrap();
    assert_eq!(bill.total_due, dec("6250.00"));
    assert_eq!(bill.total_paid, dec("250.00"));

    let records = engine.store().payment_records(bill_id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].paid_on, date(2025, 11, 20));
}

// =============================================================================
// Merge
// =============================================================================

#[test]
fn test_merge_conserves_outstanding_balances() {
    let old = fixed_term(date(2025, 10, 1), date(2025, 10, 31));
    let new = fixed_term(date(2025, 11, 1), date(2026, 10, 31));
    let mut engine = engine_with(&[&old, &new]);
    let source = engine
        .calculate_for_month(old.id, 2025, 10, false, "system")
        .unwrap();
    engine
        .calculate_for_month(new.id, 2025, 11, false, "system")
        .unwrap();

    let customer_before = customer_outstanding(&engine, old.id) + customer_outstanding(&engine, new.id);
    let payroll_before = payroll_outstanding(&engine, old.id) + payroll_outstanding(&engine, new.id);

    let report = engine.merge_bill(source[0].bill_id, new.id, "ops").unwrap();

    assert_eq!(customer_outstanding(&engine, old.id), Decimal::ZERO);
    assert_eq!(payroll_outstanding(&engine, old.id), Decimal::ZERO);
    assert_eq!(customer_outstanding(&engine, new.id), customer_before);
    assert_eq!(payroll_outstanding(&engine, new.id), payroll_before);
    assert_eq!(report.transfers.len(), 2);

    let net: Decimal = engine
        .store()
        .all_adjustments()
        .iter()
        .map(|adjustment| adjustment.signed_amount())
        .sum();
    assert_eq!(net, Decimal::ZERO);
}

#[test]
fn test_merged_bill_ignores_later_recalculation() {
    let old = fixed_term(date(2025, 10, 1), date(2025, 10, 31));
    let new = fixed_term(date(2025, 11, 1), date(2026, 10, 31));
    let mut engine = engine_with(&[&old, &new]);
    let source = engine
        .calculate_for_month(old.id, 2025, 10, false, "system")
        .unwrap();
    engine.merge_bill(source[0].bill_id, new.id, "ops").unwrap();
    let frozen = engine.store().bill(source[0].bill_id).unwrap();

    let write = engine.recalculate_bill(source[0].bill_id, "ops").unwrap();

    assert!(matches!(write.outcome, WriteOutcome::Skipped(_)));
    assert_eq!(engine.store().bill(source[0].bill_id).unwrap(), frozen);
}

// =============================================================================
// Termination
// =============================================================================

#[test]
fn test_termination_with_transfer_to_successor() {
    let contract = fixed_term(date(2025, 10, 1), date(2025, 12, 31));
    let successor = create_contract(
        ContractKind::Nanny { auto_renew: true },
        "6000",
        date(2025, 11, 16),
        date(2026, 11, 15),
    );
    let mut engine = engine_with(&[&contract, &successor]);
    engine
        .generate_all_cycles(contract.id, date(2025, 12, 31), "system")
        .unwrap();

    let report = engine
        .terminate_contract(
            contract.id,
            TerminationRequest {
                termination_date: date(2025, 11, 15),
                charge_termination_day: false,
                transfer_to_contract_id: Some(successor.id),
            },
            "ops",
        )
        .unwrap();

    let refund = report.refund.unwrap();
    assert_eq!(refund.amount, dec("920.00"));
    let transfer = report.transfer.unwrap();
    assert_eq!(transfer.target_contract_id, successor.id);

    let adjustments = engine.store().all_adjustments();
    let by_origin = |origin: AdjustmentOrigin| -> Decimal {
        adjustments
            .iter()
            .filter(|a| a.origin == origin)
            .map(|a| a.signed_amount())
            .sum()
    };
    // The refund and its offset cancel on the final bill; the successor
    // receives the credit.
    assert_eq!(
        by_origin(AdjustmentOrigin::TerminationRefund) + by_origin(AdjustmentOrigin::TransferOffset),
        Decimal::ZERO
    );
    assert_eq!(by_origin(AdjustmentOrigin::TransferIn), dec("-920.00"));

    let saved = engine.store().contract(contract.id).unwrap();
    assert_eq!(saved.status, ContractStatus::Terminated);
    assert_eq!(saved.next_contract_id, Some(successor.id));
}

#[test]
fn test_failed_termination_leaves_store_untouched() {
    let contract = fixed_term(date(2025, 10, 1), date(2025, 12, 31));
    let mut engine = engine_with(&[&contract]);
    engine
        .generate_all_cycles(contract.id, date(2025, 12, 31), "system")
        .unwrap();
    let december = engine
        .store()
        .find_bill(contract.id, date(2025, 12, 1), false)
        .unwrap();
    engine
        .store_mut()
        .insert_payment_record(PaymentRecord {
            id: Uuid::new_v4(),
            bill_id: december.id,
            amount: dec("100"),
            paid_on: date(2025, 11, 1),
            adjustment_id: None,
            recorded_by: "finance".to_string(),
        })
        .unwrap();

    let result = engine.terminate_contract(
        contract.id,
        TerminationRequest {
            termination_date: date(2025, 11, 15),
            charge_termination_day: false,
            transfer_to_contract_id: None,
        },
        "ops",
    );

    assert!(matches!(result, Err(EngineError::Consistency { .. })));
    let saved = engine.store().contract(contract.id).unwrap();
    assert_eq!(saved.status, ContractStatus::Active);
    assert_eq!(saved.termination_date, None);
    assert_eq!(engine.store().bills_for_contract(contract.id).len(), 3);
    assert!(engine.store().all_adjustments().is_empty());
    assert_eq!(engine.store().open_transactions(), 0);
}

#[test]
fn test_termination_recomputes_substitute_fee() {
    let contract = create_contract(
        ContractKind::Nanny { auto_renew: true },
        "6000",
        date(2025, 9, 1),
        date(2025, 9, 30),
    );
    let mut engine = engine_with(&[&contract]);
    let record = placement_billing::models::SubstituteRecord {
        id: Uuid::new_v4(),
        main_contract_id: contract.id,
        substitute_employee_id: Uuid::new_v4(),
        start_date: date(2025, 11, 5),
        end_date: date(2025, 11, 15),
        substitute_salary: dec("5200"),
        management_fee_rate: dec("0.10"),
        substitute_management_fee: Decimal::ZERO,
        generated_bill_id: None,
        generated_payroll_id: None,
    };
    engine.save_substitute(record.clone()).unwrap();

    let open_ended = engine.calculate_substitute(record.id, "system").unwrap();
    assert_eq!(open_ended.bill_total, dec("0.00"));

    let report = engine
        .terminate_contract(
            contract.id,
            TerminationRequest {
                termination_date: date(2025, 11, 10),
                charge_termination_day: true,
                transfer_to_contract_id: None,
            },
            "ops",
        )
        .unwrap();

    assert_eq!(report.substitutes.len(), 1);
    // 5200 × 5 ÷ 30
    assert_eq!(report.substitutes[0].bill_total, dec("866.67"));
    assert_eq!(
        engine.store().substitute(record.id).unwrap().substitute_management_fee,
        dec("866.67")
    );
}
