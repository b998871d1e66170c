//! End-to-end submission, update and fee flows against mock collaborators.

#![allow(clippy::arithmetic_side_effects)]

use std::sync::Arc;

use verdant_registry::{
    AuditId, AuditRegistry, InMemoryLedger, InvalidField, RegistryError, SubmitAudit,
    TransferError,
};
use verdant_test::prelude::*;

#[test]
fn full_audit_lifecycle() {
    let ctx = TestRegistry::ready();
    let submitter = test_submitter();

    let id = ctx
        .registry
        .submit_audit(&submitter, test_submission(1))
        .unwrap();
    assert_eq!(id, AuditId(0));

    let transfers = ctx.transfer.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, 500);
    assert_eq!(transfers[0].from, submitter);
    assert_eq!(transfers[0].to, test_registry_principal());

    assert_eq!(
        ctx.registry.submit_audit(&submitter, test_submission(1)),
        Err(RegistryError::AuditAlreadyExists)
    );

    ctx.clock.advance(10);
    ctx.registry
        .update_audit(&submitter, id, 150, 25)
        .unwrap();

    let record = ctx.registry.get_audit(id).unwrap();
    assert_eq!(record.tonnage, 150);
    assert_eq!(record.reduction_metric, 25);
    assert_eq!(record.timestamp.get(), 11);

    let update = ctx.registry.get_audit_update(id).unwrap();
    assert_eq!(update.tonnage, 150);
    assert_eq!(update.updater, submitter);

    assert_eq!(
        ctx.registry.update_audit(&test_outsider(), id, 200, 30),
        Err(RegistryError::NotAuthorized)
    );
    assert_eq!(ctx.registry.get_audit(id), Some(record));
    assert_eq!(ctx.transfer.transfers().len(), 1);
}

#[test]
fn ids_are_dense_and_count_matches() {
    let ctx = TestRegistry::ready();
    for fill in 1..=5u8 {
        let id = ctx
            .registry
            .submit_audit(&test_submitter(), test_submission(fill))
            .unwrap();
        assert_eq!(id, AuditId(u64::from(fill) - 1));
    }

    assert_eq!(ctx.registry.get_audit_count(), 5);
    for id in 0..5 {
        assert!(ctx.registry.get_audit(AuditId(id)).is_some());
    }
    assert!(ctx.registry.get_audit(AuditId(5)).is_none());
    assert_eq!(ctx.transfer.total(), 2_500);
}

#[test]
fn unverified_caller_is_refused_even_with_valid_fields() {
    let ctx = TestRegistry::ready();
    assert_eq!(
        ctx.registry
            .submit_audit(&test_outsider(), test_submission(1)),
        Err(RegistryError::NotAuthorized)
    );

    // Field errors come before the oracle is consulted.
    let bad = test_submission_with(1, |s| s.tonnage = 0);
    assert_eq!(
        ctx.registry.submit_audit(&test_outsider(), bad),
        Err(RegistryError::invalid(InvalidField::Tonnage))
    );

    ctx.oracle.verify(test_outsider());
    assert!(ctx
        .registry
        .submit_audit(&test_outsider(), test_submission(1))
        .is_ok());
}

#[test]
fn oracle_revocation_takes_effect_immediately() {
    let ctx = TestRegistry::ready();
    ctx.registry
        .submit_audit(&test_submitter(), test_submission(1))
        .unwrap();

    ctx.oracle.revoke(&test_submitter());
    assert_eq!(
        ctx.registry
            .submit_audit(&test_submitter(), test_submission(2)),
        Err(RegistryError::NotAuthorized)
    );

    // Updates are owner-checked only.
    assert!(ctx
        .registry
        .update_audit(&test_submitter(), AuditId(0), 10, 10)
        .is_ok());
}

#[test]
fn submissions_wait_for_registry_principal() {
    let ctx = TestRegistry::new();
    assert_eq!(
        ctx.registry
            .submit_audit(&test_submitter(), test_submission(1)),
        Err(RegistryError::RegistryNotVerified)
    );
    assert_eq!(
        ctx.registry.set_submission_fee(10),
        Err(RegistryError::RegistryNotVerified)
    );
    assert!(ctx.transfer.transfers().is_empty());

    ctx.registry
        .set_registry_principal(test_registry_principal())
        .unwrap();
    assert_eq!(
        ctx.registry
            .submit_audit(&test_submitter(), test_submission(1)),
        Ok(AuditId(0))
    );
    assert_eq!(
        ctx.registry.set_registry_principal(test_outsider()),
        Err(RegistryError::ConfigAlreadySet)
    );
}

#[test]
fn capacity_ceiling_freezes_state() {
    let ctx = TestRegistry::with_builder(AuditRegistry::builder().max_audits(2));
    ctx.registry
        .set_registry_principal(test_registry_principal())
        .unwrap();
    ctx.registry
        .submit_audit(&test_submitter(), test_submission(1))
        .unwrap();
    ctx.registry
        .submit_audit(&test_submitter(), test_submission(2))
        .unwrap();

    // Capacity is checked before anything else, even a malformed hash.
    let malformed = test_submission_with(3, |s| s.data_hash.truncate(4));
    assert_eq!(
        ctx.registry.submit_audit(&test_submitter(), malformed),
        Err(RegistryError::CapacityExceeded)
    );
    assert_eq!(ctx.registry.get_audit_count(), 2);
    assert!(!ctx.registry.check_audit_existence(test_hash(3)));
    assert_eq!(ctx.transfer.transfers().len(), 2);
}

#[test]
fn failed_transfer_leaves_no_trace() {
    let ctx = TestRegistry::ready();
    ctx.transfer
        .fail_next(TransferError::Rejected("ledger offline".to_string()));

    let result = ctx
        .registry
        .submit_audit(&test_submitter(), test_submission(1));
    assert!(matches!(result, Err(RegistryError::TransferFailed(_))));
    assert_eq!(ctx.registry.get_audit_count(), 0);
    assert!(!ctx.registry.check_audit_existence(test_hash(1)));
    assert!(ctx.registry.fee_receipt(AuditId(0)).is_none());

    // The same hash and the same id are still available.
    assert_eq!(
        ctx.registry
            .submit_audit(&test_submitter(), test_submission(1)),
        Ok(AuditId(0))
    );
}

#[test]
fn fee_changes_apply_to_later_submissions_only() {
    let ctx = TestRegistry::ready();
    let first = ctx
        .registry
        .submit_audit(&test_submitter(), test_submission(1))
        .unwrap();

    ctx.registry.set_submission_fee(1_250).unwrap();
    let second = ctx
        .registry
        .submit_audit(&test_submitter(), test_submission(2))
        .unwrap();

    assert_eq!(ctx.registry.fee_receipt(first).unwrap().amount, 500);
    assert_eq!(ctx.registry.fee_receipt(second).unwrap().amount, 1_250);
    let amounts: Vec<_> = ctx.transfer.transfers().iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![500, 1_250]);
}

#[test]
fn metered_ledger_rejects_broke_submitter() {
    let ledger = Arc::new(InMemoryLedger::metered());
    ledger.credit(&test_submitter(), 700);

    let registry = AuditRegistry::builder()
        .oracle(Arc::new(MockOracle::new().with_verified(test_submitter())))
        .transfer(ledger.clone())
        .clock(Arc::new(ManualClock::starting_at(1)))
        .open()
        .unwrap();
    registry
        .set_registry_principal(test_registry_principal())
        .unwrap();

    registry
        .submit_audit(&test_submitter(), test_submission(1))
        .unwrap();
    let result = registry.submit_audit(&test_submitter(), test_submission(2));
    assert!(matches!(
        result,
        Err(RegistryError::TransferFailed(
            TransferError::InsufficientFunds { available: 200, required: 500, .. }
        ))
    ));

    assert_eq!(ledger.balance_of(&test_submitter()), 200);
    assert_eq!(ledger.balance_of(&test_registry_principal()), 500);
    assert_eq!(registry.get_audit_count(), 1);
}

#[test]
fn principal_paying_itself_keeps_its_balance() {
    setup_test_logging("verdant_registry=debug");
    let ledger = Arc::new(InMemoryLedger::metered());
    ledger.credit(&test_registry_principal(), 500);

    let registry = AuditRegistry::builder()
        .oracle(Arc::new(
            MockOracle::new().with_verified(test_registry_principal()),
        ))
        .transfer(ledger.clone())
        .clock(Arc::new(ManualClock::starting_at(1)))
        .open()
        .unwrap();
    registry
        .set_registry_principal(test_registry_principal())
        .unwrap();

    registry
        .submit_audit(&test_registry_principal(), test_submission(1))
        .unwrap();
    registry
        .submit_audit(&test_registry_principal(), test_submission(2))
        .unwrap();

    assert_eq!(ledger.balance_of(&test_registry_principal()), 500);
    assert_eq!(ledger.transfers().len(), 2);
    assert_eq!(registry.get_audit_count(), 2);
}

#[test]
fn existence_check_tolerates_any_length() {
    let ctx = TestRegistry::ready();
    ctx.registry
        .submit_audit(&test_submitter(), test_submission(7))
        .unwrap();

    assert!(ctx.registry.check_audit_existence(test_hash(7)));
    assert!(!ctx.registry.check_audit_existence([7u8; 31]));
    assert!(!ctx.registry.check_audit_existence([7u8; 33]));
    assert!(!ctx.registry.check_audit_existence([0u8; 0]));
    assert_eq!(ctx.registry.find_by_hash(test_hash(7)), Some(AuditId(0)));
}

#[test]
fn every_field_rule_reports_its_own_code() {
    let ctx = TestRegistry::ready();
    let cases: Vec<(SubmitAudit, u32)> = vec![
        (test_submission_with(1, |s| s.data_hash.push(0)), 102),
        (test_submission_with(1, |s| s.tonnage = 0), 103),
        (test_submission_with(1, |s| s.waste_type.clear()), 104),
        (test_submission_with(1, |s| s.reduction_metric = 101), 105),
        (test_submission_with(1, |s| s.period = 0), 110),
        (test_submission_with(1, |s| s.category = "Organic".into()), 111),
        (test_submission_with(1, |s| s.location = "x".repeat(101)), 116),
        (test_submission_with(1, |s| s.unit = "g".into()), 117),
        (test_submission_with(1, |s| s.source.clear()), 118),
        (test_submission_with(1, |s| s.verification_level = 6), 119),
        (test_submission_with(1, |s| s.compliance_score = 101), 120),
    ];

    for (request, code) in cases {
        let err = ctx
            .registry
            .submit_audit(&test_submitter(), request)
            .unwrap_err();
        assert_eq!(err.code(), code, "unexpected error {err:?}");
    }
    assert_eq!(ctx.registry.get_audit_count(), 0);
}
