use std::thread;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use vehicle_finance_core::amortization::LoanStatus;
use vehicle_finance_core::records::{
    credit_profile_for_owner, InMemoryRecordStore, LoanRecordInput, LoanRecordUpdate, RecordEvent,
    RecordStore, StoreConfig,
};
use vehicle_finance_core::VehicleFinanceError;

fn loan(email: &str, term_months: u32) -> LoanRecordInput {
    LoanRecordInput {
        name: "Meera Iyer".into(),
        vehicle_name: "Compact SUV".into(),
        email: email.into(),
        image_url: Some("https://img.example.com/suv.png".into()),
        principal: dec!(50000),
        annual_interest_rate_percent: dec!(4.5),
        term_months,
    }
}

fn temp_store_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("vfin-test-{}", Uuid::new_v4().simple()))
        .join("records.json")
}

// ===========================================================================
// Atomic installment updates
// ===========================================================================

#[test]
fn test_concurrent_marks_lose_no_update() {
    let store = InMemoryRecordStore::new();
    let record = store.create(loan("meera@example.com", 48)).unwrap();

    let handles: Vec<_> = (0..48)
        .map(|i| {
            let store = store.clone();
            let id = record.id.clone();
            thread::spawn(move || store.mark_installment_paid(&id, i).unwrap())
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let after = store.get_by_id(&record.id).unwrap();
    assert!(after.installments.iter().all(|p| *p));
    assert_eq!(after.status(), LoanStatus::Completed);
    // one version bump per installment
    assert_eq!(after.version, 1 + 48);
}

#[test]
fn test_stale_version_rejected() {
    let store = InMemoryRecordStore::new();
    let record = store.create(loan("meera@example.com", 12)).unwrap();
    store.mark_installment_paid(&record.id, 0).unwrap();

    let stale = LoanRecordUpdate {
        principal: Some(dec!(40000)),
        expected_version: Some(record.version),
        ..Default::default()
    };
    let err = store.update(&record.id, stale).unwrap_err();
    assert!(matches!(err, VehicleFinanceError::VersionConflict { expected: 1, actual: 2, .. }));

    let fresh = LoanRecordUpdate {
        principal: Some(dec!(40000)),
        expected_version: Some(2),
        ..Default::default()
    };
    let updated = store.update(&record.id, fresh).unwrap();
    assert_eq!(updated.principal, dec!(40000));
    assert!(updated.installments[0]);
}

#[test]
fn test_update_cannot_change_term() {
    let store = InMemoryRecordStore::new();
    let record = store.create(loan("meera@example.com", 12)).unwrap();
    let update = LoanRecordUpdate {
        term_months: Some(24),
        ..Default::default()
    };
    assert!(store.update(&record.id, update).is_err());
    assert_eq!(store.get_by_id(&record.id).unwrap().installments.len(), 12);
}

// ===========================================================================
// Change notification
// ===========================================================================

#[test]
fn test_collection_subscription_sees_lifecycle() {
    let store = InMemoryRecordStore::new();
    let rx = store.subscribe();

    let record = store.create(loan("meera@example.com", 6)).unwrap();
    store.mark_installment_paid(&record.id, 2).unwrap();
    store.delete(&record.id).unwrap();

    let events: Vec<RecordEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], RecordEvent::Created { record: r } if r.id == record.id));
    assert!(matches!(&events[1], RecordEvent::Updated { record: r } if r.installments[2]));
    assert_eq!(events[2], RecordEvent::Deleted { id: record.id.clone() });
}

// ===========================================================================
// Persistence
// ===========================================================================

#[test]
fn test_snapshot_survives_reopen() {
    let path = temp_store_path();
    let config = StoreConfig {
        path: Some(path.clone()),
        unique_owner_email: false,
    };

    let id = {
        let store = InMemoryRecordStore::from_config(&config);
        let record = store.create(loan("meera@example.com", 12)).unwrap();
        store.mark_installment_paid(&record.id, 5).unwrap();
        record.id
    };

    let reopened = InMemoryRecordStore::from_config(&config);
    let record = reopened.get_by_id(&id).unwrap();
    assert!(record.installments[5]);
    assert_eq!(record.monthly_installment, dec!(4268.93));

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn test_corrupt_snapshot_starts_empty() {
    let path = temp_store_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let store = InMemoryRecordStore::from_config(&StoreConfig {
        path: Some(path.clone()),
        unique_owner_email: false,
    });
    assert!(store.is_empty());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_two_handles_on_one_file_keep_both_payments() {
    let path = temp_store_path();
    let config = StoreConfig {
        path: Some(path.clone()),
        unique_owner_email: false,
    };

    let first = InMemoryRecordStore::from_config(&config);
    let record = first.create(loan("meera@example.com", 4)).unwrap();
    let second = InMemoryRecordStore::from_config(&config);

    first.mark_installment_paid(&record.id, 0).unwrap();
    let latest = second.mark_installment_paid(&record.id, 1).unwrap();
    assert_eq!(latest.installments, vec![true, true, false, false]);
    assert_eq!(latest.version, 3);

    let reopened = InMemoryRecordStore::from_config(&config);
    let stored = reopened.get_by_id(&record.id).unwrap();
    assert_eq!(stored.installments, vec![true, true, false, false]);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn test_handles_racing_on_one_file_lose_no_update() {
    let path = temp_store_path();
    let config = StoreConfig {
        path: Some(path.clone()),
        unique_owner_email: false,
    };
    let record = InMemoryRecordStore::from_config(&config)
        .create(loan("meera@example.com", 8))
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let config = config.clone();
            let id = record.id.clone();
            thread::spawn(move || {
                InMemoryRecordStore::from_config(&config)
                    .mark_installment_paid(&id, i)
                    .unwrap()
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stored = InMemoryRecordStore::from_config(&config)
        .get_by_id(&record.id)
        .unwrap();
    assert!(stored.installments.iter().all(|p| *p));
    assert_eq!(stored.version, 1 + 8);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

// ===========================================================================
// Extreme amounts
// ===========================================================================

#[test]
fn test_out_of_range_loan_keeps_store_usable() {
    let store = InMemoryRecordStore::new();
    let mut huge = loan("meera@example.com", 60);
    huge.principal = dec!(1e20);
    huge.annual_interest_rate_percent = dec!(1e12);

    let record = store.create(huge).unwrap();
    assert_eq!(record.monthly_installment, Decimal::MAX);
    assert_eq!(record.summary().amount_remaining, Decimal::MAX);

    let normal = store.create(loan("meera@example.com", 12)).unwrap();
    assert_eq!(normal.monthly_installment, dec!(4268.93));
    assert_eq!(store.len(), 2);
}

// ===========================================================================
// Credit profile
// ===========================================================================

#[test]
fn test_credit_profile_for_owner() {
    let store = InMemoryRecordStore::new();
    let paid = store.create(loan("meera@example.com", 10)).unwrap();
    store.create(loan("meera@example.com", 10)).unwrap();
    store.create(loan("someone@example.com", 10)).unwrap();

    for i in 0..10 {
        store.mark_installment_paid(&paid.id, i).unwrap();
    }

    let profile = credit_profile_for_owner(&store, "meera@example.com").unwrap();
    assert_eq!(profile.loan_count, 2);
    assert_eq!(profile.total_installments, 20);
    assert_eq!(profile.paid_installments, 10);
    assert_eq!(profile.score, 750);

    let stranger = credit_profile_for_owner(&store, "nobody@example.com").unwrap();
    assert_eq!(stranger.score, 600);
}
