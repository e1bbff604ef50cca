//! Direct database-layer tests: schema bootstrap, user rows, and draft
//! replacement semantics.

use std::collections::BTreeMap;

use cadence_core::composer::build_draft;
use cadence_core::fsm::SessionState;
use cadence_core::models::{Duration, Focus, Load, PlanParameters, TimeSlot, UserPolicy};
use cadence_core::{Catalog, Database};
use tempfile::TempDir;

fn create_test_database() -> (TempDir, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::new(temp_dir.path().join("test.db")).expect("Failed to create database");
    (temp_dir, db)
}

fn sample_draft(seed: &str) -> cadence_core::Draft {
    let catalog = Catalog::embedded().unwrap();
    let params = PlanParameters {
        duration: Some(Duration::Short),
        focus: Some(Focus::Somatic),
        load: Some(Load::Lite),
        policy: UserPolicy {
            preferred_time_slots: vec![TimeSlot::Morning],
            ..Default::default()
        },
    };
    build_draft(&params, &catalog, seed).unwrap()
}

#[test]
fn test_schema_bootstrap_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.db");
    drop(Database::new(&path).unwrap());
    // reopening re-runs schema + migrations without complaint
    drop(Database::new(&path).unwrap());
}

#[test]
fn test_ensure_user_is_idempotent() {
    let (_temp_dir, mut db) = create_test_database();

    let first = db.ensure_user(42, "Europe/Kyiv").unwrap();
    assert_eq!(first.timezone, "Europe/Kyiv");
    assert_eq!(first.current_state, SessionState::IdleNew);

    // a second call keeps the existing row
    let second = db.ensure_user(42, "America/New_York").unwrap();
    assert_eq!(second.timezone, "Europe/Kyiv");
    assert_eq!(second.created_at, first.created_at);
}

#[test]
fn test_user_state_and_timezone_updates() {
    let (_temp_dir, mut db) = create_test_database();
    db.ensure_user(1, "UTC").unwrap();

    db.update_user_state(1, SessionState::Active).unwrap();
    db.update_user_timezone(1, "Europe/Kyiv").unwrap();

    let user = db.get_user(1).unwrap().unwrap();
    assert_eq!(user.current_state, SessionState::Active);
    assert_eq!(user.timezone, "Europe/Kyiv");

    // updates against a missing user fail loudly
    assert!(db.update_user_state(999, SessionState::Active).is_err());
}

#[test]
fn test_draft_round_trip_and_replacement() {
    let (_temp_dir, mut db) = create_test_database();
    db.ensure_user(5, "UTC").unwrap();

    let first = sample_draft("one");
    db.replace_draft(5, &first).unwrap();
    let stored = db.get_draft(5).unwrap().unwrap();
    assert_eq!(stored, first);

    // composing again fully replaces the previous draft
    let second = sample_draft("two");
    db.replace_draft(5, &second).unwrap();
    let stored = db.get_draft(5).unwrap().unwrap();
    assert_eq!(stored.id, second.id);

    db.delete_draft(5).unwrap();
    assert!(db.get_draft(5).unwrap().is_none());
}

#[test]
fn test_slot_times_survive_round_trip() {
    let (_temp_dir, mut db) = create_test_database();
    db.ensure_user(6, "UTC").unwrap();

    let mut slot_times = BTreeMap::new();
    slot_times.insert("MORNING".to_string(), "08:00".to_string());
    slot_times.insert("DAY".to_string(), "13:30".to_string());
    slot_times.insert("EVENING".to_string(), "20:45".to_string());
    db.update_user_time_slots(6, &slot_times, jiff::Timestamp::now())
        .unwrap();

    let user = db.get_user(6).unwrap().unwrap();
    assert_eq!(user.slot_times, Some(slot_times));
    let effective = user.effective_slot_times();
    assert_eq!(effective.to_strings()["MORNING"], "08:00");
}
