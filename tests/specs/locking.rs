// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock contention specs across two store instances.

use crate::prelude::*;
use mitto_core::lock::{ClientStatus, LockState};

#[test]
#[serial_test::serial(lock_registry)]
fn contention_escalation_ladder() {
    let dir = tempdir().unwrap();
    let (store_a, id) = store_with_session(&dir, "S2");
    let store_b = reopen(&dir);

    // cli client owns the session
    let lock = store_a.try_acquire_lock(&id, "cli").unwrap();

    // a second client cannot just take it
    assert!(matches!(store_b.try_acquire_lock(&id, "web"), Err(StoreError::SessionLocked(_))));

    // mid-task, even force is refused
    lock.set_status(ClientStatus::Processing, Some("streaming")).unwrap();
    assert!(matches!(
        store_b.force_acquire_lock(&id, "web"),
        Err(StoreError::SessionProcessing(_))
    ));

    // user-confirmed interrupt always wins
    let stolen = store_b.force_interrupt_lock(&id, "web").unwrap();
    assert!(!lock.is_valid(), "original holder must observe the steal");
    assert!(stolen.is_valid());
    assert_eq!(stolen.info().client_type, "web");

    stolen.release().unwrap();
    lock.release().unwrap();
}

#[test]
#[serial_test::serial(lock_registry)]
fn lock_instance_id_matches_disk_until_release() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");

    let lock = store.try_acquire_lock(&id, "cli").unwrap();
    let on_disk = store.get_lock_info(&id).unwrap().unwrap();
    assert_eq!(on_disk.instance_id, lock.instance_id());

    lock.release().unwrap();
    assert!(store.get_lock_info(&id).unwrap().is_none());
}

#[test]
#[serial_test::serial(lock_registry)]
fn status_report_guides_the_ui() {
    let dir = tempdir().unwrap();
    let (store_a, id) = store_with_session(&dir, "s1");
    let store_b = reopen(&dir);

    let report = store_b.check_lock_status(&id).unwrap();
    assert_eq!(report.state, LockState::Unlocked);
    assert!(report.can_resume);

    let lock = store_a.try_acquire_lock(&id, "cli").unwrap();

    let report = store_b.check_lock_status(&id).unwrap();
    assert_eq!(report.state, LockState::Idle);
    assert!(!report.can_resume && report.can_force && report.can_interrupt);
    assert!(!report.message.is_empty());
    assert_eq!(report.holder.unwrap().client_type, "cli");

    lock.set_status(ClientStatus::WaitingForPermission, None).unwrap();
    let report = store_b.check_lock_status(&id).unwrap();
    assert_eq!(report.state, LockState::WaitingPermission);
    assert!(!report.can_force && report.can_interrupt);

    lock.release().unwrap();
}

#[test]
#[serial_test::serial(lock_registry)]
fn well_behaved_writer_checks_lock_before_appending() {
    let dir = tempdir().unwrap();
    let (store_a, id) = store_with_session(&dir, "s1");
    let store_b = reopen(&dir);

    let lock = store_a.try_acquire_lock(&id, "cli").unwrap();
    store_a.append_event(&id, user_prompt("owned write")).unwrap();

    // the other client sees it must not write, and reads instead
    assert!(store_b.is_locked(&id).unwrap());
    let events = store_b.read_events(&id).unwrap();
    assert_eq!(events.len(), 1);

    lock.release().unwrap();
    let lock_b = store_b.try_acquire_lock(&id, "web").unwrap();
    store_b.append_event(&id, user_prompt("handed over")).unwrap();
    assert_eq!(store_a.read_events(&id).unwrap().len(), 2);
    lock_b.release().unwrap();
}
