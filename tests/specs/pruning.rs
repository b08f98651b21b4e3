// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention specs.

use crate::prelude::*;
use mitto_store::PruneConfig;

#[test]
fn ten_events_pruned_to_five() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "S3");
    for i in 0..10 {
        store.append_event(&id, user_prompt(&format!("m{i}"))).unwrap();
    }

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 5, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats.events_removed, 5);

    let events = store.read_events(&id).unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(store.get_metadata(&id).unwrap().event_count, 5);
}

#[test]
fn appends_stay_dense_after_prune() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");
    for i in 0..10 {
        store.append_event(&id, user_prompt(&format!("m{i}"))).unwrap();
    }
    store.prune_if_needed(&id, &PruneConfig { max_messages: 4, max_size_bytes: 0 }).unwrap();

    let appended = store.append_event(&id, user_prompt("after prune")).unwrap();
    assert_eq!(appended.seq, 5);

    let events = store.read_events(&id).unwrap();
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);

    // max_seq never went backwards
    let meta = store.get_metadata(&id).unwrap();
    assert!(meta.max_seq >= 10);
    assert!(meta.max_seq >= meta.event_count);
}

#[test]
fn repeated_prune_converges() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");
    for i in 0..8 {
        store.append_event(&id, user_prompt(&format!("m{i}"))).unwrap();
    }

    let config = PruneConfig { max_messages: 3, max_size_bytes: 0 };
    let first = store.prune_if_needed(&id, &config).unwrap();
    assert_eq!(first.events_removed, 5);

    let second = store.prune_if_needed(&id, &config).unwrap();
    assert_eq!(second.events_removed, 0, "already within bounds");
}
