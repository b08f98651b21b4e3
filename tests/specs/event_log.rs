// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log specs: ordering, metadata bookkeeping, cross-instance reads.

use crate::prelude::*;

#[test]
fn three_message_conversation() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new("S");
    store.create(&id, "srv", "/w").unwrap();

    store.append_event(&id, user_prompt("Hi")).unwrap();
    store.append_event(&id, agent_message("Hello!")).unwrap();
    let last = store.append_event(&id, user_prompt("Bye")).unwrap();

    let events = store.read_events(&id).unwrap();
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(
        events.iter().map(|e| e.kind.clone()).collect::<Vec<_>>(),
        vec![EventKind::UserPrompt, EventKind::AgentMessage, EventKind::UserPrompt]
    );

    let meta = store.get_metadata(&id).unwrap();
    assert_eq!(meta.event_count, 3);
    assert_eq!(meta.last_user_message_at, Some(last.timestamp));
}

#[test]
fn seqs_are_dense_and_strictly_increasing() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");

    for i in 0..50 {
        store.append_event(&id, user_prompt(&format!("m{i}"))).unwrap();
    }

    let events = store.read_events(&id).unwrap();
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.seq, i as u64 + 1, "gap at index {i}");
    }

    let meta = store.get_metadata(&id).unwrap();
    assert_eq!(meta.event_count, 50);
    assert_eq!(meta.max_seq, events.iter().map(|e| e.seq).max().unwrap());
}

#[test]
fn another_instance_reads_what_one_wrote() {
    let dir = tempdir().unwrap();
    let (writer, id) = store_with_session(&dir, "s1");
    writer.append_event(&id, user_prompt("from writer")).unwrap();

    // a different store instance over the same tree, as after a restart
    let reader = reopen(&dir);
    let events = reader.read_events(&id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data["message"], "from writer");

    let listed = reader.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].session_id, id);
}

#[test]
fn tail_reads_page_backwards() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");
    for i in 0..10 {
        store.append_event(&id, user_prompt(&format!("m{i}"))).unwrap();
    }

    // walk the log backwards three at a time
    let mut cursor = 0u64; // 0 = from the end
    let mut seen: Vec<u64> = Vec::new();
    loop {
        let page = store.read_events_last(&id, 3, cursor).unwrap();
        if page.is_empty() {
            break;
        }
        cursor = page[0].seq;
        for event in page.iter().rev() {
            seen.push(event.seq);
        }
    }
    assert_eq!(seen, (1..=10).rev().collect::<Vec<u64>>());
}
