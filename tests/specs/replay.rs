// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder → crash → resume-and-replay, the way a browser refresh does it.

use crate::prelude::*;
use mitto_core::metadata::SessionStatus;
use mitto_store::{build_conversation_history, last_agent_message, Player, Recorder};
use std::sync::Arc;

#[test]
fn record_crash_resume_replay() {
    let dir = tempdir().unwrap();
    let id = SessionId::new("s1");

    // first process: record a short conversation, then vanish without end()
    {
        let store = Arc::new(SessionStore::open(dir.path()).unwrap());
        let recorder = Recorder::new(Arc::clone(&store), id.clone());
        recorder.start("claude-code", "/repo").unwrap();
        recorder
            .record_user_prompt(UserPromptData {
                message: "fix the tests".to_string(),
                ..Default::default()
            })
            .unwrap();
        recorder.record_agent_message("on it").unwrap();
        recorder.suspend();
    }

    // second process: resume and rebuild the view
    let store = Arc::new(SessionStore::open(dir.path()).unwrap());
    let recorder = Recorder::new(Arc::clone(&store), id.clone());
    recorder.resume().unwrap();
    assert_eq!(store.get_metadata(&id).unwrap().status, SessionStatus::Active);

    let mut player = Player::new(store.as_ref(), &id).unwrap();
    assert_eq!(player.event_count(), 3); // session_start + prompt + message

    let kinds: Vec<EventKind> = std::iter::from_fn(|| player.next().map(|e| e.kind.clone())).collect();
    assert_eq!(
        kinds,
        vec![EventKind::SessionStart, EventKind::UserPrompt, EventKind::AgentMessage]
    );

    let history = build_conversation_history(player.events(), 0);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user, "fix the tests");
    assert_eq!(history[0].agent, "on it");
    assert_eq!(last_agent_message(player.events()).as_deref(), Some("on it"));

    // continue the conversation where it left off
    let appended = recorder.record_agent_message("done, three tests fixed").unwrap();
    assert_eq!(appended.seq, 4);
}

#[test]
fn ended_session_reads_back_complete() {
    let dir = tempdir().unwrap();
    let id = SessionId::new("s1");
    let store = Arc::new(SessionStore::open(dir.path()).unwrap());

    let recorder = Recorder::new(Arc::clone(&store), id.clone());
    recorder.start("srv", "/w").unwrap();
    recorder
        .record_user_prompt(UserPromptData { message: "hello".to_string(), ..Default::default() })
        .unwrap();
    recorder
        .end(mitto_core::event::SessionEndData {
            reason: "completed".to_string(),
            ..Default::default()
        })
        .unwrap();

    let meta = store.get_metadata(&id).unwrap();
    assert_eq!(meta.status, SessionStatus::Completed);

    let player = Player::new(store.as_ref(), &id).unwrap();
    let ends = player.events_of_type(&EventKind::SessionEnd);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].seq, player.events().iter().map(|e| e.seq).max().unwrap());
}
