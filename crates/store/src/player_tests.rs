// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mitto_core::event::AgentMessageData;
use serde_json::json;
use tempfile::tempdir;

fn prompt(text: &str) -> Event {
    Event::typed(
        EventKind::UserPrompt,
        &UserPromptData { message: text.to_string(), ..Default::default() },
    )
    .unwrap()
}

fn message(text: &str) -> Event {
    Event::typed(EventKind::AgentMessage, &AgentMessageData { html: text.to_string() }).unwrap()
}

fn seeded_player(events: Vec<Event>) -> (tempfile::TempDir, Player) {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new("s1");
    store.create(&id, "srv", "/w").unwrap();
    for event in events {
        store.append_event(&id, event).unwrap();
    }
    let player = Player::new(&store, &id).unwrap();
    (dir, player)
}

#[test]
fn cursor_walks_the_log() {
    let (_dir, mut player) = seeded_player(vec![prompt("a"), message("b"), prompt("c")]);

    assert_eq!(player.event_count(), 3);
    assert_eq!(player.position(), 0);
    assert_eq!(player.peek().unwrap().seq, 1);

    assert_eq!(player.next().unwrap().seq, 1);
    assert_eq!(player.next().unwrap().seq, 2);
    assert_eq!(player.position(), 2);
    assert_eq!(player.next().unwrap().seq, 3);
    assert!(player.next().is_none());
    assert!(player.peek().is_none());

    player.reset();
    assert_eq!(player.next().unwrap().seq, 1);

    player.seek(2);
    assert_eq!(player.next().unwrap().seq, 3);

    // past the end clamps
    player.seek(99);
    assert!(player.next().is_none());
}

#[test]
fn events_of_type_filters() {
    let (_dir, player) = seeded_player(vec![prompt("a"), message("b"), prompt("c")]);

    let prompts = player.events_of_type(&EventKind::UserPrompt);
    assert_eq!(prompts.len(), 2);
    assert!(player.events_of_type(&EventKind::Plan).is_empty());
}

#[test]
fn player_on_missing_session_fails() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();

    assert!(matches!(
        Player::new(&store, &SessionId::new("ghost")),
        Err(StoreError::SessionNotFound(_))
    ));
}

#[test]
fn history_folds_turns() {
    let events = vec![
        prompt("Hi"),
        message("Hello"),
        message(" there!"),
        prompt("Bye"),
        message("See you"),
    ];
    let (_dir, player) = seeded_player(events);

    let turns = build_conversation_history(player.events(), 0);
    assert_eq!(
        turns,
        vec![
            ConversationTurn { user: "Hi".to_string(), agent: "Hello there!".to_string() },
            ConversationTurn { user: "Bye".to_string(), agent: "See you".to_string() },
        ]
    );
}

#[test]
fn history_caps_last_n_turns() {
    let mut events = Vec::new();
    for i in 0..5 {
        events.push(prompt(&format!("q{i}")));
        events.push(message(&format!("a{i}")));
    }
    let (_dir, player) = seeded_player(events);

    let turns = build_conversation_history(player.events(), 2);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].user, "q3");
    assert_eq!(turns[1].user, "q4");
}

#[test]
fn history_truncates_long_texts() {
    let long_user = "u".repeat(600);
    let long_agent = "a".repeat(1500);
    let (_dir, player) = seeded_player(vec![prompt(&long_user), message(&long_agent)]);

    let turns = build_conversation_history(player.events(), 0);
    assert_eq!(turns[0].user.chars().count(), 503); // 500 + "..."
    assert!(turns[0].user.ends_with("..."));
    assert_eq!(turns[0].agent.chars().count(), 1003);
}

#[test]
fn history_tolerates_agent_before_any_prompt() {
    let (_dir, player) = seeded_player(vec![message("welcome back")]);

    let turns = build_conversation_history(player.events(), 0);
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].user, "");
    assert_eq!(turns[0].agent, "welcome back");
}

#[test]
fn history_skips_undecodable_payloads() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new("s1");
    store.create(&id, "srv", "/w").unwrap();
    store.append_event(&id, prompt("ok")).unwrap();
    // user_prompt with a payload that does not decode
    store
        .append_event(&id, Event::new(EventKind::UserPrompt, json!({"message": 42})))
        .unwrap();

    let events = store.read_events(&id).unwrap();
    let turns = build_conversation_history(&events, 0);
    assert_eq!(turns.len(), 1);
}

#[test]
fn tail_inspectors() {
    let (_dir, player) = seeded_player(vec![
        prompt("first"),
        message("reply one"),
        prompt("second"),
        message("reply two"),
    ]);

    assert_eq!(last_agent_message(player.events()).as_deref(), Some("reply two"));
    assert_eq!(last_user_prompt(player.events()).as_deref(), Some("second"));

    let info = last_user_prompt_info(player.events()).unwrap();
    assert_eq!(info.data.message, "second");
    assert_eq!(info.seq, 3);
}

#[test]
fn tail_inspectors_empty_log() {
    let (_dir, player) = seeded_player(vec![]);

    assert!(last_agent_message(player.events()).is_none());
    assert!(last_user_prompt(player.events()).is_none());
    assert!(last_user_prompt_info(player.events()).is_none());
}
