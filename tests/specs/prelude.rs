// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the spec tests.

pub use mitto_core::event::{Event, EventKind, UserPromptData};
pub use mitto_core::session::SessionId;
pub use mitto_store::{SessionStore, StoreError};
pub use tempfile::{tempdir, TempDir};

/// A store plus a created session.
pub fn store_with_session(dir: &TempDir, id: &str) -> (SessionStore, SessionId) {
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new(id);
    store.create(&id, "srv", "/w").unwrap();
    (store, id)
}

/// A second store instance over the same directory, standing in for another
/// process sharing the tree.
pub fn reopen(dir: &TempDir) -> SessionStore {
    SessionStore::open(dir.path()).unwrap()
}

pub fn user_prompt(text: &str) -> Event {
    Event::typed(
        EventKind::UserPrompt,
        &UserPromptData { message: text.to_string(), ..Default::default() },
    )
    .unwrap()
}

pub fn agent_message(html: &str) -> Event {
    Event::typed(
        EventKind::AgentMessage,
        &mitto_core::event::AgentMessageData { html: html.to_string() },
    )
    .unwrap()
}
