// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-side cursor and conversation summaries.
//!
//! A [`Player`] materializes the whole log in memory; sessions are bounded
//! by pruning, so there is no streaming cursor on disk. The free functions
//! fold events into the compact conversation views used for resumption
//! summaries.

use crate::error::StoreError;
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use mitto_core::clock::Clock;
use mitto_core::event::{decode_event_data, Event, EventData, EventKind, UserPromptData};
use mitto_core::session::SessionId;

const USER_TEXT_LIMIT: usize = 500;
const AGENT_TEXT_LIMIT: usize = 1000;

/// Replay cursor over one session's events.
pub struct Player {
    session_id: SessionId,
    events: Vec<Event>,
    position: usize,
}

impl Player {
    /// Load every event of the session into memory.
    pub fn new<C: Clock>(store: &SessionStore<C>, id: &SessionId) -> Result<Self, StoreError> {
        Ok(Self { session_id: id.clone(), events: store.read_events(id)?, position: 0 })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The event under the cursor, advancing past it.
    pub fn next(&mut self) -> Option<&Event> {
        if self.position >= self.events.len() {
            return None;
        }
        let index = self.position;
        self.position += 1;
        self.events.get(index)
    }

    /// The event under the cursor, without advancing.
    pub fn peek(&self) -> Option<&Event> {
        self.events.get(self.position)
    }

    /// Move the cursor; positions past the end clamp to the end.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.events.len());
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_of_type(&self, kind: &EventKind) -> Vec<&Event> {
        self.events.iter().filter(|event| event.kind == *kind).collect()
    }
}

/// One `(user, agent)` exchange in a conversation summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user: String,
    pub agent: String,
}

/// Truncate to `limit` characters, appending an ellipsis when cut.
fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

/// Fold events into user/agent turns.
///
/// A `user_prompt` opens a new turn; successive `agent_message` payloads
/// concatenate into the current turn. Keeps the last `max_turns` turns
/// (0 = all), truncating user text to 500 chars and agent text to 1000.
pub fn build_conversation_history(events: &[Event], max_turns: usize) -> Vec<ConversationTurn> {
    let mut turns: Vec<ConversationTurn> = Vec::new();
    for event in events {
        match &event.kind {
            EventKind::UserPrompt => {
                let Ok(EventData::UserPrompt(data)) = decode_event_data(event) else {
                    continue;
                };
                turns.push(ConversationTurn {
                    user: truncate_text(&data.message, USER_TEXT_LIMIT),
                    agent: String::new(),
                });
            }
            EventKind::AgentMessage => {
                let Ok(EventData::AgentMessage(data)) = decode_event_data(event) else {
                    continue;
                };
                if turns.is_empty() {
                    // agent spoke first (e.g. resumed mid-conversation)
                    turns.push(ConversationTurn::default());
                }
                if let Some(turn) = turns.last_mut() {
                    turn.agent.push_str(&data.html);
                    turn.agent = truncate_text(&turn.agent, AGENT_TEXT_LIMIT);
                }
            }
            _ => {}
        }
    }

    if max_turns > 0 && turns.len() > max_turns {
        turns.drain(..turns.len() - max_turns);
    }
    turns
}

/// Text of the last `agent_message`, if any.
pub fn last_agent_message(events: &[Event]) -> Option<String> {
    events.iter().rev().find_map(|event| match decode_event_data(event) {
        Ok(EventData::AgentMessage(data)) => Some(data.html),
        _ => None,
    })
}

/// Message of the last `user_prompt`, if any.
pub fn last_user_prompt(events: &[Event]) -> Option<String> {
    last_user_prompt_info(events).map(|info| info.data.message)
}

/// The last user prompt with its log coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UserPromptInfo {
    pub data: UserPromptData,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
}

pub fn last_user_prompt_info(events: &[Event]) -> Option<UserPromptInfo> {
    events.iter().rev().find_map(|event| match decode_event_data(event) {
        Ok(EventData::UserPrompt(data)) => {
            Some(UserPromptInfo { data, seq: event.seq, timestamp: event.timestamp })
        }
        _ => None,
    })
}

#[cfg(test)]
#[path = "player_tests.rs"]
mod tests;
