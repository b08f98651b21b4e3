// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the session log.
//!
//! One event is one line of `events.jsonl`:
//! `{"seq":N,"type":"...","timestamp":"...","data":{...}}`.
//!
//! The payload stays a raw [`serde_json::Value`] on the event itself so the
//! log survives unknown event types; [`decode_event_data`] is the separate
//! step that re-serializes the raw map into the typed shape. Unknown type
//! tags deserialize to [`EventKind::Unknown`] and pass through untouched.

mod payload;

pub use payload::{
    AgentMessageData, AgentThoughtData, ErrorData, FileReadData, FileRef, FileWriteData,
    ImageRef, PermissionData, PlanData, PlanEntry, SessionEndData, SessionStartData,
    ToolCallData, ToolCallUpdateData, UiPromptAnswerData, UserPromptData,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire type tag of an event.
///
/// Serializes as its snake_case tag string. Tags this build does not know
/// deserialize to [`EventKind::Unknown`] and round-trip verbatim, so the
/// enum needs hand-written serde impls rather than a derive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    UserPrompt,
    AgentMessage,
    AgentThought,
    ToolCall,
    ToolCallUpdate,
    Plan,
    Permission,
    FileRead,
    FileWrite,
    Error,
    SessionStart,
    SessionEnd,
    UiPromptAnswer,
    /// Forward compatibility: any tag this build does not know about.
    Unknown(String),
}

impl EventKind {
    /// The tag for a wire string, falling back to `Unknown`.
    pub fn from_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        match tag.as_str() {
            "user_prompt" => Self::UserPrompt,
            "agent_message" => Self::AgentMessage,
            "agent_thought" => Self::AgentThought,
            "tool_call" => Self::ToolCall,
            "tool_call_update" => Self::ToolCallUpdate,
            "plan" => Self::Plan,
            "permission" => Self::Permission,
            "file_read" => Self::FileRead,
            "file_write" => Self::FileWrite,
            "error" => Self::Error,
            "session_start" => Self::SessionStart,
            "session_end" => Self::SessionEnd,
            "ui_prompt_answer" => Self::UiPromptAnswer,
            _ => Self::Unknown(tag),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::UserPrompt => "user_prompt",
            Self::AgentMessage => "agent_message",
            Self::AgentThought => "agent_thought",
            Self::ToolCall => "tool_call",
            Self::ToolCallUpdate => "tool_call_update",
            Self::Plan => "plan",
            Self::Permission => "permission",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::Error => "error",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
            Self::UiPromptAnswer => "ui_prompt_answer",
            Self::Unknown(tag) => tag,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(tag))
    }
}

/// One immutable record in a session's append-only log.
///
/// `seq` is strictly increasing within a session: dense (1, 2, 3, ...) under
/// normal appends, possibly sparse after pruning renumbers the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default = "unix_epoch")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

impl Event {
    /// New unsequenced event; the store assigns `seq` and stamps the
    /// timestamp on append.
    pub fn new(kind: EventKind, data: Value) -> Self {
        Self { seq: 0, kind, timestamp: unix_epoch(), data }
    }

    /// New event with a typed payload.
    pub fn typed<T: Serialize>(kind: EventKind, data: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(data)?))
    }

    /// Whether the timestamp is still the unset sentinel.
    pub fn timestamp_is_zero(&self) -> bool {
        self.timestamp == unix_epoch()
    }
}

/// Typed view of an event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    UserPrompt(UserPromptData),
    AgentMessage(AgentMessageData),
    AgentThought(AgentThoughtData),
    ToolCall(ToolCallData),
    ToolCallUpdate(ToolCallUpdateData),
    Plan(PlanData),
    Permission(PermissionData),
    FileRead(FileReadData),
    FileWrite(FileWriteData),
    Error(ErrorData),
    SessionStart(SessionStartData),
    SessionEnd(SessionEndData),
    UiPromptAnswer(UiPromptAnswerData),
    /// Payload of an event type this build does not know about, unchanged.
    Unknown(Value),
}

/// Decode an event's raw payload into its typed shape.
///
/// Goes through JSON re-serialization so readers keep working when
/// producers add fields.
pub fn decode_event_data(event: &Event) -> Result<EventData, serde_json::Error> {
    let data = event.data.clone();
    Ok(match &event.kind {
        EventKind::UserPrompt => EventData::UserPrompt(serde_json::from_value(data)?),
        EventKind::AgentMessage => EventData::AgentMessage(serde_json::from_value(data)?),
        EventKind::AgentThought => EventData::AgentThought(serde_json::from_value(data)?),
        EventKind::ToolCall => EventData::ToolCall(serde_json::from_value(data)?),
        EventKind::ToolCallUpdate => EventData::ToolCallUpdate(serde_json::from_value(data)?),
        EventKind::Plan => EventData::Plan(serde_json::from_value(data)?),
        EventKind::Permission => EventData::Permission(serde_json::from_value(data)?),
        EventKind::FileRead => EventData::FileRead(serde_json::from_value(data)?),
        EventKind::FileWrite => EventData::FileWrite(serde_json::from_value(data)?),
        EventKind::Error => EventData::Error(serde_json::from_value(data)?),
        EventKind::SessionStart => EventData::SessionStart(serde_json::from_value(data)?),
        EventKind::SessionEnd => EventData::SessionEnd(serde_json::from_value(data)?),
        EventKind::UiPromptAnswer => EventData::UiPromptAnswer(serde_json::from_value(data)?),
        EventKind::Unknown(_) => EventData::Unknown(data),
    })
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
