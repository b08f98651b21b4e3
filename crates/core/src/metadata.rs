// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session metadata, the mutable header persisted as `metadata.json`.

use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
    Error,
}

crate::simple_display! {
    SessionStatus {
        Active => "active",
        Completed => "completed",
        Error => "error",
    }
}

/// The session's mutable header.
///
/// `event_count` is the number of lines in `events.jsonl`; `max_seq` is the
/// highest sequence number ever persisted. Both are monotonic; after pruning
/// `max_seq >= event_count` (the pruner rewrites `event_count` only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: SessionId,
    #[serde(default)]
    pub acp_server: String,
    #[serde(default)]
    pub working_dir: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub event_count: u64,
    #[serde(default)]
    pub max_seq: u64,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_user_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    /// Legacy flag kept for wire compatibility with older clients.
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub advanced_settings: HashMap<String, bool>,
}

impl SessionMetadata {
    /// Fresh metadata for a newly created session.
    pub fn new(
        session_id: SessionId,
        acp_server: impl Into<String>,
        working_dir: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            acp_server: acp_server.into(),
            working_dir: working_dir.into(),
            created_at: now,
            updated_at: now,
            event_count: 0,
            max_seq: 0,
            status: SessionStatus::Active,
            last_user_message_at: None,
            archived: false,
            archived_at: None,
            pinned: false,
            advanced_settings: HashMap::new(),
        }
    }

    /// Sort key for session listings: last user activity, else last update.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.last_user_message_at.unwrap_or(self.updated_at)
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
