// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queued-message wire format for `queue.json`.

use crate::id::hex8;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pending outbound message. Order in [`QueueState::messages`] is
/// insertion order (FIFO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub queued_at: DateTime<Utc>,
}

/// Contents of `queue.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(default)]
    pub messages: Vec<QueuedMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Generate a queue message id: `q-<unix>-<hex8>`.
pub fn message_id(now: DateTime<Utc>) -> String {
    format!("q-{}-{}", now.timestamp(), hex8())
}

/// Direction for reordering a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    Up,
    Down,
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
