// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock record wire format and ownership classification.
//!
//! The `.lock` file grants cross-process exclusive ownership of a session.
//! This module holds the record shape and the pure classification logic;
//! acquisition, heartbeats, and liveness probing live in the store crate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What the lock holder is currently doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    #[default]
    Idle,
    Processing,
    WaitingForPermission,
}

crate::simple_display! {
    ClientStatus {
        Idle => "idle",
        Processing => "processing",
        WaitingForPermission => "waiting_for_permission",
    }
}

/// Contents of a session's `.lock` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRecord {
    pub pid: u32,
    pub hostname: String,
    /// Random per-acquisition id; a mismatch means the lock was stolen.
    pub instance_id: String,
    pub client_type: String,
    pub started_at: DateTime<Utc>,
    pub heartbeat: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub status: ClientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl LockRecord {
    /// A lock whose heartbeat is older than `stale_timeout` is stealable.
    pub fn is_stale(&self, now: DateTime<Utc>, stale_timeout: Duration) -> bool {
        now - self.heartbeat > stale_timeout
    }
}

/// Classification of a session's lock for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Stale,
    DeadOwner,
    Idle,
    Processing,
    WaitingPermission,
    Unknown,
}

/// Result of inspecting a session's lock without attempting acquisition.
///
/// `message` is prose for UI display; the capability flags say which
/// acquisition call would succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStatus {
    pub state: LockState,
    pub message: String,
    pub can_resume: bool,
    pub can_force: bool,
    pub can_interrupt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<LockRecord>,
}

impl LockStatus {
    /// Classify a lock record read from disk.
    ///
    /// `holder_alive` is the caller's pid probe: `Some(false)` only when the
    /// record names this host and the pid is known dead; `None` when the
    /// owner runs elsewhere and liveness cannot be determined.
    pub fn classify(
        record: Option<LockRecord>,
        holder_alive: Option<bool>,
        now: DateTime<Utc>,
        stale_timeout: Duration,
    ) -> Self {
        let Some(record) = record else {
            return Self {
                state: LockState::Unlocked,
                message: "session is not locked".to_string(),
                can_resume: true,
                can_force: true,
                can_interrupt: true,
                holder: None,
            };
        };

        if holder_alive == Some(false) {
            return Self {
                state: LockState::DeadOwner,
                message: format!(
                    "lock owner (pid {}) is no longer running; safe to resume",
                    record.pid
                ),
                can_resume: true,
                can_force: true,
                can_interrupt: true,
                holder: Some(record),
            };
        }

        if record.is_stale(now, stale_timeout) {
            let age = now - record.heartbeat;
            return Self {
                state: LockState::Stale,
                message: format!(
                    "lock is stale (no heartbeat for {}s); safe to resume",
                    age.num_seconds()
                ),
                can_resume: true,
                can_force: true,
                can_interrupt: true,
                holder: Some(record),
            };
        }

        let (state, message, can_force) = match record.status {
            ClientStatus::Idle => (
                LockState::Idle,
                format!("session is open in another {} client", record.client_type),
                true,
            ),
            ClientStatus::Processing => (
                LockState::Processing,
                format!("another {} client is mid-task", record.client_type),
                false,
            ),
            ClientStatus::WaitingForPermission => (
                LockState::WaitingPermission,
                format!("another {} client is waiting for a permission answer", record.client_type),
                false,
            ),
        };

        Self {
            state,
            message,
            can_resume: false,
            can_force,
            can_interrupt: true,
            holder: Some(record),
        }
    }

    /// Status for a lock file that exists but could not be read.
    pub fn unreadable() -> Self {
        Self {
            state: LockState::Unknown,
            message: "lock file exists but could not be read".to_string(),
            can_resume: false,
            can_force: false,
            can_interrupt: true,
            holder: None,
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
