// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the session store.

use mitto_core::periodic::FrequencyError;
use mitto_core::session::SessionId;
use thiserror::Error;

/// Errors that can occur in store operations.
///
/// Messages are terse; prose for end users is the collaborator's job.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is closed")]
    StoreClosed,

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("session already exists: {0}")]
    SessionExists(SessionId),

    #[error("session id is not filesystem-safe: {0:?}")]
    InvalidSessionId(String),

    #[error("cannot determine data directory (HOME unset)")]
    NoDataDir,

    // -- lock --
    #[error("session {0} is locked by another client")]
    SessionLocked(SessionId),

    #[error("session {0} is locked and mid-task")]
    SessionProcessing(SessionId),

    #[error("session {0} is locked and waiting for a permission answer")]
    SessionWaitingPermission(SessionId),

    #[error("lock is no longer held")]
    LockNotHeld,

    // -- queue --
    #[error("queue is empty")]
    QueueEmpty,

    #[error("queue is full ({max} messages)")]
    QueueFull { max: usize },

    #[error("message not found: {0}")]
    MessageNotFound(String),

    // -- periodic --
    #[error("no periodic prompt configured")]
    PeriodicNotFound,

    #[error("periodic prompt must not be empty")]
    PromptEmpty,

    #[error(transparent)]
    InvalidFrequency(#[from] FrequencyError),

    // -- blobs --
    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("image too large: {size} bytes (max {max})")]
    ImageTooLarge { size: u64, max: u64 },

    #[error("file too large: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("session image limit reached ({max} images)")]
    SessionImageLimit { max: usize },

    #[error("session image storage limit reached ({max} bytes)")]
    SessionStorageLimit { max: u64 },

    #[error("session file limit reached ({max} files)")]
    SessionFileLimit { max: usize },

    #[error("session file storage limit reached ({max} bytes)")]
    SessionFileStorageLimit { max: u64 },

    // -- events --
    #[error("record_event requires a pre-assigned seq")]
    SeqRequired,

    #[error("event line exceeds {max} bytes")]
    LineTooLong { max: usize },

    #[error("corrupt event log at line {line}: {source}")]
    CorruptEventLog { line: usize, source: serde_json::Error },

    // -- maintenance --
    #[error("invalid cleanup period: {0:?}")]
    InvalidCleanupPeriod(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
