// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle, paths, and metadata for the store root.
//!
//! A [`SessionStore`] exclusively owns its base directory from this process's
//! perspective, but peer processes may mutate the same tree; the filesystem
//! is the source of truth and every mutable file is written atomically. The
//! store's RwLock only serializes writers against readers inside this
//! process.

use crate::error::StoreError;
use crate::fsutil::{read_json, read_json_opt, write_json_atomic};
use crate::lock::LockSettings;
use chrono::{DateTime, Duration, Utc};
use mitto_core::blob::BlobKind;
use mitto_core::clock::{Clock, SystemClock};
use mitto_core::metadata::SessionMetadata;
use mitto_core::session::SessionId;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fs;
use std::path::{Path, PathBuf};

/// Hard cap on a single event line; longer lines fail reads.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

pub(crate) struct StoreState {
    pub(crate) closed: bool,
}

/// The session store: one directory per session under a base directory.
pub struct SessionStore<C: Clock = SystemClock> {
    base_dir: PathBuf,
    clock: C,
    state: RwLock<StoreState>,
    lock_settings: LockSettings,
}

/// Resolve the default base directory:
/// `$XDG_DATA_HOME/mitto/sessions`, else `~/.local/share/mitto/sessions`.
pub fn default_base_dir() -> Result<PathBuf, StoreError> {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("mitto").join("sessions"));
        }
    }
    let home = std::env::var("HOME").map_err(|_| StoreError::NoDataDir)?;
    Ok(PathBuf::from(home).join(".local/share/mitto/sessions"))
}

impl SessionStore<SystemClock> {
    /// Open a store rooted at `base_dir`, creating it if missing.
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(base_dir, SystemClock)
    }

    /// Open the store at the default base directory.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_base_dir()?)
    }
}

impl<C: Clock> SessionStore<C> {
    pub fn open_with_clock(base_dir: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(Self {
            base_dir,
            clock,
            state: RwLock::new(StoreState { closed: false }),
            lock_settings: LockSettings::default(),
        })
    }

    /// Override lock timings (heartbeat interval, stale timeout).
    pub fn set_lock_settings(&mut self, settings: LockSettings) {
        self.lock_settings = settings;
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now_utc()
    }

    pub(crate) fn lock_settings(&self) -> &LockSettings {
        &self.lock_settings
    }

    // -- paths --

    pub fn session_dir(&self, id: &SessionId) -> PathBuf {
        self.base_dir.join(id.as_str())
    }

    pub(crate) fn metadata_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("metadata.json")
    }

    pub(crate) fn events_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("events.jsonl")
    }

    pub(crate) fn lock_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join(".lock")
    }

    pub(crate) fn queue_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("queue.json")
    }

    pub(crate) fn periodic_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("periodic.json")
    }

    pub(crate) fn action_buttons_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("action_buttons.json")
    }

    pub(crate) fn user_data_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join("user-data.json")
    }

    pub(crate) fn blob_dir(&self, id: &SessionId, kind: BlobKind) -> PathBuf {
        self.session_dir(id).join(kind.dir_name())
    }

    // -- guards --

    pub(crate) fn write_guard(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        let guard = self.state.write();
        if guard.closed {
            return Err(StoreError::StoreClosed);
        }
        Ok(guard)
    }

    pub(crate) fn read_guard(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        let guard = self.state.read();
        if guard.closed {
            return Err(StoreError::StoreClosed);
        }
        Ok(guard)
    }

    // -- lifecycle --

    /// Create a session: directory, empty events file, initial metadata.
    pub fn create(
        &self,
        id: &SessionId,
        acp_server: &str,
        working_dir: &str,
    ) -> Result<SessionMetadata, StoreError> {
        let _guard = self.write_guard()?;

        if !id.is_filesystem_safe() {
            return Err(StoreError::InvalidSessionId(id.as_str().to_string()));
        }
        let dir = self.session_dir(id);
        if dir.exists() {
            return Err(StoreError::SessionExists(id.clone()));
        }
        fs::create_dir_all(&dir)?;
        fs::File::create(self.events_path(id))?;

        let meta = SessionMetadata::new(id.clone(), acp_server, working_dir, self.now());
        write_json_atomic(&self.metadata_path(id), &meta)?;
        tracing::debug!(session_id = %id, acp_server, "created session");
        Ok(meta)
    }

    pub fn exists(&self, id: &SessionId) -> Result<bool, StoreError> {
        let _guard = self.read_guard()?;
        Ok(self.metadata_path(id).exists())
    }

    /// All sessions, newest activity first. Unreadable entries are skipped.
    pub fn list(&self) -> Result<Vec<SessionMetadata>, StoreError> {
        let _guard = self.read_guard()?;
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let meta_path = entry.path().join("metadata.json");
            match read_json::<SessionMetadata>(&meta_path) {
                Ok(meta) => sessions.push(meta),
                Err(err) => {
                    tracing::debug!(path = %meta_path.display(), %err, "skipping unreadable session");
                }
            }
        }
        sessions.sort_by_key(|m| std::cmp::Reverse(m.sort_key()));
        Ok(sessions)
    }

    pub fn count_sessions(&self) -> Result<usize, StoreError> {
        Ok(self.list()?.len())
    }

    /// Remove the session directory recursively. External (ACP server)
    /// state is untouched.
    pub fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;
        let dir = self.session_dir(id);
        if !dir.exists() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }
        fs::remove_dir_all(&dir)?;
        tracing::debug!(session_id = %id, "deleted session");
        Ok(())
    }

    /// Mark the store closed; every later operation fails with `StoreClosed`.
    pub fn close(&self) {
        self.state.write().closed = true;
    }

    // -- metadata --

    pub fn get_metadata(&self, id: &SessionId) -> Result<SessionMetadata, StoreError> {
        let _guard = self.read_guard()?;
        self.read_metadata(id)
    }

    /// Read-modify-write the session header. `updated_at` is bumped on
    /// every write.
    pub fn update_metadata(
        &self,
        id: &SessionId,
        mutator: impl FnOnce(&mut SessionMetadata),
    ) -> Result<SessionMetadata, StoreError> {
        let _guard = self.write_guard()?;
        let mut meta = self.read_metadata(id)?;
        mutator(&mut meta);
        meta.updated_at = self.now();
        write_json_atomic(&self.metadata_path(id), &meta)?;
        Ok(meta)
    }

    /// Set the archived flag and stamp `archived_at`.
    pub fn archive(&self, id: &SessionId) -> Result<SessionMetadata, StoreError> {
        let now = self.now();
        self.update_metadata(id, |meta| {
            meta.archived = true;
            meta.archived_at = Some(now);
        })
    }

    pub fn unarchive(&self, id: &SessionId) -> Result<SessionMetadata, StoreError> {
        self.update_metadata(id, |meta| {
            meta.archived = false;
            meta.archived_at = None;
        })
    }

    /// Metadata read without guard; callers hold one already.
    pub(crate) fn read_metadata(&self, id: &SessionId) -> Result<SessionMetadata, StoreError> {
        match read_json_opt::<SessionMetadata>(&self.metadata_path(id))? {
            Some(meta) => Ok(meta),
            None => Err(StoreError::SessionNotFound(id.clone())),
        }
    }

    pub(crate) fn write_metadata(
        &self,
        id: &SessionId,
        meta: &SessionMetadata,
    ) -> Result<(), StoreError> {
        write_json_atomic(&self.metadata_path(id), meta)
    }

    // -- retention --

    /// Delete sessions archived longer ago than `period`.
    ///
    /// `period` is one of `""`/`"never"` (no-op), `"1d"`, `"1w"`, `"1m"`,
    /// `"3m"`. Sessions whose `archived_at` is unset fall back to
    /// `updated_at`. Returns the number of sessions deleted; per-session
    /// failures are skipped.
    pub fn cleanup_archived_sessions(&self, period: &str) -> Result<usize, StoreError> {
        let Some(max_age) = parse_cleanup_period(period)? else {
            return Ok(0);
        };
        let cutoff = self.now() - max_age;

        let sessions = self.list()?;
        let _guard = self.write_guard()?;
        let mut deleted = 0;
        for meta in sessions {
            if !meta.archived {
                continue;
            }
            let archived_at = meta.archived_at.unwrap_or(meta.updated_at);
            if archived_at >= cutoff {
                continue;
            }
            match fs::remove_dir_all(self.session_dir(&meta.session_id)) {
                Ok(()) => {
                    tracing::info!(session_id = %meta.session_id, "removed archived session");
                    deleted += 1;
                }
                Err(err) => {
                    tracing::warn!(session_id = %meta.session_id, %err, "archived session cleanup failed");
                }
            }
        }
        Ok(deleted)
    }
}

fn parse_cleanup_period(period: &str) -> Result<Option<Duration>, StoreError> {
    match period {
        "" | "never" => Ok(None),
        "1d" => Ok(Some(Duration::days(1))),
        "1w" => Ok(Some(Duration::weeks(1))),
        "1m" => Ok(Some(Duration::days(30))),
        "3m" => Ok(Some(Duration::days(90))),
        other => Err(StoreError::InvalidCleanupPeriod(other.to_string())),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
