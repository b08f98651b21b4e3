// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring-prompt schedule persisted as `periodic.json`.
//!
//! `next_scheduled_at` is recomputed on every write so readers never have to
//! re-derive the schedule; the math itself lives in `mitto_core::periodic`.

use crate::error::StoreError;
use crate::fsutil::{read_json_opt, write_json_atomic};
use crate::store::SessionStore;
use mitto_core::clock::Clock;
use mitto_core::periodic::{next_fire, Frequency, PeriodicPrompt};
use mitto_core::session::SessionId;
use parking_lot::Mutex;
use std::path::PathBuf;

/// Handle to one session's periodic-prompt schedule.
pub struct PeriodicStore<C: Clock> {
    path: PathBuf,
    session_dir: PathBuf,
    session_id: SessionId,
    clock: C,
    mutex: Mutex<()>,
}

impl<C: Clock> SessionStore<C> {
    pub fn periodic(&self, id: &SessionId) -> PeriodicStore<C> {
        PeriodicStore {
            path: self.periodic_path(id),
            session_dir: self.session_dir(id),
            session_id: id.clone(),
            clock: self.clock().clone(),
            mutex: Mutex::new(()),
        }
    }
}

impl<C: Clock> PeriodicStore<C> {
    fn load(&self) -> Result<Option<PeriodicPrompt>, StoreError> {
        if !self.session_dir.is_dir() {
            return Err(StoreError::SessionNotFound(self.session_id.clone()));
        }
        read_json_opt::<PeriodicPrompt>(&self.path)
    }

    /// Create or replace the schedule.
    ///
    /// `created_at` and `last_sent_at` survive updates; everything else is
    /// taken from the arguments and `next_scheduled_at` is recomputed.
    pub fn set(
        &self,
        prompt: &str,
        frequency: Frequency,
        enabled: bool,
    ) -> Result<PeriodicPrompt, StoreError> {
        if prompt.trim().is_empty() {
            return Err(StoreError::PromptEmpty);
        }
        frequency.validate()?;

        let _guard = self.mutex.lock();
        let existing = self.load()?;
        let now = self.clock.now_utc();

        let created_at = existing.as_ref().map(|p| p.created_at).unwrap_or(now);
        let last_sent_at = existing.as_ref().and_then(|p| p.last_sent_at);
        let next_scheduled_at = next_fire(&frequency, enabled, last_sent_at, now);

        let record = PeriodicPrompt {
            prompt: prompt.to_string(),
            frequency,
            enabled,
            created_at,
            updated_at: now,
            last_sent_at,
            next_scheduled_at,
        };
        write_json_atomic(&self.path, &record)?;
        Ok(record)
    }

    pub fn get(&self) -> Result<PeriodicPrompt, StoreError> {
        let _guard = self.mutex.lock();
        self.load()?.ok_or(StoreError::PeriodicNotFound)
    }

    /// Stamp a send and move `next_scheduled_at` forward.
    pub fn record_sent(&self) -> Result<PeriodicPrompt, StoreError> {
        let _guard = self.mutex.lock();
        let mut record = self.load()?.ok_or(StoreError::PeriodicNotFound)?;

        let now = self.clock.now_utc();
        record.last_sent_at = Some(now);
        record.updated_at = now;
        record.next_scheduled_at = next_fire(&record.frequency, record.enabled, Some(now), now);
        write_json_atomic(&self.path, &record)?;
        Ok(record)
    }

    /// Remove the schedule; removing a missing one is fine.
    pub fn delete(&self) -> Result<(), StoreError> {
        let _guard = self.mutex.lock();
        if !self.session_dir.is_dir() {
            return Err(StoreError::SessionNotFound(self.session_id.clone()));
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "periodic_tests.rs"]
mod tests;
