// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small UI-facing side files: `action_buttons.json` and `user-data.json`.

use crate::error::StoreError;
use crate::fsutil::{read_json_opt, write_json_atomic};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use mitto_core::clock::Clock;
use mitto_core::session::SessionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// One configurable quick-action button shown by UIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ActionButtonsState {
    #[serde(default)]
    buttons: Vec<ActionButton>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Handle to one session's action buttons.
pub struct ActionButtonsStore<C: Clock> {
    path: PathBuf,
    session_dir: PathBuf,
    session_id: SessionId,
    clock: C,
    mutex: Mutex<()>,
}

impl<C: Clock> SessionStore<C> {
    pub fn action_buttons(&self, id: &SessionId) -> ActionButtonsStore<C> {
        ActionButtonsStore {
            path: self.action_buttons_path(id),
            session_dir: self.session_dir(id),
            session_id: id.clone(),
            clock: self.clock().clone(),
            mutex: Mutex::new(()),
        }
    }

    /// Arbitrary JSON the web layer stashes per session. Missing reads as
    /// `null`.
    pub fn get_user_data(&self, id: &SessionId) -> Result<Value, StoreError> {
        let _guard = self.read_guard()?;
        if !self.session_dir(id).is_dir() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }
        Ok(read_json_opt::<Value>(&self.user_data_path(id))?.unwrap_or(Value::Null))
    }

    pub fn set_user_data(&self, id: &SessionId, data: &Value) -> Result<(), StoreError> {
        let _guard = self.write_guard()?;
        if !self.session_dir(id).is_dir() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }
        write_json_atomic(&self.user_data_path(id), data)
    }
}

impl<C: Clock> ActionButtonsStore<C> {
    fn load(&self) -> Result<ActionButtonsState, StoreError> {
        if !self.session_dir.is_dir() {
            return Err(StoreError::SessionNotFound(self.session_id.clone()));
        }
        Ok(read_json_opt::<ActionButtonsState>(&self.path)?.unwrap_or_default())
    }

    pub fn set(&self, buttons: Vec<ActionButton>) -> Result<(), StoreError> {
        let _guard = self.mutex.lock();
        self.load()?; // session existence check
        let state =
            ActionButtonsState { buttons, updated_at: Some(self.clock.now_utc()) };
        write_json_atomic(&self.path, &state)
    }

    /// Configured buttons; missing file reads as empty.
    pub fn get(&self) -> Result<Vec<ActionButton>, StoreError> {
        let _guard = self.mutex.lock();
        Ok(self.load()?.buttons)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.set(Vec::new())
    }
}

#[cfg(test)]
#[path = "sidecar_tests.rs"]
mod tests;
