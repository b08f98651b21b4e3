// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FIFO message queue persisted as `queue.json`.
//!
//! Every operation re-reads the file, mutates, and rewrites it atomically
//! under the handle's mutex. Cheap and crash-safe; queues stay small.

use crate::error::StoreError;
use crate::fsutil::{read_json_opt, write_json_atomic};
use crate::store::SessionStore;
use mitto_core::clock::Clock;
use mitto_core::queue::{message_id, MoveDirection, QueueState, QueuedMessage};
use mitto_core::session::SessionId;
use parking_lot::Mutex;
use std::path::PathBuf;

/// A message to enqueue.
#[derive(Debug, Clone, Default)]
pub struct Enqueue {
    pub message: String,
    pub image_ids: Vec<String>,
    pub file_ids: Vec<String>,
    pub client_id: Option<String>,
    pub title: Option<String>,
}

impl Enqueue {
    pub fn text(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Default::default() }
    }
}

/// Handle to one session's message queue.
pub struct MessageQueue<C: Clock> {
    path: PathBuf,
    session_dir: PathBuf,
    session_id: SessionId,
    max_size: usize,
    clock: C,
    mutex: Mutex<()>,
}

impl<C: Clock> SessionStore<C> {
    /// Queue handle without a size cap.
    pub fn queue(&self, id: &SessionId) -> MessageQueue<C> {
        self.queue_with_limit(id, 0)
    }

    /// Queue handle enforcing `max_size` on add (0 means unbounded).
    pub fn queue_with_limit(&self, id: &SessionId, max_size: usize) -> MessageQueue<C> {
        MessageQueue {
            path: self.queue_path(id),
            session_dir: self.session_dir(id),
            session_id: id.clone(),
            max_size,
            clock: self.clock().clone(),
            mutex: Mutex::new(()),
        }
    }
}

impl<C: Clock> MessageQueue<C> {
    fn load(&self) -> Result<QueueState, StoreError> {
        if !self.session_dir.is_dir() {
            return Err(StoreError::SessionNotFound(self.session_id.clone()));
        }
        Ok(read_json_opt::<QueueState>(&self.path)?.unwrap_or_default())
    }

    fn save(&self, mut state: QueueState) -> Result<QueueState, StoreError> {
        state.updated_at = Some(self.clock.now_utc());
        write_json_atomic(&self.path, &state)?;
        Ok(state)
    }

    /// Append a message; fails with `QueueFull` at the cap.
    pub fn add(&self, message: Enqueue) -> Result<QueuedMessage, StoreError> {
        let _guard = self.mutex.lock();
        let mut state = self.load()?;

        if self.max_size > 0 && state.messages.len() >= self.max_size {
            return Err(StoreError::QueueFull { max: self.max_size });
        }

        let now = self.clock.now_utc();
        let queued = QueuedMessage {
            id: message_id(now),
            message: message.message,
            image_ids: message.image_ids,
            file_ids: message.file_ids,
            client_id: message.client_id,
            title: message.title,
            queued_at: now,
        };
        state.messages.push(queued.clone());
        self.save(state)?;
        Ok(queued)
    }

    /// Messages in FIFO order.
    pub fn list(&self) -> Result<Vec<QueuedMessage>, StoreError> {
        let _guard = self.mutex.lock();
        Ok(self.load()?.messages)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let _guard = self.mutex.lock();
        Ok(self.load()?.messages.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Remove and return the oldest message.
    pub fn pop(&self) -> Result<QueuedMessage, StoreError> {
        let _guard = self.mutex.lock();
        let mut state = self.load()?;
        if state.messages.is_empty() {
            return Err(StoreError::QueueEmpty);
        }
        let message = state.messages.remove(0);
        self.save(state)?;
        Ok(message)
    }

    /// Remove a message by id.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.mutex.lock();
        let mut state = self.load()?;
        let Some(index) = state.messages.iter().position(|m| m.id == id) else {
            return Err(StoreError::MessageNotFound(id.to_string()));
        };
        state.messages.remove(index);
        self.save(state)?;
        Ok(())
    }

    /// Swap a message with its neighbor. A move past either end is a no-op.
    ///
    /// Returns the resulting order.
    pub fn move_message(
        &self,
        id: &str,
        direction: MoveDirection,
    ) -> Result<Vec<QueuedMessage>, StoreError> {
        let _guard = self.mutex.lock();
        let mut state = self.load()?;
        let Some(index) = state.messages.iter().position(|m| m.id == id) else {
            return Err(StoreError::MessageNotFound(id.to_string()));
        };

        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < state.messages.len() => index + 1,
            _ => return Ok(state.messages), // boundary: unchanged, not rewritten
        };
        state.messages.swap(index, target);
        let state = self.save(state)?;
        Ok(state.messages)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.mutex.lock();
        let mut state = self.load()?;
        state.messages.clear();
        self.save(state)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
