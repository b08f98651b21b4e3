// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-side facade bound to one session.
//!
//! The recorder owns the session lifecycle events (`session_start` /
//! `session_end`) and offers typed append helpers for everything an agent
//! streams. When a prune config is attached, retention runs best-effort
//! after every record; a prune failure never fails the record.

use crate::error::StoreError;
use crate::prune::PruneConfig;
use crate::store::SessionStore;
use mitto_core::clock::{Clock, SystemClock};
use mitto_core::event::{
    AgentMessageData, AgentThoughtData, ErrorData, Event, EventKind, FileReadData, FileWriteData,
    PermissionData, PlanData, PlanEntry, SessionEndData, SessionStartData, ToolCallData,
    ToolCallUpdateData, UiPromptAnswerData, UserPromptData,
};
use mitto_core::metadata::SessionStatus;
use mitto_core::session::SessionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Records one session's events through the store.
pub struct Recorder<C: Clock = SystemClock> {
    store: Arc<SessionStore<C>>,
    session_id: SessionId,
    started: AtomicBool,
    prune: Option<PruneConfig>,
}

impl<C: Clock> Recorder<C> {
    pub fn new(store: Arc<SessionStore<C>>, session_id: SessionId) -> Self {
        Self { store, session_id, started: AtomicBool::new(false), prune: None }
    }

    /// Attach retention bounds applied best-effort after each record.
    pub fn with_prune_config(mut self, config: PruneConfig) -> Self {
        self.prune = Some(config);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Create the session and record `session_start`.
    pub fn start(&self, acp_server: &str, working_dir: &str) -> Result<(), StoreError> {
        self.store.create(&self.session_id, acp_server, working_dir)?;
        let data = SessionStartData {
            session_id: self.session_id.as_str().to_string(),
            acp_server: acp_server.to_string(),
            working_dir: working_dir.to_string(),
        };
        self.store.append_event(&self.session_id, Event::typed(EventKind::SessionStart, &data)?)?;
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Re-attach to an existing session, reactivating a completed one.
    ///
    /// No event is recorded; resumption is visible through the lock, not the
    /// log.
    pub fn resume(&self) -> Result<(), StoreError> {
        let meta = self.store.get_metadata(&self.session_id)?;
        if meta.status == SessionStatus::Completed {
            self.store.update_metadata(&self.session_id, |meta| {
                meta.status = SessionStatus::Active;
            })?;
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Detach without ending the session (transient disconnects).
    pub fn suspend(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    /// Record `session_end` and complete the session.
    ///
    /// The end event's seq is `max(max_seq, event_count) + 1` so it sorts
    /// strictly after every chunk recorded with a caller-assigned seq.
    pub fn end(&self, data: SessionEndData) -> Result<(), StoreError> {
        let meta = self.store.get_metadata(&self.session_id)?;
        let mut event = Event::typed(EventKind::SessionEnd, &data)?;
        event.seq = meta.max_seq.max(meta.event_count) + 1;
        self.store.record_event(&self.session_id, event)?;
        self.store.update_metadata(&self.session_id, |meta| {
            meta.status = SessionStatus::Completed;
        })?;
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Append an event (store-assigned seq), then prune best-effort.
    pub fn record(&self, event: Event) -> Result<Event, StoreError> {
        let event = self.store.append_event(&self.session_id, event)?;
        self.maybe_prune();
        Ok(event)
    }

    /// Append an event whose seq the caller assigned, then prune best-effort.
    pub fn record_event_with_seq(&self, event: Event) -> Result<Event, StoreError> {
        let event = self.store.record_event(&self.session_id, event)?;
        self.maybe_prune();
        Ok(event)
    }

    // -- typed helpers --

    pub fn record_user_prompt(&self, data: UserPromptData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::UserPrompt, &data)?)
    }

    pub fn record_agent_message(&self, html: impl Into<String>) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::AgentMessage, &AgentMessageData { html: html.into() })?)
    }

    pub fn record_agent_thought(&self, text: impl Into<String>) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::AgentThought, &AgentThoughtData { text: text.into() })?)
    }

    pub fn record_tool_call(&self, data: ToolCallData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::ToolCall, &data)?)
    }

    pub fn record_tool_call_update(&self, data: ToolCallUpdateData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::ToolCallUpdate, &data)?)
    }

    pub fn record_plan(&self, entries: Vec<PlanEntry>) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::Plan, &PlanData { entries })?)
    }

    pub fn record_permission(&self, data: PermissionData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::Permission, &data)?)
    }

    pub fn record_file_read(&self, data: FileReadData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::FileRead, &data)?)
    }

    pub fn record_file_write(&self, data: FileWriteData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::FileWrite, &data)?)
    }

    pub fn record_error(
        &self,
        message: impl Into<String>,
        code: Option<String>,
    ) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::Error, &ErrorData { message: message.into(), code })?)
    }

    pub fn record_ui_prompt_answer(&self, data: UiPromptAnswerData) -> Result<Event, StoreError> {
        self.record(Event::typed(EventKind::UiPromptAnswer, &data)?)
    }

    fn maybe_prune(&self) {
        let Some(config) = &self.prune else {
            return;
        };
        if let Err(err) = self.store.prune_if_needed(&self.session_id, config) {
            tracing::warn!(session_id = %self.session_id, %err, "best-effort prune failed");
        }
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
