// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append and read paths for the per-session event log.
//!
//! `events.jsonl` is the one file that is not replaced atomically: it only
//! ever grows, one newline-terminated JSON event per line. The session lock
//! guarantees a single logical writer; readers stop at end-of-file and
//! tolerate a torn final line.

use crate::error::StoreError;
use crate::store::{SessionStore, MAX_LINE_BYTES};
use mitto_core::clock::Clock;
use mitto_core::event::{Event, EventKind};
use mitto_core::session::SessionId;
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};

impl<C: Clock> SessionStore<C> {
    /// Append an event, assigning the next dense sequence number
    /// (`event_count + 1`) and stamping the timestamp if unset.
    ///
    /// Returns the event as persisted.
    pub fn append_event(&self, id: &SessionId, event: Event) -> Result<Event, StoreError> {
        self.write_event(id, event, true)
    }

    /// Append an event whose `seq` was assigned by the caller.
    ///
    /// Used when the sequence must be chosen at emission time, e.g. a
    /// `session_end` that has to sort strictly after coalesced streamed
    /// chunks. `max_seq` absorbs the caller's seq; a mismatch with the dense
    /// counter is logged and written anyway.
    pub fn record_event(&self, id: &SessionId, event: Event) -> Result<Event, StoreError> {
        self.write_event(id, event, false)
    }

    fn write_event(
        &self,
        id: &SessionId,
        mut event: Event,
        assign_seq: bool,
    ) -> Result<Event, StoreError> {
        let _guard = self.write_guard()?;

        let events_path = self.events_path(id);
        if !events_path.exists() {
            return Err(StoreError::SessionNotFound(id.clone()));
        }
        let mut meta = self.read_metadata(id)?;

        if assign_seq {
            event.seq = meta.event_count + 1;
        } else {
            if event.seq == 0 {
                return Err(StoreError::SeqRequired);
            }
            if event.seq != meta.event_count + 1 {
                tracing::debug!(
                    session_id = %id,
                    seq = event.seq,
                    expected = meta.event_count + 1,
                    "seq mismatch on record"
                );
            }
        }
        if event.timestamp_is_zero() {
            event.timestamp = self.now();
        }

        let line = serde_json::to_string(&event)?;
        let mut file = match OpenOptions::new().append(true).open(&events_path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        // Make the line durable before the header references it, so a crash
        // cannot leave event_count ahead of the log.
        file.sync_data()?;

        meta.event_count += 1;
        meta.max_seq = meta.max_seq.max(event.seq);
        meta.updated_at = self.now();
        if event.kind == EventKind::UserPrompt {
            meta.last_user_message_at = Some(event.timestamp);
        }
        self.write_metadata(id, &meta)?;

        Ok(event)
    }

    /// All events in log order.
    pub fn read_events(&self, id: &SessionId) -> Result<Vec<Event>, StoreError> {
        let mut events = Vec::new();
        self.scan_events(id, |event| events.push(event))?;
        Ok(events)
    }

    /// Events with `seq > after_seq`, in log order.
    pub fn read_events_from(
        &self,
        id: &SessionId,
        after_seq: u64,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events = Vec::new();
        self.scan_events(id, |event| {
            if event.seq > after_seq {
                events.push(event);
            }
        })?;
        Ok(events)
    }

    /// The last `n` events in chronological order. A `before_seq > 0`
    /// excludes events with `seq >= before_seq` (for paging backwards).
    pub fn read_events_last(
        &self,
        id: &SessionId,
        n: usize,
        before_seq: u64,
    ) -> Result<Vec<Event>, StoreError> {
        let mut tail: VecDeque<Event> = VecDeque::with_capacity(n.saturating_add(1));
        self.scan_events(id, |event| {
            if before_seq > 0 && event.seq >= before_seq {
                return;
            }
            tail.push_back(event);
            if tail.len() > n {
                tail.pop_front();
            }
        })?;
        Ok(tail.into_iter().collect())
    }

    /// Like [`read_events_last`](Self::read_events_last) but newest first.
    pub fn read_events_last_reverse(
        &self,
        id: &SessionId,
        n: usize,
        before_seq: u64,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events = self.read_events_last(id, n, before_seq)?;
        events.reverse();
        Ok(events)
    }

    /// Sequential scan of the events file.
    ///
    /// Takes the read side of the store lock: concurrent with other readers,
    /// serialized against writers.
    pub(crate) fn scan_events(
        &self,
        id: &SessionId,
        visit: impl FnMut(Event),
    ) -> Result<(), StoreError> {
        let _guard = self.read_guard()?;
        self.scan_events_locked(id, visit)
    }

    /// Scan without taking the store lock; the caller holds a guard.
    ///
    /// A final line without its newline that fails to parse is treated as a
    /// torn write and skipped; a malformed interior line is a hard error, as
    /// is any line over [`MAX_LINE_BYTES`].
    pub(crate) fn scan_events_locked(
        &self,
        id: &SessionId,
        mut visit: impl FnMut(Event),
    ) -> Result<(), StoreError> {
        let file = match File::open(self.events_path(id)) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        let mut reader = BufReader::with_capacity(64 * 1024, file);
        let mut buf: Vec<u8> = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            // Cap the read so an oversized line errors instead of ballooning
            // memory: content of MAX_LINE_BYTES plus its newline still fits.
            let n = reader.by_ref().take(MAX_LINE_BYTES as u64 + 2).read_until(b'\n', &mut buf)?;
            if n == 0 {
                return Ok(());
            }
            line_no += 1;

            let had_newline = buf.last() == Some(&b'\n');
            let content = if had_newline { &buf[..n - 1] } else { &buf[..n] };
            if content.len() > MAX_LINE_BYTES {
                return Err(StoreError::LineTooLong { max: MAX_LINE_BYTES });
            }
            if content.is_empty() {
                continue;
            }

            match serde_json::from_slice::<Event>(content) {
                Ok(event) => visit(event),
                Err(err) if !had_newline => {
                    tracing::debug!(session_id = %id, line = line_no, %err, "skipping torn final line");
                    return Ok(());
                }
                Err(err) => {
                    return Err(StoreError::CorruptEventLog { line: line_no, source: err });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
