// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded retention for session event logs.
//!
//! Pruning drops the oldest events until the count and byte bounds hold,
//! rewrites the log via temp+rename with the survivors renumbered to
//! `1..K`, and garbage-collects images only the dropped prompts referenced.
//! `max_seq` is left alone; it records the highest seq ever persisted.

use crate::error::StoreError;
use crate::store::SessionStore;
use mitto_core::blob::BlobKind;
use mitto_core::clock::Clock;
use mitto_core::event::{decode_event_data, Event, EventData, EventKind};
use mitto_core::session::SessionId;
use std::collections::HashSet;
use std::fs;
use std::io::Write;

/// Retention bounds; either > 0 enables pruning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneConfig {
    /// Keep at most this many events (0 = unbounded).
    pub max_messages: usize,
    /// Keep the session's event-log + image bytes under this (0 = unbounded).
    pub max_size_bytes: u64,
}

impl PruneConfig {
    pub fn is_enabled(&self) -> bool {
        self.max_messages > 0 || self.max_size_bytes > 0
    }
}

/// What a prune pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub events_removed: usize,
    pub images_removed: usize,
    pub bytes_reclaimed: u64,
}

/// Image ids referenced by a `user_prompt` event.
fn referenced_images(event: &Event) -> Vec<String> {
    if event.kind != EventKind::UserPrompt {
        return Vec::new();
    }
    match decode_event_data(event) {
        Ok(EventData::UserPrompt(data)) => data.images.into_iter().map(|img| img.id).collect(),
        _ => Vec::new(),
    }
}

impl<C: Clock> SessionStore<C> {
    /// Prune the session's event log to the configured bounds.
    ///
    /// No-op when the config is disabled or the bounds already hold. At
    /// least one event always survives.
    pub fn prune_if_needed(
        &self,
        id: &SessionId,
        config: &PruneConfig,
    ) -> Result<PruneStats, StoreError> {
        if !config.is_enabled() {
            return Ok(PruneStats::default());
        }

        // Exclusive for the whole pass: the rewrite below must not race an
        // append inside this process.
        let _guard = self.write_guard()?;

        // Snapshot the log with per-line byte sizes.
        let mut events: Vec<(Event, u64)> = Vec::new();
        self.scan_events_locked(id, |event| {
            // +1 for the newline; re-serialization length matches what the
            // rewrite below will produce.
            let bytes = serde_json::to_string(&event).map(|s| s.len() as u64 + 1).unwrap_or(0);
            events.push((event, bytes));
        })?;
        if events.is_empty() {
            return Ok(PruneStats::default());
        }

        let image_bytes: u64 =
            self.list_blobs(id, BlobKind::Image)?.iter().map(|info| info.size).sum();

        let mut drop_n = 0usize;
        if config.max_messages > 0 && events.len() > config.max_messages {
            drop_n = events.len() - config.max_messages;
        }
        if config.max_size_bytes > 0 {
            let mut remaining = events.iter().map(|(_, b)| b).sum::<u64>() + image_bytes;
            let mut i = 0usize;
            while remaining > config.max_size_bytes && i < events.len() {
                remaining -= events[i].1;
                i += 1;
            }
            drop_n = drop_n.max(i);
        }
        drop_n = drop_n.min(events.len() - 1); // always keep at least 1 event
        if drop_n == 0 {
            return Ok(PruneStats::default());
        }

        let (dropped, kept) = events.split_at(drop_n);
        let mut bytes_reclaimed: u64 = dropped.iter().map(|(_, b)| b).sum();

        // Rewrite the log with survivors renumbered 1..K.
        let events_path = self.events_path(id);
        let tmp_path = events_path.with_extension("jsonl.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            for (i, (event, _)) in kept.iter().enumerate() {
                let renumbered = Event { seq: i as u64 + 1, ..event.clone() };
                file.write_all(serde_json::to_string(&renumbered)?.as_bytes())?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &events_path)?;

        // Orphan GC: images only the dropped prompts referenced.
        let kept_refs: HashSet<String> =
            kept.iter().flat_map(|(event, _)| referenced_images(event)).collect();
        let mut images_removed = 0usize;
        for image_id in dropped.iter().flat_map(|(event, _)| referenced_images(event)) {
            if kept_refs.contains(&image_id) {
                continue;
            }
            let path = self.blob_dir(id, BlobKind::Image).join(&image_id);
            match fs::metadata(&path) {
                Ok(meta) => {
                    if fs::remove_file(&path).is_ok() {
                        images_removed += 1;
                        bytes_reclaimed += meta.len();
                    }
                }
                Err(_) => continue,
            }
        }

        let mut meta = self.read_metadata(id)?;
        meta.event_count = kept.len() as u64;
        meta.updated_at = self.now();
        self.write_metadata(id, &meta)?;

        let stats = PruneStats { events_removed: drop_n, images_removed, bytes_reclaimed };
        tracing::debug!(
            session_id = %id,
            events_removed = stats.events_removed,
            images_removed = stats.images_removed,
            bytes_reclaimed = stats.bytes_reclaimed,
            "pruned session"
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "prune_tests.rs"]
mod tests;
