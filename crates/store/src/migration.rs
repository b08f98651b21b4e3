// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot data migrations over the store root.
//!
//! Migrations run in registry order on store open (or on demand), skip names
//! already recorded in `migrations.json`, persist the applied set after each
//! success, and stop on the first failure. Per-session errors inside a
//! migration are skipped so one bad directory cannot wedge the store.

use crate::error::StoreError;
use crate::fsutil::{read_json, read_json_opt, write_json_atomic};
use crate::store::SessionStore;
use chrono::{DateTime, Utc};
use mitto_core::clock::Clock;
use mitto_core::metadata::SessionMetadata;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Context handed to every migration.
#[derive(Debug, Clone, Default)]
pub struct MigrationContext {
    /// ACP server alias → canonical name, lowercase-keyed.
    acp_server_names: HashMap<String, String>,
}

impl MigrationContext {
    /// Build a context from alias → canonical pairs.
    ///
    /// Keys are lowercased, and the bare first token of each alias is
    /// indexed too, so `"Claude-Code --acp"` and `claude-code` both resolve.
    pub fn new(aliases: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut acp_server_names = HashMap::new();
        for (alias, canonical) in aliases {
            let key = alias.to_lowercase();
            if let Some(bare) = key.split_whitespace().next() {
                acp_server_names.entry(bare.to_string()).or_insert_with(|| canonical.clone());
            }
            acp_server_names.insert(key, canonical);
        }
        Self { acp_server_names }
    }

    pub fn is_empty(&self) -> bool {
        self.acp_server_names.is_empty()
    }

    /// Canonical name for a recorded server string, if one is mapped.
    pub fn canonical_server(&self, name: &str) -> Option<&str> {
        let key = name.to_lowercase();
        if let Some(canonical) = self.acp_server_names.get(&key) {
            return Some(canonical);
        }
        let bare = key.split_whitespace().next()?;
        self.acp_server_names.get(bare).map(String::as_str)
    }
}

/// A named one-shot transform over all session directories.
pub struct Migration {
    pub name: &'static str,
    pub description: &'static str,
    pub run: fn(&Path, &MigrationContext) -> Result<(), StoreError>,
}

/// Registry, in application order. Append-only: never reorder or rename
/// entries, the applied set is keyed by name.
static MIGRATIONS: &[Migration] = &[Migration {
    name: "001_normalize_acp_server_names",
    description: "rewrite metadata.acp_server aliases to their canonical names",
    run: normalize_acp_server_names,
}];

pub fn registry() -> &'static [Migration] {
    MIGRATIONS
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppliedSet {
    #[serde(default)]
    applied: BTreeMap<String, DateTime<Utc>>,
}

/// Run all registered migrations that have not been applied yet.
///
/// Returns the number of migrations run.
pub fn run_migrations(base_dir: &Path, ctx: &MigrationContext) -> Result<usize, StoreError> {
    run_registry(base_dir, ctx, MIGRATIONS)
}

pub(crate) fn run_registry(
    base_dir: &Path,
    ctx: &MigrationContext,
    migrations: &[Migration],
) -> Result<usize, StoreError> {
    let applied_path = base_dir.join("migrations.json");
    let mut state = read_json_opt::<AppliedSet>(&applied_path)?.unwrap_or_default();

    let mut run_count = 0usize;
    for migration in migrations {
        if state.applied.contains_key(migration.name) {
            continue;
        }
        tracing::info!(name = migration.name, "running migration");
        (migration.run)(base_dir, ctx)?;
        state.applied.insert(migration.name.to_string(), Utc::now());
        write_json_atomic(&applied_path, &state)?;
        run_count += 1;
    }
    Ok(run_count)
}

/// 001: rewrite `metadata.acp_server` to canonical names. A context without
/// mappings is a no-op.
fn normalize_acp_server_names(base_dir: &Path, ctx: &MigrationContext) -> Result<(), StoreError> {
    if ctx.is_empty() {
        return Ok(());
    }

    for entry in std::fs::read_dir(base_dir)? {
        let Ok(entry) = entry else { continue };
        let meta_path = entry.path().join("metadata.json");
        if !meta_path.is_file() {
            continue;
        }
        let mut meta = match read_json::<SessionMetadata>(&meta_path) {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(path = %meta_path.display(), %err, "migration skipping session");
                continue;
            }
        };
        let Some(canonical) = ctx.canonical_server(&meta.acp_server) else {
            continue;
        };
        if canonical == meta.acp_server {
            continue;
        }
        tracing::debug!(
            session_id = %meta.session_id,
            from = %meta.acp_server,
            to = canonical,
            "normalizing acp server name"
        );
        meta.acp_server = canonical.to_string();
        if let Err(err) = write_json_atomic(&meta_path, &meta) {
            tracing::warn!(path = %meta_path.display(), %err, "migration write failed, skipping");
        }
    }
    Ok(())
}

impl<C: Clock> SessionStore<C> {
    /// Run pending migrations against this store's base directory.
    pub fn run_migrations(&self, ctx: &MigrationContext) -> Result<usize, StoreError> {
        let _guard = self.write_guard()?;
        run_migrations(self.base_dir(), ctx)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
