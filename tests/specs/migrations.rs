// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migration specs: one-shot application and idempotence.

use crate::prelude::*;
use mitto_store::{run_migrations, MigrationContext};

fn ctx() -> MigrationContext {
    MigrationContext::new([("Claude-Code --acp".to_string(), "claude-code".to_string())])
}

#[test]
fn normalizes_server_names_once() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new("legacy");
    store.create(&id, "CLAUDE-CODE --acp", "/w").unwrap();

    assert_eq!(run_migrations(dir.path(), &ctx()).unwrap(), 1);
    assert_eq!(store.get_metadata(&id).unwrap().acp_server, "claude-code");

    // registry unchanged → second run does nothing and applied set is stable
    let applied_before = std::fs::read_to_string(dir.path().join("migrations.json")).unwrap();
    assert_eq!(run_migrations(dir.path(), &ctx()).unwrap(), 0);
    let applied_after = std::fs::read_to_string(dir.path().join("migrations.json")).unwrap();
    assert_eq!(applied_before, applied_after);
}

#[test]
fn store_open_path_and_migrations_compose() {
    let dir = tempdir().unwrap();
    {
        let store = SessionStore::open(dir.path()).unwrap();
        store.create(&SessionId::new("a"), "claude-code --acp", "/w").unwrap();
        store.create(&SessionId::new("b"), "other-server", "/w").unwrap();
    }

    // a fresh open (new process) runs migrations before serving
    let store = reopen(&dir);
    store.run_migrations(&ctx()).unwrap();

    assert_eq!(store.get_metadata(&SessionId::new("a")).unwrap().acp_server, "claude-code");
    assert_eq!(store.get_metadata(&SessionId::new("b")).unwrap().acp_server, "other-server");
}
