// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mitto_core::event::{ImageRef, UserPromptData};
use tempfile::tempdir;

fn fixture(dir: &tempfile::TempDir) -> (SessionStore, SessionId) {
    let store = SessionStore::open(dir.path()).unwrap();
    let id = SessionId::new("s1");
    store.create(&id, "srv", "/w").unwrap();
    (store, id)
}

fn prompt(text: &str) -> Event {
    Event::typed(
        EventKind::UserPrompt,
        &UserPromptData { message: text.to_string(), ..Default::default() },
    )
    .unwrap()
}

fn prompt_with_image(text: &str, image_id: &str) -> Event {
    Event::typed(
        EventKind::UserPrompt,
        &UserPromptData {
            message: text.to_string(),
            images: vec![ImageRef {
                id: image_id.to_string(),
                name: None,
                mime_type: "image/png".to_string(),
            }],
            ..Default::default()
        },
    )
    .unwrap()
}

#[test]
fn disabled_config_is_noop() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    for i in 0..10 {
        store.append_event(&id, prompt(&format!("m{i}"))).unwrap();
    }

    let stats = store.prune_if_needed(&id, &PruneConfig::default()).unwrap();
    assert_eq!(stats, PruneStats::default());
    assert_eq!(store.read_events(&id).unwrap().len(), 10);
}

#[test]
fn within_bounds_is_noop() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    for i in 0..3 {
        store.append_event(&id, prompt(&format!("m{i}"))).unwrap();
    }

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 5, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats.events_removed, 0);
}

#[test]
fn count_bound_drops_oldest_and_renumbers() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    for i in 0..10 {
        store.append_event(&id, prompt(&format!("m{i}"))).unwrap();
    }

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 5, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats.events_removed, 5);
    assert!(stats.bytes_reclaimed > 0);

    let events = store.read_events(&id).unwrap();
    assert_eq!(events.len(), 5);
    // renumbered 1..5, oldest events gone
    assert_eq!(events.iter().map(|e| e.seq).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    let texts: Vec<String> =
        events.iter().map(|e| e.data["message"].as_str().unwrap().to_string()).collect();
    assert_eq!(texts, vec!["m5", "m6", "m7", "m8", "m9"]);

    let meta = store.get_metadata(&id).unwrap();
    assert_eq!(meta.event_count, 5);
    assert!(meta.max_seq >= 10, "max_seq is monotonic, got {}", meta.max_seq);
}

#[test]
fn size_bound_drops_until_under() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    for i in 0..20 {
        store.append_event(&id, prompt(&format!("padding padding padding {i}"))).unwrap();
    }
    let log_size = std::fs::metadata(store.events_path(&id)).unwrap().len();

    let stats = store
        .prune_if_needed(&id, &PruneConfig { max_messages: 0, max_size_bytes: log_size / 2 })
        .unwrap();
    assert!(stats.events_removed > 0);

    let new_size = std::fs::metadata(store.events_path(&id)).unwrap().len();
    assert!(new_size <= log_size / 2, "log still {new_size} bytes");
    assert!(!store.read_events(&id).unwrap().is_empty());
}

#[test]
fn always_keeps_at_least_one_event() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    for i in 0..5 {
        store.append_event(&id, prompt(&format!("m{i}"))).unwrap();
    }

    // A one-byte budget would drop everything; the newest must survive.
    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 0, max_size_bytes: 1 }).unwrap();
    assert_eq!(stats.events_removed, 4);

    let events = store.read_events(&id).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].seq, 1);
    assert_eq!(events[0].data["message"], "m4");
}

#[test]
fn orphaned_images_are_collected() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);

    let old = store.save_image(&id, &[1u8; 512], None, "image/png").unwrap();
    let kept = store.save_image(&id, &[2u8; 512], None, "image/png").unwrap();

    store.append_event(&id, prompt_with_image("old", &old.id)).unwrap();
    for i in 0..8 {
        store.append_event(&id, prompt(&format!("filler {i}"))).unwrap();
    }
    // the kept image is referenced by a surviving event
    store.append_event(&id, prompt_with_image("recent", &kept.id)).unwrap();

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 5, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats.events_removed, 5);
    assert_eq!(stats.images_removed, 1);
    assert!(stats.bytes_reclaimed >= 512);

    let remaining: Vec<String> =
        store.list_images(&id).unwrap().into_iter().map(|info| info.id).collect();
    assert_eq!(remaining, vec![kept.id]);
}

#[test]
fn image_referenced_by_dropped_and_kept_survives() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);
    let shared = store.save_image(&id, &[3u8; 256], None, "image/png").unwrap();

    store.append_event(&id, prompt_with_image("first use", &shared.id)).unwrap();
    for i in 0..3 {
        store.append_event(&id, prompt(&format!("filler {i}"))).unwrap();
    }
    store.append_event(&id, prompt_with_image("second use", &shared.id)).unwrap();

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 2, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats.events_removed, 3);
    assert_eq!(stats.images_removed, 0);
    assert_eq!(store.list_images(&id).unwrap().len(), 1);
}

#[test]
fn prune_empty_session_is_noop() {
    let dir = tempdir().unwrap();
    let (store, id) = fixture(&dir);

    let stats =
        store.prune_if_needed(&id, &PruneConfig { max_messages: 1, max_size_bytes: 0 }).unwrap();
    assert_eq!(stats, PruneStats::default());
}
