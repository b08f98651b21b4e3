// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob storage specs: round trips and per-session quotas.

use crate::prelude::*;

#[test]
fn image_bytes_round_trip() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");
    let data: Vec<u8> = (0..=255).collect();

    let info = store.save_image(&id, &data, Some("gradient.png"), "image/png").unwrap();
    let path = store.get_image_path(&id, &info.id).unwrap();

    assert_eq!(std::fs::read(path).unwrap(), data);
}

#[test]
fn fifty_images_then_limit_then_free_slot() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "S4");
    let kilobyte = vec![0u8; 1024];

    let mut first_id = None;
    for _ in 0..50 {
        let info = store.save_image(&id, &kilobyte, None, "image/png").unwrap();
        first_id.get_or_insert(info.id);
    }

    // the 51st is refused
    assert!(matches!(
        store.save_image(&id, &kilobyte, None, "image/png"),
        Err(StoreError::SessionImageLimit { .. })
    ));

    // deleting one frees a slot
    store.delete_image(&id, &first_id.unwrap()).unwrap();
    store.save_image(&id, &kilobyte, None, "image/png").unwrap();
    assert_eq!(store.list_images(&id).unwrap().len(), 50);
}

#[test]
fn quotas_are_per_session() {
    let dir = tempdir().unwrap();
    let (store, a) = store_with_session(&dir, "a");
    let b = SessionId::new("b");
    store.create(&b, "srv", "/w").unwrap();
    let kilobyte = vec![0u8; 1024];

    for _ in 0..50 {
        store.save_image(&a, &kilobyte, None, "image/png").unwrap();
    }
    assert!(store.save_image(&a, &kilobyte, None, "image/png").is_err());

    // session b is unaffected
    store.save_image(&b, &kilobyte, None, "image/png").unwrap();
}

#[test]
fn user_data_round_trip() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");

    let data = serde_json::json!({"draft": "unsent message", "scroll": 42});
    store.set_user_data(&id, &data).unwrap();

    // visible to another instance
    assert_eq!(reopen(&dir).get_user_data(&id).unwrap(), data);
}
