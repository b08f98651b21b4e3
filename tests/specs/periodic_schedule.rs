// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic-prompt schedule specs against a controlled clock.

use crate::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use mitto_core::clock::{Clock, FakeClock};
use mitto_core::periodic::{Frequency, FrequencyUnit};

fn daily_nine() -> Frequency {
    Frequency { value: 1, unit: FrequencyUnit::Days, at: Some("09:00".to_string()) }
}

#[test]
fn daily_at_nine_fires_today_then_tomorrow() {
    let dir = tempdir().unwrap();
    // 06:30 UTC, before the slot
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2025, 5, 1, 6, 30, 0).unwrap());
    let store = SessionStore::open_with_clock(dir.path(), clock.clone()).unwrap();
    let id = SessionId::new("s1");
    store.create(&id, "srv", "/w").unwrap();
    let periodic = store.periodic(&id);

    let record = periodic.set("morning brief", daily_nine(), true).unwrap();
    assert_eq!(
        record.next_scheduled_at,
        Some(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap()),
        "same calendar day at 09:00 UTC"
    );

    // the scheduler fires just after 09:00
    clock.set(Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 5).unwrap());
    let record = periodic.record_sent().unwrap();
    assert_eq!(
        record.next_scheduled_at,
        Some(Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap()),
        "next day at 09:00"
    );
    assert!(record.next_scheduled_at.unwrap() > clock.now_utc());
}

#[test]
fn interval_schedule_always_lands_in_the_future() {
    let dir = tempdir().unwrap();
    let clock = FakeClock::at(Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap());
    let store = SessionStore::open_with_clock(dir.path(), clock.clone()).unwrap();
    let id = SessionId::new("s1");
    store.create(&id, "srv", "/w").unwrap();
    let periodic = store.periodic(&id);

    let record = periodic
        .set("ping", Frequency { value: 2, unit: FrequencyUnit::Hours, at: None }, true)
        .unwrap();
    assert_eq!(record.next_scheduled_at, Some(clock.now_utc() + Duration::hours(2)));

    // long outage: the next fire recomputes from now instead of the past
    clock.advance(Duration::days(3));
    let record = periodic.record_sent().unwrap();
    assert_eq!(record.next_scheduled_at, Some(clock.now_utc() + Duration::hours(2)));
}

#[test]
fn schedule_survives_reopen() {
    let dir = tempdir().unwrap();
    let (store, id) = store_with_session(&dir, "s1");
    store
        .periodic(&id)
        .set("nightly summary", daily_nine(), true)
        .unwrap();

    let reread = reopen(&dir).periodic(&id).get().unwrap();
    assert_eq!(reread.prompt, "nightly summary");
    assert!(reread.enabled);
    assert!(reread.next_scheduled_at.is_some());
}
