// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recurring-prompt schedule: wire format, validation, and next-fire math.
//!
//! All schedule arithmetic is UTC. The `at` field pins a daily frequency to a
//! fixed `HH:MM` slot; every other combination is a plain offset from the
//! last send (or from now, when nothing was sent yet or the slot is past).

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unit of a recurring frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    Minutes,
    Hours,
    Days,
}

crate::simple_display! {
    FrequencyUnit {
        Minutes => "minutes",
        Hours => "hours",
        Days => "days",
    }
}

/// How often a periodic prompt fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    pub value: i64,
    pub unit: FrequencyUnit,
    /// Fixed `HH:MM` time of day; only valid with [`FrequencyUnit::Days`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
}

/// Validation failures for a [`Frequency`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrequencyError {
    #[error("frequency value must be at least 1, got {0}")]
    InvalidValue(i64),
    #[error("time of day is only valid with a daily frequency")]
    AtRequiresDays,
    #[error("invalid time of day {0:?}, expected HH:MM between 00:00 and 23:59")]
    InvalidAt(String),
}

impl Frequency {
    pub fn validate(&self) -> Result<(), FrequencyError> {
        if self.value < 1 {
            return Err(FrequencyError::InvalidValue(self.value));
        }
        if let Some(at) = &self.at {
            if self.unit != FrequencyUnit::Days {
                return Err(FrequencyError::AtRequiresDays);
            }
            parse_at(at)?;
        }
        Ok(())
    }

    /// The plain duration between fires, ignoring any `at` pin.
    pub fn interval(&self) -> Duration {
        match self.unit {
            FrequencyUnit::Minutes => Duration::minutes(self.value),
            FrequencyUnit::Hours => Duration::hours(self.value),
            FrequencyUnit::Days => Duration::days(self.value),
        }
    }
}

/// Parse a strict `HH:MM` time of day (zero-padded, 00:00–23:59).
pub fn parse_at(at: &str) -> Result<NaiveTime, FrequencyError> {
    let invalid = || FrequencyError::InvalidAt(at.to_string());

    let bytes = at.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(invalid());
    }
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits(&at[0..2]) || !digits(&at[3..5]) {
        return Err(invalid());
    }
    let hour: u32 = at[0..2].parse().map_err(|_| invalid())?;
    let minute: u32 = at[3..5].parse().map_err(|_| invalid())?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// A recurring prompt as persisted in `periodic.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodicPrompt {
    pub prompt: String,
    pub frequency: Frequency,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_scheduled_at: Option<DateTime<Utc>>,
}

/// Compute when a schedule fires next. `None` iff disabled.
///
/// Expects a validated frequency; an unparseable `at` is ignored and the
/// schedule degrades to a plain interval.
pub fn next_fire(
    frequency: &Frequency,
    enabled: bool,
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if !enabled {
        return None;
    }

    if frequency.unit == FrequencyUnit::Days {
        if let Some(at) = frequency.at.as_deref().and_then(|s| parse_at(s).ok()) {
            return Some(next_daily_slot(frequency.value, at, last_sent, now));
        }
    }

    let interval = frequency.interval();
    Some(match last_sent {
        Some(sent) if sent + interval > now => sent + interval,
        _ => now + interval,
    })
}

/// Next `HH:MM` UTC slot for an every-N-days schedule.
fn next_daily_slot(
    every_days: i64,
    at: NaiveTime,
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    if let Some(sent) = last_sent {
        let candidate = (sent.date_naive() + Duration::days(every_days)).and_time(at).and_utc();
        if candidate > now {
            return candidate;
        }
        // Slot already passed while nothing fired; fall through to recompute
        // from now.
    }

    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(every_days)
    }
}

#[cfg(test)]
#[path = "periodic_tests.rs"]
mod tests;
