//! # Temporal Types: UTC Timestamps and Clocks
//!
//! Defines `Timestamp`, a UTC-only instant truncated to seconds, and the
//! [`Clock`] trait through which every time-bounded guard reads "now".
//!
//! ## Window Semantics
//!
//! Protocol windows are inclusive at their end instant: an operation at
//! exactly `start + period` has the same legality as one just before it.
//! Only strictly-after is expired. [`Timestamp::within`] and
//! [`Timestamp::is_after`] encode that rule once so callers cannot get the
//! comparison direction wrong.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("unix timestamp out of range: {secs}")))
    }

    /// Parse an RFC 3339 string with a `Z` suffix.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix, got {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| CoreError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// `self + secs`, failing on overflow.
    pub fn checked_add_secs(&self, secs: u64) -> Result<Self, CoreError> {
        let overflow = || CoreError::TimeOverflow {
            base: self.to_iso8601(),
            secs,
        };
        let delta = i64::try_from(secs).map_err(|_| overflow())?;
        let end = self.epoch_secs().checked_add(delta).ok_or_else(overflow)?;
        Self::from_epoch_secs(end).map_err(|_| overflow())
    }

    /// True while `self` lies in `[start, start + period]`.
    ///
    /// A window whose end overflows the representable range never closes.
    pub fn within(&self, start: Timestamp, period_secs: u64) -> bool {
        match start.checked_add_secs(period_secs) {
            Ok(end) => *self <= end,
            Err(_) => true,
        }
    }

    /// True once `self` is strictly after `start + period`.
    pub fn is_after(&self, start: Timestamp, period_secs: u64) -> bool {
        !self.within(start, period_secs)
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ── Clocks ──────────────────────────────────────────────────────────

/// Source of the current instant for time-bounded guards.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Used by tests and the scenario simulator to land operations exactly on
/// window boundaries.
#[derive(Debug)]
pub struct ManualClock {
    epoch_secs: AtomicI64,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            epoch_secs: AtomicI64::new(start.epoch_secs()),
        }
    }

    /// Start the clock at the given epoch seconds.
    pub fn at_epoch(secs: i64) -> Self {
        Self {
            epoch_secs: AtomicI64::new(secs),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        let delta = i64::try_from(secs).unwrap_or(i64::MAX);
        let _ = self
            .epoch_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                Some(cur.saturating_add(delta))
            });
    }

    /// Jump to an absolute instant.
    pub fn set(&self, at: Timestamp) {
        self.epoch_secs.store(at.epoch_secs(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let secs = self.epoch_secs.load(Ordering::SeqCst);
        // Out-of-range values only arise from saturating advances; pin to the
        // last representable instant rather than failing a read.
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp(DateTime::<Utc>::MAX_UTC))
    }
}
