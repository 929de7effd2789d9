//! Timestamps and backing-store precision.

use crate::error::{CodecError, CodecResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Granularity the backing store keeps for timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Precision {
    /// Whole seconds.
    Seconds,
    /// Milliseconds.
    #[default]
    Millis,
    /// Microseconds.
    Micros,
}

impl Precision {
    const fn unit_nanos(self) -> i128 {
        match self {
            Precision::Seconds => 1_000_000_000,
            Precision::Millis => 1_000_000,
            Precision::Micros => 1_000,
        }
    }
}

/// A UTC point in time.
///
/// Timestamps are persisted as microseconds since the Unix epoch. Finer
/// detail is only kept in memory until [`Timestamp::round_to`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wraps a chrono date time.
    #[must_use]
    pub const fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Creates a timestamp from microseconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TimestampOutOfRange`] if chrono cannot
    /// represent the instant.
    pub fn from_unix_micros(micros: i64) -> CodecResult<Self> {
        let secs = micros.div_euclid(1_000_000);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos)
            .map(Self)
            .ok_or(CodecError::TimestampOutOfRange { micros })
    }

    /// Returns microseconds since the Unix epoch, truncating finer detail.
    #[must_use]
    pub fn unix_micros(&self) -> i64 {
        self.0.timestamp_micros()
    }

    /// Returns the wrapped chrono value.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Rounds to the given precision, half away from zero.
    ///
    /// An instant whose rounded value would leave chrono's range is
    /// returned unchanged.
    #[must_use]
    pub fn round_to(&self, precision: Precision) -> Self {
        let unit = precision.unit_nanos();
        let total = i128::from(self.0.timestamp()) * NANOS_PER_SEC
            + i128::from(self.0.timestamp_subsec_nanos());

        let mut quotient = total / unit;
        let remainder = total % unit;
        if remainder.abs() * 2 >= unit {
            quotient += total.signum();
        }
        let rounded = quotient * unit;

        let secs = rounded.div_euclid(NANOS_PER_SEC);
        let nanos = rounded.rem_euclid(NANOS_PER_SEC);
        i64::try_from(secs)
            .ok()
            .zip(u32::try_from(nanos).ok())
            .and_then(|(s, n)| DateTime::from_timestamp(s, n))
            .map_or(*self, Self)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
