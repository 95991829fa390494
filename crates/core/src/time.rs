//! Edition timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// The server-side last-modified time of an entity.
///
/// Edition times are the version tokens of the optimistic concurrency
/// scheme: the client echoes back the edition time it last saw and the
/// server rejects the request if the entity changed in the meantime.
///
/// Serialized as an RFC 3339 string in UTC. Fractional seconds are omitted
/// when zero and otherwise written with 3, 6 or 9 digits, so the same value
/// always produces the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EditionTime(DateTime<Utc>);

impl EditionTime {
    /// Tolerance the server applies when comparing edition times.
    pub const TOLERANCE: TimeDelta = TimeDelta::milliseconds(1);

    /// Wrap a UTC timestamp.
    #[must_use]
    pub const fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse an RFC 3339 timestamp with any UTC offset.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        DateTime::parse_from_rfc3339(input.trim())
            .map(|t| Self(t.with_timezone(&Utc)))
            .map_err(|e| CoreError::InvalidEditionTime {
                input: input.to_owned(),
                reason: e.to_string(),
            })
    }

    /// The wrapped timestamp.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// A copy moved by `delta`.
    #[must_use]
    pub fn shifted(self, delta: TimeDelta) -> Self {
        Self(self.0 + delta)
    }

    /// Whether `self` (the stored version) still matches `expected` under
    /// the server's tolerance window `[expected - 1ms, expected + 1ms)`.
    #[must_use]
    pub fn matches(&self, expected: &Self) -> bool {
        let delta = self.0 - expected.0;
        delta >= -Self::TOLERANCE && delta < Self::TOLERANCE
    }
}

impl From<DateTime<Utc>> for EditionTime {
    fn from(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl fmt::Display for EditionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl FromStr for EditionTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for EditionTime {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EditionTime {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
