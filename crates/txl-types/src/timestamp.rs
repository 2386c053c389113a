use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// A point in time, normalized to UTC, with nanosecond precision.
///
/// The only accepted text form is RFC-3339. Rendering always uses the `Z`
/// suffix and the shortest exact sub-second precision (none, milli, micro or
/// nano), so `Timestamp::parse(&t.to_rfc3339()) == Ok(t)` for every instant
/// between the epoch and `9999-12-31T23:59:59.999999999Z`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Parse an RFC-3339 timestamp. Offsets other than `Z` are converted to UTC.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        DateTime::parse_from_rfc3339(input)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| TypeError::InvalidTimestamp {
                value: input.to_string(),
                reason: e.to_string(),
            })
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The UNIX epoch.
    pub const fn epoch() -> Self {
        Self(DateTime::UNIX_EPOCH)
    }

    /// Build from seconds and nanoseconds since the epoch. `None` if out of range.
    pub fn from_unix(secs: i64, nanos: u32) -> Option<Self> {
        DateTime::from_timestamp(secs, nanos).map(Self)
    }

    /// Returns `true` for the zero instant.
    pub fn is_epoch(&self) -> bool {
        self.0 == DateTime::UNIX_EPOCH
    }

    /// Canonical RFC-3339 rendering.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl std::str::FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_rfc3339())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
