//! Expiration classes offered to clients.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A coarse time-to-live bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpirationClass {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// The value was not one of `hour`, `day`, `week`, `month`, `year`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid expiration class: {0:?}")]
pub struct InvalidExpiration(pub String);

impl ExpirationClass {
    pub const ALL: [ExpirationClass; 5] = [
        ExpirationClass::Hour,
        ExpirationClass::Day,
        ExpirationClass::Week,
        ExpirationClass::Month,
        ExpirationClass::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpirationClass::Hour => "hour",
            ExpirationClass::Day => "day",
            ExpirationClass::Week => "week",
            ExpirationClass::Month => "month",
            ExpirationClass::Year => "year",
        }
    }

    /// Fixed lifetime of the class. A month is 31 days, a year 365.
    pub fn duration(&self) -> Duration {
        match self {
            ExpirationClass::Hour => Duration::hours(1),
            ExpirationClass::Day => Duration::days(1),
            ExpirationClass::Week => Duration::days(7),
            ExpirationClass::Month => Duration::days(31),
            ExpirationClass::Year => Duration::days(365),
        }
    }

    /// Expiration for an entry created at `created`, truncated to whole
    /// seconds so it survives the on-disk format unchanged.
    pub fn expires_at(&self, created: DateTime<Utc>) -> DateTime<Utc> {
        (created + self.duration()).trunc_subsecs(0)
    }
}

impl FromStr for ExpirationClass {
    type Err = InvalidExpiration;

    /// Matches exactly; there is no default and no case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpirationClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| InvalidExpiration(s.to_string()))
    }
}

impl fmt::Display for ExpirationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
