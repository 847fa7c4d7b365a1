//! Durable Entry Record
//!
//! Every entry is persisted as one file whose name is the entry id.
//! The first line holds the expiration timestamp, everything after the
//! first `\n` is the text, verbatim:
//!
//! ```text
//! 2026-10-19T18:00:00Z\n
//! first line of text\n
//! second line of text
//! ```
//!
//! Timestamps are RFC 3339 in UTC with whole-second precision, so a
//! value written by [`format_expiration`] parses back to the same
//! instant through [`parse_expiration`].

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

/// Separator between the expiration line and the text.
pub const SEPARATOR: char = '\n';

/// A stored text blob with its expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Random identifier, also the file name
    pub id: String,
    /// Absolute expiration instant (UTC, whole seconds)
    pub expires_at: DateTime<Utc>,
    /// The text content
    pub text: String,
}

impl Entry {
    pub fn new(id: impl Into<String>, expires_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expires_at,
            text: text.into(),
        }
    }

    /// Returns true if the entry is expired as of `now`.
    ///
    /// An entry whose expiration equals `now` counts as expired.
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Serializes the entry into its on-disk form.
    pub fn encode(&self) -> String {
        let stamp = format_expiration(&self.expires_at);
        let mut out = String::with_capacity(stamp.len() + 1 + self.text.len());
        out.push_str(&stamp);
        out.push(SEPARATOR);
        out.push_str(&self.text);
        out
    }

    /// Parses the on-disk form of the entry stored under `id`.
    pub fn decode(id: impl Into<String>, contents: &str) -> Result<Self, DecodeError> {
        let (stamp, text) = contents
            .split_once(SEPARATOR)
            .ok_or(DecodeError::MissingSeparator)?;

        Ok(Self {
            id: id.into(),
            expires_at: parse_expiration(stamp)?,
            text: text.to_string(),
        })
    }
}

/// Errors produced when a durable record cannot be understood.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// No newline after the expiration line
    #[error("missing newline after expiration line")]
    MissingSeparator,

    /// The first line is not an RFC 3339 timestamp
    #[error("invalid expiration timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    /// The record is not valid UTF-8
    #[error("record is not valid UTF-8")]
    InvalidUtf8,
}

/// Formats an expiration timestamp for the first line of a record.
pub fn format_expiration(expires_at: &DateTime<Utc>) -> String {
    expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses the first line of a record.
///
/// Any RFC 3339 offset is accepted and normalized to UTC.
pub fn parse_expiration(line: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(line).map(|ts| ts.with_timezone(&Utc))
}
