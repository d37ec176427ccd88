//! Canonical inbound event
//!
//! Channel payloads are normalized into [`CanonicalEvent`] before resolution.
//! The timestamp keeps whatever precision the source gave: an offset-aware
//! instant, or a naive wall-clock value that is read as UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TriggerError;
use crate::types::{Channel, EventKind};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Event instant as received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTimestamp {
    /// Instant with a known UTC offset
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock value without zone, assumed UTC
    Naive(NaiveDateTime),
}

impl EventTimestamp {
    /// From epoch milliseconds, as LINE and Meta webhooks send them
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(|dt| Self::Zoned(dt.fixed_offset()))
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Self::Zoned(dt) => dt.with_timezone(&Utc),
            Self::Naive(naive) => naive.and_utc(),
        }
    }

    pub fn is_naive(&self) -> bool {
        matches!(self, Self::Naive(_))
    }
}

impl From<DateTime<Utc>> for EventTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Zoned(dt.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for EventTimestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self::Zoned(dt)
    }
}

impl From<NaiveDateTime> for EventTimestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl FromStr for EventTimestamp {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Zoned(dt));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Self::Naive)
            .ok_or_else(|| TriggerError::invalid_payload(format!("unrecognized timestamp '{}'", s)))
    }
}

impl fmt::Display for EventTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl Serialize for EventTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for EventTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Millis(ms) => Self::from_millis(ms)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", ms))),
            RawTimestamp::Text(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// Channel-agnostic inbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub channel: Channel,
    /// Bot that received the event
    #[serde(default)]
    pub bot_id: String,
    pub user_id: String,
    pub timestamp: EventTimestamp,
    /// Text content; absent for follows and non-text messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Story the message replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
    #[serde(default)]
    pub kind: EventKind,
}

impl CanonicalEvent {
    pub fn message(
        channel: Channel,
        user_id: impl Into<String>,
        timestamp: impl Into<EventTimestamp>,
        content: Option<String>,
    ) -> Self {
        Self {
            channel,
            bot_id: String::new(),
            user_id: user_id.into(),
            timestamp: timestamp.into(),
            content,
            story_id: None,
            kind: EventKind::Message,
        }
    }

    pub fn follow(
        channel: Channel,
        user_id: impl Into<String>,
        timestamp: impl Into<EventTimestamp>,
    ) -> Self {
        Self {
            channel,
            bot_id: String::new(),
            user_id: user_id.into(),
            timestamp: timestamp.into(),
            content: None,
            story_id: None,
            kind: EventKind::Follow,
        }
    }

    pub fn with_bot_id(mut self, bot_id: impl Into<String>) -> Self {
        self.bot_id = bot_id.into();
        self
    }

    pub fn with_story(mut self, story_id: impl Into<String>) -> Self {
        self.story_id = Some(story_id.into());
        self
    }

    pub fn is_follow(&self) -> bool {
        self.kind == EventKind::Follow
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn story_id(&self) -> Option<&str> {
        self.story_id.as_deref()
    }
}
