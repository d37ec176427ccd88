//! Trigger Error Types
//!
//! Error taxonomy for the trigger resolution engine.
//!
//! None of these errors escape [`resolve`](crate::resolver::resolve): the resolver
//! always produces a [`MatchResult`](crate::types::MatchResult), possibly empty.
//! They surface from the parsing, validation and normalization helpers that
//! feed it, where the caller decides whether to skip, log or reject.
//!
//! | Variant | Raised by | Handling |
//! |---------|-----------|----------|
//! | `InvalidScheduleConfig` | schedule parsing, config loading | rule skipped, others continue |
//! | `InvalidRule` | config loading | rule skipped, others continue |
//! | `InvalidTimezone` | strict timezone parsing | lenient paths fall back to UTC |
//! | `UnsupportedEventKind` | event normalizer | no resolution attempted |
//! | `InvalidPayload` | event normalizer | no resolution attempted |

use thiserror::Error;

/// Errors produced around trigger resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// Malformed time/date strings, out-of-range fields or inverted ranges
    #[error("Invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    /// Rule entry with missing or mistyped fields outside its schedule
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Timezone name that is not a known IANA zone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Raw payload that maps to neither a message nor a follow event
    #[error("Unsupported event kind: {0}")]
    UnsupportedEventKind(String),

    /// Raw payload that cannot be decoded at all
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl TriggerError {
    /// Create an InvalidScheduleConfig error
    pub fn invalid_schedule(reason: impl Into<String>) -> Self {
        Self::InvalidScheduleConfig(reason.into())
    }

    /// Create an InvalidRule error
    pub fn invalid_rule(reason: impl Into<String>) -> Self {
        Self::InvalidRule(reason.into())
    }

    /// Create an InvalidTimezone error
    pub fn invalid_timezone(name: impl Into<String>) -> Self {
        Self::InvalidTimezone(name.into())
    }

    /// Create an UnsupportedEventKind error
    pub fn unsupported_event(kind: impl Into<String>) -> Self {
        Self::UnsupportedEventKind(kind.into())
    }

    /// Create an InvalidPayload error
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload(reason.into())
    }

    /// Errors caused by rule or bot configuration rather than inbound traffic
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidScheduleConfig(_) | Self::InvalidRule(_) | Self::InvalidTimezone(_)
        )
    }

    /// Errors raised while normalizing a raw channel payload
    pub fn is_event_error(&self) -> bool {
        matches!(self, Self::UnsupportedEventKind(_) | Self::InvalidPayload(_))
    }
}

/// Result alias used throughout the crate
pub type TriggerResult<T> = Result<T, TriggerError>;
