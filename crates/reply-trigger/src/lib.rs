//! # reply-trigger
//!
//! Decides which automated-reply rule, if any, fires for an inbound LINE,
//! Facebook or Instagram event.
//!
//! - Four-tier priority model: story keyword, story general, keyword, general time
//! - Exact, case-insensitive keyword matching
//! - Timezone-aware schedules with midnight-crossing windows
//! - Business-hour lookups through a caller-supplied provider
//! - Channel payload normalization and webhook signature checks
//! - JSON / YAML configuration snapshots
//!
//! Resolution is a pure function of its inputs: rules, event, `now`, bot
//! settings and business hours. It keeps no state and performs no I/O.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reply_trigger::prelude::*;
//!
//! let bot = BotSettings::new("bot-1").with_timezone("Asia/Taipei");
//! let rules = vec![
//!     TriggerRule::keyword("greet", "bot-1", ["hello"]),
//!     TriggerRule::scheduled("night", "bot-1", ScheduleSpec::daily("22:00", "06:00").unwrap()),
//! ];
//!
//! // 15:00 UTC is 23:00 in Taipei
//! let at = Utc.with_ymd_and_hms(2024, 3, 15, 15, 0, 0).unwrap();
//! let event = CanonicalEvent::message(Channel::Line, "user-1", at, Some("anything".into()));
//!
//! let result = resolve(&rules, &event, at, &bot, &WeeklyBusinessHours::new());
//! assert_eq!(result.rule().map(|r| r.id.as_str()), Some("night"));
//! assert_eq!(result.tier(), Some(TriggerTier::GeneralTime));
//! ```

pub mod business_hours;
pub mod config;
pub mod error;
pub mod event;
pub mod keyword_matcher;
pub mod normalizer;
pub mod resolver;
pub mod schedule;
pub mod timezone;
pub mod types;
pub mod webhook;

pub use business_hours::{BusinessHourProvider, BusinessHourWindow, WeeklyBusinessHours};
pub use config::{ConfigError, ConfigFormat, ConfigResult, SkippedRule, TriggerConfig};
pub use error::{TriggerError, TriggerResult};
pub use event::{CanonicalEvent, EventTimestamp};
pub use keyword_matcher::{KeywordMatchResult, KeywordMatcher};
pub use normalizer::{extract_events, normalize_event};
pub use resolver::{resolve, PriorityResolver};
pub use schedule::{RawSchedule, ScheduleKind, ScheduleSpec, TimeWindow};
pub use timezone::{parse_timezone, resolve_timezone, to_local};
pub use types::{
    BotSettings, Channel, EventKind, MatchResult, TriggerMatch, TriggerRule, TriggerTier,
};
pub use webhook::WebhookVerifier;

pub mod prelude {
    //! Common imports
    pub use crate::business_hours::{BusinessHourProvider, WeeklyBusinessHours};
    pub use crate::event::CanonicalEvent;
    pub use crate::resolver::{resolve, PriorityResolver};
    pub use crate::schedule::ScheduleSpec;
    pub use crate::types::{BotSettings, Channel, EventKind, MatchResult, TriggerRule, TriggerTier};
}
