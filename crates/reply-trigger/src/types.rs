//! Core data model
//!
//! Trigger rules, tiers, bot settings and the resolution result.
//!
//! A [`TriggerRule`] is never mutated by the resolver. Its tier is derived from
//! which scoping fields are populated:
//!
//! | story_ids | keywords | schedule | tier |
//! |-----------|----------|----------|------|
//! | set | set | - | `StoryKeyword` |
//! | set | - | set | `StoryGeneral` |
//! | - | set | - | `Keyword` |
//! | - | - | set | `GeneralTime` |
//!
//! Follow rules (`event_kind = follow`) ignore all three fields.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleSpec;

/// Inbound chat channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Line,
    Facebook,
    Instagram,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Line => write!(f, "line"),
            Channel::Facebook => write!(f, "facebook"),
            Channel::Instagram => write!(f, "instagram"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(Channel::Line),
            "facebook" | "fb" | "messenger" => Ok(Channel::Facebook),
            "instagram" | "ig" => Ok(Channel::Instagram),
            other => Err(format!("unknown channel: '{}'", other)),
        }
    }
}

/// Kind of inbound event, and the kind of event a rule reacts to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[default]
    Message,
    Follow,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Message => write!(f, "message"),
            EventKind::Follow => write!(f, "follow"),
        }
    }
}

/// Priority class of a matched rule
///
/// The first four variants are checked in declaration order. `Follow` labels
/// matches from follow rules, which only ever compete with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTier {
    StoryKeyword,
    StoryGeneral,
    Keyword,
    GeneralTime,
    Follow,
}

impl TriggerTier {
    /// Message-event tiers in evaluation order
    pub const PRIORITY_ORDER: [TriggerTier; 4] = [
        TriggerTier::StoryKeyword,
        TriggerTier::StoryGeneral,
        TriggerTier::Keyword,
        TriggerTier::GeneralTime,
    ];

    /// Tiers gated on the event's story id
    pub fn is_story_tier(&self) -> bool {
        matches!(self, TriggerTier::StoryKeyword | TriggerTier::StoryGeneral)
    }

    /// Tiers decided by keyword matching
    pub fn is_keyword_tier(&self) -> bool {
        matches!(self, TriggerTier::StoryKeyword | TriggerTier::Keyword)
    }
}

impl fmt::Display for TriggerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerTier::StoryKeyword => write!(f, "story_keyword"),
            TriggerTier::StoryGeneral => write!(f, "story_general"),
            TriggerTier::Keyword => write!(f, "keyword"),
            TriggerTier::GeneralTime => write!(f, "general_time"),
            TriggerTier::Follow => write!(f, "follow"),
        }
    }
}

/// An automated-reply rule configured for one bot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerRule {
    /// Rule ID
    pub id: String,
    /// Owning bot
    pub bot_id: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event kind this rule reacts to
    #[serde(default)]
    pub event_kind: EventKind,
    /// Exact-match keywords, in configured order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// When the rule is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSpec>,
    /// Story IDs this rule is restricted to
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub story_ids: BTreeSet<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub archived: bool,
    /// Tie-break inside a tier (smaller value wins)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

pub(crate) fn default_priority() -> i32 {
    100
}

impl TriggerRule {
    /// Create an empty message rule; populate it with the `with_*` builders.
    pub fn new(id: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            bot_id: bot_id.into(),
            name: None,
            event_kind: EventKind::Message,
            keywords: Vec::new(),
            schedule: None,
            story_ids: BTreeSet::new(),
            enabled: true,
            archived: false,
            priority: default_priority(),
        }
    }

    /// Keyword rule
    pub fn keyword<I, S>(id: impl Into<String>, bot_id: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id, bot_id).with_keywords(keywords)
    }

    /// Time-based rule
    pub fn scheduled(
        id: impl Into<String>,
        bot_id: impl Into<String>,
        schedule: ScheduleSpec,
    ) -> Self {
        Self::new(id, bot_id).with_schedule(schedule)
    }

    /// Follow rule
    pub fn follow(id: impl Into<String>, bot_id: impl Into<String>) -> Self {
        Self::new(id, bot_id).with_event_kind(EventKind::Follow)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_event_kind(mut self, kind: EventKind) -> Self {
        self.event_kind = kind;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_schedule(mut self, schedule: ScheduleSpec) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_story_ids<I, S>(mut self, story_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.story_ids = story_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = archived;
        self
    }

    /// Enabled and not archived
    pub fn is_active(&self) -> bool {
        self.enabled && !self.archived
    }

    pub fn is_story_scoped(&self) -> bool {
        !self.story_ids.is_empty()
    }

    /// Has keywords and no schedule
    pub fn is_keyword_scoped(&self) -> bool {
        !self.keywords.is_empty() && self.schedule.is_none()
    }

    /// Has a schedule and no keywords
    pub fn is_time_scoped(&self) -> bool {
        self.schedule.is_some() && self.keywords.is_empty()
    }

    /// Whether the rule is restricted to the given story
    pub fn covers_story(&self, story_id: Option<&str>) -> bool {
        story_id.is_some_and(|id| self.story_ids.contains(id))
    }

    /// Tier this rule competes in, `None` when its fields fit no tier.
    pub fn tier(&self) -> Option<TriggerTier> {
        if self.event_kind == EventKind::Follow {
            return Some(TriggerTier::Follow);
        }

        match (
            self.is_story_scoped(),
            self.is_keyword_scoped(),
            self.is_time_scoped(),
        ) {
            (true, true, _) => Some(TriggerTier::StoryKeyword),
            (true, _, true) => Some(TriggerTier::StoryGeneral),
            (false, true, _) => Some(TriggerTier::Keyword),
            (false, _, true) => Some(TriggerTier::GeneralTime),
            _ => None,
        }
    }

    /// Name for logs: display name if present, otherwise the ID
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Per-bot settings that drive timezone selection and business-hour lookups
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotSettings {
    pub bot_id: String,
    /// IANA zone for Daily / Monthly / DateRange schedules
    #[serde(default)]
    pub timezone: Option<String>,
    /// Organization whose business hours apply
    #[serde(default)]
    pub organization_id: String,
    /// IANA zone for BusinessHour / NonBusinessHour schedules
    #[serde(default)]
    pub organization_timezone: Option<String>,
}

impl BotSettings {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
            ..Self::default()
        }
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_organization(
        mut self,
        organization_id: impl Into<String>,
        timezone: Option<&str>,
    ) -> Self {
        self.organization_id = organization_id.into();
        self.organization_timezone = timezone.map(str::to_string);
        self
    }

    /// Zone for business-hour schedules; the bot zone stands in when the
    /// organization has none.
    pub fn business_hour_timezone(&self) -> Option<&str> {
        self.organization_timezone
            .as_deref()
            .filter(|tz| !tz.trim().is_empty())
            .or(self.timezone.as_deref())
    }
}

/// The winning rule of a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerMatch<'r> {
    pub rule: &'r TriggerRule,
    pub tier: TriggerTier,
    /// Keyword that matched, in its configured casing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_keyword: Option<String>,
}

/// Outcome of one `resolve` call
///
/// The rule, tier and keyword live together in [`TriggerMatch`], so an empty
/// result can never carry a stray tier or keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult<'r> {
    #[serde(flatten)]
    hit: Option<TriggerMatch<'r>>,
    /// The `now` passed to the resolver
    resolved_at: DateTime<Utc>,
}

impl<'r> MatchResult<'r> {
    /// No rule matched
    pub fn empty(resolved_at: DateTime<Utc>) -> Self {
        Self {
            hit: None,
            resolved_at,
        }
    }

    pub fn matched(
        rule: &'r TriggerRule,
        tier: TriggerTier,
        matched_keyword: Option<String>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            hit: Some(TriggerMatch {
                rule,
                tier,
                matched_keyword,
            }),
            resolved_at,
        }
    }

    pub fn is_match(&self) -> bool {
        self.hit.is_some()
    }

    pub fn rule(&self) -> Option<&'r TriggerRule> {
        self.hit.as_ref().map(|m| m.rule)
    }

    pub fn tier(&self) -> Option<TriggerTier> {
        self.hit.as_ref().map(|m| m.tier)
    }

    pub fn matched_keyword(&self) -> Option<&str> {
        self.hit.as_ref().and_then(|m| m.matched_keyword.as_deref())
    }

    pub fn as_match(&self) -> Option<&TriggerMatch<'r>> {
        self.hit.as_ref()
    }

    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }
}
