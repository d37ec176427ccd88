//! Priority resolver
//!
//! Picks at most one rule for an event.
//!
//! # Resolution flow
//!
//! 1. Keep rules that are active and belong to the bot
//! 2. Follow events: the first follow rule wins, no keyword or schedule check
//! 3. Message events: walk the tiers in order, first positive match wins
//!    - `StoryKeyword`: story id covered, then exact keyword match
//!    - `StoryGeneral`: story id covered, then schedule match
//!    - `Keyword`: exact keyword match
//!    - `GeneralTime`: schedule match
//! 4. Nothing matched: empty [`MatchResult`]
//!
//! Inside a tier candidates are tried by `priority` (smaller first), then in
//! input order. General-time candidates are first ranked by schedule type:
//! Monthly, BusinessHour, NonBusinessHour, Daily, DateRange.
//!
//! Schedules are evaluated at the event timestamp in the governing timezone.
//! The resolver never reads the clock; `now` is only recorded on the result.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use reply_trigger::{
//!     BotSettings, CanonicalEvent, Channel, PriorityResolver, TriggerRule, TriggerTier,
//!     WeeklyBusinessHours,
//! };
//!
//! let bot = BotSettings::new("bot-1").with_timezone("Asia/Taipei");
//! let hours = WeeklyBusinessHours::new();
//! let rules = vec![TriggerRule::keyword("greet", "bot-1", ["hello"])];
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 4, 0, 0).unwrap();
//! let event = CanonicalEvent::message(Channel::Line, "user-1", now, Some("  HELLO ".into()));
//!
//! let result = PriorityResolver::new(&bot, &hours).resolve(&rules, &event, now);
//! assert_eq!(result.tier(), Some(TriggerTier::Keyword));
//! assert_eq!(result.matched_keyword(), Some("hello"));
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::business_hours::BusinessHourProvider;
use crate::event::CanonicalEvent;
use crate::keyword_matcher::KeywordMatcher;
use crate::schedule::ScheduleSpec;
use crate::timezone::to_local;
use crate::types::{BotSettings, MatchResult, TriggerRule, TriggerTier};

/// A rule and its position in the input list
type Candidate<'r> = (usize, &'r TriggerRule);

/// Eligible rules split by tier
#[derive(Debug, Default)]
struct TierBuckets<'r> {
    story_keyword: Vec<Candidate<'r>>,
    story_general: Vec<Candidate<'r>>,
    keyword: Vec<Candidate<'r>>,
    general_time: Vec<Candidate<'r>>,
    follow: Vec<Candidate<'r>>,
}

impl<'r> TierBuckets<'r> {
    fn bucket_mut(&mut self, tier: TriggerTier) -> &mut Vec<Candidate<'r>> {
        match tier {
            TriggerTier::StoryKeyword => &mut self.story_keyword,
            TriggerTier::StoryGeneral => &mut self.story_general,
            TriggerTier::Keyword => &mut self.keyword,
            TriggerTier::GeneralTime => &mut self.general_time,
            TriggerTier::Follow => &mut self.follow,
        }
    }

    /// Candidates of a tier in evaluation order
    fn ordered(&mut self, tier: TriggerTier) -> &[Candidate<'r>] {
        let bucket = self.bucket_mut(tier);
        if tier == TriggerTier::GeneralTime {
            bucket.sort_by_key(|(idx, rule)| {
                let rank = rule
                    .schedule
                    .map_or(u8::MAX, |s| s.kind().general_time_rank());
                (rank, rule.priority, *idx)
            });
        } else {
            bucket.sort_by_key(|(idx, rule)| (rule.priority, *idx));
        }
        bucket
    }
}

/// Resolves events against rule snapshots for one bot
///
/// Holds no mutable state; one instance may serve any number of calls.
pub struct PriorityResolver<'a> {
    bot: &'a BotSettings,
    provider: &'a dyn BusinessHourProvider,
    matcher: KeywordMatcher,
}

impl<'a> PriorityResolver<'a> {
    pub fn new(bot: &'a BotSettings, provider: &'a dyn BusinessHourProvider) -> Self {
        Self {
            bot,
            provider,
            matcher: KeywordMatcher::new(),
        }
    }

    pub fn bot(&self) -> &BotSettings {
        self.bot
    }

    /// Resolve `event` against `rules`.
    pub fn resolve<'r>(
        &self,
        rules: &'r [TriggerRule],
        event: &CanonicalEvent,
        now: DateTime<Utc>,
    ) -> MatchResult<'r> {
        let mut buckets = self.partition(rules);

        if event.is_follow() {
            return match buckets.ordered(TriggerTier::Follow).first() {
                Some(&(_, rule)) => self.hit(rule, TriggerTier::Follow, None, event, now),
                None => {
                    tracing::debug!(bot_id = %self.bot.bot_id, "no follow rule configured");
                    MatchResult::empty(now)
                }
            };
        }

        for tier in TriggerTier::PRIORITY_ORDER {
            let candidates = buckets.ordered(tier);
            tracing::debug!(tier = %tier, candidates = candidates.len(), "evaluating tier");

            for &(_, rule) in candidates {
                if let Some(result) = self.evaluate_candidate(rule, tier, event, now) {
                    return result;
                }
            }
        }

        tracing::debug!(
            bot_id = %self.bot.bot_id,
            user_id = %event.user_id,
            "no trigger matched"
        );
        MatchResult::empty(now)
    }

    /// Keep active rules of this bot, bucketed by tier.
    fn partition<'r>(&self, rules: &'r [TriggerRule]) -> TierBuckets<'r> {
        let mut buckets = TierBuckets::default();

        for (idx, rule) in rules.iter().enumerate() {
            if !rule.is_active() {
                tracing::trace!(rule_id = %rule.id, "skipping inactive rule");
                continue;
            }
            if rule.bot_id != self.bot.bot_id {
                tracing::debug!(
                    rule_id = %rule.id,
                    rule_bot = %rule.bot_id,
                    bot_id = %self.bot.bot_id,
                    "skipping rule of another bot"
                );
                continue;
            }
            match rule.tier() {
                Some(tier) => buckets.bucket_mut(tier).push((idx, rule)),
                None => {
                    tracing::debug!(rule_id = %rule.id, "rule fits no tier, skipping");
                }
            }
        }

        buckets
    }

    fn evaluate_candidate<'r>(
        &self,
        rule: &'r TriggerRule,
        tier: TriggerTier,
        event: &CanonicalEvent,
        now: DateTime<Utc>,
    ) -> Option<MatchResult<'r>> {
        if tier.is_story_tier() && !rule.covers_story(event.story_id()) {
            tracing::debug!(
                rule_id = %rule.id,
                story_id = ?event.story_id(),
                "story not covered"
            );
            return None;
        }

        if tier.is_keyword_tier() {
            return match self.matcher.match_optional(event.content(), &rule.keywords) {
                Some(m) => Some(self.hit(rule, tier, Some(m.matched_keyword), event, now)),
                None => {
                    tracing::debug!(rule_id = %rule.id, "keywords did not match");
                    None
                }
            };
        }

        let schedule = rule.schedule.as_ref()?;
        let local = self.local_time(schedule, event);
        if schedule.evaluate(local, &self.bot.organization_id, self.provider) {
            Some(self.hit(rule, tier, None, event, now))
        } else {
            tracing::debug!(
                rule_id = %rule.id,
                schedule = %schedule,
                local_time = %local,
                "schedule not active"
            );
            None
        }
    }

    /// Event instant as wall-clock time in the schedule's governing timezone
    fn local_time(&self, schedule: &ScheduleSpec, event: &CanonicalEvent) -> NaiveDateTime {
        to_local(&event.timestamp, schedule.governing_timezone(self.bot)).naive_local()
    }

    fn hit<'r>(
        &self,
        rule: &'r TriggerRule,
        tier: TriggerTier,
        matched_keyword: Option<String>,
        event: &CanonicalEvent,
        now: DateTime<Utc>,
    ) -> MatchResult<'r> {
        tracing::info!(
            rule_id = %rule.id,
            rule = %rule.label(),
            tier = %tier,
            keyword = ?matched_keyword,
            channel = %event.channel,
            user_id = %event.user_id,
            "trigger matched"
        );
        MatchResult::matched(rule, tier, matched_keyword, now)
    }
}

/// Resolve one event against a rule snapshot.
pub fn resolve<'r>(
    rules: &'r [TriggerRule],
    event: &CanonicalEvent,
    now: DateTime<Utc>,
    bot: &BotSettings,
    provider: &dyn BusinessHourProvider,
) -> MatchResult<'r> {
    PriorityResolver::new(bot, provider).resolve(rules, event, now)
}
