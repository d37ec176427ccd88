//! End-to-end resolution scenarios
//!
//! Drives the public API only: rules and events in, `MatchResult` out.
//!
//! # Test Coverage
//!
//! - Exact keyword matching through the resolver
//! - Daily, monthly and midnight-crossing schedules
//! - Tier precedence and story exclusion
//! - Disabled and archived exclusion
//! - Follow events

use chrono::{DateTime, TimeZone, Utc};
use reply_trigger::{
    resolve, BotSettings, CanonicalEvent, Channel, MatchResult, ScheduleSpec, TriggerRule,
    TriggerTier, WeeklyBusinessHours,
};
use test_case::test_case;

const BOT: &str = "bot-1";

fn bot() -> BotSettings {
    BotSettings::new(BOT)
}

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, minute, 0).unwrap()
}

fn message(content: &str, when: DateTime<Utc>) -> CanonicalEvent {
    CanonicalEvent::message(Channel::Instagram, "user-1", when, Some(content.to_string()))
        .with_bot_id(BOT)
}

fn run<'r>(rules: &'r [TriggerRule], event: &CanonicalEvent) -> MatchResult<'r> {
    let now = event.timestamp.to_utc();
    resolve(rules, event, now, &bot(), &WeeklyBusinessHours::new())
}

// ============================================================================
// Keyword matching
// ============================================================================

#[test_case("  HELLO  ", true ; "padded upper case")]
#[test_case("hello", true ; "exact")]
#[test_case("Hello", true ; "capitalized")]
#[test_case("hello world", false ; "trailing word")]
#[test_case("helo", false ; "typo")]
#[test_case("hellothere", false ; "prefix")]
#[test_case("", false ; "empty")]
fn keyword_rule_matches_only_exact_content(content: &str, expected: bool) {
    let rules = vec![TriggerRule::keyword("kw", BOT, ["hello"])];
    let result = run(&rules, &message(content, at(15, 12, 0)));

    assert_eq!(result.is_match(), expected);
    if expected {
        assert_eq!(result.tier(), Some(TriggerTier::Keyword));
        assert_eq!(result.matched_keyword(), Some("hello"));
    } else {
        assert_eq!(result.tier(), None);
        assert_eq!(result.matched_keyword(), None);
    }
}

// ============================================================================
// Schedules
// ============================================================================

#[test_case(20, 0, false ; "evening")]
#[test_case(14, 0, true ; "afternoon")]
#[test_case(9, 0, true ; "opening minute")]
#[test_case(17, 0, false ; "closing minute")]
fn daily_business_window(hour: u32, minute: u32, expected: bool) {
    let rules = vec![TriggerRule::scheduled(
        "daily",
        BOT,
        ScheduleSpec::daily("09:00", "17:00").unwrap(),
    )];
    let result = run(&rules, &message("anything", at(15, hour, minute)));
    assert_eq!(result.is_match(), expected);
}

#[test_case(23, 0, true ; "before midnight")]
#[test_case(7, 0, false ; "after window")]
#[test_case(5, 0, true ; "after midnight")]
#[test_case(12, 0, false ; "midday")]
fn midnight_crossing_window(hour: u32, minute: u32, expected: bool) {
    let rules = vec![TriggerRule::scheduled(
        "night",
        BOT,
        ScheduleSpec::daily("22:00", "06:00").unwrap(),
    )];
    let result = run(&rules, &message("anything", at(15, hour, minute)));
    assert_eq!(result.is_match(), expected);
}

#[test]
fn monthly_rule_on_wrong_day_does_not_match() {
    let rules = vec![TriggerRule::scheduled(
        "monthly",
        BOT,
        ScheduleSpec::monthly(15, "09:00", "17:00").unwrap(),
    )];
    assert!(!run(&rules, &message("x", at(16, 10, 0))).is_match());
    assert!(run(&rules, &message("x", at(15, 10, 0))).is_match());
}

// ============================================================================
// Tier precedence
// ============================================================================

#[test]
fn keyword_rule_beats_general_time_rule() {
    let rules = vec![
        TriggerRule::scheduled("all-day", BOT, ScheduleSpec::daily("00:00", "23:59").unwrap()),
        TriggerRule::keyword("hello", BOT, ["hello"]),
    ];
    let result = run(&rules, &message("hello", at(15, 12, 0)));

    assert_eq!(result.rule().map(|r| r.id.as_str()), Some("hello"));
    assert_eq!(result.tier(), Some(TriggerTier::Keyword));
}

#[test]
fn general_time_rule_wins_when_keyword_misses() {
    let rules = vec![
        TriggerRule::scheduled("all-day", BOT, ScheduleSpec::daily("00:00", "23:59").unwrap()),
        TriggerRule::keyword("hello", BOT, ["hello"]),
    ];
    let result = run(&rules, &message("something else", at(15, 12, 0)));
    assert_eq!(result.rule().map(|r| r.id.as_str()), Some("all-day"));
}

#[test_case(None ; "no story")]
#[test_case(Some("story456") ; "other story")]
fn story_rule_never_matches_outside_its_stories(story: Option<&str>) {
    let rules = vec![
        TriggerRule::keyword("story-kw", BOT, ["hello"]).with_story_ids(["story123"]),
        TriggerRule::scheduled("story-time", BOT, ScheduleSpec::daily("00:00", "23:59").unwrap())
            .with_story_ids(["story123"]),
    ];
    let mut event = message("hello", at(15, 12, 0));
    if let Some(story) = story {
        event = event.with_story(story);
    }
    assert!(!run(&rules, &event).is_match());
}

#[test]
fn story_keyword_beats_plain_keyword() {
    let rules = vec![
        TriggerRule::keyword("plain", BOT, ["hello"]),
        TriggerRule::keyword("story", BOT, ["hello"]).with_story_ids(["story123"]),
    ];
    let event = message("hello", at(15, 12, 0)).with_story("story123");
    let result = run(&rules, &event);

    assert_eq!(result.rule().map(|r| r.id.as_str()), Some("story"));
    assert_eq!(result.tier(), Some(TriggerTier::StoryKeyword));
}

// ============================================================================
// Exclusion
// ============================================================================

#[test]
fn disabled_and_archived_rules_never_match() {
    let rules = vec![
        TriggerRule::keyword("off", BOT, ["hello"]).with_enabled(false),
        TriggerRule::keyword("old", BOT, ["hello"]).with_archived(true),
        TriggerRule::scheduled("off-time", BOT, ScheduleSpec::daily("00:00", "23:59").unwrap())
            .with_enabled(false),
        TriggerRule::follow("off-follow", BOT).with_archived(true),
    ];

    assert!(!run(&rules, &message("hello", at(15, 12, 0))).is_match());

    let follow = CanonicalEvent::follow(Channel::Line, "user-1", at(15, 12, 0));
    assert!(!run(&rules, &follow).is_match());
}

// ============================================================================
// Follow events
// ============================================================================

#[test]
fn follow_event_matches_follow_rule_only() {
    let rules = vec![
        TriggerRule::keyword("hello", BOT, ["hello"]),
        TriggerRule::scheduled("all-day", BOT, ScheduleSpec::daily("00:00", "23:59").unwrap()),
        TriggerRule::follow("welcome", BOT),
    ];
    let follow = CanonicalEvent::follow(Channel::Line, "user-1", at(15, 12, 0));
    let result = run(&rules, &follow);

    assert_eq!(result.rule().map(|r| r.id.as_str()), Some("welcome"));
    assert_eq!(result.tier(), Some(TriggerTier::Follow));
    assert_eq!(result.matched_keyword(), None);
}

#[test]
fn resolution_is_idempotent() {
    let rules = vec![
        TriggerRule::keyword("hello", BOT, ["hello"]),
        TriggerRule::scheduled("night", BOT, ScheduleSpec::daily("22:00", "06:00").unwrap()),
    ];
    let event = message("hi", at(15, 23, 0));
    assert_eq!(run(&rules, &event), run(&rules, &event));
}
