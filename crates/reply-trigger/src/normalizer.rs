//! Event normalizer
//!
//! Maps one channel webhook event into a [`CanonicalEvent`].
//!
//! | Channel | Event source | Sender | Story |
//! |---------|--------------|--------|-------|
//! | LINE | `events[]` item | `source.userId` | - |
//! | Facebook | `entry[].messaging[]` item | `sender.id` | - |
//! | Instagram | `entry[].messaging[]` item | `sender.id` | `message.reply_to.story.id` |
//!
//! Payloads that are not JSON objects, or that lack a sender or timestamp,
//! fail with `InvalidPayload`. Events that are neither a message nor a follow
//! (postbacks, reads, echoes, unfollows) fail with `UnsupportedEventKind`.
//! Either way the caller should not attempt resolution.

use serde_json::{Map, Value};

use crate::error::{TriggerError, TriggerResult};
use crate::event::{CanonicalEvent, EventTimestamp};
use crate::types::Channel;

/// Normalize one webhook event for `bot_id`.
pub fn normalize_event(
    channel: Channel,
    payload: &Value,
    bot_id: &str,
) -> TriggerResult<CanonicalEvent> {
    let object = payload
        .as_object()
        .ok_or_else(|| TriggerError::invalid_payload("event payload is not a JSON object"))?;

    let event = match channel {
        Channel::Line => normalize_line(object)?,
        Channel::Facebook => normalize_messaging(channel, object, false)?,
        Channel::Instagram => normalize_messaging(channel, object, true)?,
    };

    tracing::debug!(
        channel = %channel,
        kind = %event.kind,
        user_id = %event.user_id,
        story_id = ?event.story_id,
        "normalized event"
    );
    Ok(event.with_bot_id(bot_id))
}

/// Individual events inside a webhook body.
///
/// Accepts a full LINE body (`events`) or Meta body (`entry[].messaging`);
/// anything else is treated as a single event.
pub fn extract_events(channel: Channel, body: &Value) -> Vec<&Value> {
    match channel {
        Channel::Line => match body.get("events").and_then(Value::as_array) {
            Some(events) => events.iter().collect(),
            None => vec![body],
        },
        Channel::Facebook | Channel::Instagram => {
            match body.get("entry").and_then(Value::as_array) {
                Some(entries) => entries
                    .iter()
                    .filter_map(|entry| entry.get("messaging").and_then(Value::as_array))
                    .flatten()
                    .collect(),
                None => vec![body],
            }
        }
    }
}

fn normalize_line(object: &Map<String, Value>) -> TriggerResult<CanonicalEvent> {
    let user_id = str_at(object, &["source", "userId"])
        .ok_or_else(|| TriggerError::invalid_payload("LINE event without source.userId"))?;
    let timestamp = timestamp_of(object)?;

    let event_type = object.get("type").and_then(Value::as_str).unwrap_or("");
    match event_type {
        "message" => {
            let content = match str_at(object, &["message", "type"]) {
                Some("text") => str_at(object, &["message", "text"]).map(str::to_string),
                _ => None,
            };
            Ok(CanonicalEvent::message(Channel::Line, user_id, timestamp, content))
        }
        "follow" => Ok(CanonicalEvent::follow(Channel::Line, user_id, timestamp)),
        "" => Err(TriggerError::invalid_payload("LINE event without type")),
        other => Err(TriggerError::unsupported_event(other)),
    }
}

fn normalize_messaging(
    channel: Channel,
    object: &Map<String, Value>,
    with_story: bool,
) -> TriggerResult<CanonicalEvent> {
    let user_id = str_at(object, &["sender", "id"])
        .ok_or_else(|| TriggerError::invalid_payload(format!("{} entry without sender.id", channel)))?;
    let timestamp = timestamp_of(object)?;

    let Some(message) = object.get("message").and_then(Value::as_object) else {
        let kind = ["postback", "read", "delivery", "reaction", "referral", "optin"]
            .into_iter()
            .find(|key| object.contains_key(*key))
            .unwrap_or("unknown");
        return Err(TriggerError::unsupported_event(kind));
    };

    if message.get("is_echo").and_then(Value::as_bool) == Some(true) {
        return Err(TriggerError::unsupported_event("echo"));
    }

    let content = message.get("text").and_then(Value::as_str).map(str::to_string);
    let mut event = CanonicalEvent::message(channel, user_id, timestamp, content);
    if with_story {
        if let Some(story_id) = str_at(message, &["reply_to", "story", "id"]) {
            event = event.with_story(story_id);
        }
    }
    Ok(event)
}

/// Nested string lookup
fn str_at<'v>(object: &'v Map<String, Value>, path: &[&str]) -> Option<&'v str> {
    let (first, rest) = path.split_first()?;
    let mut current = object.get(*first)?;
    for key in rest {
        current = current.get(*key)?;
    }
    current.as_str().filter(|s| !s.is_empty())
}

fn timestamp_of(object: &Map<String, Value>) -> TriggerResult<EventTimestamp> {
    match object.get("timestamp") {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(EventTimestamp::from_millis)
            .ok_or_else(|| TriggerError::invalid_payload(format!("timestamp out of range: {}", n))),
        Some(Value::String(s)) => s.parse(),
        Some(other) => Err(TriggerError::invalid_payload(format!(
            "timestamp must be a number or string, got {}",
            other
        ))),
        None => Err(TriggerError::invalid_payload("event without timestamp")),
    }
}
