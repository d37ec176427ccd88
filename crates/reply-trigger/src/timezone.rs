//! Timezone conversion
//!
//! IANA zone lookup through `chrono-tz`. Resolution never fails: a missing or
//! unknown zone name falls back to UTC, and naive event timestamps are read as
//! UTC before conversion.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::{TriggerError, TriggerResult};
use crate::event::EventTimestamp;

/// Strict parse, for validation.
pub fn parse_timezone(name: &str) -> TriggerResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TriggerError::invalid_timezone(name))
}

/// Lenient parse: empty or unknown names yield UTC.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
        return chrono_tz::UTC;
    };

    match parse_timezone(name) {
        Ok(tz) => tz,
        Err(e) => {
            tracing::warn!(timezone = %name, error = %e, "falling back to UTC");
            chrono_tz::UTC
        }
    }
}

/// Convert an event instant to local time in the named zone.
pub fn to_local(timestamp: &EventTimestamp, tz_name: Option<&str>) -> DateTime<Tz> {
    let tz = resolve_timezone(tz_name);
    timestamp.to_utc().with_timezone(&tz)
}
