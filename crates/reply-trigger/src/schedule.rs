//! Schedule evaluation
//!
//! [`ScheduleSpec`] is the typed form of a rule's schedule. Construction
//! validates every field, so evaluation itself cannot fail.
//!
//! # Variants
//!
//! - `Daily`: local time of day in `[start, end)`; `start > end` wraps past midnight
//! - `Monthly`: day of month equals `day` and the `Daily` window holds
//! - `DateRange`: local date within `[start_date, end_date]`, both inclusive
//! - `BusinessHour`: the organization's business hours are open
//! - `NonBusinessHour`: exact negation of `BusinessHour`
//!
//! # Wire form
//!
//! ```json
//! { "type": "daily", "start": "22:00", "end": "06:00" }
//! { "type": "monthly", "day": 15, "start": "09:00", "end": "17:00" }
//! { "type": "date_range", "start_date": "2024-12-24", "end_date": "2024-12-26" }
//! { "type": "business_hour" }
//! { "type": "non_business_hour" }
//! ```

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::business_hours::BusinessHourProvider;
use crate::error::{TriggerError, TriggerResult};
use crate::types::BotSettings;

/// Time-of-day window, half-open, wrapping past midnight when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

/// `"HH:MM"` / `"HH:MM:SS"` time-of-day strings
pub mod clock_time {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::error::{TriggerError, TriggerResult};

    pub fn parse(s: &str) -> TriggerResult<NaiveTime> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map_err(|_| TriggerError::invalid_schedule(format!("invalid time '{}'", s)))
    }

    /// Seconds are printed only when non-zero.
    pub fn format(time: &NaiveTime) -> String {
        if time.second() == 0 {
            time.format("%H:%M").to_string()
        } else {
            time.format("%H:%M:%S").to_string()
        }
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_date(s: &str) -> TriggerResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TriggerError::invalid_schedule(format!("invalid date '{}'", s.trim())))
}

/// Schedule as stored: tagged by `type`, times and dates as strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawSchedule {
    Daily {
        start: String,
        end: String,
    },
    Monthly {
        day: u32,
        start: String,
        end: String,
    },
    DateRange {
        start_date: String,
        end_date: String,
    },
    BusinessHour,
    NonBusinessHour,
}

/// Schedule variant without its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Daily,
    Monthly,
    DateRange,
    BusinessHour,
    NonBusinessHour,
}

impl ScheduleKind {
    /// Sub-order among general-time rules: Monthly, BusinessHour,
    /// NonBusinessHour, Daily, then DateRange.
    pub fn general_time_rank(&self) -> u8 {
        match self {
            ScheduleKind::Monthly => 0,
            ScheduleKind::BusinessHour => 1,
            ScheduleKind::NonBusinessHour => 2,
            ScheduleKind::Daily => 3,
            ScheduleKind::DateRange => 4,
        }
    }

    /// Evaluated in the organization's timezone
    pub fn uses_business_hours(&self) -> bool {
        matches!(self, ScheduleKind::BusinessHour | ScheduleKind::NonBusinessHour)
    }
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Daily => write!(f, "daily"),
            ScheduleKind::Monthly => write!(f, "monthly"),
            ScheduleKind::DateRange => write!(f, "date_range"),
            ScheduleKind::BusinessHour => write!(f, "business_hour"),
            ScheduleKind::NonBusinessHour => write!(f, "non_business_hour"),
        }
    }
}

/// When a time-scoped rule is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule", into = "RawSchedule")]
pub enum ScheduleSpec {
    Daily {
        start: NaiveTime,
        end: NaiveTime,
    },
    Monthly {
        day: u32,
        start: NaiveTime,
        end: NaiveTime,
    },
    DateRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    BusinessHour,
    NonBusinessHour,
}

impl ScheduleSpec {
    /// Daily window from `"HH:MM"` strings
    pub fn daily(start: &str, end: &str) -> TriggerResult<Self> {
        Ok(Self::Daily {
            start: clock_time::parse(start)?,
            end: clock_time::parse(end)?,
        })
    }

    /// Monthly window; `day` must be in `1..=31`
    pub fn monthly(day: u32, start: &str, end: &str) -> TriggerResult<Self> {
        if !(1..=31).contains(&day) {
            return Err(TriggerError::invalid_schedule(format!(
                "day of month must be 1..=31, got {}",
                day
            )));
        }
        Ok(Self::Monthly {
            day,
            start: clock_time::parse(start)?,
            end: clock_time::parse(end)?,
        })
    }

    /// Inclusive date range from `"YYYY-MM-DD"` strings
    pub fn date_range(start_date: &str, end_date: &str) -> TriggerResult<Self> {
        let start_date = parse_date(start_date)?;
        let end_date = parse_date(end_date)?;
        if start_date > end_date {
            return Err(TriggerError::invalid_schedule(format!(
                "start_date {} is after end_date {}",
                start_date, end_date
            )));
        }
        Ok(Self::DateRange {
            start_date,
            end_date,
        })
    }

    pub fn from_raw(raw: RawSchedule) -> TriggerResult<Self> {
        match raw {
            RawSchedule::Daily { start, end } => Self::daily(&start, &end),
            RawSchedule::Monthly { day, start, end } => Self::monthly(day, &start, &end),
            RawSchedule::DateRange {
                start_date,
                end_date,
            } => Self::date_range(&start_date, &end_date),
            RawSchedule::BusinessHour => Ok(Self::BusinessHour),
            RawSchedule::NonBusinessHour => Ok(Self::NonBusinessHour),
        }
    }

    pub fn to_raw(&self) -> RawSchedule {
        match *self {
            Self::Daily { start, end } => RawSchedule::Daily {
                start: clock_time::format(&start),
                end: clock_time::format(&end),
            },
            Self::Monthly { day, start, end } => RawSchedule::Monthly {
                day,
                start: clock_time::format(&start),
                end: clock_time::format(&end),
            },
            Self::DateRange {
                start_date,
                end_date,
            } => RawSchedule::DateRange {
                start_date: start_date.format("%Y-%m-%d").to_string(),
                end_date: end_date.format("%Y-%m-%d").to_string(),
            },
            Self::BusinessHour => RawSchedule::BusinessHour,
            Self::NonBusinessHour => RawSchedule::NonBusinessHour,
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            Self::Daily { .. } => ScheduleKind::Daily,
            Self::Monthly { .. } => ScheduleKind::Monthly,
            Self::DateRange { .. } => ScheduleKind::DateRange,
            Self::BusinessHour => ScheduleKind::BusinessHour,
            Self::NonBusinessHour => ScheduleKind::NonBusinessHour,
        }
    }

    /// Zone name the schedule is evaluated in; `None` means UTC.
    pub fn governing_timezone<'a>(&self, bot: &'a BotSettings) -> Option<&'a str> {
        if self.kind().uses_business_hours() {
            bot.business_hour_timezone()
        } else {
            bot.timezone.as_deref()
        }
    }

    /// Evaluate against a local wall-clock instant, already converted to
    /// [`governing_timezone`](Self::governing_timezone).
    pub fn evaluate(
        &self,
        local: NaiveDateTime,
        organization_id: &str,
        provider: &dyn BusinessHourProvider,
    ) -> bool {
        let time = local.time();
        match *self {
            Self::Daily { start, end } => TimeWindow::new(start, end).contains(time),
            Self::Monthly { day, start, end } => {
                local.day() == day && TimeWindow::new(start, end).contains(time)
            }
            Self::DateRange {
                start_date,
                end_date,
            } => {
                let date = local.date();
                start_date <= date && date <= end_date
            }
            Self::BusinessHour => provider.is_open(organization_id, local.weekday(), time),
            Self::NonBusinessHour => !provider.is_open(organization_id, local.weekday(), time),
        }
    }
}

impl TryFrom<RawSchedule> for ScheduleSpec {
    type Error = TriggerError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<ScheduleSpec> for RawSchedule {
    fn from(spec: ScheduleSpec) -> Self {
        spec.to_raw()
    }
}

impl fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily { start, end } => write!(
                f,
                "daily {}-{}",
                clock_time::format(start),
                clock_time::format(end)
            ),
            Self::Monthly { day, start, end } => write!(
                f,
                "monthly day {} {}-{}",
                day,
                clock_time::format(start),
                clock_time::format(end)
            ),
            Self::DateRange {
                start_date,
                end_date,
            } => write!(f, "date range {}..={}", start_date, end_date),
            Self::BusinessHour => write!(f, "business hours"),
            Self::NonBusinessHour => write!(f, "outside business hours"),
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_CASES: u32 = 128;

    fn test_config() -> ProptestConfig {
        ProptestConfig::with_cases(TEST_CASES)
    }

    fn arb_time() -> impl Strategy<Value = NaiveTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    proptest! {
        #![proptest_config(test_config())]

        /// A wrapping window is the complement of the straight window with swapped bounds
        #[test]
        fn prop_wrapping_window_is_complement(
            a in arb_time(),
            b in arb_time(),
            probe in arb_time(),
        ) {
            prop_assume!(a < b);
            let straight = TimeWindow::new(a, b);
            let wrapping = TimeWindow::new(b, a);
            prop_assert_eq!(wrapping.contains(probe), !straight.contains(probe));
        }

        /// Start is always inside a non-empty window, end never is
        #[test]
        fn prop_half_open_bounds(a in arb_time(), b in arb_time()) {
            prop_assume!(a != b);
            let window = TimeWindow::new(a, b);
            prop_assert!(window.contains(a));
            prop_assert!(!window.contains(b));
        }

        /// Formatting then parsing gives the same time
        #[test]
        fn prop_clock_time_format_parses(time in arb_time()) {
            prop_assert_eq!(clock_time::parse(&clock_time::format(&time)).unwrap(), time);
        }
    }
}
