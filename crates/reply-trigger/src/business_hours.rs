//! Business hours
//!
//! The resolver asks a [`BusinessHourProvider`] whether an organization is
//! open. The caller owns and refreshes whatever backs it; the resolver only
//! reads from it.

use std::collections::HashMap;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::schedule::{clock_time, TimeWindow};

/// Answers whether an organization is open at a local weekday and time.
pub trait BusinessHourProvider {
    fn is_open(&self, organization_id: &str, weekday: Weekday, time: NaiveTime) -> bool;
}

impl<F> BusinessHourProvider for F
where
    F: Fn(&str, Weekday, NaiveTime) -> bool,
{
    fn is_open(&self, organization_id: &str, weekday: Weekday, time: NaiveTime) -> bool {
        self(organization_id, weekday, time)
    }
}

/// One weekly opening window as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHourWindow {
    /// Owning organization; the bot's organization when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(with = "weekday_serde")]
    pub weekday: Weekday,
    #[serde(with = "clock_time")]
    pub start: NaiveTime,
    #[serde(with = "clock_time")]
    pub end: NaiveTime,
}

/// Weekdays as names (`"mon"`, `"Monday"`) or ISO numbers (1 = Monday)
mod weekday_serde {
    use chrono::Weekday;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const ISO_WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawWeekday {
        Number(u8),
        Name(String),
    }

    pub fn serialize<S: Serializer>(weekday: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&weekday.to_string().to_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        match RawWeekday::deserialize(deserializer)? {
            RawWeekday::Number(n) => n
                .checked_sub(1)
                .and_then(|i| ISO_WEEK.get(usize::from(i)).copied())
                .ok_or_else(|| D::Error::custom(format!("weekday number must be 1..=7, got {}", n))),
            RawWeekday::Name(name) => name
                .trim()
                .parse::<Weekday>()
                .map_err(|_| D::Error::custom(format!("invalid weekday '{}'", name))),
        }
    }
}

/// Immutable weekly schedule per organization
///
/// Windows are half-open like a daily schedule. A window that crosses
/// midnight opens on its own weekday and closes on the next one, so a
/// Saturday 20:00-02:00 window covers Sunday 01:00. An organization without
/// windows is closed.
#[derive(Debug, Clone, Default)]
pub struct WeeklyBusinessHours {
    windows: HashMap<String, Vec<(Weekday, TimeWindow)>>,
}

impl WeeklyBusinessHours {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured windows; windows without an organization are
    /// assigned to `default_organization`.
    pub fn from_windows(windows: &[BusinessHourWindow], default_organization: &str) -> Self {
        let mut hours = Self::new();
        for window in windows {
            let org = window
                .organization_id
                .as_deref()
                .unwrap_or(default_organization);
            hours.add_window(org, window.weekday, TimeWindow::new(window.start, window.end));
        }
        hours
    }

    pub fn add_window(&mut self, organization_id: &str, weekday: Weekday, window: TimeWindow) {
        self.windows
            .entry(organization_id.to_string())
            .or_default()
            .push((weekday, window));
    }

    pub fn with_window(
        mut self,
        organization_id: &str,
        weekday: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Self {
        self.add_window(organization_id, weekday, TimeWindow::new(start, end));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn organization_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_count(&self, organization_id: &str) -> usize {
        self.windows.get(organization_id).map_or(0, Vec::len)
    }
}

impl BusinessHourProvider for WeeklyBusinessHours {
    fn is_open(&self, organization_id: &str, weekday: Weekday, time: NaiveTime) -> bool {
        self.windows.get(organization_id).is_some_and(|windows| {
            windows
                .iter()
                .any(|(day, window)| window_covers(*day, window, weekday, time))
        })
    }
}

/// Whether a window opening on `day` covers `time` on `weekday`
fn window_covers(day: Weekday, window: &TimeWindow, weekday: Weekday, time: NaiveTime) -> bool {
    if window.crosses_midnight() {
        (weekday == day && time >= window.start) || (weekday == day.succ() && time < window.end)
    } else {
        weekday == day && window.contains(time)
    }
}
