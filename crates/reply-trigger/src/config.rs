//! Configuration snapshot
//!
//! Loading and saving the bot settings, business hours and rules a resolver
//! runs against.
//!
//! # Behavior
//!
//! - JSON by default, YAML when the file extension is `.yaml` / `.yml`
//! - Each rule entry is decoded on its own; a malformed entry is skipped with
//!   a warning and the remaining rules still load
//! - [`TriggerConfig::load`] falls back to an empty snapshot when the file is
//!   missing or unreadable
//! - [`TriggerConfig::validate`] reports problems without rejecting the file
//!
//! # Example
//!
//! ```yaml
//! bot:
//!   bot_id: bot-1
//!   timezone: Asia/Taipei
//!   organization_id: org-1
//! business_hours:
//!   - { weekday: mon, start: "09:00", end: "18:00" }
//! rules:
//!   - id: greet
//!     bot_id: bot-1
//!     keywords: [hello, hi]
//!   - id: after-hours
//!     bot_id: bot-1
//!     schedule: { type: non_business_hour }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::business_hours::{BusinessHourWindow, WeeklyBusinessHours};
use crate::error::TriggerError;
use crate::schedule::ScheduleSpec;
use crate::timezone::parse_timezone;
use crate::types::{BotSettings, EventKind, TriggerRule};

/// Config load/save errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// On-disk format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

/// A rule entry dropped while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// Position in the `rules` list
    pub index: usize,
    /// Rule ID, when the entry had one
    pub id: Option<String>,
    pub error: TriggerError,
}

#[derive(Deserialize)]
struct RawTriggerConfig {
    bot: BotSettings,
    #[serde(default)]
    business_hours: Vec<BusinessHourWindow>,
    #[serde(default)]
    rules: Vec<serde_json::Value>,
}

/// Everything one bot's resolver needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTriggerConfig")]
pub struct TriggerConfig {
    pub bot: BotSettings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub business_hours: Vec<BusinessHourWindow>,
    #[serde(default)]
    pub rules: Vec<TriggerRule>,
    /// Entries that failed to decode
    #[serde(skip)]
    pub skipped: Vec<SkippedRule>,
}

impl From<RawTriggerConfig> for TriggerConfig {
    fn from(raw: RawTriggerConfig) -> Self {
        let mut rules = Vec::with_capacity(raw.rules.len());
        let mut skipped = Vec::new();

        for (index, entry) in raw.rules.into_iter().enumerate() {
            let id = entry.get("id").and_then(|v| v.as_str()).map(str::to_string);
            match TriggerRule::deserialize(&entry) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    let error = decode_error(&entry, e);
                    warn!(index, rule_id = ?id, error = %error, "skipping malformed rule");
                    skipped.push(SkippedRule { index, id, error });
                }
            }
        }

        Self {
            bot: raw.bot,
            business_hours: raw.business_hours,
            rules,
            skipped,
        }
    }
}

/// Blame the schedule only when the schedule itself fails to decode.
fn decode_error(entry: &serde_json::Value, error: serde_json::Error) -> TriggerError {
    let schedule_error = entry
        .get("schedule")
        .filter(|schedule| !schedule.is_null())
        .and_then(|schedule| ScheduleSpec::deserialize(schedule).err());

    match schedule_error {
        Some(e) => TriggerError::invalid_schedule(e.to_string()),
        None => TriggerError::invalid_rule(error.to_string()),
    }
}

impl TriggerConfig {
    pub fn new(bot: BotSettings) -> Self {
        Self {
            bot,
            ..Self::default()
        }
    }

    pub fn with_rules(mut self, rules: Vec<TriggerRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_business_hours(mut self, windows: Vec<BusinessHourWindow>) -> Self {
        self.business_hours = windows;
        self
    }

    /// Load from file, falling back to an empty snapshot.
    ///
    /// - Missing file: `info` log, default config
    /// - Unreadable or unparsable file: `error` log, default config
    pub fn load(path: &Path) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(ConfigError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = ?path, "trigger config not found, using defaults");
                Self::default()
            }
            Err(e) => {
                error!(path = ?path, error = %e, "failed to load trigger config, using defaults");
                Self::default()
            }
        }
    }

    /// Load from file, reporting every failure.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, ConfigFormat::from_path(path))?;
        info!(
            path = ?path,
            rules = config.rules.len(),
            skipped = config.skipped.len(),
            "loaded trigger config"
        );
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Self> {
        let config: Self = match format {
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        };
        if config.bot.bot_id.trim().is_empty() {
            return Err(ConfigError::Invalid("bot.bot_id must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Save to file in the format implied by its extension.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content)?;
        info!(path = ?path, "saved trigger config");
        Ok(())
    }

    /// Business-hour provider over the configured windows
    pub fn business_hour_provider(&self) -> WeeklyBusinessHours {
        WeeklyBusinessHours::from_windows(&self.business_hours, &self.bot.organization_id)
    }

    pub fn active_rule_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_active()).count()
    }

    /// Check the snapshot, returning one message per problem.
    ///
    /// An empty list means the snapshot is fully usable.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for skipped in &self.skipped {
            warnings.push(format!(
                "Rule #{} ({}) skipped: {}",
                skipped.index,
                skipped.id.as_deref().unwrap_or("no id"),
                skipped.error
            ));
        }

        for (field, tz) in [
            ("bot.timezone", &self.bot.timezone),
            ("bot.organization_timezone", &self.bot.organization_timezone),
        ] {
            if let Some(tz) = tz.as_deref().filter(|tz| !tz.trim().is_empty()) {
                if let Err(e) = parse_timezone(tz) {
                    warnings.push(format!("{}: {}, UTC will be used", field, e));
                }
            }
        }

        let mut seen_ids = HashSet::new();
        for rule in &self.rules {
            if !seen_ids.insert(rule.id.as_str()) {
                warnings.push(format!("Duplicate rule ID: {}", rule.id));
            }
            if rule.bot_id != self.bot.bot_id {
                warnings.push(format!(
                    "Rule {} belongs to bot {}, not {}",
                    rule.id, rule.bot_id, self.bot.bot_id
                ));
            }
            if rule.tier().is_none() {
                warnings.push(format!(
                    "Rule {} fits no tier: it needs keywords or a schedule, not both",
                    rule.id
                ));
            }
            if rule.event_kind == EventKind::Follow
                && (!rule.keywords.is_empty() || rule.schedule.is_some())
            {
                warnings.push(format!(
                    "Follow rule {} has keywords or a schedule, which are ignored",
                    rule.id
                ));
            }
            if rule.keywords.iter().any(|k| k.trim().is_empty()) {
                warnings.push(format!("Rule {} has a blank keyword", rule.id));
            }
        }

        for window in &self.business_hours {
            if window.start == window.end {
                warnings.push(format!(
                    "Business hour window on {} has equal start and end, never open",
                    window.weekday
                ));
            }
        }

        for warning in &warnings {
            warn!("Config validation warning: {}", warning);
        }

        warnings
    }
}
