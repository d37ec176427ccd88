use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reply_trigger::{Channel, EventTimestamp};

use crate::logging::LogFormat;

#[derive(Debug, Parser)]
#[command(
    name = "reply-trigger",
    version,
    about = "Resolve automated-reply triggers for LINE, Facebook and Instagram events"
)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "REPLY_TRIGGER_LOG_FORMAT",
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a webhook payload or canonical event against a config
    Resolve(ResolveArgs),
    /// Check a config file and list its problems
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Trigger config (JSON, or YAML by extension)
    #[arg(long, env = "REPLY_TRIGGER_CONFIG")]
    pub config: PathBuf,

    /// Raw webhook body or single channel event (JSON)
    #[arg(long, requires = "channel", conflicts_with = "event")]
    pub payload: Option<PathBuf>,

    /// Channel the payload came from
    #[arg(long)]
    pub channel: Option<Channel>,

    /// Canonical event (JSON)
    #[arg(long, required_unless_present = "payload")]
    pub event: Option<PathBuf>,

    /// Resolution time; defaults to the current time
    #[arg(long)]
    pub now: Option<EventTimestamp>,

    /// Webhook signature header value to verify the payload against
    #[arg(long, requires = "payload")]
    pub signature: Option<String>,

    /// Channel secret used to verify `--signature`
    #[arg(long, env = "REPLY_TRIGGER_CHANNEL_SECRET", hide_env_values = true)]
    pub secret: Option<String>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Trigger config (JSON, or YAML by extension)
    #[arg(long, env = "REPLY_TRIGGER_CONFIG")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve_payload() {
        let cli = Cli::try_parse_from([
            "reply-trigger",
            "resolve",
            "--config",
            "triggers.yaml",
            "--payload",
            "body.json",
            "--channel",
            "instagram",
            "--now",
            "2024-03-15T10:00:00+08:00",
        ])
        .unwrap();

        let Command::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(args.channel, Some(Channel::Instagram));
        assert_eq!(args.payload, Some(PathBuf::from("body.json")));
        assert!(args.now.is_some());
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_payload_requires_channel() {
        let result = Cli::try_parse_from([
            "reply-trigger",
            "resolve",
            "--config",
            "c.json",
            "--payload",
            "body.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_needs_payload_or_event() {
        let result = Cli::try_parse_from(["reply-trigger", "resolve", "--config", "c.json"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from([
            "reply-trigger",
            "resolve",
            "--config",
            "c.json",
            "--event",
            "e.json",
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_validate_with_json_logs() {
        let cli = Cli::try_parse_from([
            "reply-trigger",
            "validate",
            "--config",
            "c.json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Validate(_)));
    }
}
