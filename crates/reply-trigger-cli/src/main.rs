mod cli;
mod logging;

use std::fs;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use reply_trigger::{
    extract_events, normalize_event, CanonicalEvent, PriorityResolver, TriggerConfig,
    WebhookVerifier,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use cli::{Cli, Command, ResolveArgs, ValidateArgs};

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Resolve(args) => {
            let outcomes = resolve_command(&args)?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate(args) => {
            let warnings = validate_command(&args)?;
            if warnings.is_empty() {
                println!("ok");
                return Ok(ExitCode::SUCCESS);
            }
            for warning in &warnings {
                println!("{warning}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn load_config(path: &std::path::Path) -> Result<TriggerConfig> {
    TriggerConfig::load_from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))
}

/// One JSON entry per inbound event: the match result, or the reason the
/// event was not resolved.
fn resolve_command(args: &ResolveArgs) -> Result<Vec<Value>> {
    let config = load_config(&args.config)?;
    let hours = config.business_hour_provider();
    let resolver = PriorityResolver::new(&config.bot, &hours);
    let now = args.now.as_ref().map_or_else(Utc::now, |ts| ts.to_utc());

    let events: Vec<Result<CanonicalEvent, String>> = match (&args.payload, &args.event) {
        (Some(path), _) => {
            let Some(channel) = args.channel else {
                bail!("--payload needs --channel");
            };
            let raw = fs::read(path)
                .with_context(|| format!("failed to read payload {}", path.display()))?;

            if let Some(signature) = &args.signature {
                let Some(secret) = &args.secret else {
                    bail!("--signature needs a channel secret");
                };
                let verifier = WebhookVerifier::new(channel, secret.as_str());
                if !verifier.verify(&raw, signature) {
                    bail!("{} signature mismatch", verifier.signature_header());
                }
                info!(%channel, "webhook signature verified");
            }

            let body: Value = serde_json::from_slice(&raw).context("payload is not JSON")?;
            extract_events(channel, &body)
                .into_iter()
                .map(|payload| {
                    normalize_event(channel, payload, &config.bot.bot_id)
                        .map_err(|e| e.to_string())
                })
                .collect()
        }
        (None, Some(path)) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read event {}", path.display()))?;
            let mut event: CanonicalEvent =
                serde_json::from_str(&content).context("invalid canonical event")?;
            if event.bot_id.is_empty() {
                event.bot_id = config.bot.bot_id.clone();
            }
            vec![Ok(event)]
        }
        (None, None) => bail!("either --payload or --event is required"),
    };

    let outcomes = events
        .into_iter()
        .map(|event| match event {
            Ok(event) => serde_json::to_value(resolver.resolve(&config.rules, &event, now))
                .context("failed to encode match result"),
            Err(reason) => {
                warn!(%reason, "event skipped");
                Ok(json!({ "skipped": reason }))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(outcomes)
}

fn validate_command(args: &ValidateArgs) -> Result<Vec<String>> {
    let config = load_config(&args.config)?;
    info!(
        bot_id = %config.bot.bot_id,
        rules = config.rules.len(),
        active = config.active_rule_count(),
        "config loaded"
    );
    Ok(config.validate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reply_trigger::Channel;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const CONFIG: &str = r#"{
        "bot": { "bot_id": "bot-1", "timezone": "Asia/Taipei" },
        "rules": [
            { "id": "welcome", "bot_id": "bot-1", "event_kind": "follow" },
            { "id": "hello", "bot_id": "bot-1", "keywords": ["hello"] }
        ]
    }"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn resolve_args(config: &Path) -> ResolveArgs {
        ResolveArgs {
            config: config.to_path_buf(),
            payload: None,
            channel: None,
            event: None,
            now: Some("2024-03-15T10:00:00+08:00".parse().unwrap()),
            signature: None,
            secret: None,
        }
    }

    fn line_body() -> String {
        json!({
            "events": [
                { "type": "follow", "timestamp": 1_710_468_000_000_i64, "source": { "userId": "U1" } },
                {
                    "type": "message", "timestamp": 1_710_468_000_000_i64,
                    "source": { "userId": "U1" },
                    "message": { "type": "text", "text": "Hello" }
                },
                { "type": "unfollow", "timestamp": 1_710_468_000_000_i64, "source": { "userId": "U1" } }
            ]
        })
        .to_string()
    }

    #[test]
    fn test_resolve_payload() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "triggers.json", CONFIG);
        let payload = write(&dir, "body.json", &line_body());

        let mut args = resolve_args(&config);
        args.payload = Some(payload);
        args.channel = Some(Channel::Line);

        let outcomes = resolve_command(&args).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["rule"]["id"], "welcome");
        assert_eq!(outcomes[1]["rule"]["id"], "hello");
        assert_eq!(outcomes[1]["matched_keyword"], "hello");
        assert!(outcomes[2]["skipped"].as_str().unwrap().contains("unfollow"));
    }

    #[test]
    fn test_resolve_rejects_bad_signature() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "triggers.json", CONFIG);
        let body = line_body();
        let payload = write(&dir, "body.json", &body);

        let mut args = resolve_args(&config);
        args.payload = Some(payload);
        args.channel = Some(Channel::Line);
        args.secret = Some("secret".to_string());
        args.signature = Some("bogus".to_string());
        assert!(resolve_command(&args).is_err());

        let verifier = WebhookVerifier::new(Channel::Line, "secret");
        args.signature = Some(verifier.compute_signature(body.as_bytes()));
        assert_eq!(resolve_command(&args).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_canonical_event_fills_bot_id() {
        let dir = TempDir::new().unwrap();
        let config = write(&dir, "triggers.json", CONFIG);
        let event = write(
            &dir,
            "event.json",
            r#"{ "channel": "facebook", "user_id": "u1", "timestamp": "2024-03-15T02:00:00Z", "content": "HELLO" }"#,
        );

        let mut args = resolve_args(&config);
        args.event = Some(event);

        let outcomes = resolve_command(&args).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0]["rule"]["id"], "hello");
        assert_eq!(outcomes[0]["tier"], "keyword");
        assert_eq!(outcomes[0]["resolved_at"], "2024-03-15T02:00:00Z");
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = TempDir::new().unwrap();
        let clean = write(&dir, "clean.json", CONFIG);
        let args = ValidateArgs { config: clean };
        assert!(validate_command(&args).unwrap().is_empty());

        let dirty = write(
            &dir,
            "dirty.json",
            r#"{
                "bot": { "bot_id": "bot-1" },
                "rules": [
                    { "id": "a", "bot_id": "bot-1", "keywords": ["hi"] },
                    { "id": "a", "bot_id": "bot-2", "keywords": ["hi"] }
                ]
            }"#,
        );
        let args = ValidateArgs { config: dirty };
        assert!(!validate_command(&args).unwrap().is_empty());
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = TempDir::new().unwrap();
        let args = ValidateArgs {
            config: dir.path().join("missing.json"),
        };
        assert!(validate_command(&args).is_err());
    }
}
