use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use simba_core::config::{AppConfig, LoadOptions};
use toml::Value;

/// One rendered setting: dotted key, display value, env names that can set it.
struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(&config) {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(setting.key, &setting.value, source));
    }

    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    fn setting(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Setting {
        Setting { key, value, env_keys }
    }

    vec![
        setting("database.url", config.database.url.clone(), &["SIMBA_DATABASE_URL"]),
        setting(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SIMBA_DATABASE_MAX_CONNECTIONS"],
        ),
        setting(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SIMBA_DATABASE_TIMEOUT_SECS"],
        ),
        setting(
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["SIMBA_SLACK_BOT_TOKEN", "SLACK_API_TOKEN"],
        ),
        setting(
            "slack.signing_secret",
            redact_secret(Some(&config.slack.signing_secret)),
            &["SIMBA_SLACK_SIGNING_SECRET", "SLACK_SIGNING_SECRET"],
        ),
        setting(
            "slack.channel_id",
            config.slack.channel_id.clone(),
            &["SIMBA_SLACK_CHANNEL_ID", "CHANNEL_ID"],
        ),
        setting(
            "slack.api_base_url",
            config.slack.api_base_url.clone(),
            &["SIMBA_SLACK_API_BASE_URL"],
        ),
        setting(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["SIMBA_SERVER_BIND_ADDRESS"],
        ),
        setting("server.port", config.server.port.to_string(), &["SIMBA_SERVER_PORT", "APP_PORT"]),
        setting(
            "scheduler.enabled",
            config.scheduler.enabled.to_string(),
            &["SIMBA_SCHEDULER_ENABLED"],
        ),
        setting(
            "scheduler.cron",
            config.scheduler.cron.clone(),
            &["SIMBA_SCHEDULER_CRON", "CRON_EXPRESSION"],
        ),
        setting(
            "scheduler.timezone",
            config.scheduler.timezone.clone(),
            &["SIMBA_SCHEDULER_TIMEZONE"],
        ),
        setting(
            "content.quote_api_url",
            config.content.quote_api_url.clone(),
            &["SIMBA_CONTENT_QUOTE_API_URL"],
        ),
        setting(
            "content.giphy_api_key",
            redact_secret(config.content.giphy_api_key.as_ref()),
            &["SIMBA_CONTENT_GIPHY_API_KEY", "APP_GIPHY_TOKEN"],
        ),
        setting(
            "content.buzz_words",
            config.content.buzz_words.join(","),
            &["SIMBA_CONTENT_BUZZ_WORDS", "APP_BUZZ_WORDS"],
        ),
        setting(
            "logging.level",
            config.logging.level.clone(),
            &["SIMBA_LOGGING_LEVEL", "SIMBA_LOG_LEVEL"],
        ),
        setting(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SIMBA_LOGGING_FORMAT", "SIMBA_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("simba.toml"), PathBuf::from("config/simba.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the `xoxb-` style prefix so operators can tell token kinds apart.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret {
        Some(secret) if !secret.expose_secret().trim().is_empty() => "<redacted>".to_string(),
        Some(_) => "<empty>".to_string(),
        None => "<unset>".to_string(),
    }
}
