//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.shellbot/config.json`) and environment.
//! Every section has defaults, so a missing or empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Who the bot is: the id and display name used in address tokens.
    #[serde(default)]
    pub bot: BotIdentity,

    /// Shell front-end settings.
    #[serde(default)]
    pub shell: ShellConfig,

    /// Slash command / outgoing webhook server.
    #[serde(default)]
    pub webserver: WebserverConfig,
}

/// The bot's own identity. `name` is matched by the classifier (`@ShellBot`),
/// `id` by the conversation matcher (`<@shellbot>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotIdentity {
    #[serde(default = "default_bot_id")]
    pub id: String,
    #[serde(default = "default_bot_name")]
    pub name: String,
}

fn default_bot_id() -> String {
    "shellbot".to_string()
}

fn default_bot_name() -> String {
    "ShellBot".to_string()
}

impl Default for BotIdentity {
    fn default() -> Self {
        Self {
            id: default_bot_id(),
            name: default_bot_name(),
        }
    }
}

/// Shell REPL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellConfig {
    /// Channel the shell starts in (default "##").
    #[serde(default = "default_shell_channel")]
    pub channel: String,

    /// User id attached to every line typed at the prompt (default "SHELLUSER").
    #[serde(default = "default_shell_user")]
    pub user: String,
}

fn default_shell_channel() -> String {
    "##".to_string()
}

fn default_shell_user() -> String {
    "SHELLUSER".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            channel: default_shell_channel(),
            user: default_shell_user(),
        }
    }
}

/// Webserver bind, port and response window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebserverConfig {
    /// Start the webserver alongside the shell (default false; `--serve` also enables it).
    #[serde(default)]
    pub enabled: bool,

    /// Port for slash commands and webhooks (default 3000).
    #[serde(default = "default_webserver_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_webserver_bind")]
    pub bind: String,

    /// How long a request waits for a handler to respond before an empty 200 is sent.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

fn default_webserver_port() -> u16 {
    3000
}

fn default_webserver_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_response_timeout_ms() -> u64 {
    2500
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_webserver_port(),
            bind: default_webserver_bind(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

/// Resolve the webserver port: env SHELLBOT_PORT overrides config.
pub fn resolve_webserver_port(config: &Config) -> u16 {
    std::env::var("SHELLBOT_PORT")
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .unwrap_or(config.webserver.port)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("SHELLBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".shellbot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, SHELLBOT_CONFIG_PATH, or the default. Missing file => default config.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        parse_config(&s).with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Parse config JSON. An empty or whitespace-only document is the default config.
pub fn parse_config(s: &str) -> Result<Config> {
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_json::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shell_conventions() {
        let c = Config::default();
        assert_eq!(c.bot.id, "shellbot");
        assert_eq!(c.bot.name, "ShellBot");
        assert_eq!(c.shell.channel, "##");
        assert_eq!(c.shell.user, "SHELLUSER");
        assert_eq!(c.webserver.port, 3000);
        assert_eq!(c.webserver.bind, "127.0.0.1");
        assert!(!c.webserver.enabled);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let c = parse_config(r#"{ "bot": { "name": "Marvin" }, "webserver": { "responseTimeoutMs": 500 } }"#)
            .unwrap();
        assert_eq!(c.bot.name, "Marvin");
        assert_eq!(c.bot.id, "shellbot");
        assert_eq!(c.webserver.response_timeout_ms, 500);
        assert_eq!(c.webserver.port, 3000);
    }

    #[test]
    fn empty_document_is_default() {
        let c = parse_config("  \n").unwrap();
        assert_eq!(c.shell.channel, "##");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_config("{ not json").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("shellbot-missing-{}.json", uuid::Uuid::new_v4()));
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.bot, BotIdentity::default());
    }
}
