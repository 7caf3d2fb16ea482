//! Configuration loading and validation
//!
//! The service is configured from one TOML file. Secrets may be kept out of
//! it and referenced by environment variable name; a `.env` file in the
//! working directory is loaded first.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use vigil_core::render::RenderOptions;
use vigil_core::NotificationMode;
use vigil_core_types::Sensitive;

use crate::errors::{config_error, Result};
use crate::watcher::WatchMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Status document location; relative paths resolve against the config file
    pub snapshot_path: PathBuf,
    #[serde(default)]
    pub status: RenderOptions,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub mode: WatchMode,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            mode: WatchMode::Notify,
            debounce_ms: 500,
            poll_interval_ms: 2000,
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub delivery_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            delivery_timeout_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

impl OrchestratorConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1000,
            max_ms: 60_000,
        }
    }
}

/// One `[[adapters]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: NotificationMode,
    #[serde(default)]
    pub destinations: Vec<String>,
    #[serde(flatten)]
    pub kind: AdapterKindConfig,
}

/// Backend-specific settings, selected by the `kind` key
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterKindConfig {
    Console {},
    Webhook(WebhookConfig),
    Irc(IrcConfig),
}

impl AdapterKindConfig {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKindConfig::Console {} => "console",
            AdapterKindConfig::Webhook(_) => "webhook",
            AdapterKindConfig::Irc(_) => "irc",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

/// How an unauthorised command sender is answered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenyReply {
    #[default]
    Silent,
    Explicit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    pub server: String,
    #[serde(default = "default_irc_port")]
    pub port: u16,
    pub nick: String,
    /// Nicknames tried in order when `nick` is taken
    #[serde(default)]
    pub alt_nicks: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    #[serde(default)]
    pub password: Option<Sensitive<String>>,
    /// Environment variable holding the server password
    #[serde(default)]
    pub password_env: Option<String>,
    /// SASL PLAIN credentials, authenticated before registration completes
    #[serde(default)]
    pub sasl: Option<SaslConfig>,
    /// Raw lines sent after registration, before joining
    #[serde(default)]
    pub login_commands: Vec<String>,
    #[serde(default)]
    pub autojoin_delay_ms: u64,
    /// Accounts allowed to run admin commands (case-insensitive)
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub deny_reply: DenyReply,
    #[serde(default = "default_true")]
    pub request_account_tag: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    pub username: String,
    #[serde(default)]
    pub password: Option<Sensitive<String>>,
    /// Environment variable holding the SASL password
    #[serde(default)]
    pub password_env: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

fn default_irc_port() -> u16 {
    6667
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load `.env`, then read, parse and validate the file at `path`.
    ///
    /// # Errors
    ///
    /// `Config` for an unreadable file, a parse failure or a rule violation.
    pub fn load(path: &Path) -> Result<Config> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "Ignoring unreadable .env file");
            }
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| config_error(path, format!("Failed to read config file: {}", e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Config::from_toml_str(&text, base_dir).map_err(|e| e.with_path(path.display().to_string()))
    }

    /// Parse and validate config text; relative paths resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// `Config` for a parse failure or a rule violation.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Config> {
        let mut config: Config = toml::from_str(text)
            .map_err(|e| config_error(base_dir, format!("Invalid config: {}", e)))?;

        if config.snapshot_path.as_os_str().is_empty() {
            return Err(config_error(base_dir, "`snapshot_path` must not be empty"));
        }
        if config.snapshot_path.is_relative() {
            config.snapshot_path = base_dir.join(&config.snapshot_path);
        }

        config.validate(base_dir)?;
        config.resolve_secrets(base_dir)?;
        Ok(config)
    }

    /// Adapters that take part in registration
    pub fn enabled_adapters(&self) -> impl Iterator<Item = &AdapterConfig> {
        self.adapters.iter().filter(|a| a.enabled)
    }

    fn validate(&self, base_dir: &Path) -> Result<()> {
        if self.watch.mode == WatchMode::Poll && self.watch.poll_interval_ms == 0 {
            return Err(config_error(base_dir, "`watch.poll_interval_ms` must be positive"));
        }
        if self.orchestrator.delivery_timeout_secs == 0 {
            return Err(config_error(
                base_dir,
                "`orchestrator.delivery_timeout_secs` must be positive",
            ));
        }
        if self.backoff.initial_ms == 0 || self.backoff.max_ms < self.backoff.initial_ms {
            return Err(config_error(
                base_dir,
                "`backoff.initial_ms` must be positive and not above `backoff.max_ms`",
            ));
        }

        let mut names = HashSet::new();
        for adapter in &self.adapters {
            let name = adapter.name.trim();
            if name.is_empty() {
                return Err(config_error(base_dir, "adapter `name` must not be empty"));
            }
            if !names.insert(name.to_string()) {
                return Err(config_error(
                    base_dir,
                    format!("duplicate adapter name '{}'", name),
                ));
            }
            if !adapter.enabled {
                continue;
            }
            if adapter.destinations.is_empty() {
                return Err(config_error(
                    base_dir,
                    format!("adapter '{}' lists no destinations", name),
                ));
            }

            match &adapter.kind {
                AdapterKindConfig::Console {} => {}
                AdapterKindConfig::Webhook(webhook) => {
                    if webhook.timeout_secs == 0 {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': `timeout_secs` must be positive", name),
                        ));
                    }
                    if let Some(bad) = adapter
                        .destinations
                        .iter()
                        .find(|d| !(d.starts_with("http://") || d.starts_with("https://")))
                    {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': destination '{}' is not an http(s) URL", name, bad),
                        ));
                    }
                }
                AdapterKindConfig::Irc(irc) => {
                    if irc.port == 0 {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': `port` must be non-zero", name),
                        ));
                    }
                    if irc.server.trim().is_empty() || irc.nick.trim().is_empty() {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': `server` and `nick` are required", name),
                        ));
                    }
                    if irc.connect_timeout_secs == 0 {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': `connect_timeout_secs` must be positive", name),
                        ));
                    }
                    if irc.alt_nicks.iter().any(|n| n.trim().is_empty()) {
                        return Err(config_error(
                            base_dir,
                            format!("adapter '{}': `alt_nicks` entries must not be empty", name),
                        ));
                    }
                    if irc.password.is_some() && irc.password_env.is_some() {
                        return Err(config_error(
                            base_dir,
                            format!(
                                "adapter '{}': set either `password` or `password_env`, not both",
                                name
                            ),
                        ));
                    }
                    if let Some(sasl) = &irc.sasl {
                        if sasl.username.trim().is_empty()
                            || sasl.password.is_some() == sasl.password_env.is_some()
                        {
                            return Err(config_error(
                                base_dir,
                                format!(
                                    "adapter '{}': `sasl` needs a `username` and exactly one of `password` or `password_env`",
                                    name
                                ),
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn resolve_secrets(&mut self, base_dir: &Path) -> Result<()> {
        for adapter in self.adapters.iter_mut().filter(|a| a.enabled) {
            if let AdapterKindConfig::Irc(irc) = &mut adapter.kind {
                if let Some(var) = &irc.password_env {
                    irc.password = Some(secret_from_env(base_dir, &adapter.name, var)?);
                }
                if let Some(sasl) = &mut irc.sasl {
                    if let Some(var) = &sasl.password_env {
                        sasl.password = Some(secret_from_env(base_dir, &adapter.name, var)?);
                    }
                }
            }
        }
        Ok(())
    }
}

fn secret_from_env(base_dir: &Path, adapter: &str, var: &str) -> Result<Sensitive<String>> {
    std::env::var(var).map(Sensitive::new).map_err(|_| {
        config_error(
            base_dir,
            format!(
                "adapter '{}': environment variable '{}' is not set",
                adapter, var
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::errors::VgErrorKind;

    fn parse(text: &str) -> Result<Config> {
        Config::from_toml_str(text, Path::new("/etc/vigil"))
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            snapshot_path = "report.json"

            [[adapters]]
            kind = "console"
            name = "stdout"
            destinations = ["log"]
            "#,
        )
        .unwrap();

        assert_eq!(config.snapshot_path, PathBuf::from("/etc/vigil/report.json"));
        assert_eq!(config.watch.debounce_ms, 500);
        assert_eq!(config.orchestrator.delivery_timeout_secs, 30);
        assert_eq!(config.backoff.max_ms, 60_000);
        assert_eq!(config.adapters[0].mode, NotificationMode::ChangesWithBaseline);
        assert!(config.adapters[0].enabled);
        assert_eq!(config.status.title, "Site Status");
    }

    #[test]
    fn test_irc_adapter_fields() {
        let config = parse(
            r##"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "irc"
            name = "libera"
            mode = "changes-only-strict"
            destinations = ["#status"]
            server = "irc.example.org"
            nick = "vigil"
            password = "hunter2"
            admins = ["Alice"]
            login_commands = ["MODE vigil +B"]
            autojoin_delay_ms = 1500
            deny_reply = "explicit"
            "##,
        )
        .unwrap();

        let adapter = &config.adapters[0];
        assert_eq!(adapter.mode, NotificationMode::ChangesOnlyStrict);
        let AdapterKindConfig::Irc(irc) = &adapter.kind else {
            panic!("expected irc adapter");
        };
        assert_eq!(irc.port, 6667);
        assert_eq!(irc.command_prefix, "!");
        assert_eq!(irc.deny_reply, DenyReply::Explicit);
        assert_eq!(irc.autojoin_delay_ms, 1500);
        assert_eq!(format!("{:?}", irc.password), "Some(***REDACTED***)");
    }

    #[test]
    fn test_boolean_mode_is_rejected() {
        let err = parse(
            r#"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "console"
            name = "stdout"
            mode = true
            destinations = ["log"]
            "#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), VgErrorKind::Config);
    }

    #[test]
    fn test_duplicate_adapter_names_are_rejected() {
        let err = parse(
            r#"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "console"
            name = "a"
            destinations = ["log"]

            [[adapters]]
            kind = "console"
            name = "a"
            destinations = ["log"]
            "#,
        )
        .unwrap_err();
        assert!(err.message().contains("duplicate adapter name"));
    }

    #[test]
    fn test_webhook_destination_must_be_http() {
        let err = parse(
            r#"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "webhook"
            name = "hook"
            destinations = ["ftp://example.org"]
            "#,
        )
        .unwrap_err();
        assert!(err.message().contains("not an http(s) URL"));
    }

    #[test]
    fn test_disabled_adapter_skips_destination_rule() {
        let config = parse(
            r#"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "console"
            name = "off"
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.enabled_adapters().count(), 0);
    }

    #[test]
    fn test_zero_irc_port_is_rejected() {
        let err = parse(
            r##"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "irc"
            name = "libera"
            destinations = ["#status"]
            server = "irc.example.org"
            nick = "vigil"
            port = 0
            "##,
        )
        .unwrap_err();
        assert!(err.message().contains("`port` must be non-zero"));
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let irc = parse(
            r##"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "irc"
            name = "libera"
            destinations = ["#status"]
            server = "irc.example.org"
            nick = "vigil"
            connect_timeout_secs = 0
            "##,
        )
        .unwrap_err();
        assert!(irc.message().contains("`connect_timeout_secs` must be positive"));

        let webhook = parse(
            r#"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "webhook"
            name = "hook"
            destinations = ["https://hooks.example.org/abc"]
            timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(webhook.message().contains("`timeout_secs` must be positive"));
    }

    #[test]
    fn test_sasl_and_alternate_nicks() {
        let config = parse(
            r##"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "irc"
            name = "libera"
            destinations = ["#status"]
            server = "irc.example.org"
            nick = "vigil"
            alt_nicks = ["vigil-bot", "vigil2"]

            [adapters.sasl]
            username = "vigil"
            password = "s3cret"
            "##,
        )
        .unwrap();

        let AdapterKindConfig::Irc(irc) = &config.adapters[0].kind else {
            panic!("expected irc adapter");
        };
        assert_eq!(irc.alt_nicks, vec!["vigil-bot", "vigil2"]);
        let sasl = irc.sasl.as_ref().unwrap();
        assert_eq!(sasl.username, "vigil");
        assert_eq!(sasl.password.as_ref().map(|p| p.expose().as_str()), Some("s3cret"));
    }

    #[test]
    fn test_sasl_without_password_is_rejected() {
        let err = parse(
            r##"
            snapshot_path = "/srv/report.json"

            [[adapters]]
            kind = "irc"
            name = "libera"
            destinations = ["#status"]
            server = "irc.example.org"
            nick = "vigil"

            [adapters.sasl]
            username = "vigil"
            "##,
        )
        .unwrap_err();
        assert!(err.message().contains("`sasl` needs a `username`"));
    }
}
