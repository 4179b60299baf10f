//! Configuration data model.
//!
//! All structs derive `Deserialize` for TOML loading. Every field has a
//! sensible default so a config file only needs to name what it changes.

use serde::Deserialize;

/// Root bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Module names in dispatch order.
    #[serde(default = "default_modules")]
    pub modules: Vec<String>,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub ctcp: CtcpConfig,
    #[serde(default)]
    pub sed: SedConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            modules: default_modules(),
            dispatch: DispatchConfig::default(),
            ctcp: CtcpConfig::default(),
            sed: SedConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// The single IRC server the bot lives on.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address of the IRC server.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Connection password sent with `PASS`.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    /// Secret sent to NickServ after registration.
    #[serde(default)]
    pub nickserv_password: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    /// How long, in milliseconds, a registration step waits for the
    /// server's line before moving on.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            nickname: default_nickname(),
            username: None,
            realname: None,
            nickserv_password: None,
            channels: Vec::new(),
            drain_timeout_ms: default_drain_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

/// Limits applied to concurrently dispatched messages.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_module_timeout")]
    pub module_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            module_timeout_secs: default_module_timeout(),
        }
    }
}

/// CTCP (Client-To-Client Protocol) auto-reply settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CtcpConfig {
    #[serde(default = "default_true")]
    pub reply_version: bool,
    #[serde(default = "default_true")]
    pub reply_ping: bool,
    #[serde(default = "default_true")]
    pub reply_time: bool,
    #[serde(default)]
    pub reply_finger: bool,
    #[serde(default = "default_version_string")]
    pub version_string: String,
    #[serde(default = "default_finger_string")]
    pub finger_string: String,
}

impl Default for CtcpConfig {
    fn default() -> Self {
        Self {
            reply_version: true,
            reply_ping: true,
            reply_time: true,
            reply_finger: false,
            version_string: default_version_string(),
            finger_string: default_finger_string(),
        }
    }
}

/// Find/replace module settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SedConfig {
    /// Longest edited message echoed back, in characters.
    #[serde(default = "default_sed_max_length")]
    pub max_length: usize,
}

impl Default for SedConfig {
    fn default() -> Self {
        Self {
            max_length: default_sed_max_length(),
        }
    }
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Log raw wire traffic at `info` instead of `debug`.
    #[serde(default = "default_true")]
    pub wire: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            wire: true,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    6667
}
fn default_drain_timeout() -> u64 {
    10_000
}
fn default_nickname() -> String {
    "crabbot".to_string()
}
fn default_modules() -> Vec<String> {
    ["sed", "rot13", "reverse", "spaced", "ping"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_max_in_flight() -> usize {
    32
}
fn default_module_timeout() -> u64 {
    15
}
fn default_true() -> bool {
    true
}
fn default_version_string() -> String {
    "crabbot - Rust IRC bot".to_string()
}
fn default_finger_string() -> String {
    "crabbot".to_string()
}
fn default_sed_max_length() -> usize {
    400
}
fn default_filter() -> String {
    "info".to_string()
}
