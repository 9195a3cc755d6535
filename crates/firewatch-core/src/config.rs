//! Configuration for firewatch-core
//!
//! Escalation timing, alert wording, delivery target and the admin directory.
//! Gateway credentials and the listen address live with the crates that use
//! them; the binary composes everything into one TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::incident::Tier;

/// Core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewatchConfig {
    /// Confirmation window and tier policy
    pub escalation: EscalationConfig,
    /// Default alert wording
    pub alert: AlertConfig,
    /// Group or per-person delivery
    pub target: TargetConfig,
    /// Stable identities resolved at startup
    pub directory: DirectoryConfig,
    /// Trigger throttling
    pub dispatch: DispatchConfig,
}

/// Escalation behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// How long to wait for an acknowledgment, in seconds
    pub budget_secs: u64,
    /// Time between reply checks, in seconds
    pub interval_secs: u64,
    /// Tier of the first alert
    pub initial_tier: Tier,
    /// Tell everyone once somebody acknowledged
    pub notify_stand_down: bool,
    pub stand_down_title: String,
    pub stand_down_body: String,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            budget_secs: 180,
            interval_secs: 5,
            initial_tier: Tier::UrgentSms,
            notify_stand_down: true,
            stand_down_title: "Alert cleared".to_string(),
            stand_down_body: "A responder acknowledged the alert. Escalation stopped.".to_string(),
        }
    }
}

impl EscalationConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.budget_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Wording used when a trigger does not supply its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub title: String,
    pub description: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            title: "Lab fire alarm".to_string(),
            description: "Open flame detected! Reply 1 within 3 minutes to confirm, \
                          otherwise a phone call will be placed."
                .to_string(),
        }
    }
}

/// How alerts are addressed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Direct message to each admin
    #[default]
    Individuals,
    /// One card in a group chat, admins buzzed on it
    Group,
}

/// Delivery target configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub mode: TargetMode,
    /// Group chat id, required in group mode
    pub chat_id: Option<String>,
}

/// Admin directory configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Phone numbers of the people to alert
    pub admin_phones: Vec<String>,
}

/// Trigger throttling and bookkeeping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum seconds between accepted triggers; 0 disables the cooldown
    pub cooldown_secs: u64,
    /// Final statuses of finished incidents kept for lookup
    pub history_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 0,
            history_limit: crate::dispatch::DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl DispatchConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl FirewatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Apply `FIREWATCH_*` overrides using `lookup` to read variables
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(chat_id) = lookup("FIREWATCH_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            self.target.mode = TargetMode::Group;
            self.target.chat_id = Some(chat_id.trim().to_string());
        }

        if let Some(phones) = lookup("FIREWATCH_ADMIN_PHONES") {
            self.directory.admin_phones = phones
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.escalation.interval_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "escalation.interval_secs must be positive".to_string(),
            ));
        }

        if self.escalation.budget_secs < self.escalation.interval_secs {
            return Err(ConfigError::OutOfRange(
                "escalation.budget_secs must be at least interval_secs".to_string(),
            ));
        }

        if self.target.mode == TargetMode::Group
            && self.target.chat_id.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingField("target.chat_id".to_string()));
        }

        Ok(())
    }
}

/// Default config file location: `<config_dir>/firewatch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("firewatch").join("config.toml"))
}

/// Read a TOML file into any deserializable config type
pub fn read_toml_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is out of valid range
    OutOfRange(String),
    /// Required field is missing
    MissingField(String),
    /// File could not be read
    Io(String),
    /// File is not valid TOML for this schema
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::OutOfRange(msg) => write!(f, "Value out of range: {}", msg),
            ConfigError::MissingField(msg) => write!(f, "Missing field: {}", msg),
            ConfigError::Io(msg) => write!(f, "IO error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
