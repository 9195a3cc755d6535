//! Application configuration: core settings, Feishu credentials, listen address
//!
//! One TOML file holds everything:
//!
//! ```toml
//! [escalation]
//! budget_secs = 180
//! interval_secs = 5
//!
//! [target]
//! mode = "group"
//! chat_id = "oc_..."
//!
//! [directory]
//! admin_phones = ["+8613800000001"]
//!
//! [feishu]
//! app_id = "cli_..."
//! app_secret = "..."
//!
//! [server]
//! addr = "127.0.0.1:8080"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use firewatch_core::config::{default_config_path, read_toml_file};
use firewatch_core::{ConfigError, FirewatchConfig};
use firewatch_feishu::FeishuConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(flatten)]
    pub core: FirewatchConfig,
    pub feishu: FeishuConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load from `path`, or from the default location if it exists, or fall
    /// back to defaults. Environment overrides are applied, then validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = match path {
            Some(path) => read_toml_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!("Loading config from {:?}", path);
                    read_toml_file(&path)?
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        self.core.apply_overrides(lookup);
        self.feishu.apply_overrides(lookup);
        if let Some(addr) = lookup("FIREWATCH_ADDR").filter(|v| !v.trim().is_empty()) {
            self.server.addr = addr.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.core.validate()?;
        self.feishu.validate()?;
        if self.server.addr.is_empty() {
            return Err(ConfigError::MissingField("server.addr".to_string()));
        }
        Ok(())
    }
}
