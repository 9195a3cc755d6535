//! Feishu app credentials and endpoint settings

use std::time::Duration;

use firewatch_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings for the `[feishu]` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeishuConfig {
    /// API root, `https://open.larksuite.com` for Lark tenants
    pub base_url: String,
    pub app_id: String,
    pub app_secret: String,
    /// Prefix shown in the card header, matching the bot's keyword filter if one is set
    pub keyword: String,
    pub request_timeout_secs: u64,
    /// Messages fetched per chat when looking for replies
    pub reply_page_size: u32,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.feishu.cn".to_string(),
            app_id: String::new(),
            app_secret: String::new(),
            keyword: "Fire alarm".to_string(),
            request_timeout_secs: 10,
            reply_page_size: 20,
        }
    }
}

impl FeishuConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Apply `FIREWATCH_APP_ID` / `FIREWATCH_APP_SECRET` using `lookup` to read variables
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(app_id) = lookup("FIREWATCH_APP_ID").filter(|v| !v.trim().is_empty()) {
            self.app_id = app_id.trim().to_string();
        }
        if let Some(secret) = lookup("FIREWATCH_APP_SECRET").filter(|v| !v.trim().is_empty()) {
            self.app_secret = secret.trim().to_string();
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_id.is_empty() {
            return Err(ConfigError::MissingField("feishu.app_id".to_string()));
        }
        if self.app_secret.is_empty() {
            return Err(ConfigError::MissingField("feishu.app_secret".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange(
                "feishu.request_timeout_secs must be positive".to_string(),
            ));
        }
        if !(1..=50).contains(&self.reply_page_size) {
            return Err(ConfigError::OutOfRange(
                "feishu.reply_page_size must be between 1 and 50".to_string(),
            ));
        }
        Ok(())
    }
}
