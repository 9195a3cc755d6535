//! Feishu (Lark) gateway for firewatch
//!
//! Implements [`firewatch_core::NotificationGateway`] on top of the Feishu
//! open API:
//!
//! - tenant access token auth, cached until shortly before expiry
//! - phone number → open_id lookup (`contact/v3/users/batch_get_id`)
//! - image upload and interactive alert cards (`im/v1/images`, `im/v1/messages`)
//! - urgent buzzes over app, SMS, or phone (`im/v1/messages/{id}/urgent_*`)
//! - acknowledgment detection by reading chat history

pub mod api;
pub mod card;
pub mod config;
pub mod gateway;
pub mod http;
pub mod reply;

pub use api::ChatSummary;
pub use card::build_alert_card;
pub use config::FeishuConfig;
pub use gateway::FeishuGateway;
pub use http::{ApiResponse, HttpClient, HttpError};
