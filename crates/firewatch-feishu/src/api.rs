//! Wire types for the Feishu open API endpoints firewatch calls

use serde::{Deserialize, Serialize};

pub const TENANT_TOKEN_PATH: &str = "/open-apis/auth/v3/tenant_access_token/internal";
pub const BATCH_GET_ID_PATH: &str = "/open-apis/contact/v3/users/batch_get_id";
pub const IMAGES_PATH: &str = "/open-apis/im/v1/images";
pub const MESSAGES_PATH: &str = "/open-apis/im/v1/messages";
pub const CHATS_PATH: &str = "/open-apis/im/v1/chats";

/// Error code for a missing bot or app permission
pub const CODE_NO_PERMISSION: i64 = 230001;
/// Error code for an exhausted urgent-call quota
pub const CODE_QUOTA_EXHAUSTED: i64 = 1070003;

/// Path of the urgent-buzz endpoint for a message and channel ("app", "sms", "phone")
pub fn urgent_path(message_id: &str, channel: &str) -> String {
    format!("{}/{}/urgent_{}", MESSAGES_PATH, message_id, channel)
}

/// Operator-facing hint for well-known error codes
pub fn hint_for(code: i64) -> Option<&'static str> {
    match code {
        CODE_NO_PERMISSION => Some("the app lacks the permission or the bot is not in the chat"),
        CODE_QUOTA_EXHAUSTED => Some("urgent-call quota exhausted; top up the tenant's quota"),
        _ => None,
    }
}

// The token endpoint is the one response without a `data` wrapper.
#[derive(Debug, Serialize)]
pub struct TenantTokenRequest<'a> {
    pub app_id: &'a str,
    pub app_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TenantTokenResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub tenant_access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expire: u64,
}

#[derive(Debug, Serialize)]
pub struct BatchGetIdRequest<'a> {
    pub mobiles: &'a [String],
}

#[derive(Debug, Deserialize)]
pub struct BatchGetIdData {
    #[serde(default)]
    pub user_list: Vec<UserIdEntry>,
}

#[derive(Debug, Deserialize)]
pub struct UserIdEntry {
    #[serde(default)]
    pub mobile: Option<String>,
    /// Absent when the number is not in the tenant
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    pub image_key: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub receive_id: &'a str,
    pub msg_type: &'a str,
    /// JSON-encoded message body
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageData {
    pub message_id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UrgentRequest<'a> {
    pub user_id_list: Vec<&'a str>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UrgentData {
    #[serde(default)]
    pub invalid_user_id_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageListData {
    #[serde(default)]
    pub items: Vec<MessageItem>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageItem {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub msg_type: String,
    /// Milliseconds since the epoch, as a string
    #[serde(default)]
    pub create_time: String,
    #[serde(default)]
    pub deleted: bool,
    pub sender: Option<MessageSender>,
    pub body: Option<MessageBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageSender {
    #[serde(default)]
    pub id: String,
    /// "user" or "app"
    #[serde(default)]
    pub sender_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatListData {
    #[serde(default)]
    pub items: Vec<ChatSummary>,
}

/// A group chat the bot belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}
