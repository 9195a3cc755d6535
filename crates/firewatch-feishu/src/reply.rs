//! Scanning chat history for an acknowledgment reply

use chrono::{DateTime, Utc};

use firewatch_core::is_acknowledgment;

use crate::api::MessageItem;

/// Text of a user-sent text message, or `None` for anything else
pub fn reply_text(item: &MessageItem) -> Option<String> {
    if item.deleted || item.msg_type != "text" {
        return None;
    }
    let sender = item.sender.as_ref()?;
    if sender.sender_type != "user" {
        return None;
    }
    let body = item.body.as_ref()?;
    let content: serde_json::Value = serde_json::from_str(&body.content).ok()?;
    content
        .get("text")
        .and_then(|t| t.as_str())
        .map(strip_mentions)
}

/// Whether any item is an acknowledgment sent at or after `since`
pub fn contains_acknowledgment(items: &[MessageItem], since: DateTime<Utc>) -> bool {
    let since_ms = since.timestamp_millis();
    items.iter().any(|item| {
        let sent_ms = match item.create_time.parse::<i64>() {
            Ok(ms) => ms,
            Err(_) => return false,
        };
        sent_ms >= since_ms && reply_text(item).is_some_and(|text| is_acknowledgment(&text))
    })
}

/// Drop leading `@_user_N` placeholders that group replies carry
fn strip_mentions(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !word.starts_with("@_user_") && !word.starts_with("@_all"))
        .collect::<Vec<_>>()
        .join(" ")
}
