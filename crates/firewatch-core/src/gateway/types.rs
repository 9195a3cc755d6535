//! Addressing and dispatch types shared by all gateways

use serde::{Deserialize, Serialize};

use crate::incident::Tier;

/// Gateway-specific addressable identifier for a person (e.g. a Feishu open_id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub String);

impl RecipientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to media already uploaded to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(pub String);

/// Where an alert is delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// One message per recipient, each in its own direct conversation
    Individuals { recipients: Vec<RecipientId> },
    /// One message in a shared group; `members` are the people buzzed on it
    Group {
        chat_id: String,
        members: Vec<RecipientId>,
    },
}

impl Target {
    /// People whose devices ring when urgency is raised
    pub fn recipients(&self) -> &[RecipientId] {
        match self {
            Target::Individuals { recipients } => recipients,
            Target::Group { members, .. } => members,
        }
    }
}

/// A formatted alert ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub image: Option<ImageKey>,
    /// Tier at which the alert is delivered
    pub tier: Tier,
}

/// One message the gateway produced while sending an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    /// Conversation the message landed in, used to look for replies
    pub chat_id: Option<String>,
    /// Recipients this message is addressed to
    pub recipients: Vec<RecipientId>,
}

/// Opaque reference to a sent alert
///
/// Escalation raises urgency on these same messages instead of sending new ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchHandle {
    pub messages: Vec<SentMessage>,
}

impl DispatchHandle {
    pub fn single(message: SentMessage) -> Self {
        Self {
            messages: vec![message],
        }
    }

    /// Conversations in which an acknowledgment may appear
    pub fn conversation(&self) -> ConversationContext {
        let mut chat_ids: Vec<String> = self
            .messages
            .iter()
            .filter_map(|m| m.chat_id.clone())
            .collect();
        chat_ids.sort();
        chat_ids.dedup();
        ConversationContext { chat_ids }
    }
}

/// Conversations the poller watches for replies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub chat_ids: Vec<String>,
}

impl ConversationContext {
    pub fn is_empty(&self) -> bool {
        self.chat_ids.is_empty()
    }
}
