//! Shared fixtures: a recording in-memory gateway

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use firewatch_core::{
    Alert, ConversationContext, DispatchHandle, GatewayError, ImageKey, NotificationGateway,
    RecipientId, SentMessage, Target, Tier,
};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Resolve(String),
    Upload(PathBuf),
    Send {
        title: String,
        tier: Tier,
        image: Option<ImageKey>,
        target: Target,
    },
    Raise {
        tier: Tier,
        recipients: Vec<RecipientId>,
        messages: usize,
    },
    Check {
        chats: Vec<String>,
        since: DateTime<Utc>,
    },
}

/// Scriptable gateway that records every call
#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<Call>>,
    directory: HashMap<String, String>,
    failing_titles: HashSet<String>,
    fail_all_sends: bool,
    fail_upload: bool,
    fail_raise: bool,
    ack_script: Mutex<VecDeque<Result<bool, GatewayError>>>,
    ack_on_check: Option<u32>,
    ack_every_check: bool,
    raise_delay: Option<Duration>,
    checks: AtomicU32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, phone: &str, open_id: &str) -> Self {
        self.directory.insert(phone.to_string(), open_id.to_string());
        self
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_all_sends = true;
        self
    }

    pub fn failing_sends_titled(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn failing_raise(mut self) -> Self {
        self.fail_raise = true;
        self
    }

    /// Acknowledge on the nth check (1-based); every other check says "no"
    pub fn acknowledging_on(mut self, n: u32) -> Self {
        self.ack_on_check = Some(n);
        self
    }

    /// Every check finds a reply
    pub fn acknowledging_always(mut self) -> Self {
        self.ack_every_check = true;
        self
    }

    /// `raise_urgency` takes `delay` before it returns
    pub fn raising_after(mut self, delay: Duration) -> Self {
        self.raise_delay = Some(delay);
        self
    }

    /// Answers for the first checks, in order; afterwards the default applies
    pub fn with_check_script(self, script: Vec<Result<bool, GatewayError>>) -> Self {
        *self.ack_script.lock().unwrap() = script.into();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Send { .. }))
            .collect()
    }

    pub fn raises(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Raise { .. }))
            .collect()
    }

    pub fn check_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Check { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl NotificationGateway for MockGateway {
    async fn resolve_recipient(&self, identity: &str) -> Result<RecipientId, GatewayError> {
        self.record(Call::Resolve(identity.to_string()));
        self.directory
            .get(identity)
            .map(|id| RecipientId::new(id.as_str()))
            .ok_or_else(|| GatewayError::NotFound(identity.to_string()))
    }

    async fn upload_image(&self, path: &Path) -> Result<ImageKey, GatewayError> {
        self.record(Call::Upload(path.to_path_buf()));
        if self.fail_upload {
            return Err(GatewayError::UploadFailed("image too large".into()));
        }
        Ok(ImageKey("img_v2_fire".into()))
    }

    async fn send_alert(
        &self,
        target: &Target,
        alert: &Alert,
    ) -> Result<DispatchHandle, GatewayError> {
        self.record(Call::Send {
            title: alert.title.clone(),
            tier: alert.tier,
            image: alert.image.clone(),
            target: target.clone(),
        });

        if self.fail_all_sends || self.failing_titles.contains(&alert.title) {
            return Err(GatewayError::SendFailed("bot not in chat".into()));
        }

        let messages = match target {
            Target::Individuals { recipients } => recipients
                .iter()
                .enumerate()
                .map(|(i, r)| SentMessage {
                    message_id: format!("om_{}", i),
                    chat_id: Some(format!("p2p_{}", r)),
                    recipients: vec![r.clone()],
                })
                .collect(),
            Target::Group { chat_id, members } => vec![SentMessage {
                message_id: "om_group".into(),
                chat_id: Some(chat_id.clone()),
                recipients: members.clone(),
            }],
        };
        Ok(DispatchHandle { messages })
    }

    async fn raise_urgency(
        &self,
        handle: &DispatchHandle,
        recipients: &[RecipientId],
        tier: Tier,
    ) -> Result<(), GatewayError> {
        self.record(Call::Raise {
            tier,
            recipients: recipients.to_vec(),
            messages: handle.messages.len(),
        });
        if let Some(delay) = self.raise_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_raise {
            return Err(GatewayError::EscalationFailed("quota exhausted".into()));
        }
        Ok(())
    }

    async fn has_acknowledgment(
        &self,
        conversation: &ConversationContext,
        since: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        self.record(Call::Check {
            chats: conversation.chat_ids.clone(),
            since,
        });
        let n = self.checks.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(scripted) = self.ack_script.lock().unwrap().pop_front() {
            return scripted;
        }
        Ok(self.ack_every_check || self.ack_on_check == Some(n))
    }
}

pub fn admins(ids: &[&str]) -> Vec<RecipientId> {
    ids.iter().map(|id| RecipientId::new(*id)).collect()
}
