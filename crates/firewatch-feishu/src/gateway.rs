//! [`NotificationGateway`] backed by a Feishu custom app

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use reqwest::multipart::{Form, Part};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use firewatch_core::{
    Alert, ConversationContext, DispatchHandle, GatewayError, ImageKey, NotificationGateway,
    RecipientId, SentMessage, Target, Tier,
};

use crate::api::{
    self, BatchGetIdData, BatchGetIdRequest, ChatListData, ChatSummary, ImageData, MessageData,
    MessageListData, SendMessageRequest, TenantTokenRequest, TenantTokenResponse, UrgentData,
    UrgentRequest,
};
use crate::card::build_alert_card;
use crate::config::FeishuConfig;
use crate::http::{HttpClient, HttpError};
use crate::reply::contains_acknowledgment;

/// Tokens are refreshed this long before Feishu says they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Feishu gateway: tenant token auth, interactive cards, urgent buzzes
pub struct FeishuGateway {
    http: HttpClient,
    config: FeishuConfig,
    token: Mutex<Option<CachedToken>>,
}

impl FeishuGateway {
    pub fn new(config: FeishuConfig) -> Result<Self, GatewayError> {
        let http = HttpClient::new(&config.base_url, config.request_timeout())
            .map_err(|e| GatewayError::Transient(e.to_string()))?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &FeishuConfig {
        &self.config
    }

    /// Current tenant access token, fetched or refreshed as needed
    async fn tenant_token(&self) -> Result<String, GatewayError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let request = TenantTokenRequest {
            app_id: &self.config.app_id,
            app_secret: &self.config.app_secret,
        };
        let response: TenantTokenResponse = self
            .http
            .send_raw(
                self.http
                    .request(reqwest::Method::POST, api::TENANT_TOKEN_PATH, None)
                    .json(&request),
            )
            .await
            .map_err(|e| {
                if e.is_transient() {
                    GatewayError::Transient(e.to_string())
                } else {
                    GatewayError::Auth(e.to_string())
                }
            })?;

        if response.code != 0 || response.tenant_access_token.is_empty() {
            return Err(GatewayError::Auth(format!(
                "tenant_access_token rejected ({}): {}",
                response.code, response.msg
            )));
        }

        let lifetime = Duration::from_secs(response.expire);
        let refresh_at = Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN);
        debug!(expire_secs = response.expire, "Fetched tenant access token");

        let value = response.tenant_access_token;
        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_at,
        });
        Ok(value)
    }

    /// Group chats the bot belongs to, for finding a `chat_id`
    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>, GatewayError> {
        let token = self.tenant_token().await?;
        let data: ChatListData = self
            .http
            .get_with_params(api::CHATS_PATH, &token, &[("page_size", "100")])
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| classify(e, GatewayError::SendFailed))?;
        Ok(data.items)
    }

    async fn send_card(
        &self,
        token: &str,
        receive_id_type: &str,
        receive_id: &str,
        card: &serde_json::Value,
    ) -> Result<MessageData, HttpError> {
        let request = SendMessageRequest {
            receive_id,
            msg_type: "interactive",
            content: card.to_string(),
        };
        self.http
            .post_json(
                api::MESSAGES_PATH,
                Some(token),
                &[("receive_id_type", receive_id_type)],
                &request,
            )
            .await?
            .into_data()
    }

    /// Buzz `recipients` on one message through `tier`'s channel
    async fn buzz(
        &self,
        token: &str,
        message_id: &str,
        recipients: &[RecipientId],
        tier: Tier,
    ) -> Result<(), HttpError> {
        let request = UrgentRequest {
            user_id_list: recipients.iter().map(RecipientId::as_str).collect(),
        };
        let result = self
            .http
            .patch_json::<_, UrgentData>(
                &api::urgent_path(message_id, tier.channel()),
                token,
                &[("user_id_type", "open_id")],
                &request,
            )
            .await
            .and_then(|r| match r.code {
                0 => Ok(r.data.unwrap_or_default()),
                code => Err(HttpError::Api { code, msg: r.msg }),
            });
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                log_hint(&e, message_id, tier);
                return Err(e);
            }
        };

        let invalid = data.invalid_user_id_list;
        if !invalid.is_empty() {
            warn!(
                message_id,
                ?invalid,
                channel = tier.channel(),
                "Some recipients could not be buzzed"
            );
        }
        info!(
            message_id,
            channel = tier.channel(),
            recipients = recipients.len(),
            "Urgency raised"
        );
        Ok(())
    }

    async fn chat_has_acknowledgment(
        &self,
        token: &str,
        chat_id: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, HttpError> {
        let start_time = since.timestamp().to_string();
        let page_size = self.config.reply_page_size.to_string();
        let data: MessageListData = self
            .http
            .get_with_params(
                api::MESSAGES_PATH,
                token,
                &[
                    ("container_id_type", "chat"),
                    ("container_id", chat_id),
                    ("start_time", start_time.as_str()),
                    ("sort_type", "ByCreateTimeDesc"),
                    ("page_size", page_size.as_str()),
                ],
            )
            .await?
            .into_data()?;
        Ok(contains_acknowledgment(&data.items, since))
    }
}

#[async_trait]
impl NotificationGateway for FeishuGateway {
    async fn resolve_recipient(&self, identity: &str) -> Result<RecipientId, GatewayError> {
        let token = self.tenant_token().await?;
        let mobiles = [identity.to_string()];
        let data: BatchGetIdData = self
            .http
            .post_json(
                api::BATCH_GET_ID_PATH,
                Some(&token),
                &[("user_id_type", "open_id")],
                &BatchGetIdRequest { mobiles: &mobiles },
            )
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| classify(e, GatewayError::NotFound))?;

        data.user_list
            .into_iter()
            .find_map(|entry| entry.user_id.filter(|id| !id.is_empty()))
            .map(RecipientId::new)
            .ok_or_else(|| GatewayError::NotFound(identity.to_string()))
    }

    async fn upload_image(&self, path: &Path) -> Result<ImageKey, GatewayError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GatewayError::UploadFailed(format!("{}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.jpg".to_string());

        let token = self.tenant_token().await?;
        let form = Form::new()
            .text("image_type", "message")
            .part("image", Part::bytes(bytes).file_name(file_name));
        let data: ImageData = self
            .http
            .post_multipart(api::IMAGES_PATH, &token, form)
            .await
            .and_then(|r| r.into_data())
            .map_err(|e| classify(e, GatewayError::UploadFailed))?;

        debug!(image_key = %data.image_key, "Image uploaded");
        Ok(ImageKey(data.image_key))
    }

    async fn send_alert(
        &self,
        target: &Target,
        alert: &Alert,
    ) -> Result<DispatchHandle, GatewayError> {
        let token = self.tenant_token().await?;
        let card = build_alert_card(alert, &self.config.keyword, Local::now());

        let messages = match target {
            Target::Group { chat_id, members } => {
                let sent = self
                    .send_card(&token, "chat_id", chat_id, &card)
                    .await
                    .map_err(|e| GatewayError::SendFailed(e.to_string()))?;
                info!(message_id = %sent.message_id, chat_id = %chat_id, "Alert sent to group");
                vec![SentMessage {
                    message_id: sent.message_id,
                    chat_id: sent.chat_id.or_else(|| Some(chat_id.clone())),
                    recipients: members.clone(),
                }]
            }
            Target::Individuals { recipients } => {
                let mut messages = Vec::with_capacity(recipients.len());
                let mut last_error = None;
                for recipient in recipients {
                    match self
                        .send_card(&token, "open_id", recipient.as_str(), &card)
                        .await
                    {
                        Ok(sent) => {
                            info!(
                                message_id = %sent.message_id,
                                recipient = %recipient,
                                "Alert sent"
                            );
                            messages.push(SentMessage {
                                message_id: sent.message_id,
                                chat_id: sent.chat_id,
                                recipients: vec![recipient.clone()],
                            });
                        }
                        Err(e) => {
                            warn!(recipient = %recipient, error = %e, "Alert not delivered");
                            last_error = Some(e);
                        }
                    }
                }
                if messages.is_empty() {
                    return Err(GatewayError::SendFailed(match last_error {
                        Some(e) => format!("no recipient received the alert: {}", e),
                        None => "no recipients".to_string(),
                    }));
                }
                messages
            }
        };

        // Urgency at send time is best effort; the card itself is already out.
        for message in &messages {
            if message.recipients.is_empty() {
                continue;
            }
            if let Err(e) = self
                .buzz(&token, &message.message_id, &message.recipients, alert.tier)
                .await
            {
                warn!(message_id = %message.message_id, error = %e, "Initial buzz failed");
            }
        }

        Ok(DispatchHandle { messages })
    }

    async fn raise_urgency(
        &self,
        handle: &DispatchHandle,
        recipients: &[RecipientId],
        tier: Tier,
    ) -> Result<(), GatewayError> {
        let token = self.tenant_token().await?;
        let mut raised = 0;
        let mut last_error = None;

        for message in &handle.messages {
            let targets: Vec<RecipientId> = if message.recipients.is_empty() {
                recipients.to_vec()
            } else {
                message
                    .recipients
                    .iter()
                    .filter(|r| recipients.contains(r))
                    .cloned()
                    .collect()
            };
            if targets.is_empty() {
                continue;
            }

            match self.buzz(&token, &message.message_id, &targets, tier).await {
                Ok(()) => raised += 1,
                Err(e) => last_error = Some(e),
            }
        }

        match (raised, last_error) {
            (0, Some(e)) => Err(GatewayError::EscalationFailed(e.to_string())),
            (0, None) => Err(GatewayError::EscalationFailed(
                "no message addresses the given recipients".to_string(),
            )),
            (_, Some(e)) => {
                warn!(raised, error = %e, "Urgency raised on some messages only");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn has_acknowledgment(
        &self,
        conversation: &ConversationContext,
        since: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        if conversation.is_empty() {
            return Ok(false);
        }
        let token = self.tenant_token().await?;

        let mut answered = false;
        let mut last_error = None;
        for chat_id in &conversation.chat_ids {
            match self.chat_has_acknowledgment(&token, chat_id, since).await {
                Ok(true) => {
                    info!(chat_id = %chat_id, "Acknowledgment received");
                    return Ok(true);
                }
                Ok(false) => answered = true,
                Err(e) => {
                    debug!(chat_id = %chat_id, error = %e, "Reply check failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !answered => Err(GatewayError::Transient(e.to_string())),
            _ => Ok(false),
        }
    }
}

/// Transport hiccups are transient; everything else takes the caller's variant
fn classify(e: HttpError, otherwise: fn(String) -> GatewayError) -> GatewayError {
    if e.is_transient() {
        GatewayError::Transient(e.to_string())
    } else {
        otherwise(e.to_string())
    }
}

fn log_hint(e: &HttpError, message_id: &str, tier: Tier) {
    if let HttpError::Api { code, msg } = e {
        match api::hint_for(*code) {
            Some(hint) => warn!(
                message_id,
                code,
                msg = %msg,
                channel = tier.channel(),
                "Buzz rejected: {}",
                hint
            ),
            None => warn!(
                message_id,
                code,
                msg = %msg,
                channel = tier.channel(),
                "Buzz rejected"
            ),
        }
    }
}
