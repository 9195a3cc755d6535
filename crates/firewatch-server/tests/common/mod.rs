//! Test fixtures: an in-memory gateway and app config

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use firewatch_core::{
    Alert, ConversationContext, DispatchHandle, GatewayError, ImageKey, NotificationGateway,
    RecipientId, SentMessage, Target, Tier,
};
use firewatch_server::{AppConfig, AppState};

/// Gateway that knows two admins and never sees a reply
#[derive(Default)]
pub struct QuietGateway {
    pub sends: AtomicU32,
    pub raises: AtomicU32,
}

#[async_trait]
impl NotificationGateway for QuietGateway {
    async fn resolve_recipient(&self, identity: &str) -> Result<RecipientId, GatewayError> {
        match identity {
            "+8613800000001" => Ok(RecipientId::new("ou_admin1")),
            "+8613800000002" => Ok(RecipientId::new("ou_admin2")),
            _ => Err(GatewayError::NotFound(identity.to_string())),
        }
    }

    async fn upload_image(&self, _path: &Path) -> Result<ImageKey, GatewayError> {
        Ok(ImageKey("img_v2_test".into()))
    }

    async fn send_alert(
        &self,
        target: &Target,
        _alert: &Alert,
    ) -> Result<DispatchHandle, GatewayError> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(DispatchHandle::single(SentMessage {
            message_id: format!("om_{}", n),
            chat_id: Some("oc_lab".into()),
            recipients: target.recipients().to_vec(),
        }))
    }

    async fn raise_urgency(
        &self,
        _handle: &DispatchHandle,
        _recipients: &[RecipientId],
        _tier: Tier,
    ) -> Result<(), GatewayError> {
        self.raises.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn has_acknowledgment(
        &self,
        _conversation: &ConversationContext,
        _since: DateTime<Utc>,
    ) -> Result<bool, GatewayError> {
        Ok(false)
    }
}

pub fn config(phones: &[&str]) -> AppConfig {
    let mut config = AppConfig::default();
    config.core.directory.admin_phones = phones.iter().map(|p| p.to_string()).collect();
    config.core.escalation.notify_stand_down = false;
    config.feishu.app_id = "cli_test".into();
    config.feishu.app_secret = "secret".into();
    config
}

pub async fn app_state(config: &AppConfig) -> (Arc<AppState>, Arc<QuietGateway>) {
    let gateway = Arc::new(QuietGateway::default());
    let (state, _) = AppState::build(config, gateway.clone()).await.unwrap();
    (Arc::new(state), gateway)
}
