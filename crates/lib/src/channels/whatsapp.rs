//! WhatsApp channel: send text and template messages via the Business Cloud API.

use crate::channels::sender::ReplySender;
use crate::config::WhatsAppConfig;
use async_trait::async_trait;
use serde_json::json;

const MESSAGING_PRODUCT: &str = "whatsapp";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("whatsapp not configured: {0}")]
    NotConfigured(&'static str),
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("whatsapp api error: {0}")]
    Api(String),
}

/// WhatsApp Business Cloud API connector (outbound only; inbound arrives on the webhook).
pub struct WhatsAppChannel {
    api_base: String,
    api_version: String,
    phone_number_id: Option<String>,
    token: Option<String>,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig, client: reqwest::Client) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_version: config.api_version.trim_matches('/').to_string(),
            phone_number_id: config.phone_number_id.clone(),
            token: config.access_token.clone(),
            client,
        }
    }

    /// Send a plain-text message to `to` (international number without '+').
    pub async fn send_text(&self, to: &str, text: &str) -> Result<(), DeliveryError> {
        let body = json!({
            "messaging_product": MESSAGING_PRODUCT,
            "to": to,
            "type": "text",
            "text": { "body": text },
        });
        self.post_message(&body).await
    }

    /// Send a pre-approved template (e.g. "hello_world"), which may open a conversation outside the 24h window.
    pub async fn send_template(&self, to: &str, name: &str, language: &str) -> Result<(), DeliveryError> {
        let body = json!({
            "messaging_product": MESSAGING_PRODUCT,
            "to": to,
            "type": "template",
            "template": {
                "name": name,
                "language": { "code": language },
            },
        });
        self.post_message(&body).await
    }

    fn messages_url(&self) -> Result<String, DeliveryError> {
        let phone_id = self
            .phone_number_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(DeliveryError::NotConfigured("phone number id"))?;
        Ok(format!(
            "{}/{}/{}/messages",
            self.api_base, self.api_version, phone_id
        ))
    }

    async fn post_message(&self, body: &serde_json::Value) -> Result<(), DeliveryError> {
        let token = self
            .token
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(DeliveryError::NotConfigured("access token"))?;
        let url = self.messages_url()?;
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Api(format!("{} {}", status, body)));
        }
        log::debug!("whatsapp: message accepted");
        Ok(())
    }
}

#[async_trait]
impl ReplySender for WhatsAppChannel {
    async fn send_text(&self, to: &str, text: &str) -> Result<(), DeliveryError> {
        WhatsAppChannel::send_text(self, to, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_uses_version_and_phone_id() {
        let config = WhatsAppConfig {
            phone_number_id: Some("10987".to_string()),
            api_base: "https://graph.example.com/".to_string(),
            ..WhatsAppConfig::default()
        };
        let channel = WhatsAppChannel::new(&config, reqwest::Client::new());
        assert_eq!(
            channel.messages_url().unwrap(),
            "https://graph.example.com/v18.0/10987/messages"
        );
    }

    #[tokio::test]
    async fn send_without_token_is_not_configured() {
        let config = WhatsAppConfig {
            phone_number_id: Some("10987".to_string()),
            ..WhatsAppConfig::default()
        };
        let channel = WhatsAppChannel::new(&config, reqwest::Client::new());
        let err = channel.send_text("15551234567", "hi").await.unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured("access token")));
    }

    #[tokio::test]
    async fn send_without_phone_id_is_not_configured() {
        let config = WhatsAppConfig {
            access_token: Some("token".to_string()),
            ..WhatsAppConfig::default()
        };
        let channel = WhatsAppChannel::new(&config, reqwest::Client::new());
        let err = channel
            .send_template("15551234567", "hello_world", "en_US")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::NotConfigured("phone number id")));
    }
}
