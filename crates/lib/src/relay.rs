//! Message relay: one completion call and one reply per inbound text message.
//!
//! Failures never leave this module. A completion failure turns into [`FALLBACK_REPLY`];
//! a delivery failure is logged and dropped. There is no retry and no deduplication.

use crate::channels::{DeliveryError, InboundMessage, ReplySender, WhatsAppChannel};
use crate::config::Config;
use crate::llm::{CompletionBackend, OpenAiClient, UpstreamError};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sent to the user when the completion service fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// No text body; nothing was called.
    Skipped,
    /// Completion text delivered.
    Replied,
    /// Completion failed; fallback delivered.
    FallbackSent,
    /// The final send failed (after a completion or a fallback).
    DeliveryFailed,
}

/// Completion backend plus reply channel. Cheap to clone; shared by all dispatched tasks.
#[derive(Clone)]
pub struct Relay {
    completion: Arc<dyn CompletionBackend>,
    sender: Arc<dyn ReplySender>,
}

/// Shared reqwest client with the configured per-request deadline.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_secs))
        .build()
        .context("building http client")
}

impl Relay {
    pub fn new(completion: Arc<dyn CompletionBackend>, sender: Arc<dyn ReplySender>) -> Self {
        Self { completion, sender }
    }

    /// OpenAI completion + WhatsApp delivery from config, sharing `client`.
    pub fn from_config(config: &Config, client: reqwest::Client, whatsapp: Arc<WhatsAppChannel>) -> Self {
        let completion = Arc::new(OpenAiClient::new(&config.completion, client));
        Self::new(completion, whatsapp)
    }

    /// Relay one message: completion, then reply (or fallback). Never returns an error.
    pub async fn handle_message(&self, inbound: &InboundMessage) -> RelayOutcome {
        let message = &inbound.message;
        let Some(text) = message.text_body() else {
            return RelayOutcome::Skipped;
        };
        log::info!("relay: received message from {}: {}", inbound.sender_label(), text);

        let (reply, outcome) = match self.get_completion(text).await {
            Ok(reply) => (reply, RelayOutcome::Replied),
            Err(e) => {
                log::warn!("relay: completion failed for {}: {}", message.from, e);
                (FALLBACK_REPLY.to_string(), RelayOutcome::FallbackSent)
            }
        };
        match self.send_reply(&message.from, &reply).await {
            Ok(()) => {
                log::info!("relay: reply sent to {}", message.from);
                outcome
            }
            Err(e) => {
                log::warn!("relay: delivery to {} failed: {}", message.from, e);
                RelayOutcome::DeliveryFailed
            }
        }
    }

    pub async fn get_completion(&self, text: &str) -> Result<String, UpstreamError> {
        self.completion.complete(text).await
    }

    pub async fn send_reply(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        self.sender.send_text(recipient, text).await
    }

    /// Spawn relay work for one message without waiting for it. Best effort: the task
    /// absorbs relay failures and a supervising task logs panics, so nothing escapes.
    pub fn dispatch(&self, inbound: InboundMessage) -> JoinHandle<()> {
        let relay = self.clone();
        let from = inbound.message.from.clone();
        let work = tokio::spawn(async move {
            relay.handle_message(&inbound).await;
        });
        tokio::spawn(async move {
            if let Err(e) = work.await {
                log::error!("relay: task for {} aborted: {}", from, e);
            }
        })
    }
}
