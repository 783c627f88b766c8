//! Outbound reply seam between the relay and a messaging channel.

use crate::channels::whatsapp::DeliveryError;
use async_trait::async_trait;

/// Sends a plain-text reply to a recipient on a channel.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Send `text` to `to` (for WhatsApp, the sender's phone number as received on the webhook).
    async fn send_text(&self, to: &str, text: &str) -> Result<(), DeliveryError>;
}
