//! Messaging channels (WhatsApp).
//!
//! Inbound webhook payload types, the reply seam used by the relay, and the WhatsApp
//! Business Cloud API connector that implements it.

mod inbound;
mod sender;
mod whatsapp;

pub use inbound::{
    is_whatsapp_object, ChangeValue, Contact, InboundMessage, Profile, TextContent, WebhookChange,
    WebhookEntry, WebhookEvent, WebhookMessage, MESSAGES_FIELD, WHATSAPP_OBJECT,
};
pub use sender::ReplySender;
pub use whatsapp::{DeliveryError, WhatsAppChannel};
