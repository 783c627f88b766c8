//! Inbound WhatsApp webhook payload and the per-message pairs handed to the relay.
//!
//! Parsing is per item: a malformed entry, change, message or contact is logged and
//! skipped, and the rest of the batch is still relayed.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Value of the top-level `object` tag for WhatsApp Business notifications.
pub const WHATSAPP_OBJECT: &str = "whatsapp_business_account";

/// Change `field` carrying user messages.
pub const MESSAGES_FIELD: &str = "messages";

/// True when a notification body is tagged `"object": "whatsapp_business_account"`.
/// Checked on the raw JSON so other objects are recognised whatever their shape.
pub fn is_whatsapp_object(body: &Value) -> bool {
    body.get("object").and_then(Value::as_str) == Some(WHATSAPP_OBJECT)
}

/// Webhook notification body (POST /webhook).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default, deserialize_with = "lenient")]
    pub value: ChangeValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub messages: Vec<WebhookMessage>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub contacts: Vec<Contact>,
}

/// One user message. Only text messages carry `text`; media and reactions are skipped by the relay.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

/// Array of `T`, dropping items that do not parse. Anything other than an array is empty.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("webhook: skipping malformed item: {}", e);
                None
            }
        })
        .collect())
}

/// `T` if the value parses, otherwise `T::default()`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        log::warn!("webhook: ignoring malformed change value: {}", e);
        T::default()
    }))
}

impl WebhookMessage {
    /// Text body, if this is a text message with non-empty content.
    pub fn text_body(&self) -> Option<&str> {
        self.text
            .as_ref()
            .map(|t| t.body.as_str())
            .filter(|b| !b.is_empty())
    }
}

impl Contact {
    pub fn display_name(&self) -> Option<&str> {
        self.profile.as_ref().and_then(|p| p.name.as_deref())
    }
}

/// A message paired with the contact that sent it, ready for the relay.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message: WebhookMessage,
    pub contact: Option<Contact>,
}

impl InboundMessage {
    /// Name used in logs: contact display name, falling back to the sender id.
    pub fn sender_label(&self) -> &str {
        self.contact
            .as_ref()
            .and_then(Contact::display_name)
            .unwrap_or(&self.message.from)
    }
}

impl WebhookEvent {
    /// Every message under every `messages` change, each paired with its contact.
    pub fn inbound_messages(&self) -> Vec<InboundMessage> {
        let mut out = Vec::new();
        for entry in &self.entry {
            for change in entry.changes.iter().filter(|c| c.field == MESSAGES_FIELD) {
                let contacts = &change.value.contacts;
                for (idx, message) in change.value.messages.iter().enumerate() {
                    out.push(InboundMessage {
                        message: message.clone(),
                        contact: pair_contact(message, idx, contacts).cloned(),
                    });
                }
            }
        }
        out
    }
}

/// Contact whose `wa_id` matches the sender; otherwise the contact at the same position.
fn pair_contact<'a>(message: &WebhookMessage, idx: usize, contacts: &'a [Contact]) -> Option<&'a Contact> {
    contacts
        .iter()
        .find(|c| c.wa_id.as_deref() == Some(message.from.as_str()))
        .or_else(|| contacts.get(idx))
}
