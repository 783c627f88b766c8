//! WhatsApp completion relay — webhook gateway, WhatsApp and OpenAI clients, and the
//! relay that joins them. Used by the `wa-relay` CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod llm;
pub mod relay;
