//! Webhook gateway: HTTP server for the WhatsApp webhook and operator endpoints.

mod server;

pub use server::{router, run_gateway, GatewayState};
