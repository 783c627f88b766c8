//! Shared helpers: a fake OpenAI + WhatsApp upstream on a free port, and a gateway pointed at it.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use relay::config::Config;
use relay::gateway;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const VERIFY_TOKEN: &str = "s3cret";
pub const PHONE_NUMBER_ID: &str = "1234567890";
pub const COMPLETION_TEXT: &str = "Hello Ada! How can I help?";
/// How long the fake completion stalls when `slow_completion` is set.
pub const SLOW_COMPLETION: Duration = Duration::from_secs(2);

/// One request seen by the fake upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub auth: Option<String>,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct Upstream {
    pub completions: Arc<Mutex<Vec<Recorded>>>,
    pub sends: Arc<Mutex<Vec<Recorded>>>,
    pub fail_completion: Arc<AtomicBool>,
    pub slow_completion: Arc<AtomicBool>,
}

fn record(headers: &HeaderMap, body: Value) -> Recorded {
    Recorded {
        auth: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    }
}

async fn fake_completion(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    up.completions.lock().await.push(record(&headers, body));
    if up.slow_completion.load(Ordering::SeqCst) {
        tokio::time::sleep(SLOW_COMPLETION).await;
    }
    if up.fail_completion.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "upstream exploded" } })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": format!("  {}\n", COMPLETION_TEXT) } }]
        })),
    )
}

async fn fake_send(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    up.sends.lock().await.push(record(&headers, body));
    Json(json!({ "messaging_product": "whatsapp", "messages": [{ "id": "wamid.test" }] }))
}

impl Upstream {
    /// Serve the fake upstream on a free loopback port.
    pub async fn start(&self) -> SocketAddr {
        let app = Router::new()
            .route("/v1/chat/completions", post(fake_completion))
            .route("/v18.0/:phone_id/messages", post(fake_send))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind upstream");
        let addr = listener.local_addr().expect("upstream addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    /// Wait until at least `n` sends were recorded (relay work is dispatched in the background).
    pub async fn wait_for_sends(&self, n: usize) -> Vec<Recorded> {
        for _ in 0..100 {
            {
                let sends = self.sends.lock().await;
                if sends.len() >= n {
                    return sends.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("expected {} send(s) within 5s", n);
    }
}

pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

pub fn test_config(port: u16, upstream: SocketAddr) -> Config {
    let mut config = Config::default();
    config.server.port = port;
    config.server.bind = "127.0.0.1".to_string();
    config.whatsapp.access_token = Some("wa-token".to_string());
    config.whatsapp.phone_number_id = Some(PHONE_NUMBER_ID.to_string());
    config.whatsapp.verify_token = Some(VERIFY_TOKEN.to_string());
    config.whatsapp.api_base = format!("http://{}", upstream);
    config.completion.api_key = Some("sk-test".to_string());
    config.completion.base_url = format!("http://{}/v1", upstream);
    config.http.timeout_secs = 5;
    config
}

/// Start the gateway in the background and wait until GET / answers. Returns the base URL.
pub async fn start_gateway(config: Config) -> String {
    let base = format!("http://127.0.0.1:{}", config.server.port);
    tokio::spawn(async move {
        let _ = gateway::run_gateway(config).await;
    });
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not come up within 5s", base);
}

/// Fake upstream plus a gateway wired to it.
pub async fn start_relay() -> (Upstream, String) {
    let upstream = Upstream::default();
    let addr = upstream.start().await;
    let base = start_gateway(test_config(free_port(), addr)).await;
    (upstream, base)
}

/// Notification with one text message from Ada.
pub fn ada_says(text: &str) -> Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "102290129340398",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": { "display_phone_number": "15550783881", "phone_number_id": PHONE_NUMBER_ID },
                    "contacts": [{ "profile": { "name": "Ada" }, "wa_id": "15551234567" }],
                    "messages": [{
                        "from": "15551234567",
                        "id": "wamid.HBgLMTU1NTEyMzQ1NjcVAgASGBQzQTRBNjU5OUFFRTAzODEwMTQ0RgA=",
                        "timestamp": "1749416383",
                        "type": "text",
                        "text": { "body": text }
                    }]
                }
            }]
        }]
    })
}
