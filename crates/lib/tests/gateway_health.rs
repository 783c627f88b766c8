//! Integration test: start the gateway on a free port, GET /, assert health JSON.
//! Does not require WhatsApp or OpenAI. The server task is left running when the test ends.

mod common;

use relay::config::Config;

#[tokio::test]
async fn gateway_health_http_responds_with_running() {
    let port = common::free_port();
    let mut config = Config::default();
    config.server.port = port;
    config.server.bind = "127.0.0.1".to_string();

    let base = common::start_gateway(config).await;
    let resp = reqwest::get(format!("{}/", base)).await.expect("GET /");
    assert!(resp.status().is_success());
    let json: serde_json::Value = resp.json().await.expect("parse JSON");
    assert_eq!(json.get("status").and_then(|v| v.as_str()), Some("running"));
    assert_eq!(json.get("webhook").and_then(|v| v.as_str()), Some("/webhook"));
    assert_eq!(json.get("port").and_then(|v| v.as_u64()), Some(port as u64));
}
