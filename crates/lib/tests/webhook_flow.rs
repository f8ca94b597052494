//! End-to-end webhook tests against fake carrier and language-model endpoints:
//! POST /webhook acks fast, the background processor asks the fallback model,
//! and the reply is delivered through the carrier API.

use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};
use lib::config::Config;
use lib::gateway;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type SentMessages = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

/// Fake Twilio Messages endpoint: records the form params, returns a SID.
async fn start_fake_carrier() -> (String, SentMessages) {
    let sent: SentMessages = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/2010-04-01/Accounts/:sid/Messages.json",
            post(
                |State(sent): State<SentMessages>,
                 Form(params): Form<HashMap<String, String>>| async move {
                    sent.lock().await.push(params);
                    Json(serde_json::json!({ "sid": "SM00000000000000000000000000000000" }))
                },
            ),
        )
        .with_state(sent.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake carrier");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}", addr), sent)
}

/// Fake Gemini generateContent endpoint: always replies with a fixed text.
async fn start_fake_model(reply: &'static str) -> String {
    let app = Router::new().route(
        "/v1beta/models/:model",
        post(move || async move {
            Json(serde_json::json!({
                "candidates": [
                    { "content": { "parts": [ { "text": reply } ] } }
                ]
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake model");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

/// Start the gateway against the fake endpoints; returns its base URL.
async fn start_gateway(carrier_base: String, model_base: String) -> String {
    let port = free_port();
    let mut config = Config::default();
    config.gateway.port = port;
    config.gateway.bind = "127.0.0.1".to_string();
    config.carrier.account_sid = Some("AC_test".to_string());
    config.carrier.auth_token = Some("token".to_string());
    config.carrier.api_base = Some(carrier_base);
    config.llm.api_key = Some("k".to_string());
    config.llm.api_base = Some(model_base);

    tokio::spawn(async move {
        let _ = gateway::run_gateway(config).await;
    });

    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/test", base)).send().await {
            if resp.status().is_success() {
                return base;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("gateway at {} did not come up within 5s", base);
}

#[tokio::test]
async fn webhook_fallback_reply_is_sent_through_carrier() {
    let (carrier_base, sent) = start_fake_carrier().await;
    let model_base = start_fake_model("hi! how can I help?").await;
    let base = start_gateway(carrier_base, model_base).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/webhook", base))
        .form(&[("From", "whatsapp:+919876543210"), ("Body", "hello")])
        .send()
        .await
        .expect("post webhook");
    assert_eq!(res.status(), 200);

    // the ack returns before the reply is delivered; poll for the send
    for _ in 0..100 {
        if let Some(params) = sent.lock().await.first() {
            assert_eq!(
                params.get("To").map(String::as_str),
                Some("whatsapp:+919876543210")
            );
            assert_eq!(
                params.get("Body").map(String::as_str),
                Some("hi! how can I help?")
            );
            assert_eq!(
                params.get("From").map(String::as_str),
                Some("whatsapp:+14155238886")
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("no outbound send captured within 5s");
}

#[tokio::test]
async fn webhook_rejects_payload_without_sender() {
    let (carrier_base, sent) = start_fake_carrier().await;
    let model_base = start_fake_model("unused").await;
    let base = start_gateway(carrier_base, model_base).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/webhook", base))
        .form(&[("Body", "hello")])
        .send()
        .await
        .expect("post webhook");
    assert_eq!(res.status(), 400);

    // an empty body is acked but not processed
    let res = client
        .post(format!("{}/webhook", base))
        .form(&[("From", "whatsapp:+1415"), ("Body", "  ")])
        .send()
        .await
        .expect("post webhook");
    assert_eq!(res.status(), 200);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sent.lock().await.is_empty());
}

#[tokio::test]
async fn manual_send_endpoint_forwards_to_carrier() {
    let (carrier_base, sent) = start_fake_carrier().await;
    let model_base = start_fake_model("unused").await;
    let base = start_gateway(carrier_base, model_base).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/send", base))
        .json(&serde_json::json!({ "to": "+14155551234", "message": "ping" }))
        .send()
        .await
        .expect("post send");
    assert_eq!(res.status(), 200);
    let json: serde_json::Value = res.json().await.expect("parse JSON");
    assert_eq!(json.get("sent").and_then(|v| v.as_bool()), Some(true));

    let captured = sent.lock().await;
    let params = captured.first().expect("captured send");
    assert_eq!(params.get("To").map(String::as_str), Some("whatsapp:+14155551234"));
    assert_eq!(params.get("Body").map(String::as_str), Some("ping"));
    drop(captured);

    let res = client
        .post(format!("{}/send", base))
        .json(&serde_json::json!({ "to": "+14155551234" }))
        .send()
        .await
        .expect("post send");
    assert_eq!(res.status(), 400);
}
