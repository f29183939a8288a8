//! Client-level tests against a mock images API on a local port.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::StatusCode;
use axum::{Json, Router};
use imgen::error::ImgenError;
use imgen::openai::{
    Background, GenerationRequest, ImageQuality, ImageSize, OpenAiClient, OutputFormat,
};
use serde_json::{Value, json};

async fn spawn_mock(status: StatusCode, response: Value) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let handler_hits = hits.clone();

    let app = Router::new().route(
        "/v1/images/generations",
        axum::routing::post(move |Json(_request): Json<Value>| {
            let handler_hits = handler_hits.clone();
            let response = response.clone();
            async move {
                handler_hits.fetch_add(1, Ordering::SeqCst);
                (status, Json(response))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}/v1/images/generations"), hits)
}

fn request() -> GenerationRequest {
    GenerationRequest {
        prompt: "a lighthouse at dusk".to_string(),
        size: ImageSize::default(),
        quality: ImageQuality::default(),
        model: "dall-e-3".to_string(),
        count: 1,
        output_format: OutputFormat::default(),
        background: Background::default(),
    }
}

#[tokio::test]
async fn generate_returns_parsed_data() {
    let (url, hits) = spawn_mock(
        StatusCode::OK,
        json!({"data": [{"b64_json": "aGVsbG8=", "revised_prompt": "a lighthouse"}]}),
    )
    .await;
    let client = OpenAiClient::new(Some("sk-test".to_string()), url);

    let response = client.generate(&request()).await.expect("generate");

    assert_eq!(response.data.len(), 1);
    assert_eq!(response.data[0].b64_json.as_deref(), Some("aGVsbG8="));
    assert_eq!(
        response.data[0].revised_prompt.as_deref(),
        Some("a lighthouse")
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_key_is_a_configuration_error_with_no_network_traffic() {
    let (url, hits) = spawn_mock(StatusCode::OK, json!({"data": []})).await;
    let client = OpenAiClient::new(None, url);

    let err = client.generate(&request()).await.expect_err("no key");

    assert!(matches!(err, ImgenError::Configuration(_)));
    assert!(err.to_string().contains("OPENAI_API_KEY"));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_failure_carries_status_and_body() {
    let (url, _hits) = spawn_mock(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"error": "server busy"}),
    )
    .await;
    let client = OpenAiClient::new(Some("sk-test".to_string()), url);

    let err = client.generate(&request()).await.expect_err("upstream 500");

    match err {
        ImgenError::Api { status, message } => {
            assert_eq!(status, Some(500));
            assert!(message.contains("server busy"), "got: {message}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_body_is_an_api_error() {
    let (url, _hits) = spawn_mock(StatusCode::OK, json!(["not", "an", "object"])).await;
    let client = OpenAiClient::new(Some("sk-test".to_string()), url);

    let err = client.generate(&request()).await.expect_err("bad body");

    match err {
        ImgenError::Api { status, message } => {
            assert_eq!(status, None);
            assert!(message.contains("parse"), "got: {message}");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
