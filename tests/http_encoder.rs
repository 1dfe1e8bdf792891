//! Contract tests for the HTTP text encoder.
//!
//! These tests verify the request body sent to the embedding endpoint and
//! how responses, failures and malformed payloads are handled.

use clipseek::config::EncoderConfig;
use clipseek::fusion::{CachedEncoder, FusionConfig, FusionError, TextEncoder};
use clipseek::HttpTextEncoder;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn encoder_for(server: &MockServer, dimension: usize) -> HttpTextEncoder {
    let config = EncoderConfig {
        endpoint: format!("{}/embed", server.uri()),
        timeout_seconds: 5,
        dimension,
        ..EncoderConfig::default()
    };
    HttpTextEncoder::new(&config).expect("client")
}

#[tokio::test]
async fn posts_text_and_normalises_embedding() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_json(json!({"text": "red car at night"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [3.0, 0.0, 4.0]})))
        .expect(1)
        .mount(&server)
        .await;

    let embedding = encoder_for(&server, 3)
        .encode("red car at night")
        .await
        .expect("embedding");
    assert_eq!(embedding.len(), 3);
    assert!((embedding[0] - 0.6).abs() < 1e-6);
    assert!(embedding[1].abs() < 1e-6);
    assert!((embedding[2] - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn server_error_is_encoder_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
        .mount(&server)
        .await;

    let err = encoder_for(&server, 3).encode("dog").await.unwrap_err();
    assert!(matches!(err, FusionError::Encoder(_)));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn wrong_dimension_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [1.0, 0.0]})))
        .mount(&server)
        .await;

    let err = encoder_for(&server, 3).encode("dog").await.unwrap_err();
    assert!(err.to_string().contains("expected 3 dimensions, got 2"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vector": [1.0, 0.0, 0.0]})))
        .mount(&server)
        .await;

    let err = encoder_for(&server, 3).encode("dog").await.unwrap_err();
    assert!(err.to_string().contains("malformed embedding response"));
}

#[tokio::test]
async fn unreachable_endpoint_is_encoder_error() {
    let config = EncoderConfig {
        // Port 9 (discard) is closed on test hosts.
        endpoint: "http://127.0.0.1:9/embed".to_owned(),
        timeout_seconds: 2,
        dimension: 3,
        ..EncoderConfig::default()
    };
    let err = HttpTextEncoder::new(&config)
        .expect("client")
        .encode("dog")
        .await
        .unwrap_err();
    assert!(matches!(err, FusionError::Encoder(_)));
}

#[tokio::test]
async fn cached_encoder_calls_endpoint_once_per_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embedding": [0.0, 1.0, 0.0]})))
        .expect(1)
        .mount(&server)
        .await;

    let encoder = CachedEncoder::new(encoder_for(&server, 3), &FusionConfig::default());
    let first = encoder.encode("a dog").await.expect("first");
    let second = encoder.encode("a dog").await.expect("second");
    assert_eq!(first, second);
    // `expect(1)` is verified when the mock server drops.
}
