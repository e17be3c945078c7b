//! End-to-end tests for the HTTP endpoints, driven in-process.

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{write_voice, SlowCapability};
use tts_gateway::engines::formant::FormantEngine;
use tts_gateway::server::{create_router, AppState};
use tts_gateway::{GatewayConfig, SingleFlightGateway};

fn formant_app(default_voice: &Path) -> Router {
    let gateway = SingleFlightGateway::new(Arc::new(FormantEngine::new()), GatewayConfig::default());
    create_router(AppState::new(gateway, default_voice))
}

fn post_tts(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tts")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn content_type(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[tokio::test]
async fn wav_request_returns_audio() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({
            "text": "hello",
            "voice_path": voice,
            "output_format": "wav",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "audio/wav");
    let body = body_bytes(response).await;
    assert!(body.len() > 44);
    assert_eq!(&body[..4], b"RIFF");
}

#[cfg(feature = "mp3")]
#[tokio::test]
async fn format_defaults_to_mp3() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({ "text": "hello there", "seed": 3 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "audio/mpeg");
    assert!(!body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn omitted_voice_uses_the_server_default() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Default.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({
            "text": "hello",
            "voice_path": null,
            "output_format": "WAV",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "audio/wav");
}

#[tokio::test]
async fn seeded_requests_return_identical_audio() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);
    let body = json!({ "text": "same words", "seed": 99, "output_format": "wav" });

    let first = app.clone().oneshot(post_tts(body.clone())).await.unwrap();
    let second = app.oneshot(post_tts(body)).await.unwrap();

    assert_eq!(body_bytes(first).await, body_bytes(second).await);
}

#[tokio::test]
async fn missing_voice_is_404_naming_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({
            "text": "hello",
            "voice_path": "voices/missing.wav",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("voices/missing.wav"), "{detail}");
}

#[tokio::test]
async fn generation_failure_is_500_with_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let capability = Arc::new(SlowCapability::new(Duration::from_millis(1)));
    let gateway = SingleFlightGateway::new(capability, GatewayConfig::default());
    let app = create_router(AppState::new(gateway, &voice));

    let response = app
        .oneshot(post_tts(json!({ "text": "boom" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Generation Error: "), "{detail}");
    assert!(detail.contains("numerical instability"), "{detail}");
}

#[tokio::test]
async fn empty_text_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn body_without_text_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({ "voice_path": "voices/Jordan.wav" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("text"), "{json}");
}

#[tokio::test]
async fn negative_seed_is_rejected_with_detail() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let app = formant_app(&voice);

    let response = app
        .oneshot(post_tts(json!({ "text": "hello", "seed": -5 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("-5"), "{detail}");
}

#[tokio::test]
async fn oversized_text_is_rejected_before_admission() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let capability = Arc::new(SlowCapability::new(Duration::from_millis(1)));
    let gateway = SingleFlightGateway::new(capability.clone(), GatewayConfig::default());
    let app = create_router(AppState::new(gateway.clone(), &voice).with_max_text_chars(10));

    let at_limit = app
        .clone()
        .oneshot(post_tts(json!({ "text": "ééééééééé.", "output_format": "wav" })))
        .await
        .unwrap();
    assert_eq!(at_limit.status(), StatusCode::OK);

    let response = app
        .oneshot(post_tts(json!({ "text": "a".repeat(11) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("10 characters"), "{json}");
    assert_eq!(capability.calls(), 1);
    assert_eq!(gateway.stats().admitted, 1);
}

#[tokio::test]
async fn concurrent_requests_both_succeed_serially() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let delay = Duration::from_millis(150);
    let capability = Arc::new(SlowCapability::new(delay));
    let gateway = SingleFlightGateway::new(capability.clone(), GatewayConfig::default());
    let app = create_router(AppState::new(gateway, &voice));

    let started = Instant::now();
    let (a, b) = tokio::join!(
        app.clone().oneshot(post_tts(json!({ "text": "one", "output_format": "wav" }))),
        app.clone().oneshot(post_tts(json!({ "text": "two", "output_format": "wav" }))),
    );
    let elapsed = started.elapsed();

    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);
    assert!(elapsed >= delay * 2, "finished in {elapsed:?}");
    assert_eq!(capability.max_active(), 1);
}

#[tokio::test]
async fn health_answers_while_inference_is_running() {
    let dir = tempfile::tempdir().unwrap();
    let voice = write_voice(dir.path(), "Jordan.wav");
    let capability = Arc::new(SlowCapability::new(Duration::from_millis(300)));
    let gateway = SingleFlightGateway::new(capability, GatewayConfig::default());
    let app = create_router(AppState::new(gateway.clone(), &voice));

    let slow = tokio::spawn(
        app.clone()
            .oneshot(post_tts(json!({ "text": "long", "output_format": "wav" }))),
    );

    // Wait until the slow request holds the slot.
    let deadline = Instant::now() + Duration::from_secs(2);
    while gateway.is_idle() {
        assert!(Instant::now() < deadline, "request was never admitted");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["engine"], "slow");
    assert_eq!(json["gateway"]["admitted"], 1);

    assert_eq!(slow.await.unwrap().unwrap().status(), StatusCode::OK);
}
