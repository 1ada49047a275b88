//! Integration tests for the control protocol endpoints
//!
//! Drives the router in-process with tower's `oneshot`, covering:
//! - health and current probes
//! - play / evaluate / pause / stop state transitions
//! - empty-code rejection (400) and evaluation failure (500)
//! - the shared {ok:false, error} failure shape

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tapedeckd::engine::NullEngine;
use tapedeckd::{build_router, AppContext};
use tower::util::ServiceExt; // for `oneshot` method

fn setup_app() -> (axum::Router, AppContext) {
    let ctx = AppContext::new(Arc::new(NullEngine::new()));
    (build_router(ctx.clone()), ctx)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn health_reports_pid() {
    let (app, ctx) = setup_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["pid"], ctx.pid);
}

#[tokio::test]
async fn current_starts_stopped() {
    let (app, _ctx) = setup_app();

    let response = app.oneshot(get_request("/current")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "stopped");
    assert!(body.get("name").is_none());
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn play_transitions_to_playing() {
    let (app, _ctx) = setup_app();

    let response = app
        .clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "s(\"bd sn\")", "name": "jam", "version": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["name"], "jam");
    assert_eq!(body["version"], 2);
    assert_eq!(body["state"], "playing");

    let response = app.oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "playing");
    assert_eq!(body["name"], "jam");
    assert_eq!(body["version"], 2);
    assert_eq!(body["code"], "s(\"bd sn\")");
}

#[tokio::test]
async fn play_rejects_empty_code() {
    let (app, _ctx) = setup_app();

    let response = app
        .oneshot(post_request(
            "/play",
            json!({"code": "", "name": "jam", "version": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("code"));
}

#[tokio::test]
async fn omitted_code_is_a_400_with_shared_shape() {
    let (app, _ctx) = setup_app();

    // A body without the code field must behave exactly like empty code:
    // HTTP 400 with the {ok:false, error} failure shape, not a
    // deserialization rejection
    let requests = [
        post_request("/play", json!({"name": "jam", "version": 1})),
        post_request("/evaluate", json!({})),
        post_request("/validate", json!({})),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

        let body = extract_json(response.into_body()).await;
        assert_eq!(body["ok"], false, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("code"), "{uri}");
    }
}

#[tokio::test]
async fn failed_evaluation_keeps_prior_state() {
    let (app, _ctx) = setup_app();

    // Establish a playing snapshot
    let response = app
        .clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "tone(440)", "name": "jam", "version": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Unbalanced pattern fails evaluation with a 500
    let response = app
        .clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "tone(440", "name": "broken", "version": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], false);

    // No partial state commit: the prior snapshot is intact
    let response = app.oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "jam");
    assert_eq!(body["code"], "tone(440)");
    assert_eq!(body["state"], "playing");
}

#[tokio::test]
async fn stop_clears_current() {
    let (app, _ctx) = setup_app();

    app.clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "tone(440)", "name": "jam", "version": 1}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_request("/stop", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "stopped");

    let response = app.oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "stopped");
    assert!(body.get("name").is_none());
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (app, _ctx) = setup_app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_request("/stop", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn pause_only_pauses_when_playing() {
    let (app, _ctx) = setup_app();

    // Pausing while stopped succeeds but stays stopped
    let response = app
        .clone()
        .oneshot(post_request("/pause", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "stopped");

    app.clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "tone(440)", "name": "jam", "version": 1}),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post_request("/pause", json!({})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "paused");
}

#[tokio::test]
async fn evaluate_retains_prior_identity_when_unnamed() {
    let (app, _ctx) = setup_app();

    app.clone()
        .oneshot(post_request(
            "/play",
            json!({"code": "tone(440)", "name": "jam", "version": 3}),
        ))
        .await
        .unwrap();

    // Anonymous evaluate: new code, same song identity
    let response = app
        .clone()
        .oneshot(post_request("/evaluate", json!({"code": "tone(880)"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);

    let response = app.clone().oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["name"], "jam");
    assert_eq!(body["version"], 3);
    assert_eq!(body["code"], "tone(880)");

    // Named evaluate updates the identity
    app.clone()
        .oneshot(post_request(
            "/evaluate",
            json!({"code": "tone(220)", "name": "jam", "version": 4}),
        ))
        .await
        .unwrap();
    let response = app.oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["version"], 4);
}

#[tokio::test]
async fn validate_reports_location_without_state_change() {
    let (app, _ctx) = setup_app();

    let response = app
        .clone()
        .oneshot(post_request("/validate", json!({"code": "s(\"bd\""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["valid"], false);
    assert_eq!(body["line"], 1);
    assert!(body["error"].as_str().is_some());

    let response = app
        .clone()
        .oneshot(post_request("/validate", json!({"code": "s(\"bd\")"})))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["valid"], true);
    assert!(body.get("error").is_none());

    // Side-effect-free: still stopped
    let response = app.oneshot(get_request("/current")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["state"], "stopped");
}

#[tokio::test]
async fn validate_rejects_empty_code() {
    let (app, _ctx) = setup_app();

    let response = app
        .oneshot(post_request("/validate", json!({"code": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
