use super::*;
use std::{
    io,
    sync::{Arc, Mutex},
};

use axum::{body, body::Body, http::Request};
use tower::ServiceExt;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn interactions(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains("interaction recorded"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn interaction_id(line: &str) -> String {
    line.split("interaction_id=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("interaction id field")
        .to_string()
}

fn track_request(body: serde_json::Value) -> Request<Body> {
    Request::post("/track_event")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn healthz_reports_ok() {
    let request = Request::get("/healthz")
        .body(Body::empty())
        .expect("request");
    let response = build_router().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn accepts_event_with_free_form_details() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let response = build_router()
        .oneshot(track_request(serde_json::json!({
            "event_type": "refinement_applied",
            "control_id": "control-42",
            "refinementId": "r1",
            "attempt": 2
        })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let recorded = logs.interactions();
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].contains("event_type=refinement_applied"));
    assert!(recorded[0].contains("control_id=control-42"));
    assert!(recorded[0].contains("\"refinementId\":\"r1\""));
    assert!(recorded[0].contains("\"attempt\":2"));
}

#[tokio::test]
async fn each_event_gets_its_own_interaction_id() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let app = build_router();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(track_request(serde_json::json!({
                "event_type": "review_opened",
                "control_id": "AC-2"
            })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let recorded = logs.interactions();
    assert_eq!(recorded.len(), 2);
    assert_ne!(interaction_id(&recorded[0]), interaction_id(&recorded[1]));
}

#[tokio::test]
async fn blank_event_type_is_rejected_with_validation_error() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let response = build_router()
        .oneshot(track_request(serde_json::json!({
            "event_type": " ",
            "control_id": "control-42"
        })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let error: ApiError = serde_json::from_slice(&body).expect("json");
    assert!(matches!(error.code, shared::error::ErrorCode::Validation));
    assert!(logs.interactions().is_empty());
}

#[tokio::test]
async fn missing_control_id_is_a_client_error() {
    let response = build_router()
        .oneshot(track_request(serde_json::json!({ "event_type": "x" })))
        .await
        .expect("response");
    assert!(response.status().is_client_error());
}
