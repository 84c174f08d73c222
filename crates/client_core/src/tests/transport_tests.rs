use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::protocol::{ActionKind, NextActionResponse, ResetResponse};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use super::*;

async fn spawn_router(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn action(id: &str, finished: bool) -> shared::protocol::Action {
    shared::protocol::Action {
        id: id.to_string(),
        description: format!("step {id}"),
        kind: ActionKind::Confirm,
        finished,
    }
}

#[tokio::test]
async fn fetch_next_handles_all_three_wire_shapes() {
    let calls = Arc::new(Mutex::new(0usize));
    let app = Router::new().route(
        "/next-action",
        get({
            let calls = Arc::clone(&calls);
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    let mut calls = calls.lock().await;
                    *calls += 1;
                    let body = match *calls {
                        1 => NextActionResponse::Step(action("first", false)),
                        2 => NextActionResponse::Step(action("last", true)),
                        _ => NextActionResponse::exhausted(),
                    };
                    Json(body)
                }
            }
        }),
    );
    let client = MesClient::new(spawn_router(app).await);
    let unit = SlaughterNumber::new("12345");

    let first = client.fetch_next(&unit).await.expect("first fetch");
    let FetchOutcome::Step(step) = first else {
        panic!("expected a step");
    };
    assert_eq!(step.id, "first");
    assert!(!step.finished);

    let second = client.fetch_next(&unit).await.expect("second fetch");
    let FetchOutcome::Step(step) = second else {
        panic!("expected a step");
    };
    assert!(step.finished);

    let third = client.fetch_next(&unit).await.expect("third fetch");
    assert_eq!(third, FetchOutcome::Finished);
}

#[tokio::test]
async fn fetch_next_maps_server_error_to_transport_failure() {
    let app = Router::new().route(
        "/next-action",
        get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let client = MesClient::new(spawn_router(app).await);

    let err = client
        .fetch_next(&SlaughterNumber::new("12345"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, SourceError::Transport(_)));
}

#[tokio::test]
async fn fetch_next_maps_malformed_body_to_protocol_failure() {
    let app = Router::new().route(
        "/next-action",
        get(|| async { Json(serde_json::json!({"unexpected": true})) }),
    );
    let client = MesClient::new(spawn_router(app).await);

    let err = client
        .fetch_next(&SlaughterNumber::new("12345"))
        .await
        .expect_err("should fail");
    assert!(matches!(err, SourceError::Protocol(_)));
}

struct CaptureState<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

// Manual impl: a derive would demand `T: Clone`, but only the `Arc` is
// cloned and the captured payloads are not themselves cloneable.
impl<T> Clone for CaptureState<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

fn capture_state<T>() -> (CaptureState<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        CaptureState {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

async fn capture_submit(
    State(state): State<CaptureState<serde_json::Value>>,
    Json(payload): Json<serde_json::Value>,
) -> StatusCode {
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(payload);
    }
    StatusCode::OK
}

#[tokio::test]
async fn submit_value_posts_camel_case_payload() {
    let (state, rx) = capture_state();
    let app = Router::new()
        .route("/submit", post(capture_submit))
        .with_state(state);
    let client = MesClient::new(spawn_router(app).await);

    client
        .submit_value(&SlaughterNumber::new("12345"), "input-weight", "4.2")
        .await
        .expect("submit");

    let payload = rx.await.expect("captured payload");
    assert_eq!(
        payload,
        serde_json::json!({
            "slaughterNumber": "12345",
            "action": "input-weight",
            "value": "4.2",
        })
    );
}

#[derive(Debug, PartialEq)]
struct UploadedPhoto {
    filename: String,
    bytes: Vec<u8>,
    slaughter_number: String,
    action: String,
}

async fn capture_photo(
    State(state): State<CaptureState<UploadedPhoto>>,
    mut multipart: Multipart,
) -> StatusCode {
    let mut filename = String::new();
    let mut bytes = Vec::new();
    let mut slaughter_number = String::new();
    let mut action = String::new();

    while let Some(field) = multipart.next_field().await.expect("field") {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("photo") => {
                filename = field.file_name().unwrap_or_default().to_string();
                bytes = field.bytes().await.expect("bytes").to_vec();
            }
            Some("slaughterNumber") => slaughter_number = field.text().await.expect("text"),
            Some("action") => action = field.text().await.expect("text"),
            _ => {}
        }
    }

    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(UploadedPhoto {
            filename,
            bytes,
            slaughter_number,
            action,
        });
    }
    StatusCode::OK
}

#[tokio::test]
async fn submit_photo_sends_multipart_attachment_with_unit_and_action() {
    let (state, rx) = capture_state();
    let app = Router::new()
        .route("/upload-photo", post(capture_photo))
        .with_state(state);
    let client = MesClient::new(spawn_router(app).await);

    client
        .submit_photo(
            &SlaughterNumber::new("12345"),
            "upload-photo",
            &PhotoAttachment {
                filename: "part.jpg".into(),
                mime_type: Some("image/jpeg".into()),
                bytes: vec![0xff, 0xd8, 0xff],
            },
        )
        .await
        .expect("upload");

    let uploaded = rx.await.expect("captured upload");
    assert_eq!(
        uploaded,
        UploadedPhoto {
            filename: "part.jpg".into(),
            bytes: vec![0xff, 0xd8, 0xff],
            slaughter_number: "12345".into(),
            action: "upload-photo".into(),
        }
    );
}

#[tokio::test]
async fn reset_posts_slaughter_query_and_parses_message() {
    let (state, rx) = capture_state();
    let app = Router::new()
        .route(
            "/reset",
            post(
                |State(state): State<CaptureState<String>>,
                 axum::extract::Query(query): axum::extract::Query<
                    std::collections::HashMap<String, String>,
                >| async move {
                    if let Some(tx) = state.tx.lock().await.take() {
                        let _ = tx.send(query.get("slaughter").cloned().unwrap_or_default());
                    }
                    Json(ResetResponse {
                        message: "Session has been reset.".into(),
                    })
                },
            ),
        )
        .with_state(state);
    let client = MesClient::new(spawn_router(app).await);

    let response = client
        .reset(&SlaughterNumber::new("12345"))
        .await
        .expect("reset");
    assert_eq!(response.message, "Session has been reset.");
    assert_eq!(rx.await.expect("captured unit"), "12345");
}

#[tokio::test]
async fn probe_session_reports_ok_payload() {
    let app = Router::new().route(
        "/session",
        get(|| async { Json(shared::protocol::LivenessResponse::ok_now()) }),
    );
    let client = MesClient::new(spawn_router(app).await);

    let response = client.probe_session().await.expect("probe");
    assert!(response.is_ok());
}
