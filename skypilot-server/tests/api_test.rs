//! HTTP API tests

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::Value;
use skypilot_core::{Direction, LinkHandle, Maneuver, PilotConfig, RecordingLink};
use skypilot_eye::{NullDetector, TranscoderConfig};
use skypilot_server::{create_router, PilotSession};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn session() -> (Arc<RecordingLink>, Arc<PilotSession>) {
    let link = Arc::new(RecordingLink::new());
    let session = PilotSession::new(
        LinkHandle::new(link.clone()),
        Arc::new(NullDetector),
        PilotConfig::default(),
        TranscoderConfig::default(),
        false,
    );
    (link, session)
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn get(session: &Arc<PilotSession>, uri: &str) -> axum::response::Response {
    create_router(session.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_command_ok() {
    let (link, session) = session();

    let response = get(&session, "/api/command?command=takeOff").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        serde_json::json!({"result": "OK", "code": 200})
    );
    assert_eq!(link.maneuvers(), vec![Maneuver::TakeOff]);
}

#[tokio::test]
async fn test_trailing_slash_route() {
    let (link, session) = session();

    let response = get(&session, "/api/command/?command=land").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(link.maneuvers(), vec![Maneuver::Land]);
}

#[tokio::test]
async fn test_unknown_command_not_found() {
    let (link, session) = session();

    for uri in ["/api/command?command=barrelRoll", "/api/command"] {
        let response = get(&session, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"result": "Not found", "code": 404})
        );
    }
    assert!(link.maneuvers().is_empty());
}

#[tokio::test]
async fn test_speed_via_form_post() {
    let (link, session) = session();

    let response = create_router(session.clone())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/command")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("command=speed&speed=40"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(session.state().speed(), 40);

    get(&session, "/api/command?command=up").await;
    assert_eq!(link.last(), Some(Maneuver::moving(Direction::Up, 40)));
}

#[tokio::test]
async fn test_post_with_query_only() {
    let (link, session) = session();

    let response = create_router(session.clone())
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/command?command=bounce")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(link.maneuvers(), vec![Maneuver::Bounce]);
}

#[tokio::test]
async fn test_unknown_path_not_found() {
    let (_link, session) = session();

    let response = get(&session, "/api/v2/anything").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["result"], "Not found");
}

#[tokio::test]
async fn test_status_endpoint() {
    let (_link, session) = session();
    get(&session, "/api/command?command=speed&speed=25").await;
    get(&session, "/api/command?command=faceDetectTrack").await;

    let response = get(&session, "/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["link"], "sim");
    assert_eq!(status["state"], "Disconnected");
    assert_eq!(status["speed"], 25);
    assert_eq!(status["face_tracking"], true);
    assert_eq!(status["patrolling"], false);
}

#[tokio::test]
async fn test_video_stream_delivers_frames() {
    let (_link, session) = session();

    let response = get(&session, "/video/streaming").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(session.broadcaster().subscriber_count(), 1);

    session
        .broadcaster()
        .publish(Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xD9]));

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
        .await
        .expect("no frame streamed")
        .unwrap()
        .unwrap();
    assert!(chunk.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n"));
    assert!(chunk.ends_with(&[0xFF, 0xD8, 0xFF, 0xD9, b'\r', b'\n']));

    drop(body);
    assert_eq!(session.broadcaster().subscriber_count(), 0);
}
