//! HTTP API
//!
//! - `GET|POST /api/command?command=<name>&speed=<n>`: run one command
//! - `GET /api/status`: session snapshot
//! - `GET /video/streaming`: MJPEG stream of the processed video

use crate::session::PilotSession;
use axum::{
    body::Body,
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use skypilot_ctl::DispatchOutcome;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

/// Multipart boundary separating frames in the video stream
pub const MJPEG_BOUNDARY: &str = "frame";

#[derive(Clone)]
pub struct AppState {
    session: Arc<PilotSession>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandParams {
    command: Option<String>,
    speed: Option<String>,
}

pub fn create_router(session: Arc<PilotSession>) -> Router {
    let state = AppState { session };

    Router::new()
        .route("/api/command", get(command_query).post(command_form))
        .route("/api/command/", get(command_query).post(command_form))
        .route("/api/status", get(status_handler))
        .route("/video/streaming", get(video_stream_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn command_query(
    State(state): State<AppState>,
    Query(params): Query<CommandParams>,
) -> Response {
    run_command(&state, params).await
}

/// Form fields take precedence over query parameters
async fn command_form(
    State(state): State<AppState>,
    Query(query): Query<CommandParams>,
    form: Option<Form<CommandParams>>,
) -> Response {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let params = CommandParams {
        command: form.command.or(query.command),
        speed: form.speed.or(query.speed),
    };
    run_command(&state, params).await
}

async fn run_command(state: &AppState, params: CommandParams) -> Response {
    let command = params.command.unwrap_or_default();
    let outcome = state
        .session
        .dispatch(&command, params.speed.as_deref())
        .await;
    outcome_response(outcome)
}

fn outcome_response(outcome: DispatchOutcome) -> Response {
    let status = StatusCode::from_u16(outcome.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome)).into_response()
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.status())
}

async fn video_stream_handler(State(state): State<AppState>) -> Response {
    let subscription = state.session.broadcaster().subscribe();
    debug!(
        "viewer connected, {} watching",
        state.session.broadcaster().subscriber_count()
    );

    // The subscription drops with the body when the client goes away
    let stream = futures_util::stream::unfold(subscription, |mut subscription| async move {
        let jpeg = subscription.next().await?;
        Some((Ok::<_, Infallible>(mjpeg_part(&jpeg)), subscription))
    });

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
            ),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// One multipart section wrapping a JPEG frame
pub fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let head = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        MJPEG_BOUNDARY,
        jpeg.len()
    );
    let mut part = BytesMut::with_capacity(head.len() + jpeg.len() + 2);
    part.put_slice(head.as_bytes());
    part.put_slice(jpeg);
    part.put_slice(b"\r\n");
    part.freeze()
}

async fn not_found_handler() -> Response {
    outcome_response(DispatchOutcome::not_found())
}
