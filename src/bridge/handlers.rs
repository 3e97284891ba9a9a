use crate::channel::wire::{ConsoleResponse, HealthResponse, MessageResponse, StatusResponse};
use crate::control::command::Command;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use log::{debug, info, warn};
use std::sync::Arc;

use super::Bridge;

/// Handler for `POST /send`
pub async fn send_handler(
    State(bridge): State<Arc<Bridge>>,
    payload: Result<Json<Command>, JsonRejection>,
) -> impl IntoResponse {
    let Json(command) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!("Rejected command body: {}", rejection);
            return (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new(
                    "Please enter valid integers for command, motor, and value.",
                )),
            );
        }
    };

    match bridge.submit(&command) {
        Ok(()) => (StatusCode::OK, Json(MessageResponse::new("Success"))),
        Err(e) => {
            warn!("Command {} rejected: {}", command, e);
            (StatusCode::SERVICE_UNAVAILABLE, Json(MessageResponse::new(e.to_string())))
        }
    }
}

/// Handler for `GET /status`
pub async fn status_handler(State(bridge): State<Arc<Bridge>>) -> impl IntoResponse {
    match bridge.request_status().await {
        Ok(Some(snapshot)) => (
            StatusCode::OK,
            Json(StatusResponse {
                message: Some("Success".into()),
                data: Some(snapshot),
            }),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(StatusResponse {
                message: Some("No status received".into()),
                data: None,
            }),
        ),
        Err(e) => {
            warn!("Status request failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse {
                    message: Some(e.to_string()),
                    data: None,
                }),
            )
        }
    }
}

/// Handler for `GET /console`; drains the buffer
pub async fn console_handler(State(bridge): State<Arc<Bridge>>) -> impl IntoResponse {
    let entries = bridge.drain_log();
    if !entries.is_empty() {
        info!("Console poll: {} entries", entries.len());
    }
    Json(ConsoleResponse { data: Some(entries) })
}

/// Handler for `GET /health`
pub async fn health_handler(State(bridge): State<Arc<Bridge>>) -> impl IntoResponse {
    let device = if bridge.is_device_healthy() { "connected" } else { "unavailable" };
    Json(HealthResponse { device: device.to_string() })
}
