//! Snapshot trigger.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::error;

use super::handlers::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub endpoints: usize,
    pub bytes: usize,
}

/// POST /api/v1/snapshot
///
/// Persist the whole registry now.
pub async fn trigger_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SnapshotResponse>, impl IntoResponse> {
    match state.snapshots().snapshot_now().await {
        Ok(report) => Ok(Json(SnapshotResponse {
            endpoints: report.endpoints,
            bytes: report.bytes,
        })),
        Err(e) => {
            error!(error = %e, "On-demand snapshot failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
