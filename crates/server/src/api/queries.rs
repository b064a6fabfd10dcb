//! Query listing and mutation handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use listwatch_core::{SearchHit, StateError};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub available: usize,
    pub visited: usize,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EndpointsResponse {
    pub endpoints: Vec<EndpointSummary>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ListingParams {
    /// Optional lower cap; never exceeds the configured maximum.
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub endpoint: String,
    pub results: Vec<SearchHit>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct MarkVisitedRequest {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct MarkVisitedResponse {
    pub id: String,
    pub moved: bool,
}

#[derive(Debug, Deserialize)]
pub struct MarkVisitedBatchRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkVisitedBatchResponse {
    pub requested: usize,
    pub moved: usize,
}

fn state_error(e: StateError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        StateError::UnknownEndpoint(_) => StatusCode::NOT_FOUND,
        _ => {
            error!(error = %e, "State error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/endpoints
///
/// Counters for every query, sorted by endpoint.
pub async fn list_endpoints(State(state): State<Arc<AppState>>) -> Json<EndpointsResponse> {
    let endpoints: Vec<EndpointSummary> = state
        .registry()
        .summaries()
        .await
        .into_iter()
        .map(|s| EndpointSummary {
            endpoint: s.endpoint,
            available: s.available,
            visited: s.visited,
            last_refresh: s.last_refresh,
        })
        .collect();
    let total = endpoints.len();
    Json(EndpointsResponse { endpoints, total })
}

/// GET /api/v1/endpoints/{endpoint}/listing
///
/// Available hits of one query.
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Query(params): Query<ListingParams>,
) -> Result<Json<ListingResponse>, impl IntoResponse> {
    let max = state.config().listing.max_results;
    let limit = params.limit.map_or(max, |l| l.min(max));

    match state.registry().list(&endpoint, Some(limit)).await {
        Ok(results) => {
            let count = results.len();
            Ok(Json(ListingResponse {
                endpoint,
                results,
                count,
            }))
        }
        Err(e) => Err(state_error(e)),
    }
}

/// POST /api/v1/endpoints/{endpoint}/visited
///
/// Mark one hit as handled.
pub async fn mark_visited(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Json(request): Json<MarkVisitedRequest>,
) -> Result<Json<MarkVisitedResponse>, impl IntoResponse> {
    match state.registry().mark_visited(&endpoint, &request.id).await {
        Ok(moved) => {
            debug!(endpoint = %endpoint, id = %request.id, moved, "Marked visited");
            Ok(Json(MarkVisitedResponse {
                id: request.id,
                moved,
            }))
        }
        Err(e) => Err(state_error(e)),
    }
}

/// POST /api/v1/endpoints/{endpoint}/visited/batch
///
/// Mark several hits as handled in one step.
pub async fn mark_visited_batch(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    Json(request): Json<MarkVisitedBatchRequest>,
) -> Result<Json<MarkVisitedBatchResponse>, impl IntoResponse> {
    let requested = request.ids.len();
    match state
        .registry()
        .mark_visited_batch(&endpoint, request.ids.as_slice())
        .await
    {
        Ok(moved) => {
            debug!(endpoint = %endpoint, requested, moved, "Marked batch visited");
            Ok(Json(MarkVisitedBatchResponse { requested, moved }))
        }
        Err(e) => Err(state_error(e)),
    }
}
