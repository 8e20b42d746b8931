//! Admin endpoints: complaint list, map and status editing.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, put},
};
use fixmycity_common::{AppError, AppResult};
use fixmycity_core::MapView;
use fixmycity_db::entities::complaint::ComplaintStatus;
use serde::Deserialize;

use super::complaints::ComplaintResponse;
use crate::{extractors::AdminUser, middleware::AppState, response::ApiResponse};

/// Update status request.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// List all complaints for review.
async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ComplaintResponse>>> {
    let complaints = state.complaint_service.list().await?;

    Ok(ApiResponse::ok(
        complaints.into_iter().map(ComplaintResponse::from).collect(),
    ))
}

/// Markers for complaints that carry coordinates.
async fn map(_admin: AdminUser, State(state): State<AppState>) -> AppResult<ApiResponse<MapView>> {
    Ok(ApiResponse::ok(state.complaint_service.map_view().await?))
}

/// Set a complaint's status and return the stored result.
async fn update_status(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> AppResult<ApiResponse<ComplaintResponse>> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let status: ComplaintStatus = req.status.parse().map_err(AppError::BadRequest)?;

    state.complaint_service.update_status(&id, status).await?;
    let complaint = state.complaint_service.get(&id).await?;

    Ok(ApiResponse::ok(complaint.into()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/complaints", get(list))
        .route("/complaints/map", get(map))
        .route("/complaints/{id}/status", put(update_status))
}
