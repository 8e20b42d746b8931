//! Complaint submission and public tracking endpoints.

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    routing::get,
};
use bytes::Bytes;
use fixmycity_common::{AppError, AppResult};
use fixmycity_core::{ComplaintDraft, Coordinates, MediaPayload};
use fixmycity_db::entities::complaint::{self, ComplaintStatus};
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Room for the text fields and multipart framing around two attachments.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Coordinate pair as exposed to clients.
#[derive(Debug, Serialize)]
pub struct CoordsResponse {
    pub latitude: f64,
    pub longitude: f64,
}

/// Complaint response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    #[serde(rename = "audioURL")]
    pub audio_url: String,
    pub location: String,
    pub coords: Option<CoordsResponse>,
    pub status: ComplaintStatus,
    pub created_at: String,
}

impl From<complaint::Model> for ComplaintResponse {
    fn from(c: complaint::Model) -> Self {
        let coords = c
            .coordinates()
            .map(|(latitude, longitude)| CoordsResponse {
                latitude,
                longitude,
            });
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            photo_url: c.photo_url,
            audio_url: c.audio_url,
            location: c.location,
            coords,
            status: c.status,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

fn multipart_error(e: &MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

fn parse_coordinate(name: &str, raw: Option<String>) -> AppResult<Option<f64>> {
    raw.map(|text| {
        text.parse::<f64>()
            .map_err(|_| AppError::Validation(format!("{name} must be a number")))
    })
    .transpose()
}

/// Submit a complaint via multipart form.
async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ComplaintResponse>> {
    let mut draft = ComplaintDraft::default();
    let mut latitude: Option<String> = None;
    let mut longitude: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "photo" | "audio" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data: Bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;

                // A file input left empty still submits a zero-length part.
                if data.is_empty() {
                    continue;
                }

                if name == "photo" {
                    draft.photo = Some(MediaPayload::photo(file_name, content_type, data));
                } else {
                    draft.audio = Some(MediaPayload::audio(content_type, data));
                }
            }
            "title" | "description" | "location" | "latitude" | "longitude" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                match name.as_str() {
                    "title" => draft.title = text,
                    "description" => draft.description = text,
                    "location" => draft.location = text,
                    "latitude" if !text.trim().is_empty() => latitude = Some(text.trim().to_string()),
                    "longitude" if !text.trim().is_empty() => longitude = Some(text.trim().to_string()),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    draft.coordinates = match (
        parse_coordinate("latitude", latitude)?,
        parse_coordinate("longitude", longitude)?,
    ) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)?),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "latitude and longitude must be supplied together".to_string(),
            ));
        }
    };

    let created = state.complaint_service.submit(draft).await?;

    Ok(ApiResponse::ok(created.into()))
}

/// List all complaints, newest first.
async fn list(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<ComplaintResponse>>> {
    let complaints = state.complaint_service.list().await?;

    Ok(ApiResponse::ok(
        complaints.into_iter().map(ComplaintResponse::from).collect(),
    ))
}

/// Show a single complaint.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ComplaintResponse>> {
    let complaint = state.complaint_service.get(&id).await?;

    Ok(ApiResponse::ok(complaint.into()))
}

/// Status strings in lifecycle order.
async fn statuses() -> ApiResponse<Vec<&'static str>> {
    ApiResponse::ok(ComplaintStatus::ALL.iter().map(|s| s.as_str()).collect())
}

/// Body limit for submissions carrying up to two attachments.
const fn submission_body_limit(max_upload_size: usize) -> usize {
    max_upload_size
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD)
}

pub fn router(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list)
                .post(submit)
                .layer(DefaultBodyLimit::max(submission_body_limit(max_upload_size))),
        )
        .route("/statuses", get(statuses))
        .route("/{id}", get(show))
}
