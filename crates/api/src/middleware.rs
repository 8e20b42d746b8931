//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use fixmycity_common::AppError;
use fixmycity_core::ComplaintService;

use crate::extractors::AdminSession;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub complaint_service: ComplaintService,
    /// Bearer token for admin routes. `None` locks the admin API.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    #[must_use]
    pub fn new(complaint_service: ComplaintService, admin_token: Option<String>) -> Self {
        Self {
            complaint_service,
            admin_token: admin_token
                .filter(|t| !t.is_empty())
                .map(Arc::from),
        }
    }
}

/// Admin authentication middleware.
///
/// Inserts an [`AdminSession`] when the bearer token matches, rejects otherwise.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match (state.admin_token.as_deref(), presented) {
        (Some(expected), Some(token)) if tokens_match(expected, token) => {
            req.extensions_mut().insert(AdminSession);
            next.run(req).await
        }
        _ => {
            tracing::debug!(path = %req.uri().path(), "Rejected admin request");
            AppError::Unauthorized.into_response()
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
