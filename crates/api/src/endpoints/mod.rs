//! API endpoints.

mod admin;
mod complaints;

use axum::{Router, middleware::from_fn_with_state};

use crate::middleware::{AppState, admin_auth_middleware};

pub use complaints::{ComplaintResponse, CoordsResponse};

/// Create the API router.
///
/// Admin routes are gated by [`admin_auth_middleware`], which needs the state
/// up front; `max_upload_size` sizes the submission body limit.
pub fn router(state: AppState, max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .nest("/complaints", complaints::router(max_upload_size))
        .nest(
            "/admin",
            admin::router().route_layer(from_fn_with_state(state, admin_auth_middleware)),
        )
}
