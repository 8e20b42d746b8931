//! Static serving of locally stored complaint media.

use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{Next, from_fn},
    response::Response,
};
use fixmycity_core::content_type_for_key;
use tower_http::services::ServeDir;

/// Serve files below `root`, mounted by the caller with `nest_service` at
/// the storage base URL.
///
/// Photo keys end in a millisecond stamp, so the type `ServeDir` guesses is
/// replaced with the one implied by the uploaded file name.
pub fn files_router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(from_fn(media_content_type))
}

async fn media_content_type(request: Request, next: Next) -> Response {
    let content_type = content_type_for_key(request.uri().path());
    let mut response = next.run(request).await;

    if let Some(content_type) = content_type.filter(|_| response.status().is_success()) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    response
}
