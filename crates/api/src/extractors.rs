//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use fixmycity_common::AppError;

/// Marker inserted by the admin middleware after a successful token check.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

/// Authenticated admin extractor.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AdminSession);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by admin_auth_middleware
        parts
            .extensions
            .get::<AdminSession>()
            .copied()
            .map(AdminUser)
            .ok_or(AppError::Unauthorized)
    }
}
