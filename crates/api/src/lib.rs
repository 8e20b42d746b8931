//! HTTP API layer for FixMyCity.
//!
//! This crate provides the REST API consumed by the citizen and admin views:
//!
//! - **Endpoints**: complaint submission, public tracking, admin list, map and status editing
//! - **Extractors**: admin session
//! - **Middleware**: bearer-token admin gate
//! - **Files**: local media serving with content types recovered from keys
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod files;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use files::files_router;
pub use middleware::AppState;
