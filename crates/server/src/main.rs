//! FixMyCity server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fixmycity_api::{AppState, files_router, router as api_router};
use fixmycity_common::{
    AppError, AppResult, Config, LocalStorage, StorageService, config::StorageKind,
};
use fixmycity_core::{
    ComplaintService, ComplaintStoreService, GeocodingClient, MediaUploader, MemoryComplaintStore,
};
use fixmycity_db::repositories::ComplaintRepository;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Complaint store selected by `database.url`.
async fn build_store(config: &Config) -> AppResult<ComplaintStoreService> {
    if config.database.is_memory() {
        warn!("Using in-memory complaint store; complaints are lost on restart");
        return Ok(Arc::new(MemoryComplaintStore::new()));
    }

    let db = fixmycity_db::open(&config.database).await?;
    Ok(Arc::new(ComplaintRepository::new(db)))
}

/// Media storage selected by `storage.backend`.
async fn build_storage(config: &Config) -> AppResult<StorageService> {
    match config.storage.backend {
        StorageKind::Local => {
            tokio::fs::create_dir_all(&config.storage.local_path)
                .await
                .map_err(|e| {
                    AppError::Config(format!(
                        "Cannot create {}: {e}",
                        config.storage.local_path.display()
                    ))
                })?;
            let base_url = config.storage.resolved_base_url(&config.server.url);
            info!(path = %config.storage.local_path.display(), url = %base_url, "Using local media storage");
            Ok(Arc::new(LocalStorage::new(
                config.storage.local_path.clone(),
                base_url,
            )))
        }
        #[cfg(feature = "s3")]
        StorageKind::S3 => {
            let storage = fixmycity_common::S3Storage::from_config(&config.storage)?;
            info!("Using S3 media storage");
            Ok(Arc::new(storage))
        }
        #[cfg(not(feature = "s3"))]
        StorageKind::S3 => Err(AppError::Config(
            "storage.backend = \"s3\" requires the `s3` feature".to_string(),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fixmycity=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting FixMyCity server...");

    // Load configuration
    let config = Config::load()?;

    let store = build_store(&config).await?;
    let storage = build_storage(&config).await?;
    let geocoder = GeocodingClient::service(&config.geocoding)?;
    if !config.geocoding.enabled {
        info!("Reverse geocoding disabled; coordinates are stored as the location");
    }

    let max_upload_size = config.storage.max_upload_size;
    let complaint_service = ComplaintService::new(
        store,
        MediaUploader::new(storage, max_upload_size),
        geocoder,
    );

    if config.admin.token.as_deref().is_none_or(str::is_empty) {
        warn!("admin.token is not set; admin endpoints will reject every request");
    }
    let state = AppState::new(complaint_service, config.admin.token.clone());

    // Build router
    let mut app = Router::new().nest("/api", api_router(state.clone(), max_upload_size));

    if config.storage.backend == StorageKind::Local {
        app = app.nest_service("/files", files_router(&config.storage.local_path));
    }

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
