//! Defines routes for the gallery API.
//!
//! ## Structure
//! - **Gallery endpoints**
//!   - `GET  /api/list-images` — grouped listing (supports ?orientation=)
//!   - `POST /api/presign` — time-limited URL for one object key
//!   - `GET  /api/studio-info` — static studio contact information
//!
//! - **Health endpoints**
//!   - `GET /healthz` — liveness
//!   - `GET /readyz` — readiness (storage configuration + cache warmth)

use crate::{
    handlers::{
        gallery_handlers::{list_images, presign, studio_info},
        health_handlers::{healthz, readyz},
    },
    services::gallery_service::GalleryService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all gallery routes.
///
/// The router carries shared state (`GalleryService`) to all handlers.
pub fn routes() -> Router<GalleryService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // gallery endpoints
        .route("/api/list-images", get(list_images))
        .route("/api/presign", post(presign))
        .route("/api/studio-info", get(studio_info))
}
