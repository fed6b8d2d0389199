//! HTTP handlers for the gallery API.
//!
//! Listing goes through the process-wide cache; presigning degrades to the
//! public fallback URL rather than surfacing signing errors to callers.

use crate::{
    errors::AppError,
    models::image::ImagesByGroup,
    models::studio::StudioInfo,
    services::gallery_service::GalleryService,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

/// Query params accepted by `GET /api/list-images`.
#[derive(Debug, Deserialize)]
pub struct ListImagesQuery {
    pub orientation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PresignResponse {
    pub url: String,
}

/// `GET /api/list-images?orientation=landscape|portrait`
///
/// Ensures the server cache is initialized (a no-op once populated) and
/// returns the grouped listing. An empty object means "nothing cached for
/// this view yet"; the frontend treats it as a loading state.
pub async fn list_images(
    State(service): State<GalleryService>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Json<ImagesByGroup>, AppError> {
    let prefix = query
        .orientation
        .as_deref()
        .filter(|orientation| !orientation.is_empty())
        .map(|orientation| format!("{}/", orientation));

    if let Err(err) = service.cache.initialize().await {
        error!(error = %err, "failed to list gallery images");
        return Err(AppError::internal("Failed to list images"));
    }

    let groups = service.cache.get_cached(prefix.as_deref()).unwrap_or_default();
    Ok(Json(groups))
}

/// `POST /api/presign` with body `{key: "path/to/object.jpg"}`.
///
/// Always answers with *some* usable URL for a well-formed key: signing
/// failures silently degrade to the constructed public URL. Only an
/// unconfigured bucket produces a 500.
pub async fn presign(
    State(service): State<GalleryService>,
    Json(body): Json<Value>,
) -> Result<Json<PresignResponse>, AppError> {
    let Some(key) = body.get("key").and_then(Value::as_str).filter(|k| !k.is_empty()) else {
        return Err(AppError::bad_request("Missing key"));
    };

    let resolved = service.resolver.resolve(key).await.map_err(|err| {
        error!(error = %err, key, "failed to presign key");
        AppError::internal("Failed to presign key")
    })?;

    Ok(Json(PresignResponse {
        url: resolved.into_url(),
    }))
}

/// `GET /api/studio-info` — static studio contact information.
pub async fn studio_info(State(service): State<GalleryService>) -> Json<StudioInfo> {
    Json((*service.studio).clone())
}
