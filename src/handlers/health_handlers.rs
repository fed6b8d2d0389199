//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks storage configuration and
//!   reports cache warmth

use crate::services::gallery_service::GalleryService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that:
/// 1. Checks the storage configuration (no network; the bucket must be set).
/// 2. Reports whether the listing cache holds a snapshot and how old it is.
///
/// A cold cache is still ready — it populates lazily on the first gallery
/// request — so only an unconfigured bucket turns the probe 503.
pub async fn readyz(State(service): State<GalleryService>) -> impl IntoResponse {
    let storage_check = match service.storage_configured() {
        Ok(()) => (true, None::<String>),
        Err(err) => (false, Some(err.to_string())),
    };

    let snapshot = service.cache.snapshot();
    let cache_check = CacheStatus {
        warm: snapshot.is_some(),
        built_at: snapshot.as_ref().map(|s| s.built_at),
        groups: snapshot.as_ref().map(|s| s.data.len()),
    };

    let storage_ok = storage_check.0;

    let mut checks = HashMap::new();
    checks.insert(
        "storage",
        CheckStatus {
            ok: storage_ok,
            error: storage_check.1,
        },
    );

    let body = ReadyResponse {
        status: if storage_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
        cache: cache_check,
    };

    let status = if storage_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
    cache: CacheStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct CacheStatus {
    warm: bool,
    built_at: Option<DateTime<Utc>>,
    groups: Option<usize>,
}
