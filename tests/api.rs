//! End-to-end tests of the HTTP surface over an in-memory object store.

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use gallery_api::models::image::StorageObject;
use gallery_api::models::studio::StudioInfo;
use gallery_api::routes::routes::routes;
use gallery_api::services::gallery_service::GalleryService;
use gallery_api::services::s3_client::{ObjectStore, StoreError, StoreResult};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct MemoryStore {
    keys: Vec<String>,
    configured: bool,
    sign: bool,
}

impl MemoryStore {
    fn with_keys(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            configured: true,
            sign: true,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, _prefix: Option<&str>) -> StoreResult<Vec<StorageObject>> {
        if !self.configured {
            return Err(StoreError::BucketNotConfigured);
        }
        Ok(self
            .keys
            .iter()
            .map(|key| StorageObject {
                key: key.clone(),
                last_modified: None,
                size: 1,
            })
            .collect())
    }

    async fn presign_get(&self, key: &str) -> StoreResult<String> {
        if self.sign {
            Ok(format!("https://signed.example.com/{}?sig=x", key))
        } else {
            Err(StoreError::CredentialsMissing)
        }
    }

    fn public_url(&self, key: &str) -> StoreResult<String> {
        if !self.configured {
            return Err(StoreError::BucketNotConfigured);
        }
        Ok(format!("https://public.example.com/{}", key))
    }
}

fn app_over(store: MemoryStore) -> Router {
    let service = GalleryService::new(
        Arc::new(store),
        Duration::from_secs(900),
        StudioInfo::default(),
    );
    routes().with_state(service)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn list_images_on_an_empty_bucket_returns_an_empty_object() {
    let app = app_over(MemoryStore::with_keys(&[]));
    let (status, body) = get(&app, "/api/list-images").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn list_images_groups_by_top_level_folder() {
    let app = app_over(MemoryStore::with_keys(&[
        "landscape/outdoor/a.jpg",
        "landscape/indoor/b.jpg",
        "portrait/studio/c.jpg",
        "landscape/",
    ]));
    let (status, body) = get(&app, "/api/list-images").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["landscape"].as_array().unwrap().len(), 2);
    assert_eq!(body["portrait"].as_array().unwrap().len(), 1);
    // Items keep listing order within each group.
    assert_eq!(
        body["landscape"][0]["url"],
        "https://signed.example.com/landscape/outdoor/a.jpg?sig=x"
    );
}

#[tokio::test]
async fn orientation_filter_regroups_by_second_segment() {
    let app = app_over(MemoryStore::with_keys(&[
        "landscape/outdoor/a.jpg",
        "landscape/indoor/b.jpg",
        "portrait/studio/c.jpg",
    ]));
    let (status, body) = get(&app, "/api/list-images?orientation=landscape").await;
    assert_eq!(status, StatusCode::OK);
    let groups = body.as_object().unwrap();
    assert_eq!(
        groups.keys().collect::<Vec<_>>(),
        vec!["indoor", "outdoor"]
    );
    assert!(!groups.contains_key("portrait"));
}

#[tokio::test]
async fn presign_returns_a_signed_url() {
    let app = app_over(MemoryStore::with_keys(&[]));
    let (status, body) = post_json(&app, "/api/presign", json!({"key": "weddings/a.jpg"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["url"],
        "https://signed.example.com/weddings/a.jpg?sig=x"
    );
}

#[tokio::test]
async fn presign_without_a_key_is_a_bad_request() {
    let app = app_over(MemoryStore::with_keys(&[]));
    let (status, body) = post_json(&app, "/api/presign", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing key");

    let (status, _) = post_json(&app, "/api/presign", json!({"key": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn presign_degrades_to_the_public_url_when_signing_fails() {
    let app = app_over(MemoryStore {
        keys: vec![],
        configured: true,
        sign: false,
    });
    let (status, body) = post_json(&app, "/api/presign", json!({"key": "weddings/a.jpg"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://public.example.com/weddings/a.jpg");
}

#[tokio::test]
async fn presign_fails_when_the_bucket_is_unconfigured() {
    let app = app_over(MemoryStore {
        keys: vec![],
        configured: false,
        sign: false,
    });
    let (status, body) = post_json(&app, "/api/presign", json!({"key": "a.jpg"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to presign key");
}

#[tokio::test]
async fn list_images_fails_when_the_bucket_is_unconfigured() {
    let app = app_over(MemoryStore {
        keys: vec![],
        configured: false,
        sign: true,
    });
    let (status, body) = get(&app, "/api/list-images").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to list images");
}

#[tokio::test]
async fn studio_info_is_served_statically() {
    let app = app_over(MemoryStore::with_keys(&[]));
    let (status, body) = get(&app, "/api/studio-info").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["name"].as_str().unwrap().len() > 0);
    assert!(body["about"].as_array().unwrap().len() > 0);
}

#[tokio::test]
async fn healthz_is_always_ok() {
    let app = app_over(MemoryStore {
        keys: vec![],
        configured: false,
        sign: false,
    });
    let (status, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn readyz_reports_cache_warmth() {
    let app = app_over(MemoryStore::with_keys(&["landscape/outdoor/a.jpg"]));

    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache"]["warm"], json!(false));

    // Warm the cache through the public surface.
    let (status, _) = get(&app, "/api/list-images").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache"]["warm"], json!(true));
    assert_eq!(body["cache"]["groups"], json!(1));
}

#[tokio::test]
async fn readyz_is_unavailable_without_a_bucket() {
    let app = app_over(MemoryStore {
        keys: vec![],
        configured: false,
        sign: true,
    });
    let (status, body) = get(&app, "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["checks"]["storage"]["ok"], json!(false));
}
