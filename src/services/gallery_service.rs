//! GalleryService — shared state handed to every handler.
//!
//! Owns the listing cache (and through it the refresh task), the URL
//! resolver, and the static studio info. Constructed once in `main` and
//! cloned into the router; nothing here is a process-wide singleton.

use crate::config::AppConfig;
use crate::models::studio::StudioInfo;
use crate::services::listing_cache::ListingCache;
use crate::services::s3_client::{ObjectStore, S3Client, StoreResult};
use crate::services::url_resolver::UrlResolver;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn ObjectStore>,
    pub cache: ListingCache,
    pub resolver: UrlResolver,
    pub studio: Arc<StudioInfo>,
}

impl GalleryService {
    /// Assemble the service over any store implementation. Tests inject
    /// fakes through this.
    pub fn new(store: Arc<dyn ObjectStore>, url_lifetime: Duration, studio: StudioInfo) -> Self {
        let cache = ListingCache::new(store.clone(), url_lifetime);
        let resolver = UrlResolver::new(store.clone());
        Self {
            store,
            cache,
            resolver,
            studio: Arc::new(studio),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> StoreResult<Self> {
        let url_lifetime = Duration::from_secs(cfg.storage.presign_expiration);
        let store = Arc::new(S3Client::new(cfg.storage.clone())?);
        Ok(Self::new(store, url_lifetime, StudioInfo::default()))
    }

    /// Cheap readiness probe: the fallback URL is a pure computation that
    /// fails only when the bucket is unconfigured.
    pub fn storage_configured(&self) -> StoreResult<()> {
        self.store.public_url("readyz").map(|_| ())
    }
}
