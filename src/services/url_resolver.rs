//! Access URL resolution with graceful degradation.
//!
//! The public contract is "give me a usable URL for this key". Internally the
//! outcome stays a two-variant result so tests and logs can observe whether
//! the store actually signed the URL or we degraded to the public fallback.

use crate::services::s3_client::{ObjectStore, StoreError, StoreResult};
use std::sync::Arc;
use tracing::warn;

/// How a key's URL was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedUrl {
    /// Cryptographically signed, time-limited URL from the provider.
    Signed(String),
    /// Constructed public URL; may 404 if the bucket forbids public reads.
    Fallback(String),
}

impl ResolvedUrl {
    pub fn as_str(&self) -> &str {
        match self {
            ResolvedUrl::Signed(url) | ResolvedUrl::Fallback(url) => url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            ResolvedUrl::Signed(url) | ResolvedUrl::Fallback(url) => url,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ResolvedUrl::Fallback(_))
    }
}

/// Resolves object keys to fetchable URLs, preferring signed URLs and
/// degrading to the public fallback on any signing failure. The only error
/// that escapes is an unconfigured bucket.
#[derive(Clone)]
pub struct UrlResolver {
    store: Arc<dyn ObjectStore>,
}

impl UrlResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, key: &str) -> StoreResult<ResolvedUrl> {
        match self.store.presign_get(key).await {
            Ok(url) => Ok(ResolvedUrl::Signed(url)),
            Err(StoreError::BucketNotConfigured) => Err(StoreError::BucketNotConfigured),
            Err(err) => {
                warn!(key, error = %err, "presign failed, returning public URL fallback");
                Ok(ResolvedUrl::Fallback(self.store.public_url(key)?))
            }
        }
    }
}
