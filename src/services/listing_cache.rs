//! Process-wide listing cache.
//!
//! Holds at most one fully-built snapshot of the bucket, grouped by the
//! first path segment of each key, with a resolved access URL per object.
//! The snapshot is replaced by assignment only, so readers see either the
//! old complete view or the new one, never a mix. A single timer task
//! rebuilds the snapshot shortly before the presigned URLs expire.

use crate::models::image::{CacheSnapshot, ImageItem, ImagesByGroup, display_category, first_segment};
use crate::services::s3_client::{ObjectStore, StoreResult};
use crate::services::url_resolver::UrlResolver;
use chrono::Utc;
use futures::future::join_all;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Rebuild this long before the presigned URLs expire.
const REFRESH_BEFORE_EXPIRY: Duration = Duration::from_secs(60);
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Grouped, URL-resolved view of the bucket with timed refresh.
///
/// Cheap to clone; clones share the snapshot slot and refresh task. The
/// refresh task stops on [`ListingCache::shutdown`] or when the last clone
/// is dropped, so tests never leak timers.
#[derive(Clone)]
pub struct ListingCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Arc<dyn ObjectStore>,
    resolver: UrlResolver,
    url_lifetime: Duration,
    snapshot: RwLock<Option<Arc<CacheSnapshot>>>,
    /// Serializes builds so concurrent first callers await one listing.
    build_lock: tokio::sync::Mutex<()>,
    /// Signalled after every successful build; restarts the refresh countdown.
    rearm_tx: watch::Sender<()>,
    rearm_rx: watch::Receiver<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl ListingCache {
    pub fn new(store: Arc<dyn ObjectStore>, url_lifetime: Duration) -> Self {
        let resolver = UrlResolver::new(store.clone());
        let (rearm_tx, rearm_rx) = watch::channel(());
        Self {
            inner: Arc::new(CacheInner {
                store,
                resolver,
                url_lifetime,
                snapshot: RwLock::new(None),
                build_lock: tokio::sync::Mutex::new(()),
                rearm_tx,
                rearm_rx,
                refresh_task: Mutex::new(None),
            }),
        }
    }

    pub fn resolver(&self) -> &UrlResolver {
        &self.inner.resolver
    }

    /// The current snapshot, or `None` before the first successful build.
    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Idempotent: returns the existing snapshot or performs the first full
    /// build. Concurrent callers during that build await it rather than
    /// triggering their own.
    pub async fn initialize(&self) -> StoreResult<Arc<CacheSnapshot>> {
        if let Some(snapshot) = self.snapshot() {
            return Ok(snapshot);
        }
        let _guard = self.inner.build_lock.lock().await;
        if let Some(snapshot) = self.snapshot() {
            // Built while we waited for the lock.
            return Ok(snapshot);
        }
        self.build_and_publish().await
    }

    /// Force an immediate rebuild regardless of timer state.
    pub async fn refresh_now(&self) -> StoreResult<Arc<CacheSnapshot>> {
        let _guard = self.inner.build_lock.lock().await;
        self.build_and_publish().await
    }

    /// Grouped view of the snapshot, or `None` while still loading.
    ///
    /// Without a prefix, groups are keyed by the first path segment. With a
    /// prefix (a top-level orientation folder), matching items are regrouped
    /// by their second segment: the first segment is a coarse filter, the
    /// second is the display category. The orientation split on the index
    /// page depends on this asymmetry.
    pub fn get_cached(&self, prefix: Option<&str>) -> Option<ImagesByGroup> {
        let snapshot = self.snapshot()?;
        let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
            return Some(snapshot.data.clone());
        };

        let mut result = ImagesByGroup::new();
        for items in snapshot.data.values() {
            for item in items {
                if !item.pathname.starts_with(prefix) {
                    continue;
                }
                result
                    .entry(display_category(&item.pathname).to_string())
                    .or_default()
                    .push(item.clone());
            }
        }
        Some(result)
    }

    /// Stop the refresh task. Idempotent; safe to call without one running.
    pub fn shutdown(&self) {
        let task = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    async fn build_and_publish(&self) -> StoreResult<Arc<CacheSnapshot>> {
        let objects = self.inner.store.list_objects(None).await?;
        let files: Vec<_> = objects
            .into_iter()
            .filter(|object| !object.key.ends_with('/'))
            .collect();

        // Resolve every URL before anything becomes visible; a partially
        // resolved listing is never published.
        let resolved = join_all(files.iter().map(|object| {
            let resolver = self.inner.resolver.clone();
            async move { resolver.resolve(&object.key).await }
        }))
        .await;

        let mut data = ImagesByGroup::new();
        for (object, resolved) in files.into_iter().zip(resolved) {
            let url = resolved?.into_url();
            data.entry(first_segment(&object.key).to_string())
                .or_default()
                .push(ImageItem {
                    pathname: object.key,
                    url,
                });
        }

        let snapshot = Arc::new(CacheSnapshot {
            built_at: Utc::now(),
            data,
        });
        *self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot.clone());
        info!(groups = snapshot.data.len(), "gallery listing cache rebuilt");

        self.ensure_refresh_task();
        let _ = self.inner.rearm_tx.send(());
        Ok(snapshot)
    }

    fn refresh_delay(&self) -> Duration {
        self.inner
            .url_lifetime
            .saturating_sub(REFRESH_BEFORE_EXPIRY)
            .max(MIN_REFRESH_DELAY)
    }

    fn ensure_refresh_task(&self) {
        let mut slot = self
            .inner
            .refresh_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return;
        }
        let delay = self.refresh_delay();
        let weak = Arc::downgrade(&self.inner);
        let rearm = self.inner.rearm_rx.clone();
        *slot = Some(tokio::spawn(refresh_loop(weak, rearm, delay)));
    }
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        let task = self
            .refresh_task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Timer loop owning no strong reference to the cache: it upgrades only for
/// the duration of a rebuild, so dropping the cache ends the loop.
async fn refresh_loop(
    weak: Weak<CacheInner>,
    mut rearm: watch::Receiver<()>,
    delay: Duration,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                let Some(inner) = weak.upgrade() else { return };
                let cache = ListingCache { inner };
                if let Err(err) = cache.refresh_now().await {
                    error!(error = %err, "scheduled gallery cache refresh failed; keeping stale snapshot");
                    drop(cache);
                    // Not retried on a timer: the countdown stays disarmed
                    // until some other build succeeds.
                    if rearm.changed().await.is_err() {
                        return;
                    }
                }
            }
            result = rearm.changed() => {
                if result.is_err() {
                    return;
                }
                // Snapshot rebuilt elsewhere; restart the countdown.
            }
        }
    }
}
