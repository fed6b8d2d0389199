//! Listing and gallery types derived from the object store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group name used when a key has no usable path segment.
pub const ROOT_GROUP: &str = "root";

/// One object as reported by the storage listing.
///
/// Read-only: the gallery never writes objects, so this struct only carries
/// what the store tells us about each key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageObject {
    /// Slash-delimited key within the bucket, `{orientation}/{category}/{file}`.
    pub key: String,

    /// Last-modified timestamp, when the listing included one.
    pub last_modified: Option<DateTime<Utc>>,

    /// Size in bytes.
    pub size: i64,
}

/// A single displayable image: its storage key plus a time-limited (or
/// public fallback) URL. Recomputed on every cache rebuild, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    pub pathname: String,
    pub url: String,
}

/// Category name to ordered images. Per-group order follows storage listing
/// order; a `BTreeMap` keeps the JSON output stable across rebuilds.
pub type ImagesByGroup = BTreeMap<String, Vec<ImageItem>>;

/// One fully-built view of the bucket.
///
/// There is at most one snapshot at a time and it is replaced wholesale on
/// refresh, so readers either see no snapshot yet or a complete one.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub built_at: DateTime<Utc>,
    pub data: ImagesByGroup,
}

/// First path segment of a key, used as the coarse grouping key when
/// listing without a prefix.
pub fn first_segment(key: &str) -> &str {
    key.split('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(ROOT_GROUP)
}

/// Display category for a key under a coarse prefix: the second path
/// segment, falling back to the first, then to the root sentinel.
pub fn display_category(key: &str) -> &str {
    let mut parts = key.split('/');
    let first = parts.next().filter(|s| !s.is_empty());
    let second = parts.next().filter(|s| !s.is_empty());
    second.or(first).unwrap_or(ROOT_GROUP)
}
