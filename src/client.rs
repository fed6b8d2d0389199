//! Consumer-side gallery client.
//!
//! Counterpart of the index and category views: fetches the grouped listing
//! once and mirrors it in a [`GroupStore`] so category lookups within the
//! same session skip the network. On direct navigation (mirror empty) it
//! falls back to fetching the full listing and filtering by pathname.

use crate::models::image::{ImageItem, ImagesByGroup};
use crate::services::group_store::GroupStore;
use anyhow::{Context, Result};

pub struct GalleryClient {
    http: reqwest::Client,
    base_url: String,
    mirror: GroupStore,
}

impl GalleryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            mirror: GroupStore::new(),
        }
    }

    pub fn mirror(&self) -> &GroupStore {
        &self.mirror
    }

    /// Fetch the grouped listing for the index view and mirror it so
    /// category views can skip a second round trip.
    pub async fn gallery_index(&self, orientation: Option<&str>) -> Result<ImagesByGroup> {
        let groups = self.fetch_listing(orientation).await?;
        self.mirror.set_groups(groups.clone());
        Ok(groups)
    }

    /// Images for one category.
    ///
    /// Served from the mirror when the index view already populated it.
    /// Otherwise fetches the full listing and filters for items whose
    /// pathname contains `/{folder}/`; an unknown category yields an empty
    /// list, never an error.
    pub async fn category(&self, folder: &str) -> Result<Vec<ImageItem>> {
        if let Some(items) = self.mirror.get_group(folder) {
            return Ok(items);
        }

        let groups = self.fetch_listing(None).await?;
        let marker = format!("/{}/", folder);
        for items in groups.values() {
            if items
                .first()
                .is_some_and(|item| item.pathname.contains(&marker))
            {
                return Ok(items
                    .iter()
                    .filter(|item| item.pathname.contains(&marker))
                    .cloned()
                    .collect());
            }
        }
        Ok(Vec::new())
    }

    async fn fetch_listing(&self, orientation: Option<&str>) -> Result<ImagesByGroup> {
        let mut url = format!("{}/api/list-images", self.base_url);
        if let Some(orientation) = orientation {
            url.push_str("?orientation=");
            url.push_str(&urlencoding::encode(orientation));
        }

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("requesting image listing")?
            .error_for_status()
            .context("image listing request rejected")?;

        response.json().await.context("decoding image listing")
    }
}
