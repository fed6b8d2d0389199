//! Same-process mirror of the gallery index response.
//!
//! When the index view fetches the grouped listing, the result is mirrored
//! here so a category view in the same session can skip the network. This
//! is a best-effort shortcut: no eviction, no TTL, no persistence, and its
//! absence must never break a category view.

use crate::models::image::{ImageItem, ImagesByGroup};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct GroupStore {
    groups: RwLock<Option<ImagesByGroup>>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirrored groups wholesale. No merge.
    pub fn set_groups(&self, groups: ImagesByGroup) {
        *self.write() = Some(groups);
    }

    /// The full mirrored grouping, if an index response was ever mirrored.
    pub fn groups(&self) -> Option<ImagesByGroup> {
        self.read().clone()
    }

    /// Items for one category. `None` when the mirror was never populated or
    /// the category is unknown; a missing category is absent, not empty.
    pub fn get_group(&self, name: &str) -> Option<Vec<ImageItem>> {
        self.read().as_ref()?.get(name).cloned()
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<ImagesByGroup>> {
        self.groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<ImagesByGroup>> {
        self.groups
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pathname: &str) -> ImageItem {
        ImageItem {
            pathname: pathname.into(),
            url: format!("https://example.com/{}", pathname),
        }
    }

    #[test]
    fn set_then_get_returns_the_same_sequence() {
        let store = GroupStore::new();
        let mut groups = ImagesByGroup::new();
        groups.insert(
            "weddings".into(),
            vec![item("landscape/weddings/a.jpg"), item("landscape/weddings/b.jpg")],
        );

        store.set_groups(groups.clone());
        assert_eq!(store.get_group("weddings"), Some(groups["weddings"].clone()));
    }

    #[test]
    fn never_set_category_is_absent_not_empty() {
        let store = GroupStore::new();
        assert_eq!(store.get_group("portraits"), None);

        store.set_groups(ImagesByGroup::new());
        // Populated mirror, unknown category: still absent.
        assert_eq!(store.get_group("portraits"), None);
    }

    #[test]
    fn set_groups_replaces_wholesale() {
        let store = GroupStore::new();
        let mut first = ImagesByGroup::new();
        first.insert("a".into(), vec![item("a/x.jpg")]);
        store.set_groups(first);

        let mut second = ImagesByGroup::new();
        second.insert("b".into(), vec![item("b/y.jpg")]);
        store.set_groups(second);

        assert_eq!(store.get_group("a"), None);
        assert!(store.get_group("b").is_some());
    }

    #[test]
    fn clear_forgets_everything() {
        let store = GroupStore::new();
        let mut groups = ImagesByGroup::new();
        groups.insert("a".into(), vec![item("a/x.jpg")]);
        store.set_groups(groups);

        store.clear();
        assert_eq!(store.groups(), None);
    }
}
