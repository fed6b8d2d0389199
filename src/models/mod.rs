//! Core data models for the gallery API.
//!
//! These entities mirror what the object store reports (`StorageObject`) and
//! what the gallery derives from it (`ImageItem`, `ImagesByGroup`,
//! `CacheSnapshot`). Everything here serializes naturally as JSON via `serde`.

pub mod image;
pub mod studio;

pub use image::{CacheSnapshot, ImageItem, ImagesByGroup, StorageObject};
pub use studio::StudioInfo;
