//! Service layer: storage collaborator, listing cache, URL resolution, and
//! the shared gallery state.

pub mod gallery_service;
pub mod group_store;
pub mod listing_cache;
pub mod s3_client;
pub mod sigv4;
pub mod url_resolver;
