//! Backend for a photography studio gallery: lists bucket contents grouped
//! by top-level folder, resolves a presigned (or public fallback) URL per
//! image, and serves the result from a process-wide cache over HTTP.

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
