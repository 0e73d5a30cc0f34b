//! HTTP request handlers.

pub mod health;
pub mod ingest;
pub mod jobs;
pub mod search;
pub mod videos;

pub use health::{health, ready};
