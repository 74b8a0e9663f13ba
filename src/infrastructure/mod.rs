//! Infrastructure layer - Store implementations, embedding adapters and services

pub mod embedding;
pub mod logging;
pub mod metrics;
pub mod query_cache;
pub mod services;
