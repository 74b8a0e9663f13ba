//! Infrastructure services

mod chat_session;
mod query_cache_service;

pub use chat_session::ChatSession;
pub use query_cache_service::QueryCacheService;
