pub mod classify;
pub mod engine;
pub mod fetcher;
pub mod proxy_pool;
