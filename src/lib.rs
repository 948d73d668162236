use std::sync::Arc;

use cache::{CacheBackend, CachePool};
use config::Config;
use middleware::SlidingWindowLimiter;
use upstream::Upstream;

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod operations;
pub mod routes;
pub mod upstream;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub cache: CachePool,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(
        config: Config,
        cache_backend: Arc<dyn CacheBackend>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            limiter: Arc::new(SlidingWindowLimiter::from_config(&config)),
            config: Arc::new(config),
            cache: CachePool::new(cache_backend),
            upstream,
        }
    }
}
