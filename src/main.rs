use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use swapi_gateway::{
    AppState,
    cache::{CacheBackend, MemoryBackend, RedisBackend},
    config::{CacheBackendKind, Config},
    routes,
    upstream::HttpUpstream,
};
#[cfg(debug_assertions)]
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 加载配置（同时读取 .env）
    let config = Config::from_env().expect("Failed to load configuration");

    // 初始化日志：RUST_LOG 优先，其次 LOG_LEVEL
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .or_else(|_| std::env::var("LOG_LEVEL"))
                .map(|level| level.to_lowercase())
                .unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置缓存后端
    let cache_backend: Arc<dyn CacheBackend> = match config.cache_backend {
        CacheBackendKind::Redis => Arc::new(
            RedisBackend::new(&config.redis_url).expect("Failed to create Redis client"),
        ),
        CacheBackendKind::Memory => {
            tracing::warn!("Using in-process cache backend");
            Arc::new(MemoryBackend::new())
        }
    };

    let upstream = HttpUpstream::new(config.upstream_url.clone(), config.upstream_timeout())
        .expect("Failed to build upstream HTTP client");

    let state = AppState::new(config, cache_backend, Arc::new(upstream));

    if !state.cache.connection_healthy().await {
        tracing::warn!("Cache backend is not reachable yet; requests will fail until it is");
    }

    // 定期清理过期的限流窗口
    state.limiter.clone().spawn_sweeper();
    tracing::info!(
        "Rate limit: {} requests per {}s per client",
        state.config.rate_limit_requests,
        state.limiter.period().as_secs()
    );

    let router = routes::create_router(state.clone());

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        // 设置开发环境的CORS，允许所有来源
        router.layer(CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
