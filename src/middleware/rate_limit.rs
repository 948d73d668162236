use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use dashmap::DashMap;
use tokio::{task::JoinHandle, time::Instant};
use tracing::debug;

use crate::{AppState, config::Config};

/// 按客户端标识的滑动窗口限流器
///
/// 每个标识保存窗口内被放行请求的时间戳。映射按分片加锁，
/// 不同客户端之间基本不会互相阻塞。
pub struct SlidingWindowLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    period: Duration,
    max_clients: usize,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, period: Duration, max_clients: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            period,
            max_clients,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.rate_limit_requests,
            config.rate_limit_window(),
            config.rate_limit_max_clients,
        )
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 判断该标识的新请求是否放行；放行时记录本次时间戳
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();

        // 新客户端且已达容量上限时，先清理窗口已空的客户端
        if !self.windows.contains_key(identity) && self.windows.len() >= self.max_clients {
            let purged = self.purge_stale_at(now);
            debug!("Limiter at capacity, purged {} stale clients", purged);
        }

        let mut window = self.windows.entry(identity.to_string()).or_default();
        prune(&mut window, now, self.period);

        if window.len() < self.max_requests {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// 移除所有时间戳均已过期的客户端，返回移除数量
    pub fn purge_stale(&self) -> usize {
        self.purge_stale_at(Instant::now())
    }

    fn purge_stale_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            prune(window, now, self.period);
            !window.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// 每个窗口周期清理一次过期客户端
    pub fn spawn_sweeper(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period.max(Duration::from_secs(1)));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = self.purge_stale();
                if purged > 0 {
                    debug!(
                        "Purged {} stale clients, {} still tracked",
                        purged,
                        self.tracked_clients()
                    );
                }
            }
        })
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, period: Duration) {
    while let Some(oldest) = window.front() {
        if now.duration_since(*oldest) >= period {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// 限流使用的客户端标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl FromRequestParts<AppState> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let remote_ip = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // 仅在部署于可信代理之后时才采信转发头
        let forwarded = if state.config.trust_proxy_headers {
            parts
                .headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .or_else(|| {
                    parts
                        .headers
                        .get("x-forwarded-for")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
                })
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
        } else {
            None
        };

        let identity = forwarded
            .or(remote_ip)
            .unwrap_or_else(|| "unknown".to_string());
        debug!("client identity: {}", identity);
        Ok(ClientIdentity(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(5, Duration::from_secs(60), 100)
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_is_allowed() {
        assert!(limiter().allow("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn allows_up_to_limit_then_denies() {
        let limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("user1"));
        }
        assert!(!limiter.allow("user1"));
        assert!(!limiter.allow("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn identities_are_independent() {
        let limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("user1"));
        }
        assert!(!limiter.allow("user1"));
        assert!(limiter.allow("user2"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides_with_time() {
        let limiter = limiter();
        for _ in 0..3 {
            assert!(limiter.allow("user1"));
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..2 {
            assert!(limiter.allow("user1"));
        }
        assert!(!limiter.allow("user1"));

        // 前三个时间戳过期，释放三个名额
        tokio::time::advance(Duration::from_secs(30)).await;
        for _ in 0..3 {
            assert!(limiter.allow("user1"));
        }
        assert!(!limiter.allow("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn denial_does_not_extend_window() {
        let limiter = limiter();
        for _ in 0..5 {
            assert!(limiter.allow("user1"));
        }
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.allow("user1"));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.allow("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_limit_denies_everything() {
        let limiter = SlidingWindowLimiter::new(0, Duration::from_secs(60), 100);
        assert!(!limiter.allow("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_removes_only_stale_clients() {
        let limiter = limiter();
        limiter.allow("old");
        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.allow("recent");
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(limiter.purge_stale(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_triggers_purge_for_new_clients() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60), 2);
        limiter.allow("a");
        limiter.allow("b");
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(limiter.allow("c"));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_is_soft_when_nothing_is_stale() {
        let limiter = SlidingWindowLimiter::new(5, Duration::from_secs(60), 2);
        limiter.allow("a");
        limiter.allow("b");

        assert!(limiter.allow("c"));
        assert_eq!(limiter.tracked_clients(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_periodically() {
        let limiter = Arc::new(SlidingWindowLimiter::new(5, Duration::from_secs(60), 100));
        limiter.allow("user1");
        let handle = limiter.clone().spawn_sweeper();

        tokio::time::sleep(Duration::from_secs(121)).await;

        assert_eq!(limiter.tracked_clients(), 0);
        handle.abort();
    }
}
