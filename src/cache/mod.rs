// 缓存模块
// 进程持有一个 CachePool，每个请求（或整个批量请求）从中取出一个 CacheSession

pub mod keys;
pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

pub use keys::resource_key;
pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache backend unavailable")]
    Unavailable,
    #[error("cache session already closed")]
    Closed,
}

/// 缓存后端：负责建立（或复用）连接
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>, CacheError>;
}

/// 单个已建立的缓存连接，只处理原始字符串
#[async_trait]
pub trait CacheConnection: Send {
    async fn ping(&mut self) -> Result<(), CacheError>;

    async fn get_raw(&mut self, key: &str) -> Result<Option<String>, CacheError>;

    /// 覆盖写入并设置过期时间
    async fn set_raw(&mut self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

#[derive(Clone)]
pub struct CachePool {
    backend: Arc<dyn CacheBackend>,
}

impl CachePool {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// 取出一个会话；连接失败或 PING 失败都视为后端不可用
    pub async fn acquire(&self) -> Result<CacheSession, CacheError> {
        let mut conn = self.backend.connect().await?;
        conn.ping().await?;
        Ok(CacheSession { conn: Some(conn) })
    }

    pub async fn connection_healthy(&self) -> bool {
        match self.acquire().await {
            Ok(mut session) => {
                session.close();
                true
            }
            Err(e) => {
                warn!("Cache health probe failed: {}", e);
                false
            }
        }
    }
}

/// 一次请求范围内的缓存会话
///
/// 读失败（后端错误或数据损坏）按未命中处理；写失败原样返回给调用方。
pub struct CacheSession {
    conn: Option<Box<dyn CacheConnection>>,
}

impl CacheSession {
    pub async fn get(&mut self, key: &str) -> Option<Value> {
        let conn = self.conn.as_mut()?;
        let raw = match conn.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to get {} from cache: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set(&mut self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        let conn = self.conn.as_mut().ok_or(CacheError::Closed)?;
        let raw = serde_json::to_string(value)?;
        conn.set_raw(key, raw, ttl).await?;
        debug!("Cached {} for {}s", key, ttl.as_secs());
        Ok(())
    }

    /// 释放连接；可重复调用
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!("Cache session released");
        }
    }
}
