use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::OnceCell;
use tracing::info;

use super::{CacheBackend, CacheConnection, CacheError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis 缓存后端
///
/// 全进程共享一个多路复用的 `ConnectionManager`，首次使用时建立；
/// 建立失败时下一次请求会重新尝试。
pub struct RedisBackend {
    client: redis::Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisBackend {
    pub fn new(redis_url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            manager: OnceCell::new(),
        })
    }

    async fn manager(&self) -> Result<ConnectionManager, CacheError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(1)
                    .set_connection_timeout(CONNECT_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT);
                let manager =
                    ConnectionManager::new_with_config(self.client.clone(), config).await?;
                info!("Redis connection manager established");
                Ok::<_, CacheError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>, CacheError> {
        Ok(Box::new(RedisConnection {
            conn: self.manager().await?,
        }))
    }
}

struct RedisConnection {
    conn: ConnectionManager,
}

#[async_trait]
impl CacheConnection for RedisConnection {
    async fn ping(&mut self) -> Result<(), CacheError> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn).await?;
        Ok(())
    }

    async fn get_raw(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        let value: Option<String> = self.conn.get(key).await?;
        Ok(value)
    }

    async fn set_raw(&mut self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        // SETEX 不接受 0 秒
        let _: () = self.conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }
}
