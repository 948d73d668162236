use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CacheBackend, CacheConnection, CacheError};

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    unavailable: AtomicBool,
    fail_writes: AtomicBool,
}

/// 进程内缓存后端，用于本地开发和测试
///
/// 过期按 tokio 时钟计算，暂停时钟的测试可以直接推进时间。
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟后端宕机/恢复
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 读取未过期的原始字符串
    pub fn raw(&self, key: &str) -> Option<String> {
        let entries = self.inner.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|(_, expires_at)| Instant::now() < *expires_at)
            .map(|(raw, _)| raw.clone())
    }

    /// 当前保存的条目数（含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.inner.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert_raw(&self, key: &str, raw: &str, ttl: Duration) {
        if let Ok(mut entries) = self.inner.entries.lock() {
            entries.insert(key.to_string(), (raw.to_string(), Instant::now() + ttl));
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn connect(&self) -> Result<Box<dyn CacheConnection>, CacheError> {
        self.inner.check_available()?;
        Ok(Box::new(MemoryConnection {
            inner: self.inner.clone(),
        }))
    }
}

impl Inner {
    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::Unavailable)
    }
}

struct MemoryConnection {
    inner: Arc<Inner>,
}

#[async_trait]
impl CacheConnection for MemoryConnection {
    async fn ping(&mut self) -> Result<(), CacheError> {
        self.inner.check_available()
    }

    async fn get_raw(&mut self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.check_available()?;
        let mut entries = self.inner.entries()?;
        let now = Instant::now();
        match entries.get(key) {
            Some((raw, expires_at)) if now < *expires_at => Ok(Some(raw.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_raw(&mut self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.inner.check_available()?;
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable);
        }
        let now = Instant::now();
        let mut entries = self.inner.entries()?;
        // 写入时顺带清理所有已过期条目，未再读取的键也不会常驻
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}
