use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 缓存后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Redis,
    Memory,
}

impl FromStr for CacheBackendKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackendKind::Redis),
            "memory" => Ok(CacheBackendKind::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_url: String,
    pub upstream_timeout_secs: u64,
    pub redis_url: String,
    pub cache_backend: CacheBackendKind,
    pub cache_ttl_secs: u64,
    pub rate_limit_requests: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_clients: usize,
    pub trust_proxy_headers: bool,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        let upstream_url = env::var("SWAPI_URL").map_err(|_| ConfigError::Missing("SWAPI_URL"))?;

        // REDIS_URL 优先，否则由 host/port/db 拼接
        let redis_url = match env::var("REDIS_URL") {
            Ok(url) => url,
            Err(_) => format!(
                "redis://{}:{}/{}",
                env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
                parse_var::<u16>("REDIS_PORT", 6379)?,
                parse_var::<u32>("REDIS_DB", 0)?,
            ),
        };

        let cache_backend = parse_var("CACHE_BACKEND", defaults.cache_backend)?;

        Ok(Config {
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            upstream_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS", defaults.upstream_timeout_secs)?,
            redis_url,
            cache_backend,
            cache_ttl_secs: parse_var("REDIS_TTL", defaults.cache_ttl_secs)?,
            rate_limit_requests: parse_var("RL_REQUEST", defaults.rate_limit_requests)?,
            rate_limit_window_secs: parse_var("RL_PERIOD", defaults.rate_limit_window_secs)?,
            rate_limit_max_clients: parse_var("RL_MAX_CLIENTS", defaults.rate_limit_max_clients)?,
            trust_proxy_headers: parse_var("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers)?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port)?,
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upstream_url: "https://swapi.dev/api".into(),
            upstream_timeout_secs: 10,
            redis_url: "redis://127.0.0.1:6379/0".into(),
            cache_backend: CacheBackendKind::Redis,
            cache_ttl_secs: 60,
            rate_limit_requests: 5,
            rate_limit_window_secs: 60,
            rate_limit_max_clients: 10_000,
            trust_proxy_headers: false,
            server_host: "0.0.0.0".into(),
            server_port: 8000,
        }
    }
}

/// 读取可选环境变量；存在但无法解析时报错而不是静默回退
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_when_unset() {
        let value: u64 = parse_var("SWAPI_GATEWAY_TEST_UNSET_VAR", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        // SAFETY: 变量名仅在本测试中使用
        unsafe { env::set_var("SWAPI_GATEWAY_TEST_BAD_NUMBER", "sixty") };
        let result = parse_var::<u64>("SWAPI_GATEWAY_TEST_BAD_NUMBER", 60);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { name: "SWAPI_GATEWAY_TEST_BAD_NUMBER", .. })
        ));
    }

    #[test]
    fn cache_backend_kind_is_case_insensitive() {
        assert_eq!("memory".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Memory));
        assert_eq!(" Redis ".parse::<CacheBackendKind>(), Ok(CacheBackendKind::Redis));
        assert_eq!("memcached".parse::<CacheBackendKind>(), Err(()));
    }

    #[test]
    fn parse_var_reads_cache_backend() {
        // SAFETY: 变量名仅在本测试中使用
        unsafe { env::set_var("SWAPI_GATEWAY_TEST_BACKEND", "MEMORY") };
        assert_eq!(
            parse_var("SWAPI_GATEWAY_TEST_BACKEND", CacheBackendKind::Redis).unwrap(),
            CacheBackendKind::Memory
        );
    }

    #[test]
    fn parse_var_reads_booleans() {
        // SAFETY: 变量名仅在本测试中使用
        unsafe { env::set_var("SWAPI_GATEWAY_TEST_FLAG", "true") };
        assert!(parse_var("SWAPI_GATEWAY_TEST_FLAG", false).unwrap());
    }
}
