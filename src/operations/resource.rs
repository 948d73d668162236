//! 单资源与批量请求的缓存旁路流程
//!
//! 单个请求：校验类型 -> 缓存健康检查 -> 限流 -> 查缓存 -> 未命中时请求上游并回写缓存。
//! 批量请求共用一次缓存会话和一次限流判定，每个条目独立成败，结果按输入顺序返回。

use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    AppState,
    cache::{CacheSession, resource_key},
    error::GatewayError,
    routes::resource::model::{BatchItemResult, ResourceType},
};

pub async fn fetch_resource(
    state: &AppState,
    identity: &str,
    resource_type: &str,
    resource_id: &str,
) -> Result<Value, GatewayError> {
    let resource_type = check_resource_type(resource_type)?;
    let resource_id = check_resource_id(resource_id)?;
    let mut session = open_session(state).await?;
    admit(state, identity)?;

    let result = cache_aside(state, &mut session, resource_type, resource_id).await;
    session.close();
    result
}

pub async fn fetch_batch(
    state: &AppState,
    identity: &str,
    endpoints: &[String],
) -> Result<Vec<BatchItemResult>, GatewayError> {
    let mut session = open_session(state).await?;
    admit(state, identity)?;

    let mut results = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let item = match fetch_endpoint(state, &mut session, endpoint).await {
            Ok(response) => BatchItemResult::Success {
                endpoint: endpoint.clone(),
                response,
            },
            Err(e) => {
                error!("Error for endpoint {}: {}", endpoint, e);
                BatchItemResult::Failure {
                    endpoint: endpoint.clone(),
                    error: e.message(),
                }
            }
        };
        results.push(item);
    }

    session.close();
    info!(
        "Batch finished: {} of {} endpoints succeeded",
        results.iter().filter(|r| r.is_success()).count(),
        results.len()
    );
    Ok(results)
}

async fn fetch_endpoint(
    state: &AppState,
    session: &mut CacheSession,
    endpoint: &str,
) -> Result<Value, GatewayError> {
    let (resource_type, resource_id) = parse_endpoint(endpoint)?;
    let resource_type = check_resource_type(resource_type)?;
    let resource_id = check_resource_id(resource_id)?;
    cache_aside(state, session, resource_type, resource_id).await
}

/// 拆分 `类型/id`，必须恰好两段且均非空
pub fn parse_endpoint(endpoint: &str) -> Result<(&str, &str), GatewayError> {
    let mut segments = endpoint.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(resource_type), Some(resource_id), None)
            if !resource_type.is_empty() && !resource_id.is_empty() =>
        {
            Ok((resource_type, resource_id))
        }
        _ => Err(GatewayError::MalformedBatchItem),
    }
}

pub fn check_resource_type(raw: &str) -> Result<ResourceType, GatewayError> {
    raw.parse().map_err(|_| {
        warn!("Invalid parameter: {}", raw);
        GatewayError::InvalidParameter(raw.to_string())
    })
}

/// id 必须是非负整数；`01` 规范化为 `1`，保证缓存键唯一
pub fn check_resource_id(raw: &str) -> Result<u64, GatewayError> {
    raw.parse().map_err(|_| {
        warn!("Invalid parameter: {}", raw);
        GatewayError::InvalidParameter(raw.to_string())
    })
}

async fn open_session(state: &AppState) -> Result<CacheSession, GatewayError> {
    state.cache.acquire().await.map_err(|e| {
        error!("Failed to connect to cache backend: {}", e);
        GatewayError::CacheUnavailable(e)
    })
}

fn admit(state: &AppState, identity: &str) -> Result<(), GatewayError> {
    if state.limiter.allow(identity) {
        Ok(())
    } else {
        warn!("Rate limit exceeded for {}", identity);
        Err(GatewayError::RateLimitExceeded)
    }
}

async fn cache_aside(
    state: &AppState,
    session: &mut CacheSession,
    resource_type: ResourceType,
    resource_id: u64,
) -> Result<Value, GatewayError> {
    let key = resource_key(resource_type, resource_id);

    if let Some(cached) = session.get(&key).await {
        info!("Returning {}/{} from cache", resource_type, resource_id);
        return Ok(cached);
    }

    let response = state.upstream.fetch(resource_type, resource_id).await?;
    session
        .set(&key, &response, state.config.cache_ttl())
        .await
        .map_err(|e| {
            error!("Failed to add {} to cache: {}", key, e);
            GatewayError::CacheWrite(e)
        })?;
    Ok(response)
}
