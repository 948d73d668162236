use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::routes::resource::model::ResourceType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UpstreamError {
    /// 传输层失败：DNS、连接拒绝、超时
    #[error("Server not found")]
    Unreachable,
    /// 上游返回了非成功状态码，detail 为其 JSON 错误体或原始文本
    #[error("upstream responded with {status}")]
    Status { status: StatusCode, detail: Value },
}

/// 上游资源获取
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, resource_type: ResourceType, resource_id: u64)
    -> Result<Value, UpstreamError>;
}

#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn resource_uri(&self, resource_type: ResourceType, resource_id: u64) -> String {
        format!("{}/{}/{}", self.base_url, resource_type, resource_id)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Result<Value, UpstreamError> {
        let uri = self.resource_uri(resource_type, resource_id);
        debug!("Making request to {}", uri);

        let response = self.client.get(&uri).send().await.map_err(|e| {
            error!("Request exception occurred for request to {}: {}", uri, e);
            UpstreamError::Unreachable
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read response body from {}: {}", uri, e);
            UpstreamError::Unreachable
        })?;

        if !status.is_success() {
            error!("HTTP error {} occurred for request to {}", status, uri);
            let detail = serde_json::from_str(&body).unwrap_or(Value::String(body));
            return Err(UpstreamError::Status { status, detail });
        }

        let document = serde_json::from_str(&body).map_err(|e| {
            error!("Upstream returned a non-JSON body for {}: {}", uri, e);
            UpstreamError::Unreachable
        })?;
        info!("Request to {} successful", uri);
        Ok(document)
    }
}
