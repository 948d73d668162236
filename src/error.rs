use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheError;
use crate::upstream::UpstreamError;

pub const SERVER_ERROR_DETAIL: &str = "Error in Server Side";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("cache backend unavailable: {0}")]
    CacheUnavailable(CacheError),
    #[error("cache write failed: {0}")]
    CacheWrite(CacheError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("Invalid endpoint format")]
    MalformedBatchItem,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: Value,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidParameter(_) | GatewayError::MalformedBatchItem => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::CacheUnavailable(_) | GatewayError::CacheWrite(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::Upstream(UpstreamError::Unreachable) => StatusCode::NOT_FOUND,
            GatewayError::Upstream(UpstreamError::Status { status, .. }) => *status,
        }
    }

    /// 返回给客户端的 detail；上游错误体原样转发
    pub fn detail(&self) -> Value {
        match self {
            GatewayError::CacheUnavailable(_) | GatewayError::CacheWrite(_) => {
                Value::String(SERVER_ERROR_DETAIL.to_string())
            }
            GatewayError::Upstream(UpstreamError::Status { detail, .. }) => detail.clone(),
            other => Value::String(other.to_string()),
        }
    }

    /// 批量条目中的错误文本
    pub fn message(&self) -> String {
        match self.detail() {
            Value::String(text) => text,
            other => other.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            detail: self.detail(),
        });

        (self.status(), body).into_response()
    }
}
