//! 路由级测试共用的夹具

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::connect_info::MockConnectInfo,
    http::{Method, Request, StatusCode, header},
};
use serde_json::Value;
use swapi_gateway::{
    AppState,
    cache::MemoryBackend,
    config::Config,
    routes::{create_router, resource::model::ResourceType},
    upstream::{Upstream, UpstreamError},
};
use tower::ServiceExt;

/// 按预设表应答并统计调用次数的上游
#[derive(Default)]
pub struct ScriptedUpstream {
    responses: Mutex<HashMap<String, Result<Value, UpstreamError>>>,
    calls: AtomicUsize,
}

impl ScriptedUpstream {
    pub fn respond(&self, path: &str, response: Result<Value, UpstreamError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn fetch(
        &self,
        resource_type: ResourceType,
        resource_id: u64,
    ) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(&format!("{}/{}", resource_type, resource_id))
            .cloned()
            .unwrap_or(Err(UpstreamError::Unreachable))
    }
}

pub struct TestApp {
    pub router: Router,
    pub cache: MemoryBackend,
    pub upstream: Arc<ScriptedUpstream>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let cache = MemoryBackend::new();
        let upstream = Arc::new(ScriptedUpstream::default());
        let state = AppState::new(config, Arc::new(cache.clone()), upstream.clone());
        let router = create_router(state)
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 1], 54321))));
        Self {
            router,
            cache,
            upstream,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_as(&self, uri: &str, forwarded_for: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .uri(uri)
                .header("x-forwarded-for", forwarded_for)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}
