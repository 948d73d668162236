use axum::{
    Router,
    routing::{get, post},
};

use tower::ServiceBuilder;

use crate::{AppState, middleware::log_errors};

pub mod resource;

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(resource::batch_request))
        .route(
            "/{resource_type}/{resource_id}",
            get(resource::get_resource),
        )
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(log_errors)))
        .with_state(state)
}
