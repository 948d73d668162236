use axum::extract::{Json, Path, State};
use serde_json::Value;
use tracing::info;

use crate::{
    AppState,
    error::GatewayError,
    middleware::ClientIdentity,
    operations::{fetch_batch, fetch_resource},
};

use super::model::{BatchItemResult, BatchRequest};

#[axum::debug_handler]
pub async fn get_resource(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Path((resource_type, resource_id)): Path<(String, String)>,
) -> Result<Json<Value>, GatewayError> {
    info!("Handling GET request for {}/{}", resource_type, resource_id);
    let response = fetch_resource(&state, &identity, &resource_type, &resource_id).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn batch_request(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<BatchItemResult>>, GatewayError> {
    info!("Handling batch request for {:?}", req.endpoints);
    let results = fetch_batch(&state, &identity, &req.endpoints).await?;
    Ok(Json(results))
}
