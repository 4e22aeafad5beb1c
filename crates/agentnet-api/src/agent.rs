//! Routes of an agent process.

use crate::error::ApiResult;
use agentnet_runtime::MessageRouter;
use agentnet_types::message::{Message, QueryRequest, RouteReply};
use agentnet_types::tool::{ToolDescriptor, ToolResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Router exposing a [`MessageRouter`] and its tools.
pub fn agent_router(router: Arc<MessageRouter>) -> Router {
    Router::new()
        .route("/message", post(message))
        .route("/query", post(query))
        .route("/tools", get(list_tools))
        .route("/tools/{name}", post(invoke_tool))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

async fn message(
    State(router): State<Arc<MessageRouter>>,
    payload: Result<Json<Message>, JsonRejection>,
) -> ApiResult<Json<RouteReply>> {
    let Json(message) = payload?;
    Ok(Json(router.route(message).await?))
}

/// Accepts a full query object or a bare JSON string.
async fn query(
    State(router): State<Arc<MessageRouter>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<RouteReply>> {
    let Json(body) = payload?;
    let request = QueryRequest::from_content(&body)?;
    Ok(Json(router.query(request).await?))
}

async fn list_tools(State(router): State<Arc<MessageRouter>>) -> Json<Vec<ToolDescriptor>> {
    Json(router.tools().list_tools())
}

async fn invoke_tool(
    State(router): State<Arc<MessageRouter>>,
    Path(name): Path<String>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<ToolResult>> {
    let Json(arguments) = payload?;
    Ok(Json(router.tools().invoke(&name, &arguments).await?))
}

async fn health(State(router): State<Arc<MessageRouter>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agent_id": router.agent_id(),
        "message_types": router.message_types(),
        "tools": router.tools().names(),
    }))
}
