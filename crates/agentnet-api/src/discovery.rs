//! Routes of the discovery service.

use crate::error::ApiResult;
use agentnet_registry::DiscoveryService;
use agentnet_types::agent::{AgentFilter, AgentList, AgentRecord, AgentRegistration, AgentStatus};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// Query string of `GET /agents`.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub kind: Option<String>,
    pub capability: Option<String>,
    #[serde(default)]
    pub include_stale: bool,
}

impl ListParams {
    fn into_filter(self) -> AgentFilter {
        let statuses: &[AgentStatus] = if self.include_stale {
            &[AgentStatus::Active, AgentStatus::Stale]
        } else {
            &[AgentStatus::Active]
        };
        AgentFilter {
            kind: self.kind,
            capability: self.capability,
            statuses: statuses.to_vec(),
        }
    }
}

/// Router exposing a [`DiscoveryService`].
pub fn discovery_router(service: DiscoveryService) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/unregister/{id}", delete(unregister))
        .route("/heartbeat/{id}", put(heartbeat))
        .route("/agents", get(list_agents))
        .route("/agent/{id}", get(get_agent))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn register(
    State(service): State<DiscoveryService>,
    payload: Result<Json<AgentRegistration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AgentRecord>)> {
    let Json(registration) = payload?;
    let record = service.register(registration)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn unregister(State(service): State<DiscoveryService>, Path(id): Path<String>) -> StatusCode {
    service.unregister(&id);
    StatusCode::NO_CONTENT
}

async fn heartbeat(
    State(service): State<DiscoveryService>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    service.heartbeat(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_agents(
    State(service): State<DiscoveryService>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<AgentList>> {
    let Query(params) = params?;
    let agents = service.list(&params.into_filter());
    Ok(Json(AgentList { agents }))
}

async fn get_agent(
    State(service): State<DiscoveryService>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentRecord>> {
    Ok(Json(service.get(&id)?))
}

async fn health(State(service): State<DiscoveryService>) -> Json<Value> {
    let stats = service.stats();
    Json(json!({
        "status": "ok",
        "active": stats.active,
        "stale": stats.stale,
    }))
}
