//! Connection request endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::persistence::{ConnectionStatus, Persistence};
use crate::service::context::AppState;
use crate::service::converters::{convert_connection, ConnectionResponse};
use crate::service::error::ApiError;
use crate::service::extractors::{ApiJson, ApiPath, ApiQuery, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub requester_profile_id: i64,
    pub target_profile_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DecideConnectionRequest {
    pub status: ConnectionStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListConnectionsQuery {
    pub profile_id: Option<i64>,
}

/// `user1` and `user2` are profile ids.
#[derive(Debug, Deserialize)]
pub struct MutualQuery {
    pub user1: Option<i64>,
    pub user2: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionEnvelope {
    pub connection: ConnectionResponse,
}

#[derive(Debug, Serialize)]
pub struct ConnectionListResponse {
    pub connections: Vec<ConnectionResponse>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct MutualResponse {
    pub user1: i64,
    pub user2: i64,
    pub is_mutual: bool,
}

pub async fn create_connection<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiJson(req): ApiJson<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<ConnectionEnvelope>), ApiError> {
    tracing::info!(
        from = req.requester_profile_id,
        to = req.target_profile_id,
        "HTTP create_connection"
    );
    let connection = state
        .connections
        .request(
            caller.user_id,
            req.requester_profile_id,
            req.target_profile_id,
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ConnectionEnvelope {
            connection: convert_connection(connection),
        }),
    ))
}

pub async fn list_connections<D: Persistence>(
    State(state): State<AppState<D>>,
    _caller: AuthUser,
    ApiQuery(query): ApiQuery<ListConnectionsQuery>,
) -> Result<Json<ConnectionListResponse>, ApiError> {
    let profile_id = query
        .profile_id
        .ok_or_else(|| ApiError::validation("profile_id is required"))?;
    tracing::info!(profile_id, "HTTP list_connections");

    let connections: Vec<ConnectionResponse> = state
        .connections
        .list(profile_id)
        .await?
        .into_iter()
        .map(convert_connection)
        .collect();
    Ok(Json(ConnectionListResponse {
        total: connections.len(),
        connections,
    }))
}

pub async fn get_connection<D: Persistence>(
    State(state): State<AppState<D>>,
    _caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ConnectionEnvelope>, ApiError> {
    tracing::info!(connection_id = id, "HTTP get_connection");
    let connection = state.connections.get(id).await?;
    Ok(Json(ConnectionEnvelope {
        connection: convert_connection(connection),
    }))
}

pub async fn decide_connection<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<DecideConnectionRequest>,
) -> Result<Json<ConnectionEnvelope>, ApiError> {
    tracing::info!(connection_id = id, status = %req.status, "HTTP decide_connection");
    let connection = state
        .connections
        .decide(caller.user_id, id, req.status)
        .await?;
    Ok(Json(ConnectionEnvelope {
        connection: convert_connection(connection),
    }))
}

pub async fn delete_connection<D: Persistence>(
    State(state): State<AppState<D>>,
    caller: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!(connection_id = id, "HTTP delete_connection");
    state.connections.delete(caller.user_id, id).await?;
    Ok(Json(json!({ "result": "success" })))
}

pub async fn mutual<D: Persistence>(
    State(state): State<AppState<D>>,
    _caller: AuthUser,
    ApiQuery(query): ApiQuery<MutualQuery>,
) -> Result<Json<MutualResponse>, ApiError> {
    tracing::info!(user1 = ?query.user1, user2 = ?query.user2, "HTTP mutual");
    let is_mutual = state.connections.is_mutual(query.user1, query.user2).await?;
    Ok(Json(MutualResponse {
        user1: query.user1.unwrap_or_default(),
        user2: query.user2.unwrap_or_default(),
        is_mutual,
    }))
}
