//! The `peers`/`shards`/`route` slice of the MetaService HTTP surface.
//! `/2pc` is mounted separately by `kvs-coordinator` and merged into this
//! router by the hosting binary, keeping this crate free of a dependency on
//! the coordinator.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_derive::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::metastore::MetaStore;
use crate::types::{Peer, Shard};

pub fn router(store: Arc<MetaStore>) -> Router {
    Router::new()
        .route("/peers", get(get_peers).post(post_peers))
        .route("/shards", get(get_shards).post(post_shards))
        .route("/shards/split", post(post_split))
        .route("/route", get(get_route))
        .with_state(store)
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = match self {
            RouterError::NoShard => StatusCode::NOT_FOUND,
            RouterError::UnknownShard(_) => StatusCode::NOT_FOUND,
            RouterError::InvalidSplit(_) => StatusCode::BAD_REQUEST,
            RouterError::Io(_) | RouterError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

async fn get_peers(State(store): State<Arc<MetaStore>>) -> Json<Vec<Peer>> {
    Json(store.list_peers())
}

async fn post_peers(
    State(store): State<Arc<MetaStore>>,
    Json(peers): Json<Vec<Peer>>,
) -> Result<StatusCode, RouterError> {
    store.save_peers(peers)?;
    Ok(StatusCode::OK)
}

async fn get_shards(State(store): State<Arc<MetaStore>>) -> Result<Json<Vec<Shard>>, RouterError> {
    Ok(Json(store.list_shards()?))
}

async fn post_shards(
    State(store): State<Arc<MetaStore>>,
    Json(shards): Json<Vec<Shard>>,
) -> Result<StatusCode, RouterError> {
    store.save_shards(shards)?;
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct SplitRequest {
    pub id: String,
    pub split_key: String,
}

async fn post_split(
    State(store): State<Arc<MetaStore>>,
    Json(req): Json<SplitRequest>,
) -> Result<Json<Vec<Shard>>, RouterError> {
    Ok(Json(store.split(&req.id, &req.split_key)?))
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub shard_id: String,
    pub nodes: Vec<String>,
}

async fn get_route(
    State(store): State<Arc<MetaStore>>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, RouterError> {
    let shard = store.route(&query.key)?;
    Ok(Json(RouteResponse { shard_id: shard.id, nodes: shard.nodes }))
}
