//! The `/2pc` leaf of the MetaService HTTP surface. Merged into
//! `kvs_router::http::router`'s `Router` by the hosting binary.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_derive::{Deserialize, Serialize};

use crate::coordinator::TwoPhaseCommitCoordinator;
use crate::error::CoordinatorError;

pub fn router(coordinator: Arc<TwoPhaseCommitCoordinator>) -> Router {
    Router::new().route("/2pc", post(post_2pc)).with_state(coordinator)
}

impl IntoResponse for CoordinatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoordinatorError::Routing(kvs_router::RouterError::NoShard) => StatusCode::NOT_FOUND,
            CoordinatorError::Routing(kvs_router::RouterError::UnknownShard(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(TwoPcResponse { success: false, message: Some(self.to_string()) })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct WriteEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct TwoPcRequest {
    pub writes: Vec<WriteEntry>,
}

#[derive(Debug, Serialize)]
pub struct TwoPcResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

async fn post_2pc(
    State(coordinator): State<Arc<TwoPhaseCommitCoordinator>>,
    Json(req): Json<TwoPcRequest>,
) -> Result<Json<TwoPcResponse>, CoordinatorError> {
    let writes = req.writes.into_iter().map(|w| (w.key.into_bytes(), w.value.into_bytes())).collect();
    coordinator.commit(writes).await?;
    Ok(Json(TwoPcResponse { success: true, message: None }))
}
