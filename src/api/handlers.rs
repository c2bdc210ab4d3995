use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::status::{ClusterStatus, StatusBoard};

pub async fn get_all_status(State(board): State<Arc<StatusBoard>>) -> Json<Vec<ClusterStatus>> {
    Json(board.all())
}

pub async fn get_cluster_status(
    State(board): State<Arc<StatusBoard>>,
    Path(cluster): Path<String>,
) -> Result<Json<ClusterStatus>, (StatusCode, Json<serde_json::Value>)> {
    board.cluster(&cluster).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown cluster '{}'", cluster) })),
        )
    })
}

pub async fn get_health() -> Json<serde_json::Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
    }))
}
