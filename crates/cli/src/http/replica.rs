//! The backend replica process: identifies itself on `/home`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Clone)]
struct ReplicaState {
    id: String,
}

#[derive(Debug, Serialize)]
struct HomeResponse {
    message: String,
    status: &'static str,
}

pub fn replica_router(id: impl Into<String>) -> Router {
    Router::new()
        .route("/home", get(home))
        .route("/heartbeat", get(heartbeat))
        .with_state(ReplicaState { id: id.into() })
}

async fn home(State(state): State<ReplicaState>) -> Json<HomeResponse> {
    Json(HomeResponse {
        message: format!("Hello from Server: {}", state.id),
        status: "successful",
    })
}

async fn heartbeat() -> Json<Value> {
    Json(json!({}))
}
