//! Health check endpoint for the Tollgate Server

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::server::TollgateServer;

/// Health check handler
pub async fn health_check(State(_server): State<Arc<TollgateServer>>) -> impl IntoResponse {
    Json(json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
