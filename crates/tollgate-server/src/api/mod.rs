//! API module for the Tollgate Server
//!
//! This module contains the API routes and handlers.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod applications;
pub mod errors;
pub mod health;
pub mod identity;
pub mod licenses;
pub mod reviews;

use crate::server::TollgateServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<TollgateServer>) -> Router {
    Router::new()
        // Application lifecycle
        .route(
            "/v1/applications",
            post(applications::create_draft_handler).get(applications::list_applications_handler),
        )
        .route(
            "/v1/applications/:id",
            get(applications::get_application_handler)
                .put(applications::update_draft_handler)
                .delete(applications::delete_draft_handler),
        )
        .route(
            "/v1/applications/:id/submit",
            post(applications::submit_handler),
        )
        .route(
            "/v1/applications/:id/cancel",
            post(applications::cancel_handler),
        )
        // Review pipeline
        .route("/v1/review-queue", get(reviews::review_queue_handler))
        .route(
            "/v1/review-stages/:id/decide",
            post(reviews::decide_handler),
        )
        // Issued resources
        .route(
            "/v1/licenses/:id/revoke",
            post(licenses::revoke_license_handler),
        )
        .route(
            "/v1/licenses/:id/usage",
            post(licenses::record_usage_handler),
        )
        .route(
            "/v1/credentials/:id/regenerate",
            post(licenses::regenerate_credential_handler),
        )
        .route(
            "/v1/credentials/:id/revoke",
            post(licenses::revoke_credential_handler),
        )
        // Health check
        .route("/health", get(health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}
