//! Review pipeline handlers: the reviewer queue and stage decisions

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use tollgate_core::{
    ApplicationStatus, CallerRole, CoreError, DecisionRequest, QueueSortBy, ReviewQueueQuery,
    ReviewStageId, ReviewerRole,
};

use super::errors::ApiError;
use super::identity::caller_from_headers;
use crate::server::TollgateServer;

/// POST /v1/review-stages/:id/decide
pub async fn decide_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let outcome = server
        .workflow
        .decide(&caller, ReviewStageId(id), request)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueParams {
    pub role: Option<ReviewerRole>,
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: QueueSortBy,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /v1/review-queue
///
/// The queue is scoped to the stages the caller's role may decide;
/// applicants have no queue. Admins may pass `role=` to inspect another
/// role's queue.
pub async fn review_queue_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Query(params): Query<ReviewQueueParams>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let role = match caller.role {
        CallerRole::Reviewer(ReviewerRole::Admin) => {
            params.role.unwrap_or(ReviewerRole::Admin)
        }
        CallerRole::Reviewer(role) => role,
        CallerRole::Applicant => {
            return Err(ApiError::CoreError(CoreError::AuthorizationError(
                "the review queue is reviewer-only".to_string(),
            )))
        }
    };

    let query = ReviewQueueQuery {
        role: Some(role),
        status: params.status,
        search: params.search,
        sort_by: params.sort_by,
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(0),
    };

    let today = chrono::Utc::now().date_naive();
    let page = server.review_queue.list(&query, today).await?;
    Ok(Json(page))
}
