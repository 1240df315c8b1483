//! Application lifecycle handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use tollgate_core::{ApplicationId, ApplicationStatus, CallerRole, DraftUpdate, NewApplication};

use super::errors::ApiError;
use super::identity::caller_from_headers;
use crate::server::TollgateServer;

/// POST /v1/applications
pub async fn create_draft_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Json(fields): Json<NewApplication>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let application = server.workflow.create_draft(&caller, fields).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<ApplicationStatus>,
}

/// GET /v1/applications
///
/// Applicants get their own applications; reviewers get all of them.
pub async fn list_applications_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let applications = server
        .workflow
        .list_applications(&caller, params.status)
        .await?;
    Ok(Json(applications))
}

/// GET /v1/applications/:id
///
/// Applicants may only read their own applications; reviewers may read
/// any application in the pipeline.
pub async fn get_application_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let detail = server.workflow.application_detail(ApplicationId(id)).await?;

    if matches!(caller.role, CallerRole::Applicant)
        && !detail.application.is_owned_by(&caller.user_id)
    {
        return Err(ApiError::CoreError(
            tollgate_core::CoreError::AuthorizationError(
                "not the owner of this application".to_string(),
            ),
        ));
    }

    Ok(Json(detail))
}

/// PUT /v1/applications/:id
pub async fn update_draft_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(update): Json<DraftUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let application = server
        .workflow
        .update_draft(&caller, ApplicationId(id), update)
        .await?;
    Ok(Json(application))
}

/// DELETE /v1/applications/:id
pub async fn delete_draft_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    server.workflow.delete_draft(&caller, ApplicationId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/applications/:id/submit
pub async fn submit_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let application = server.workflow.submit(&caller, ApplicationId(id)).await?;
    Ok(Json(application))
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// POST /v1/applications/:id/cancel
pub async fn cancel_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    let application = server
        .workflow
        .cancel(&caller, ApplicationId(id), request.reason)
        .await?;
    Ok(Json(application))
}
