//! Issued resource handlers: license and credential lifecycle

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use tollgate_core::{Caller, CallerRole, CoreError, CredentialId, LicenseId, ReviewerRole};

use super::errors::ApiError;
use super::identity::caller_from_headers;
use crate::server::TollgateServer;

/// Lifecycle operations on issued resources are restricted to the
/// license desk and administrators.
fn require_license_manager(caller: &Caller) -> Result<(), ApiError> {
    match caller.role {
        CallerRole::Reviewer(ReviewerRole::LicenseManager)
        | CallerRole::Reviewer(ReviewerRole::Admin) => Ok(()),
        _ => Err(ApiError::CoreError(CoreError::AuthorizationError(
            "license lifecycle operations require the LICENSE_MANAGER role".to_string(),
        ))),
    }
}

/// POST /v1/licenses/:id/revoke
pub async fn revoke_license_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    require_license_manager(&caller)?;
    let license = server.provisioning.revoke_license(LicenseId(id)).await?;
    Ok(Json(license))
}

#[derive(Debug, Deserialize)]
pub struct UsageReport {
    pub amount: u64,
}

/// POST /v1/licenses/:id/usage
pub async fn record_usage_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(report): Json<UsageReport>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    require_license_manager(&caller)?;
    let license = server
        .provisioning
        .record_usage(LicenseId(id), report.amount)
        .await?;
    Ok(Json(license))
}

/// POST /v1/credentials/:id/regenerate
pub async fn regenerate_credential_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    require_license_manager(&caller)?;
    let credential = server
        .provisioning
        .regenerate_credential(CredentialId(id))
        .await?;
    Ok(Json(credential))
}

/// POST /v1/credentials/:id/revoke
pub async fn revoke_credential_handler(
    State(server): State<Arc<TollgateServer>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller_from_headers(&headers)?;
    require_license_manager(&caller)?;
    let credential = server
        .provisioning
        .revoke_credential(CredentialId(id))
        .await?;
    Ok(Json(credential))
}
