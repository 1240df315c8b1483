//! Repository traits for the Tollgate core
//!
//! This module defines the persistence interfaces the workflow engine
//! depends on. External crates implement these traits to provide concrete
//! storage; the engine never touches storage directly.

use async_trait::async_trait;

use super::application::{Application, ApplicationId, ApplicationStatus};
use super::license::{Credential, CredentialId, License, LicenseId};
use super::review_stage::{ReviewFeedback, ReviewStage, ReviewStageId, ReviewerRef, StageName};
use crate::CoreError;

/// Filter for listing applications
#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    /// Only applications in this status
    pub status: Option<ApplicationStatus>,
    /// Only applications owned by this user
    pub applicant_user_id: Option<String>,
}

/// Repository for the Application aggregate
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Find an application by ID
    async fn find_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, CoreError>;

    /// Save an application.
    ///
    /// Optimistic concurrency: the stored version must equal the
    /// instance's version or the save fails with `CoreError::Conflict`.
    /// The stored copy's version is incremented on success.
    async fn save(&self, application: &Application) -> Result<(), CoreError>;

    /// Delete an application. Only drafts may be deleted; the service
    /// layer enforces that rule before calling this.
    async fn delete(&self, id: &ApplicationId) -> Result<(), CoreError>;

    /// List applications matching the filter
    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, CoreError>;
}

/// Repository for review stages
#[async_trait]
pub trait ReviewStageRepository: Send + Sync {
    /// Find a stage by ID
    async fn find_by_id(&self, id: &ReviewStageId) -> Result<Option<ReviewStage>, CoreError>;

    /// All stages ever created for an application, ordered by stage_order
    /// then creation time
    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ReviewStage>, CoreError>;

    /// The currently open stage for an application, if any
    async fn find_open_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ReviewStage>, CoreError>;

    /// All open stages across all applications (review queue source)
    async fn find_open(&self) -> Result<Vec<ReviewStage>, CoreError>;

    /// Save a stage.
    ///
    /// Write-time invariants: at most one open stage per application, and
    /// a recorded result is immutable (overwriting a decided stage with a
    /// different result fails with `CoreError::Conflict`).
    async fn save(&self, stage: &ReviewStage) -> Result<(), CoreError>;
}

/// Repository for review feedback records
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Append an immutable feedback record
    async fn append(&self, feedback: &ReviewFeedback) -> Result<(), CoreError>;

    /// All feedback for one stage, oldest first
    async fn find_by_stage(
        &self,
        review_stage_id: &ReviewStageId,
    ) -> Result<Vec<ReviewFeedback>, CoreError>;

    /// All feedback across an application's stages, oldest first
    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ReviewFeedback>, CoreError>;
}

/// Repository for licenses
#[async_trait]
pub trait LicenseRepository: Send + Sync {
    /// Find a license by ID
    async fn find_by_id(&self, id: &LicenseId) -> Result<Option<License>, CoreError>;

    /// Save a license
    async fn save(&self, license: &License) -> Result<(), CoreError>;

    /// Licenses created by an application's approval
    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<License>, CoreError>;

    /// Licenses owned by a user
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<License>, CoreError>;

    /// All licenses (expiry sweep source)
    async fn find_all(&self) -> Result<Vec<License>, CoreError>;
}

/// Repository for credentials
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Find a credential by ID
    async fn find_by_id(&self, id: &CredentialId) -> Result<Option<Credential>, CoreError>;

    /// Save a credential
    async fn save(&self, credential: &Credential) -> Result<(), CoreError>;

    /// Credentials created by an application's approval
    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Credential>, CoreError>;
}

/// Atomic insert of a provisioning batch.
///
/// Either every license and credential in the batch is persisted or none
/// is; the engine relies on this to keep the KEY_ISSUED transition
/// all-or-nothing.
#[async_trait]
pub trait ProvisioningRepository: Send + Sync {
    /// Insert all licenses and credentials, all-or-nothing
    async fn provision(
        &self,
        licenses: &[License],
        credentials: &[Credential],
    ) -> Result<(), CoreError>;
}

/// Sequential human-readable numbering for applications and licenses
#[async_trait]
pub trait SequenceRepository: Send + Sync {
    /// Next application number for the given year, APP-{year}-{seq}
    async fn next_application_number(&self, year: i32) -> Result<String, CoreError>;

    /// Next license number for the given year, LIC-{year}-{seq}
    async fn next_license_number(&self, year: i32) -> Result<String, CoreError>;
}

/// Collaborator: resolves the reviewer responsible for a stage.
///
/// Resolution happens at stage-entry time, not at submit time, so
/// reviewer reassignments take effect for stages entered afterwards.
#[async_trait]
pub trait ReviewerDirectory: Send + Sync {
    /// Resolve the reviewer for a pipeline stage
    async fn resolve(&self, stage: StageName) -> Result<ReviewerRef, CoreError>;
}
