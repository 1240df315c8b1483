//!
//! Tollgate Core - approval workflow engine for the Tollgate platform
//!
//! This crate defines the domain model, the multi-stage review state
//! machine, the SLA clock, stage routing and the provisioning side-effect
//! chain. Persistence is abstracted behind repository traits so the
//! engine never depends on concrete storage.

#![forbid(unsafe_code)]

/// Domain layer - aggregates, value objects, events, repository interfaces
pub mod domain;

/// Application services - the workflow engine and its companions
pub mod application;

/// Error types
pub mod error;

/// Stage routing - reviewer role to stage authorization
pub mod routing;

/// SLA clock - pure deadline computation
pub mod sla;

// Re-export key types
pub use error::CoreError;

pub use domain::application::{
    Applicant, Application, ApplicationId, ApplicationStatus, AttachmentRef, DraftUpdate,
    Environment, NewApplication, Project, SecurityAgreement, ToolSelection,
};
pub use domain::license::{
    Credential, CredentialId, CredentialStatus, License, LicenseId, LicenseStatus,
};
pub use domain::repository::{
    ApplicationFilter, ApplicationRepository, CredentialRepository, FeedbackRepository,
    LicenseRepository, ProvisioningRepository, ReviewStageRepository, ReviewerDirectory,
    SequenceRepository,
};
pub use domain::review_stage::{
    ChecklistItem, ReviewFeedback, ReviewFeedbackId, ReviewResult, ReviewStage, ReviewStageId,
    ReviewerRef, StageName,
};

pub use application::provisioning_service::{
    LicenseConfig, ProvisioningService, ALLOWED_VALIDITY_MONTHS, MIN_QUOTA_LIMIT,
};
pub use application::review_queue_service::{
    Page, QueueSortBy, ReviewListItem, ReviewQueueQuery, ReviewQueueService, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use application::sla_sweep::SlaSweeper;
pub use application::workflow_service::{
    ApplicationDetail, Caller, CallerRole, DecisionOutcome, DecisionRequest, WorkflowConfig,
    WorkflowService,
};

pub use routing::ReviewerRole;
pub use sla::SlaStatus;
