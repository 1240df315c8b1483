use crate::domain::review_stage::StageName;
use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Application status
///
/// The review statuses (`TeamReview` .. `LicenseIssuance`) name the stage
/// that is currently open for the application. A freshly submitted
/// application stays in `Submitted` while its first stage awaits a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Being edited by the applicant, not yet visible to reviewers
    Draft,

    /// Submitted, first stage open
    Submitted,

    /// Team lead review stage open (after a feedback resubmission)
    TeamReview,

    /// Security review stage open
    SecurityReview,

    /// Environment preparation stage open
    EnvPreparation,

    /// License issuance stage open
    LicenseIssuance,

    /// All stages approved
    Approved,

    /// Licenses and credentials issued, pipeline complete
    KeyIssued,

    /// Rejected by a reviewer (terminal)
    Rejected,

    /// A reviewer asked the applicant for changes
    FeedbackRequested,

    /// Withdrawn by the applicant before review started (terminal)
    Cancelled,
}

impl ApplicationStatus {
    /// The status an application shows while the given stage is open
    pub fn for_open_stage(stage: StageName) -> Self {
        match stage {
            StageName::TeamReview => ApplicationStatus::TeamReview,
            StageName::SecurityReview => ApplicationStatus::SecurityReview,
            StageName::EnvPreparation => ApplicationStatus::EnvPreparation,
            StageName::LicenseIssuance => ApplicationStatus::LicenseIssuance,
        }
    }

    /// True while a review stage is open for the application
    pub fn is_in_review(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Submitted
                | ApplicationStatus::TeamReview
                | ApplicationStatus::SecurityReview
                | ApplicationStatus::EnvPreparation
                | ApplicationStatus::LicenseIssuance
        )
    }

    /// True once no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::KeyIssued | ApplicationStatus::Rejected | ApplicationStatus::Cancelled
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplicationStatus::Draft => "DRAFT",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::TeamReview => "TEAM_REVIEW",
            ApplicationStatus::SecurityReview => "SECURITY_REVIEW",
            ApplicationStatus::EnvPreparation => "ENV_PREPARATION",
            ApplicationStatus::LicenseIssuance => "LICENSE_ISSUANCE",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::KeyIssued => "KEY_ISSUED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::FeedbackRequested => "FEEDBACK_REQUESTED",
            ApplicationStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Value object: Application ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub Uuid);

impl ApplicationId {
    /// Generate a fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ApplicationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Applicant identity, sourced from the external directory and immutable here
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub user_id: String,
    pub name: String,
    pub department: String,
    pub position: String,
}

/// A tool the applicant asked access for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSelection {
    pub tool_id: String,
    pub tool_name: String,
}

/// Target execution environment for the tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Environment {
    Vdi,
    Notebook,
    Other,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Environment::Vdi => "VDI",
            Environment::Notebook => "NOTEBOOK",
            Environment::Other => "OTHER",
        };
        write!(f, "{}", s)
    }
}

/// Project sub-record supplied by the applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub manager_email: Option<String>,
}

/// Reference to an uploaded attachment; storage itself is external
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRef {
    pub file_id: String,
    pub file_name: String,
}

/// Security agreement acknowledgement captured at draft time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAgreement {
    pub agreed: bool,
    pub agreed_at: DateTime<Utc>,
}

/// Fields the applicant supplies when creating a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub applicant: Applicant,
    pub tools: Vec<ToolSelection>,
    pub environment: Environment,
    pub purpose: String,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default)]
    pub security_agreement: Option<SecurityAgreement>,
}

/// Partial update applied to a draft (or feedback-requested) application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftUpdate {
    #[serde(default)]
    pub tools: Option<Vec<ToolSelection>>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub projects: Option<Vec<Project>>,
    #[serde(default)]
    pub attachments: Option<Vec<AttachmentRef>>,
    #[serde(default)]
    pub security_agreement: Option<SecurityAgreement>,
}

/// Aggregate: access application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Unique identifier
    pub id: ApplicationId,

    /// Human-readable sequential number, e.g. APP-2026-0001
    pub application_number: String,

    /// Applicant identity
    pub applicant: Applicant,

    /// Selected tools (at least one required on submit)
    pub tools: Vec<ToolSelection>,

    /// Target environment
    pub environment: Environment,

    /// Free-text purpose
    pub purpose: String,

    /// Project sub-records
    pub projects: Vec<Project>,

    /// Attachment references
    pub attachments: Vec<AttachmentRef>,

    /// Optional security agreement
    pub security_agreement: Option<SecurityAgreement>,

    /// Current status
    pub status: ApplicationStatus,

    /// Stage that issued the most recent feedback request.
    /// Set only while status is FeedbackRequested, cleared on resubmission.
    pub feedback_stage: Option<StageName>,

    /// Reason recorded when the applicant cancels
    pub cancel_reason: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// First submission timestamp
    pub submitted_at: Option<DateTime<Utc>>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,

    /// Terminal success timestamp
    pub completed_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency version, incremented by the store on save
    pub version: u64,
}

impl Application {
    /// Create a new draft application
    pub fn new(application_number: String, fields: NewApplication, now: DateTime<Utc>) -> Self {
        Self {
            id: ApplicationId::new(),
            application_number,
            applicant: fields.applicant,
            tools: fields.tools,
            environment: fields.environment,
            purpose: fields.purpose,
            projects: fields.projects,
            attachments: fields.attachments,
            security_agreement: fields.security_agreement,
            status: ApplicationStatus::Draft,
            feedback_stage: None,
            cancel_reason: None,
            created_at: now,
            submitted_at: None,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    /// Apply a draft update; only legal while the applicant still owns the edit
    pub fn apply_draft_update(&mut self, update: DraftUpdate, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !matches!(
            self.status,
            ApplicationStatus::Draft | ApplicationStatus::FeedbackRequested
        ) {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "DRAFT or FEEDBACK_REQUESTED",
            ));
        }

        if let Some(tools) = update.tools {
            self.tools = tools;
        }
        if let Some(environment) = update.environment {
            self.environment = environment;
        }
        if let Some(purpose) = update.purpose {
            self.purpose = purpose;
        }
        if let Some(projects) = update.projects {
            self.projects = projects;
        }
        if let Some(attachments) = update.attachments {
            self.attachments = attachments;
        }
        if let Some(agreement) = update.security_agreement {
            self.security_agreement = Some(agreement);
        }

        self.updated_at = now;
        Ok(())
    }

    /// First submission: Draft -> Submitted
    pub fn mark_submitted(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status != ApplicationStatus::Draft {
            return Err(CoreError::invalid_state(self.status.to_string(), "DRAFT"));
        }
        if self.tools.is_empty() {
            return Err(CoreError::ValidationError(
                "at least one tool must be selected".to_string(),
            ));
        }

        self.status = ApplicationStatus::Submitted;
        self.submitted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Resubmission after feedback: FeedbackRequested -> the feedback stage.
    /// Returns the stage to re-open.
    pub fn mark_resubmitted(&mut self, now: DateTime<Utc>) -> Result<StageName, CoreError> {
        if self.status != ApplicationStatus::FeedbackRequested {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "FEEDBACK_REQUESTED",
            ));
        }
        let stage = self.feedback_stage.ok_or_else(|| {
            CoreError::StateStoreError(format!(
                "application {} is in FEEDBACK_REQUESTED without a feedback stage",
                self.id
            ))
        })?;

        self.status = ApplicationStatus::for_open_stage(stage);
        self.feedback_stage = None;
        self.updated_at = now;
        Ok(stage)
    }

    /// Advance into the given stage after the previous one was approved
    pub fn enter_stage(&mut self, stage: StageName, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.status.is_in_review() {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "an active review status",
            ));
        }

        self.status = ApplicationStatus::for_open_stage(stage);
        self.updated_at = now;
        Ok(())
    }

    /// A reviewer asked the applicant for changes
    pub fn request_feedback(&mut self, stage: StageName, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.status.is_in_review() {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "an active review status",
            ));
        }

        self.status = ApplicationStatus::FeedbackRequested;
        self.feedback_stage = Some(stage);
        self.updated_at = now;
        Ok(())
    }

    /// A reviewer rejected the application (terminal)
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.status.is_in_review() {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "an active review status",
            ));
        }

        self.status = ApplicationStatus::Rejected;
        self.updated_at = now;
        Ok(())
    }

    /// Final-stage approval landed and provisioning succeeded
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status != ApplicationStatus::LicenseIssuance {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "LICENSE_ISSUANCE",
            ));
        }

        self.status = ApplicationStatus::KeyIssued;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Withdraw before anyone started working the application
    pub fn cancel(&mut self, reason: String, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status != ApplicationStatus::Submitted {
            return Err(CoreError::invalid_state(
                self.status.to_string(),
                "SUBMITTED",
            ));
        }

        self.status = ApplicationStatus::Cancelled;
        self.cancel_reason = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    /// Check draft ownership
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.applicant.user_id == user_id
    }
}
