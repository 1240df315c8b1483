use crate::domain::application::ApplicationId;
use crate::domain::review_stage::{ReviewResult, ReviewStageId, StageName};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Debug;

use crate::CoreError;

/// Domain event trait for all workflow events
pub trait WorkflowEvent: Debug + Send + Sync {
    /// Returns the type of the event as a string
    fn event_type(&self) -> &'static str;

    /// Returns the application ID this event is associated with
    fn application_id(&self) -> &ApplicationId;

    /// Returns the timestamp when the event occurred
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Handler invoked with workflow events after a transition commits.
///
/// Notification delivery (email/chat) is an external collaborator behind
/// this seam; handlers are fire-and-forget from the engine's perspective.
#[async_trait]
pub trait WorkflowEventHandler: Send + Sync {
    /// Handle a domain event
    async fn handle_event(&self, event: Box<dyn WorkflowEvent>) -> Result<(), CoreError>;
}

/// Default handler that only logs events via tracing
pub struct TracingEventHandler;

#[async_trait]
impl WorkflowEventHandler for TracingEventHandler {
    async fn handle_event(&self, event: Box<dyn WorkflowEvent>) -> Result<(), CoreError> {
        tracing::info!(
            event_type = event.event_type(),
            application_id = %event.application_id(),
            "workflow event"
        );
        Ok(())
    }
}

/// Event: application submitted (first submission)
#[derive(Debug)]
pub struct ApplicationSubmitted {
    /// The application that was submitted
    pub application_id: ApplicationId,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for ApplicationSubmitted {
    fn event_type(&self) -> &'static str {
        "application.submitted"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: a review stage was opened
#[derive(Debug)]
pub struct StageEntered {
    /// The owning application
    pub application_id: ApplicationId,

    /// The stage that was opened
    pub review_stage_id: ReviewStageId,

    /// Which pipeline stage
    pub stage_name: StageName,

    /// 1-based sequence position
    pub stage_order: u32,

    /// SLA deadline computed at entry
    pub due_date: NaiveDate,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for StageEntered {
    fn event_type(&self) -> &'static str {
        "stage.entered"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: a reviewer decided a stage
#[derive(Debug)]
pub struct StageDecided {
    /// The owning application
    pub application_id: ApplicationId,

    /// The decided stage
    pub review_stage_id: ReviewStageId,

    /// Which pipeline stage
    pub stage_name: StageName,

    /// The recorded decision
    pub result: ReviewResult,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for StageDecided {
    fn event_type(&self) -> &'static str {
        "stage.decided"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: a reviewer asked the applicant for changes
#[derive(Debug)]
pub struct FeedbackRequested {
    /// The owning application
    pub application_id: ApplicationId,

    /// The stage that issued the feedback
    pub stage_name: StageName,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for FeedbackRequested {
    fn event_type(&self) -> &'static str {
        "stage.feedback_requested"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: a reviewer rejected the application (terminal)
#[derive(Debug)]
pub struct ApplicationRejected {
    /// The rejected application
    pub application_id: ApplicationId,

    /// The stage whose reviewer rejected it
    pub stage_name: StageName,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for ApplicationRejected {
    fn event_type(&self) -> &'static str {
        "application.rejected"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: application cancelled by its applicant
#[derive(Debug)]
pub struct ApplicationCancelled {
    /// The cancelled application
    pub application_id: ApplicationId,

    /// Reason recorded for audit
    pub reason: String,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for ApplicationCancelled {
    fn event_type(&self) -> &'static str {
        "application.cancelled"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: final approval provisioned licenses and credentials
#[derive(Debug)]
pub struct LicenseIssued {
    /// The completed application
    pub application_id: ApplicationId,

    /// Number of license/credential pairs created
    pub license_count: usize,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for LicenseIssued {
    fn event_type(&self) -> &'static str {
        "license.issued"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Event: an open stage passed its SLA deadline.
///
/// Emitted by the read-only SLA sweep; an escalation observation, never a
/// state transition.
#[derive(Debug)]
pub struct StageOverdue {
    /// The owning application
    pub application_id: ApplicationId,

    /// The overdue stage
    pub review_stage_id: ReviewStageId,

    /// Which pipeline stage
    pub stage_name: StageName,

    /// The missed deadline
    pub due_date: NaiveDate,

    /// The timestamp when the event occurred
    pub timestamp: DateTime<Utc>,
}

impl WorkflowEvent for StageOverdue {
    fn event_type(&self) -> &'static str {
        "stage.overdue"
    }

    fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
