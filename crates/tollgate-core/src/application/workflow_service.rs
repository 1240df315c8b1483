use crate::{
    domain::application::{
        Application, ApplicationId, ApplicationStatus, DraftUpdate, NewApplication,
    },
    domain::events::{
        ApplicationCancelled, ApplicationRejected, ApplicationSubmitted, FeedbackRequested,
        LicenseIssued, StageDecided, StageEntered, WorkflowEvent, WorkflowEventHandler,
    },
    domain::repository::{
        ApplicationFilter, ApplicationRepository, FeedbackRepository, ReviewStageRepository,
        ReviewerDirectory, SequenceRepository,
    },
    domain::review_stage::{
        ChecklistItem, ReviewFeedback, ReviewResult, ReviewStage, ReviewStageId, StageName,
    },
    routing::{self, ReviewerRole},
    sla, CoreError,
};
use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::provisioning_service::{LicenseConfig, ProvisioningService};

/// Tunable workflow parameters
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Days between stage entry and the stage's SLA deadline
    pub sla_deadline_days: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            sla_deadline_days: 2,
        }
    }
}

/// What kind of actor a caller is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    /// An applicant; may own applications but never decide stages
    Applicant,
    /// A reviewer with a routing role
    Reviewer(ReviewerRole),
}

/// Caller identity, supplied by the boundary's identity provider
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub name: String,
    pub role: CallerRole,
}

/// A reviewer's decision on a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub result: ReviewResult,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Required when approving the final (license issuance) stage
    #[serde(default)]
    pub license_config: Option<LicenseConfig>,
}

/// Result of a decision: the decided stage plus the application's new status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub stage: ReviewStage,
    pub application_status: ApplicationStatus,
}

/// Full application view: the aggregate plus its review history
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub stages: Vec<ReviewStage>,
    pub feedbacks: Vec<ReviewFeedback>,
}

/// The workflow engine.
///
/// Validates submitted operations against the current state, performs the
/// transition, and invokes provisioning on the final approval. Each
/// operation is serialized per application via an in-process lock; the
/// repository's version check is the second line of defense.
pub struct WorkflowService {
    applications: Arc<dyn ApplicationRepository>,
    stages: Arc<dyn ReviewStageRepository>,
    feedbacks: Arc<dyn FeedbackRepository>,
    sequences: Arc<dyn SequenceRepository>,
    reviewers: Arc<dyn ReviewerDirectory>,
    provisioning: Arc<ProvisioningService>,
    event_handler: Arc<dyn WorkflowEventHandler>,
    config: WorkflowConfig,
    locks: DashMap<ApplicationId, Arc<Mutex<()>>>,
}

impl WorkflowService {
    /// Create a new workflow service
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        stages: Arc<dyn ReviewStageRepository>,
        feedbacks: Arc<dyn FeedbackRepository>,
        sequences: Arc<dyn SequenceRepository>,
        reviewers: Arc<dyn ReviewerDirectory>,
        provisioning: Arc<ProvisioningService>,
        event_handler: Arc<dyn WorkflowEventHandler>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            applications,
            stages,
            feedbacks,
            sequences,
            reviewers,
            provisioning,
            event_handler,
            config,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: ApplicationId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once the application can no longer transition,
    /// so the map does not accumulate terminal applications. Any operation
    /// racing through a freshly created lock fails its status check, and
    /// the repository version check backstops the write.
    fn discard_lock(&self, id: &ApplicationId) {
        self.locks.remove(id);
    }

    /// Fire-and-forget event dispatch; a failing handler never fails the
    /// transition that already committed.
    async fn emit(&self, event: Box<dyn WorkflowEvent>) {
        let event_type = event.event_type();
        if let Err(err) = self.event_handler.handle_event(event).await {
            error!(%err, event_type, "event handler failed");
        }
    }

    /// Create a new draft application owned by the caller
    pub async fn create_draft(
        &self,
        caller: &Caller,
        fields: NewApplication,
    ) -> Result<Application, CoreError> {
        if fields.applicant.user_id != caller.user_id {
            return Err(CoreError::AuthorizationError(
                "an application can only be created for oneself".to_string(),
            ));
        }

        let now = Utc::now();
        let number = self.sequences.next_application_number(now.year()).await?;
        let application = Application::new(number, fields, now);
        self.applications.save(&application).await?;

        info!(
            application = %application.application_number,
            applicant = %caller.user_id,
            "draft created"
        );
        Ok(application)
    }

    /// Update a draft (or feedback-requested) application
    pub async fn update_draft(
        &self,
        caller: &Caller,
        id: ApplicationId,
        update: DraftUpdate,
    ) -> Result<Application, CoreError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut application = self.load_application(&id).await?;
        if !application.is_owned_by(&caller.user_id) {
            return Err(CoreError::AuthorizationError(
                "only the applicant may edit the application".to_string(),
            ));
        }

        application.apply_draft_update(update, Utc::now())?;
        self.applications.save(&application).await?;
        Ok(application)
    }

    /// Delete a draft. Submitted applications are never hard-deleted.
    pub async fn delete_draft(&self, caller: &Caller, id: ApplicationId) -> Result<(), CoreError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let application = self.load_application(&id).await?;
        if !application.is_owned_by(&caller.user_id) {
            return Err(CoreError::AuthorizationError(
                "only the applicant may delete the application".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Draft {
            return Err(CoreError::invalid_state(
                application.status.to_string(),
                "DRAFT",
            ));
        }

        self.applications.delete(&id).await?;
        drop(_guard);
        self.discard_lock(&id);
        Ok(())
    }

    /// Submit a draft, or resubmit after a feedback request.
    ///
    /// A fresh submit opens the first stage; a resubmission re-opens the
    /// stage that issued the feedback, at the same stage order, with a
    /// freshly computed due date.
    pub async fn submit(
        &self,
        caller: &Caller,
        id: ApplicationId,
    ) -> Result<Application, CoreError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut application = self.load_application(&id).await?;
        if !application.is_owned_by(&caller.user_id) {
            return Err(CoreError::AuthorizationError(
                "only the applicant may submit the application".to_string(),
            ));
        }

        let now = Utc::now();
        match application.status {
            ApplicationStatus::Draft => {
                application.mark_submitted(now)?;
                let stage = self
                    .open_stage(&application, StageName::first(), StageName::first().order(), now)
                    .await?;

                self.applications.save(&application).await?;

                self.emit(Box::new(ApplicationSubmitted {
                    application_id: application.id,
                    timestamp: now,
                }))
                .await;
                self.emit_stage_entered(&stage, now).await;
            }
            ApplicationStatus::FeedbackRequested => {
                let stage_name = application.mark_resubmitted(now)?;
                let stage = self
                    .open_stage(&application, stage_name, stage_name.order(), now)
                    .await?;

                self.applications.save(&application).await?;
                self.emit_stage_entered(&stage, now).await;
            }
            other => {
                return Err(CoreError::invalid_state(
                    other.to_string(),
                    "DRAFT or FEEDBACK_REQUESTED",
                ));
            }
        }

        info!(
            application = %application.application_number,
            status = %application.status,
            "application submitted"
        );
        Ok(application)
    }

    /// Record a reviewer decision on an open stage.
    ///
    /// All validation happens before any write; an invalid call leaves
    /// every record untouched. Approving the final stage provisions
    /// licenses and credentials atomically before the stage and
    /// application are persisted, so a provisioning failure leaves the
    /// stage open and the application in LICENSE_ISSUANCE.
    pub async fn decide(
        &self,
        caller: &Caller,
        stage_id: ReviewStageId,
        request: DecisionRequest,
    ) -> Result<DecisionOutcome, CoreError> {
        let stage_probe = self
            .stages
            .find_by_id(&stage_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Review stage {}", stage_id)))?;

        let lock = self.lock_for(stage_probe.application_id);
        let _guard = lock.lock().await;

        // Reload under the lock; the probe may be stale.
        let mut stage = self
            .stages
            .find_by_id(&stage_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Review stage {}", stage_id)))?;
        let mut application = self.load_application(&stage.application_id).await?;

        let role = match caller.role {
            CallerRole::Reviewer(role) => role,
            CallerRole::Applicant => {
                return Err(CoreError::AuthorizationError(
                    "applicants may not decide review stages".to_string(),
                ));
            }
        };
        if !routing::can_decide(role, stage.stage_name) {
            return Err(CoreError::AuthorizationError(format!(
                "role {} is not authorized for stage {}",
                role, stage.stage_name
            )));
        }
        if role != ReviewerRole::Admin && stage.reviewer.user_id != caller.user_id {
            return Err(CoreError::AuthorizationError(format!(
                "stage {} is assigned to another reviewer",
                stage.stage_name
            )));
        }

        if !stage.is_open() {
            return Err(CoreError::invalid_state(
                format!("{} already decided", stage.stage_name),
                "an open stage",
            ));
        }
        if !application.status.is_in_review() {
            return Err(CoreError::invalid_state(
                application.status.to_string(),
                "an active review status",
            ));
        }

        let now = Utc::now();
        // Validates the comment requirement before any state is persisted
        stage.decide(request.result, request.comment.clone(), request.checklist, now)?;

        match request.result {
            ReviewResult::Rejected => {
                application.reject(now)?;
                self.stages.save(&stage).await?;
                self.applications.save(&application).await?;

                self.emit(Box::new(ApplicationRejected {
                    application_id: application.id,
                    stage_name: stage.stage_name,
                    timestamp: now,
                }))
                .await;
            }
            ReviewResult::FeedbackRequested => {
                application.request_feedback(stage.stage_name, now)?;
                self.stages.save(&stage).await?;
                self.applications.save(&application).await?;

                if let Some(content) = stage.comment.clone() {
                    let feedback = ReviewFeedback::new(
                        stage.id,
                        application.id,
                        stage.reviewer.clone(),
                        content,
                        now,
                    );
                    self.feedbacks.append(&feedback).await?;
                }

                self.emit(Box::new(FeedbackRequested {
                    application_id: application.id,
                    stage_name: stage.stage_name,
                    timestamp: now,
                }))
                .await;
            }
            ReviewResult::Approved => match stage.stage_name.next() {
                Some(next_stage) => {
                    application.enter_stage(next_stage, now)?;
                    self.stages.save(&stage).await?;
                    let opened = self
                        .open_stage(&application, next_stage, stage.stage_order + 1, now)
                        .await?;
                    self.applications.save(&application).await?;
                    self.emit_stage_entered(&opened, now).await;
                }
                None => {
                    // Final stage: provision first, atomically. Only then
                    // persist the decision and the terminal status.
                    let config = request.license_config.clone().ok_or_else(|| {
                        CoreError::ValidationError(
                            "licenseConfig is required when approving license issuance"
                                .to_string(),
                        )
                    })?;

                    let issued = self
                        .provisioning
                        .provision_for(&application, &config, now)
                        .await?;

                    application.complete(now)?;
                    self.stages.save(&stage).await?;
                    self.applications.save(&application).await?;

                    self.emit(Box::new(LicenseIssued {
                        application_id: application.id,
                        license_count: issued.len(),
                        timestamp: now,
                    }))
                    .await;
                }
            },
        }

        self.emit(Box::new(StageDecided {
            application_id: application.id,
            review_stage_id: stage.id,
            stage_name: stage.stage_name,
            result: request.result,
            timestamp: now,
        }))
        .await;

        info!(
            application = %application.application_number,
            stage = %stage.stage_name,
            result = %request.result,
            status = %application.status,
            "stage decided"
        );

        if application.status.is_terminal() {
            drop(_guard);
            self.discard_lock(&application.id);
        }

        Ok(DecisionOutcome {
            stage,
            application_status: application.status,
        })
    }

    /// Cancel a submitted application.
    ///
    /// Only legal while status is exactly SUBMITTED: once a reviewer has
    /// taken the application into an active stage it can no longer be
    /// withdrawn.
    pub async fn cancel(
        &self,
        caller: &Caller,
        id: ApplicationId,
        reason: String,
    ) -> Result<Application, CoreError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut application = self.load_application(&id).await?;
        if !application.is_owned_by(&caller.user_id) {
            return Err(CoreError::AuthorizationError(
                "only the applicant may cancel the application".to_string(),
            ));
        }

        let now = Utc::now();
        application.cancel(reason.clone(), now)?;
        self.applications.save(&application).await?;

        self.emit(Box::new(ApplicationCancelled {
            application_id: application.id,
            reason,
            timestamp: now,
        }))
        .await;

        info!(application = %application.application_number, "application cancelled");
        drop(_guard);
        self.discard_lock(&id);
        Ok(application)
    }

    /// List applications, scoped to the caller.
    ///
    /// Applicants see only their own; reviewers see everything, with an
    /// optional status filter either way.
    pub async fn list_applications(
        &self,
        caller: &Caller,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, CoreError> {
        let filter = ApplicationFilter {
            status,
            applicant_user_id: match caller.role {
                CallerRole::Applicant => Some(caller.user_id.clone()),
                CallerRole::Reviewer(_) => None,
            },
        };
        self.applications.list(&filter).await
    }

    /// Full application view with stage history and feedbacks
    pub async fn application_detail(
        &self,
        id: ApplicationId,
    ) -> Result<ApplicationDetail, CoreError> {
        let application = self.load_application(&id).await?;
        let stages = self.stages.find_by_application(&id).await?;
        let feedbacks = self.feedbacks.find_by_application(&id).await?;

        Ok(ApplicationDetail {
            application,
            stages,
            feedbacks,
        })
    }

    async fn load_application(&self, id: &ApplicationId) -> Result<Application, CoreError> {
        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Application {}", id)))
    }

    /// Resolve the reviewer, compute the due date, and persist a fresh
    /// open stage.
    async fn open_stage(
        &self,
        application: &Application,
        stage_name: StageName,
        stage_order: u32,
        now: DateTime<Utc>,
    ) -> Result<ReviewStage, CoreError> {
        let reviewer = self.reviewers.resolve(stage_name).await?;
        let due_date = sla::due_date_after(now, self.config.sla_deadline_days);
        let stage = ReviewStage::open(
            application.id,
            stage_name,
            stage_order,
            reviewer,
            due_date,
            now,
        );
        self.stages.save(&stage).await?;

        debug!(
            application = %application.application_number,
            stage = %stage_name,
            order = stage_order,
            due = %due_date,
            "stage opened"
        );
        Ok(stage)
    }

    async fn emit_stage_entered(&self, stage: &ReviewStage, now: DateTime<Utc>) {
        self.emit(Box::new(StageEntered {
            application_id: stage.application_id,
            review_stage_id: stage.id,
            stage_name: stage.stage_name,
            stage_order: stage.stage_order,
            due_date: stage.due_date,
            timestamp: now,
        }))
        .await;
    }
}
