//! End-to-end workflow engine tests against the in-memory state store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use tollgate_core::domain::events::TracingEventHandler;
use tollgate_core::domain::repository::ProvisioningRepository;
use tollgate_core::{
    Applicant, Application, ApplicationId, ApplicationStatus, Caller, CallerRole, ChecklistItem,
    CoreError, Credential, DecisionRequest, Environment, License, LicenseConfig, NewApplication,
    ProvisioningService, ReviewResult, ReviewStage, ReviewerRole, StageName, ToolSelection,
    WorkflowConfig, WorkflowService,
};
use tollgate_state_inmemory::{InMemoryStateProvider, StaticReviewerDirectory};

struct Harness {
    provider: InMemoryStateProvider,
    workflow: WorkflowService,
}

fn build_harness(batch: Option<Arc<dyn ProvisioningRepository>>) -> Harness {
    let provider = InMemoryStateProvider::new();
    let batch = batch.unwrap_or_else(|| provider.provisioning());
    let provisioning = Arc::new(ProvisioningService::new(
        provider.licenses(),
        provider.credentials(),
        batch,
        provider.sequences(),
    ));
    let workflow = WorkflowService::new(
        provider.applications(),
        provider.stages(),
        provider.feedbacks(),
        provider.sequences(),
        Arc::new(StaticReviewerDirectory::with_defaults()),
        provisioning,
        Arc::new(TracingEventHandler),
        WorkflowConfig::default(),
    );
    Harness { provider, workflow }
}

fn harness() -> Harness {
    build_harness(None)
}

fn applicant_caller() -> Caller {
    Caller {
        user_id: "u-100".to_string(),
        name: "Dana Park".to_string(),
        role: CallerRole::Applicant,
    }
}

fn reviewer_caller(user_id: &str, role: ReviewerRole) -> Caller {
    Caller {
        user_id: user_id.to_string(),
        name: user_id.to_string(),
        role: CallerRole::Reviewer(role),
    }
}

fn team_lead() -> Caller {
    reviewer_caller("team-lead", ReviewerRole::TeamLead)
}

fn security_reviewer() -> Caller {
    reviewer_caller("sec-reviewer", ReviewerRole::SecurityReviewer)
}

fn it_admin() -> Caller {
    reviewer_caller("it-admin", ReviewerRole::ItAdmin)
}

fn license_manager() -> Caller {
    reviewer_caller("license-manager", ReviewerRole::LicenseManager)
}

fn new_application() -> NewApplication {
    NewApplication {
        applicant: Applicant {
            user_id: "u-100".to_string(),
            name: "Dana Park".to_string(),
            department: "Platform".to_string(),
            position: "Engineer".to_string(),
        },
        tools: vec![ToolSelection {
            tool_id: "t-1".to_string(),
            tool_name: "Copilot".to_string(),
        }],
        environment: Environment::Vdi,
        purpose: "code review automation".to_string(),
        projects: vec![],
        attachments: vec![],
        security_agreement: None,
    }
}

fn approve() -> DecisionRequest {
    DecisionRequest {
        result: ReviewResult::Approved,
        comment: None,
        checklist: vec![],
        license_config: None,
    }
}

fn approve_with_license(quota_limit: u64, validity_months: u32) -> DecisionRequest {
    DecisionRequest {
        result: ReviewResult::Approved,
        comment: None,
        checklist: vec![],
        license_config: Some(LicenseConfig {
            quota_limit,
            validity_months,
        }),
    }
}

async fn submitted_application(harness: &Harness) -> Application {
    let app = harness
        .workflow
        .create_draft(&applicant_caller(), new_application())
        .await
        .unwrap();
    harness
        .workflow
        .submit(&applicant_caller(), app.id)
        .await
        .unwrap()
}

async fn open_stage(harness: &Harness, id: ApplicationId) -> ReviewStage {
    harness
        .provider
        .stages()
        .find_open_by_application(&id)
        .await
        .unwrap()
        .expect("expected an open stage")
}

/// Drive an application through the given approvals in order
async fn approve_through(harness: &Harness, id: ApplicationId, reviewers: &[Caller]) {
    for reviewer in reviewers {
        let stage = open_stage(harness, id).await;
        harness
            .workflow
            .decide(reviewer, stage.id, approve())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn happy_path_four_approvals_issue_keys() {
    let h = harness();
    let app = submitted_application(&h).await;
    assert_eq!(app.status, ApplicationStatus::Submitted);
    assert!(app.submitted_at.is_some());
    assert!(app.application_number.starts_with("APP-"));

    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;

    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(detail.application.status, ApplicationStatus::LicenseIssuance);

    let stage = open_stage(&h, app.id).await;
    assert_eq!(stage.stage_name, StageName::LicenseIssuance);
    let outcome = h
        .workflow
        .decide(&license_manager(), stage.id, approve_with_license(1_000_000, 12))
        .await
        .unwrap();
    assert_eq!(outcome.application_status, ApplicationStatus::KeyIssued);

    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(detail.application.status, ApplicationStatus::KeyIssued);
    assert!(detail.application.completed_at.is_some());

    // Stage orders are strictly increasing from 1 with no gaps
    let orders: Vec<u32> = detail.stages.iter().map(|s| s.stage_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
    assert!(detail.stages.iter().all(|s| !s.is_open()));

    let licenses: Vec<License> = h
        .provider
        .licenses()
        .find_by_application(&app.id)
        .await
        .unwrap();
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].quota_limit, 1_000_000);
    assert!(licenses[0].license_number.starts_with("LIC-"));
    assert_eq!(licenses[0].user_id, "u-100");

    let credentials: Vec<Credential> = h
        .provider
        .credentials()
        .find_by_application(&app.id)
        .await
        .unwrap();
    assert_eq!(credentials.len(), 1);
    assert!(credentials[0].masked_key.starts_with("tg-****-****-"));
}

#[tokio::test]
async fn one_license_pair_per_selected_tool() {
    let h = harness();
    let mut fields = new_application();
    fields.tools.push(ToolSelection {
        tool_id: "t-2".to_string(),
        tool_name: "Claude Code".to_string(),
    });
    let app = h
        .workflow
        .create_draft(&applicant_caller(), fields)
        .await
        .unwrap();
    h.workflow.submit(&applicant_caller(), app.id).await.unwrap();

    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;
    let stage = open_stage(&h, app.id).await;
    h.workflow
        .decide(&license_manager(), stage.id, approve_with_license(200_000, 6))
        .await
        .unwrap();

    let licenses = h
        .provider
        .licenses()
        .find_by_application(&app.id)
        .await
        .unwrap();
    let credentials = h
        .provider
        .credentials()
        .find_by_application(&app.id)
        .await
        .unwrap();
    assert_eq!(licenses.len(), 2);
    assert_eq!(credentials.len(), 2);
}

#[tokio::test]
async fn feedback_cycle_reopens_same_stage_order() {
    let h = harness();
    let app = submitted_application(&h).await;

    let stage = open_stage(&h, app.id).await;
    let request = DecisionRequest {
        result: ReviewResult::FeedbackRequested,
        comment: Some("add PM email".to_string()),
        checklist: vec![],
        license_config: None,
    };
    h.workflow.decide(&team_lead(), stage.id, request).await.unwrap();

    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(
        detail.application.status,
        ApplicationStatus::FeedbackRequested
    );
    assert_eq!(
        detail.application.feedback_stage,
        Some(StageName::TeamReview)
    );
    assert_eq!(detail.feedbacks.len(), 1);
    assert_eq!(detail.feedbacks[0].content, "add PM email");

    // Resubmit: a new open stage at the same order, feedback stage cleared
    let resubmitted = h.workflow.submit(&applicant_caller(), app.id).await.unwrap();
    assert_eq!(resubmitted.status, ApplicationStatus::TeamReview);
    assert!(resubmitted.feedback_stage.is_none());

    let detail = h.workflow.application_detail(app.id).await.unwrap();
    let orders: Vec<u32> = detail.stages.iter().map(|s| s.stage_order).collect();
    assert_eq!(orders, vec![1, 1]);

    let reopened = open_stage(&h, app.id).await;
    assert_eq!(reopened.stage_name, StageName::TeamReview);
    assert_eq!(reopened.stage_order, 1);
    assert_ne!(reopened.id, stage.id);
}

#[tokio::test]
async fn decide_twice_is_rejected_without_write() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    h.workflow.decide(&team_lead(), stage.id, approve()).await.unwrap();

    let version_before = h
        .provider
        .applications()
        .find_by_id(&app.id)
        .await
        .unwrap()
        .unwrap()
        .version;

    let err = h
        .workflow
        .decide(&team_lead(), stage.id, approve())
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());

    // Exactly one persisted result, no second write
    let stored = h
        .provider
        .stages()
        .find_by_id(&stage.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.result, Some(ReviewResult::Approved));
    let version_after = h
        .provider
        .applications()
        .find_by_id(&app.id)
        .await
        .unwrap()
        .unwrap()
        .version;
    assert_eq!(version_before, version_after);
}

#[tokio::test]
async fn reject_requires_comment() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    let request = DecisionRequest {
        result: ReviewResult::Rejected,
        comment: Some("".to_string()),
        checklist: vec![],
        license_config: None,
    };
    let err = h
        .workflow
        .decide(&team_lead(), stage.id, request)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));

    // No state change
    let stored = h
        .provider
        .stages()
        .find_by_id(&stage.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_open());
    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(detail.application.status, ApplicationStatus::Submitted);
}

#[tokio::test]
async fn reject_ends_the_pipeline() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    let request = DecisionRequest {
        result: ReviewResult::Rejected,
        comment: Some("headcount freeze this quarter".to_string()),
        checklist: vec![ChecklistItem {
            label: "PM approval attached".to_string(),
            checked: false,
        }],
        license_config: None,
    };
    let outcome = h.workflow.decide(&team_lead(), stage.id, request).await.unwrap();
    assert_eq!(outcome.application_status, ApplicationStatus::Rejected);

    // Terminal: nothing further is open and a resubmit is refused
    assert!(h
        .provider
        .stages()
        .find_open_by_application(&app.id)
        .await
        .unwrap()
        .is_none());
    let err = h
        .workflow
        .submit(&applicant_caller(), app.id)
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn wrong_role_is_unauthorized() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;
    assert_eq!(stage.stage_name, StageName::TeamReview);

    let err = h
        .workflow
        .decide(&security_reviewer(), stage.id, approve())
        .await
        .unwrap_err();
    assert!(err.is_authorization_error());

    let stored = h
        .provider
        .stages()
        .find_by_id(&stage.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_open());
}

#[tokio::test]
async fn assigned_reviewer_is_enforced_except_for_admin() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    // Right role, different user
    let imposter = reviewer_caller("someone-else", ReviewerRole::TeamLead);
    let err = h
        .workflow
        .decide(&imposter, stage.id, approve())
        .await
        .unwrap_err();
    assert!(err.is_authorization_error());

    // Admin override may decide any stage
    let admin = reviewer_caller("root", ReviewerRole::Admin);
    h.workflow.decide(&admin, stage.id, approve()).await.unwrap();
}

#[tokio::test]
async fn applicants_cannot_decide() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    let err = h
        .workflow
        .decide(&applicant_caller(), stage.id, approve())
        .await
        .unwrap_err();
    assert!(err.is_authorization_error());
}

#[tokio::test]
async fn cancel_is_only_legal_while_submitted() {
    let h = harness();
    let app = submitted_application(&h).await;

    // Another user cannot cancel
    let stranger = Caller {
        user_id: "u-999".to_string(),
        name: "Someone Else".to_string(),
        role: CallerRole::Applicant,
    };
    let err = h
        .workflow
        .cancel(&stranger, app.id, "oops".to_string())
        .await
        .unwrap_err();
    assert!(err.is_authorization_error());

    let cancelled = h
        .workflow
        .cancel(&applicant_caller(), app.id, "plans changed".to_string())
        .await
        .unwrap();
    assert_eq!(cancelled.status, ApplicationStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("plans changed"));

    // Once a review is underway, cancellation is refused
    let app2 = submitted_application(&h).await;
    let stage = open_stage(&h, app2.id).await;
    h.workflow.decide(&team_lead(), stage.id, approve()).await.unwrap();
    let err = h
        .workflow
        .cancel(&applicant_caller(), app2.id, "too late".to_string())
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn submitting_a_submitted_application_is_invalid() {
    let h = harness();
    let app = submitted_application(&h).await;
    let err = h
        .workflow
        .submit(&applicant_caller(), app.id)
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn final_approval_requires_license_config() {
    let h = harness();
    let app = submitted_application(&h).await;
    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;

    let stage = open_stage(&h, app.id).await;
    let err = h
        .workflow
        .decide(&license_manager(), stage.id, approve())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));

    // Undecided, still at license issuance
    let stored = h
        .provider
        .stages()
        .find_by_id(&stage.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_open());
    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(detail.application.status, ApplicationStatus::LicenseIssuance);
}

#[tokio::test]
async fn malformed_license_config_is_rejected() {
    let h = harness();
    let app = submitted_application(&h).await;
    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;

    let stage = open_stage(&h, app.id).await;
    let err = h
        .workflow
        .decide(&license_manager(), stage.id, approve_with_license(99_999, 12))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));

    let err = h
        .workflow
        .decide(&license_manager(), stage.id, approve_with_license(200_000, 13))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationError(_)));
}

/// Provisioning repository wrapper that fails a configured number of
/// times before delegating, for fault injection.
struct FlakyProvisioningRepository {
    inner: Arc<dyn ProvisioningRepository>,
    failures_left: AtomicUsize,
}

#[async_trait]
impl ProvisioningRepository for FlakyProvisioningRepository {
    async fn provision(
        &self,
        licenses: &[License],
        credentials: &[Credential],
    ) -> Result<(), CoreError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CoreError::StateStoreError(
                "simulated provisioning outage".to_string(),
            ));
        }
        self.inner.provision(licenses, credentials).await
    }
}

#[tokio::test]
async fn usage_accrues_against_an_active_license() {
    let h = harness();
    let app = submitted_application(&h).await;
    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;
    let stage = open_stage(&h, app.id).await;
    h.workflow
        .decide(&license_manager(), stage.id, approve_with_license(200_000, 6))
        .await
        .unwrap();

    let provisioning = ProvisioningService::new(
        h.provider.licenses(),
        h.provider.credentials(),
        h.provider.provisioning(),
        h.provider.sequences(),
    );
    let license = h
        .provider
        .licenses()
        .find_by_application(&app.id)
        .await
        .unwrap()
        .remove(0);

    let updated = provisioning.record_usage(license.id, 150_000).await.unwrap();
    assert_eq!(updated.quota_used, 150_000);

    // Over-quota usage is recorded, not blocked
    let updated = provisioning.record_usage(license.id, 100_000).await.unwrap();
    assert_eq!(updated.quota_used, 250_000);

    provisioning.revoke_license(license.id).await.unwrap();
    let err = provisioning.record_usage(license.id, 1).await.unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn provisioning_failure_rolls_back_the_final_decision() {
    let provider = InMemoryStateProvider::new();
    let flaky = Arc::new(FlakyProvisioningRepository {
        inner: provider.provisioning(),
        failures_left: AtomicUsize::new(1),
    });

    let provisioning = Arc::new(ProvisioningService::new(
        provider.licenses(),
        provider.credentials(),
        flaky,
        provider.sequences(),
    ));
    let workflow = WorkflowService::new(
        provider.applications(),
        provider.stages(),
        provider.feedbacks(),
        provider.sequences(),
        Arc::new(StaticReviewerDirectory::with_defaults()),
        provisioning,
        Arc::new(TracingEventHandler),
        WorkflowConfig::default(),
    );
    let h = Harness { provider, workflow };

    let app = submitted_application(&h).await;
    approve_through(&h, app.id, &[team_lead(), security_reviewer(), it_admin()]).await;

    let stage = open_stage(&h, app.id).await;
    let err = h
        .workflow
        .decide(&license_manager(), stage.id, approve_with_license(1_000_000, 12))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ProvisioningFailure(_)));

    // Stage undecided, application still at license issuance, no partial
    // licenses or credentials
    let stored = h
        .provider
        .stages()
        .find_by_id(&stage.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_open());
    let detail = h.workflow.application_detail(app.id).await.unwrap();
    assert_eq!(detail.application.status, ApplicationStatus::LicenseIssuance);
    assert!(detail.application.completed_at.is_none());
    assert!(h
        .provider
        .licenses()
        .find_by_application(&app.id)
        .await
        .unwrap()
        .is_empty());

    // The caller can retry without side effects once the outage clears
    let outcome = h
        .workflow
        .decide(&license_manager(), stage.id, approve_with_license(1_000_000, 12))
        .await
        .unwrap();
    assert_eq!(outcome.application_status, ApplicationStatus::KeyIssued);
    assert_eq!(
        h.provider
            .licenses()
            .find_by_application(&app.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn due_dates_follow_the_sla_config() {
    let h = harness();
    let app = submitted_application(&h).await;
    let stage = open_stage(&h, app.id).await;

    let expected = tollgate_core::sla::due_date_after(Utc::now(), 2);
    assert_eq!(stage.due_date, expected);
}

#[tokio::test]
async fn draft_lifecycle_create_update_delete() {
    let h = harness();
    let caller = applicant_caller();
    let app = h
        .workflow
        .create_draft(&caller, new_application())
        .await
        .unwrap();
    assert_eq!(app.status, ApplicationStatus::Draft);

    let update = tollgate_core::DraftUpdate {
        purpose: Some("migration tooling".to_string()),
        ..Default::default()
    };
    let updated = h.workflow.update_draft(&caller, app.id, update).await.unwrap();
    assert_eq!(updated.purpose, "migration tooling");

    h.workflow.delete_draft(&caller, app.id).await.unwrap();
    let err = h.workflow.application_detail(app.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    // A submitted application cannot be deleted
    let app = submitted_application(&h).await;
    let err = h.workflow.delete_draft(&caller, app.id).await.unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn application_numbers_are_sequential_per_year() {
    let h = harness();
    let caller = applicant_caller();
    let first = h
        .workflow
        .create_draft(&caller, new_application())
        .await
        .unwrap();
    let second = h
        .workflow
        .create_draft(&caller, new_application())
        .await
        .unwrap();

    let year = Utc::now().format("%Y").to_string();
    assert_eq!(first.application_number, format!("APP-{}-0001", year));
    assert_eq!(second.application_number, format!("APP-{}-0002", year));
}
