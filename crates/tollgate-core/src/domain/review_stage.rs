use crate::domain::application::ApplicationId;
use crate::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The four pipeline stages, in fixed total order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    TeamReview,
    SecurityReview,
    EnvPreparation,
    LicenseIssuance,
}

impl StageName {
    /// 1-based position in the pipeline
    pub fn order(&self) -> u32 {
        match self {
            StageName::TeamReview => 1,
            StageName::SecurityReview => 2,
            StageName::EnvPreparation => 3,
            StageName::LicenseIssuance => 4,
        }
    }

    /// The stage that follows this one, None for the terminal stage
    pub fn next(&self) -> Option<StageName> {
        match self {
            StageName::TeamReview => Some(StageName::SecurityReview),
            StageName::SecurityReview => Some(StageName::EnvPreparation),
            StageName::EnvPreparation => Some(StageName::LicenseIssuance),
            StageName::LicenseIssuance => None,
        }
    }

    /// First stage of the pipeline
    pub fn first() -> StageName {
        StageName::TeamReview
    }

    /// All stages in pipeline order
    pub fn all() -> &'static [StageName] {
        &[
            StageName::TeamReview,
            StageName::SecurityReview,
            StageName::EnvPreparation,
            StageName::LicenseIssuance,
        ]
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageName::TeamReview => "TEAM_REVIEW",
            StageName::SecurityReview => "SECURITY_REVIEW",
            StageName::EnvPreparation => "ENV_PREPARATION",
            StageName::LicenseIssuance => "LICENSE_ISSUANCE",
        };
        write!(f, "{}", s)
    }
}

/// Reviewer decision on a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewResult {
    Approved,
    Rejected,
    FeedbackRequested,
}

impl fmt::Display for ReviewResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewResult::Approved => "APPROVED",
            ReviewResult::Rejected => "REJECTED",
            ReviewResult::FeedbackRequested => "FEEDBACK_REQUESTED",
        };
        write!(f, "{}", s)
    }
}

/// Value object: Review stage ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewStageId(pub Uuid);

impl ReviewStageId {
    /// Generate a fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewStageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewStageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reviewer identity resolved at stage entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRef {
    pub user_id: String,
    pub name: String,
    pub department: String,
}

/// One labeled boolean checklist item; advisory, not a gating precondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub label: String,
    pub checked: bool,
}

/// One ordered step of the approval pipeline for one application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStage {
    /// Unique identifier
    pub id: ReviewStageId,

    /// Owning application
    pub application_id: ApplicationId,

    /// 1-based sequence position; a feedback cycle re-opens the same order
    pub stage_order: u32,

    /// Which pipeline stage this is
    pub stage_name: StageName,

    /// Assigned reviewer, resolved when the stage was entered
    pub reviewer: ReviewerRef,

    /// SLA deadline, computed once at stage entry and never recomputed
    pub due_date: NaiveDate,

    /// Checklist items; mutable only while the stage is open
    pub checklist: Vec<ChecklistItem>,

    /// Decision; unset while the stage is open, immutable once set
    pub result: Option<ReviewResult>,

    /// Reviewer comment recorded with the decision
    pub comment: Option<String>,

    /// When the decision was recorded
    pub reviewed_at: Option<DateTime<Utc>>,

    /// When the stage was entered
    pub created_at: DateTime<Utc>,
}

impl ReviewStage {
    /// Open a new stage for an application
    pub fn open(
        application_id: ApplicationId,
        stage_name: StageName,
        stage_order: u32,
        reviewer: ReviewerRef,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewStageId::new(),
            application_id,
            stage_order,
            stage_name,
            reviewer,
            due_date,
            checklist: Vec::new(),
            result: None,
            comment: None,
            reviewed_at: None,
            created_at: now,
        }
    }

    /// True until a decision has been recorded
    pub fn is_open(&self) -> bool {
        self.result.is_none()
    }

    /// Record the reviewer's decision. Append-only: fails if already decided.
    pub fn decide(
        &mut self,
        result: ReviewResult,
        comment: Option<String>,
        checklist: Vec<ChecklistItem>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if let Some(existing) = self.result {
            return Err(CoreError::invalid_state(
                format!("decided ({})", existing),
                "open",
            ));
        }

        let comment = comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        if matches!(result, ReviewResult::Rejected | ReviewResult::FeedbackRequested)
            && comment.is_none()
        {
            return Err(CoreError::ValidationError(format!(
                "a comment is required when the result is {}",
                result
            )));
        }

        self.result = Some(result);
        self.comment = comment;
        self.checklist = checklist;
        self.reviewed_at = Some(now);
        Ok(())
    }
}

/// Value object: Review feedback ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewFeedbackId(pub Uuid);

impl fmt::Display for ReviewFeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable feedback record appended on a FEEDBACK_REQUESTED decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFeedback {
    pub id: ReviewFeedbackId,
    pub review_stage_id: ReviewStageId,
    pub application_id: ApplicationId,
    pub reviewer: ReviewerRef,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ReviewFeedback {
    /// Create a feedback record for a stage decision
    pub fn new(
        review_stage_id: ReviewStageId,
        application_id: ApplicationId,
        reviewer: ReviewerRef,
        content: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReviewFeedbackId(Uuid::new_v4()),
            review_stage_id,
            application_id,
            reviewer,
            content,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer() -> ReviewerRef {
        ReviewerRef {
            user_id: "r-1".to_string(),
            name: "Lee Min".to_string(),
            department: "Security".to_string(),
        }
    }

    fn open_stage() -> ReviewStage {
        ReviewStage::open(
            ApplicationId::new(),
            StageName::TeamReview,
            1,
            reviewer(),
            NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn test_stage_order_is_total() {
        let orders: Vec<u32> = StageName::all().iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(StageName::first().order(), 1);
        assert_eq!(StageName::LicenseIssuance.next(), None);
        assert_eq!(StageName::TeamReview.next(), Some(StageName::SecurityReview));
    }

    #[test]
    fn test_decide_approved_without_comment() {
        let mut stage = open_stage();
        stage
            .decide(ReviewResult::Approved, None, vec![], Utc::now())
            .unwrap();
        assert!(!stage.is_open());
        assert!(stage.reviewed_at.is_some());
    }

    #[test]
    fn test_decide_rejected_requires_comment() {
        let mut stage = open_stage();
        let err = stage
            .decide(ReviewResult::Rejected, Some("   ".to_string()), vec![], Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        // Validation failure leaves the stage untouched
        assert!(stage.is_open());
        assert!(stage.reviewed_at.is_none());
    }

    #[test]
    fn test_decide_twice_rejected() {
        let mut stage = open_stage();
        stage
            .decide(ReviewResult::Approved, None, vec![], Utc::now())
            .unwrap();
        let err = stage
            .decide(ReviewResult::Rejected, Some("no".to_string()), vec![], Utc::now())
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(stage.result, Some(ReviewResult::Approved));
    }

    #[test]
    fn test_checklist_recorded_with_decision() {
        let mut stage = open_stage();
        let checklist = vec![ChecklistItem {
            label: "PM approval attached".to_string(),
            checked: true,
        }];
        stage
            .decide(ReviewResult::Approved, None, checklist.clone(), Utc::now())
            .unwrap();
        assert_eq!(stage.checklist, checklist);
    }
}
