use crate::{
    domain::application::{ApplicationId, ApplicationStatus},
    domain::repository::{ApplicationRepository, ReviewStageRepository},
    domain::review_stage::{ReviewStageId, StageName},
    routing::{self, ReviewerRole},
    sla::{self, SlaStatus},
    CoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Sort key for the review queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QueueSortBy {
    #[default]
    #[serde(rename = "dueDate")]
    DueDate,
    #[serde(rename = "submittedAt")]
    SubmittedAt,
}

impl QueueSortBy {
    /// Parse the wire representation used in query strings
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "dueDate" => Some(QueueSortBy::DueDate),
            "submittedAt" => Some(QueueSortBy::SubmittedAt),
            _ => None,
        }
    }
}

/// Review queue query
#[derive(Debug, Clone, Default)]
pub struct ReviewQueueQuery {
    /// Restrict to stages the role is eligible for
    pub role: Option<ReviewerRole>,
    /// Restrict to applications in this status
    pub status: Option<ApplicationStatus>,
    /// Case-insensitive match on application number, applicant name or
    /// tool name
    pub search: Option<String>,
    pub sort_by: QueueSortBy,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

/// Default and maximum page sizes
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One work item in a reviewer's queue
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListItem {
    pub review_stage_id: ReviewStageId,
    pub application_id: ApplicationId,
    pub application_number: String,
    pub applicant_name: String,
    pub applicant_department: String,
    pub tool_names: Vec<String>,
    pub stage_name: StageName,
    pub stage_order: u32,
    pub due_date: NaiveDate,
    pub submitted_at: Option<DateTime<Utc>>,
    pub sla_status: SlaStatus,
    pub sla_label: String,
}

/// A page of results
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

/// Read-only view over the open stages: filters, sorts and paginates the
/// work queue. Never mutates workflow state.
pub struct ReviewQueueService {
    applications: Arc<dyn ApplicationRepository>,
    stages: Arc<dyn ReviewStageRepository>,
}

impl ReviewQueueService {
    /// Create a new review queue service
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        stages: Arc<dyn ReviewStageRepository>,
    ) -> Self {
        Self {
            applications,
            stages,
        }
    }

    /// List the review queue as of the given day
    pub async fn list(
        &self,
        query: &ReviewQueueQuery,
        today: NaiveDate,
    ) -> Result<Page<ReviewListItem>, CoreError> {
        let mut items = Vec::new();

        for stage in self.stages.find_open().await? {
            if let Some(role) = query.role {
                if !routing::can_decide(role, stage.stage_name) {
                    continue;
                }
            }

            let application = match self.applications.find_by_id(&stage.application_id).await? {
                Some(application) => application,
                None => {
                    warn!(stage = %stage.id, "open stage without application, skipping");
                    continue;
                }
            };

            if let Some(status) = query.status {
                if application.status != status {
                    continue;
                }
            }
            if let Some(search) = &query.search {
                let needle = search.to_lowercase();
                let matched = application
                    .application_number
                    .to_lowercase()
                    .contains(&needle)
                    || application.applicant.name.to_lowercase().contains(&needle)
                    || application
                        .tools
                        .iter()
                        .any(|t| t.tool_name.to_lowercase().contains(&needle));
                if !matched {
                    continue;
                }
            }

            items.push(ReviewListItem {
                review_stage_id: stage.id,
                application_id: application.id,
                application_number: application.application_number.clone(),
                applicant_name: application.applicant.name.clone(),
                applicant_department: application.applicant.department.clone(),
                tool_names: application
                    .tools
                    .iter()
                    .map(|t| t.tool_name.clone())
                    .collect(),
                stage_name: stage.stage_name,
                stage_order: stage.stage_order,
                due_date: stage.due_date,
                submitted_at: application.submitted_at,
                sla_status: sla::calculate_sla_status(stage.due_date, today),
                sla_label: sla::sla_label(stage.due_date, today),
            });
        }

        match query.sort_by {
            QueueSortBy::DueDate => items.sort_by_key(|item| item.due_date),
            QueueSortBy::SubmittedAt => items.sort_by_key(|item| item.submitted_at),
        }

        let total = items.len();
        let page = query.page.max(1);
        let page_size = if query.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size.min(MAX_PAGE_SIZE)
        };
        let start = (page as usize - 1).saturating_mul(page_size as usize);
        let items = if start >= total {
            Vec::new()
        } else {
            items
                .into_iter()
                .skip(start)
                .take(page_size as usize)
                .collect()
        };

        Ok(Page {
            items,
            total,
            page,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::application::{
        Applicant, Application, ApplicationId, Environment, NewApplication, ToolSelection,
    };
    use crate::domain::repository::ApplicationFilter;
    use crate::domain::review_stage::{ReviewStage, ReviewerRef};
    use async_trait::async_trait;
    use chrono::Duration;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        AppRepo {}

        #[async_trait]
        impl ApplicationRepository for AppRepo {
            async fn find_by_id(
                &self,
                id: &ApplicationId,
            ) -> Result<Option<Application>, CoreError>;
            async fn save(&self, application: &Application) -> Result<(), CoreError>;
            async fn delete(&self, id: &ApplicationId) -> Result<(), CoreError>;
            async fn list(
                &self,
                filter: &ApplicationFilter,
            ) -> Result<Vec<Application>, CoreError>;
        }
    }

    mock! {
        StageRepo {}

        #[async_trait]
        impl ReviewStageRepository for StageRepo {
            async fn find_by_id(
                &self,
                id: &ReviewStageId,
            ) -> Result<Option<ReviewStage>, CoreError>;
            async fn find_by_application(
                &self,
                application_id: &ApplicationId,
            ) -> Result<Vec<ReviewStage>, CoreError>;
            async fn find_open_by_application(
                &self,
                application_id: &ApplicationId,
            ) -> Result<Option<ReviewStage>, CoreError>;
            async fn find_open(&self) -> Result<Vec<ReviewStage>, CoreError>;
            async fn save(&self, stage: &ReviewStage) -> Result<(), CoreError>;
        }
    }

    fn application(name: &str) -> Application {
        let mut app = Application::new(
            format!("APP-2026-{}", name),
            NewApplication {
                applicant: Applicant {
                    user_id: format!("u-{}", name),
                    name: name.to_string(),
                    department: "Platform".to_string(),
                    position: "Engineer".to_string(),
                },
                tools: vec![ToolSelection {
                    tool_id: "t-1".to_string(),
                    tool_name: "Copilot".to_string(),
                }],
                environment: Environment::Vdi,
                purpose: "testing".to_string(),
                projects: vec![],
                attachments: vec![],
                security_agreement: None,
            },
            Utc::now(),
        );
        app.status = crate::ApplicationStatus::Submitted;
        app.submitted_at = Some(Utc::now());
        app
    }

    fn open_stage(app: &Application, stage_name: StageName, due_in_days: i64) -> ReviewStage {
        let now = Utc::now();
        ReviewStage::open(
            app.id,
            stage_name,
            stage_name.order(),
            ReviewerRef {
                user_id: "reviewer".to_string(),
                name: "Reviewer".to_string(),
                department: "Platform".to_string(),
            },
            (now + Duration::days(due_in_days)).date_naive(),
            now,
        )
    }

    fn service_over(
        applications: Vec<Application>,
        stages: Vec<ReviewStage>,
    ) -> ReviewQueueService {
        let by_id: HashMap<ApplicationId, Application> =
            applications.into_iter().map(|a| (a.id, a)).collect();

        let mut app_repo = MockAppRepo::new();
        app_repo
            .expect_find_by_id()
            .returning(move |id| Ok(by_id.get(id).cloned()));

        let mut stage_repo = MockStageRepo::new();
        stage_repo
            .expect_find_open()
            .returning(move || Ok(stages.clone()));

        ReviewQueueService::new(Arc::new(app_repo), Arc::new(stage_repo))
    }

    #[tokio::test]
    async fn test_queue_is_filtered_by_role_and_sorted_by_due_date() {
        let late = application("0001");
        let early = application("0002");
        let other = application("0003");
        let stages = vec![
            open_stage(&late, StageName::TeamReview, 5),
            open_stage(&early, StageName::TeamReview, 1),
            open_stage(&other, StageName::SecurityReview, 0),
        ];
        let service = service_over(vec![late, early, other], stages);

        let query = ReviewQueueQuery {
            role: Some(ReviewerRole::TeamLead),
            ..Default::default()
        };
        let page = service.list(&query, Utc::now().date_naive()).await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].application_number, "APP-2026-0002");
        assert_eq!(page.items[1].application_number, "APP-2026-0001");
        assert_eq!(page.items[0].sla_status, SlaStatus::Warning);
        assert_eq!(page.items[0].sla_label, "D-1");
    }

    #[tokio::test]
    async fn test_queue_search_and_pagination() {
        let apps: Vec<Application> = (1..=5)
            .map(|n| application(&format!("{:04}", n)))
            .collect();
        let stages: Vec<ReviewStage> = apps
            .iter()
            .enumerate()
            .map(|(i, app)| open_stage(app, StageName::TeamReview, i as i64 + 2))
            .collect();
        let service = service_over(apps, stages);

        let query = ReviewQueueQuery {
            role: Some(ReviewerRole::TeamLead),
            page: 2,
            page_size: 2,
            ..Default::default()
        };
        let page = service.list(&query, Utc::now().date_naive()).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);

        let query = ReviewQueueQuery {
            role: Some(ReviewerRole::TeamLead),
            search: Some("app-2026-0003".to_string()),
            ..Default::default()
        };
        let page = service.list(&query, Utc::now().date_naive()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].application_number, "APP-2026-0003");
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let app = application("0001");
        let stages = vec![open_stage(&app, StageName::TeamReview, 2)];
        let service = service_over(vec![app], stages);

        let query = ReviewQueueQuery {
            role: Some(ReviewerRole::TeamLead),
            page: u32::MAX,
            page_size: MAX_PAGE_SIZE,
            ..Default::default()
        };
        let page = service.list(&query, Utc::now().date_naive()).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.page, u32::MAX);
    }

    #[tokio::test]
    async fn test_admin_sees_every_stage() {
        let a = application("0001");
        let b = application("0002");
        let stages = vec![
            open_stage(&a, StageName::TeamReview, 2),
            open_stage(&b, StageName::LicenseIssuance, 2),
        ];
        let service = service_over(vec![a, b], stages);

        let query = ReviewQueueQuery {
            role: Some(ReviewerRole::Admin),
            ..Default::default()
        };
        let page = service.list(&query, Utc::now().date_naive()).await.unwrap();
        assert_eq!(page.total, 2);
    }
}
