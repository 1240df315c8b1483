//! In-memory repository implementations
//!
//! Storage is shared `Arc<RwLock<HashMap>>` maps so multiple repository
//! handles can point at the same data, mirroring how a shared database
//! would behave in a real deployment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use tollgate_core::domain::repository::{
    ApplicationFilter, ApplicationRepository, CredentialRepository, FeedbackRepository,
    LicenseRepository, ProvisioningRepository, ReviewStageRepository, ReviewerDirectory,
    SequenceRepository,
};
use tollgate_core::{
    Application, ApplicationId, CoreError, Credential, CredentialId, License, LicenseId,
    ReviewFeedback, ReviewStage, ReviewStageId, ReviewerRef, StageName,
};

pub(crate) type ApplicationMap = Arc<RwLock<HashMap<Uuid, Application>>>;
pub(crate) type StageMap = Arc<RwLock<HashMap<Uuid, ReviewStage>>>;
pub(crate) type FeedbackList = Arc<RwLock<Vec<ReviewFeedback>>>;
pub(crate) type LicenseMap = Arc<RwLock<HashMap<Uuid, License>>>;
pub(crate) type CredentialMap = Arc<RwLock<HashMap<Uuid, Credential>>>;

/// In-memory application repository with optimistic-concurrency saves
pub struct InMemoryApplicationRepository {
    applications: ApplicationMap,
}

impl InMemoryApplicationRepository {
    /// Create a repository over shared storage
    pub fn new(applications: ApplicationMap) -> Self {
        Self { applications }
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn find_by_id(&self, id: &ApplicationId) -> Result<Option<Application>, CoreError> {
        let applications = self.applications.read().await;
        Ok(applications.get(&id.0).cloned())
    }

    async fn save(&self, application: &Application) -> Result<(), CoreError> {
        let mut applications = self.applications.write().await;

        if let Some(stored) = applications.get(&application.id.0) {
            if stored.version != application.version {
                debug!(
                    application = %application.application_number,
                    stored = stored.version,
                    saved = application.version,
                    "version mismatch on save"
                );
                return Err(CoreError::Conflict(format!(
                    "application {} was modified concurrently (stored version {}, save version {})",
                    application.application_number, stored.version, application.version
                )));
            }
        }

        let mut to_store = application.clone();
        to_store.version += 1;
        applications.insert(application.id.0, to_store);
        Ok(())
    }

    async fn delete(&self, id: &ApplicationId) -> Result<(), CoreError> {
        let mut applications = self.applications.write().await;
        applications.remove(&id.0);
        Ok(())
    }

    async fn list(&self, filter: &ApplicationFilter) -> Result<Vec<Application>, CoreError> {
        let applications = self.applications.read().await;
        let mut result: Vec<Application> = applications
            .values()
            .filter(|app| {
                filter.status.map_or(true, |status| app.status == status)
                    && filter
                        .applicant_user_id
                        .as_deref()
                        .map_or(true, |user| app.applicant.user_id == user)
            })
            .cloned()
            .collect();
        result.sort_by_key(|app| app.created_at);
        Ok(result)
    }
}

/// In-memory review stage repository.
///
/// Enforces the write-time invariants: at most one open stage per
/// application and decided results are immutable.
pub struct InMemoryReviewStageRepository {
    stages: StageMap,
}

impl InMemoryReviewStageRepository {
    /// Create a repository over shared storage
    pub fn new(stages: StageMap) -> Self {
        Self { stages }
    }
}

#[async_trait]
impl ReviewStageRepository for InMemoryReviewStageRepository {
    async fn find_by_id(&self, id: &ReviewStageId) -> Result<Option<ReviewStage>, CoreError> {
        let stages = self.stages.read().await;
        Ok(stages.get(&id.0).cloned())
    }

    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ReviewStage>, CoreError> {
        let stages = self.stages.read().await;
        let mut result: Vec<ReviewStage> = stages
            .values()
            .filter(|stage| stage.application_id == *application_id)
            .cloned()
            .collect();
        result.sort_by_key(|stage| (stage.stage_order, stage.created_at));
        Ok(result)
    }

    async fn find_open_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<ReviewStage>, CoreError> {
        let stages = self.stages.read().await;
        Ok(stages
            .values()
            .find(|stage| stage.application_id == *application_id && stage.is_open())
            .cloned())
    }

    async fn find_open(&self) -> Result<Vec<ReviewStage>, CoreError> {
        let stages = self.stages.read().await;
        let mut result: Vec<ReviewStage> =
            stages.values().filter(|stage| stage.is_open()).cloned().collect();
        result.sort_by_key(|stage| stage.created_at);
        Ok(result)
    }

    async fn save(&self, stage: &ReviewStage) -> Result<(), CoreError> {
        let mut stages = self.stages.write().await;

        if let Some(stored) = stages.get(&stage.id.0) {
            if stored.result.is_some() && stage.result != stored.result {
                return Err(CoreError::Conflict(format!(
                    "review stage {} is already decided",
                    stage.id
                )));
            }
        }

        if stage.is_open() {
            let other_open = stages.values().any(|existing| {
                existing.application_id == stage.application_id
                    && existing.id != stage.id
                    && existing.is_open()
            });
            if other_open {
                return Err(CoreError::Conflict(format!(
                    "application {} already has an open review stage",
                    stage.application_id
                )));
            }
        }

        stages.insert(stage.id.0, stage.clone());
        Ok(())
    }
}

/// In-memory append-only feedback store
pub struct InMemoryFeedbackRepository {
    feedbacks: FeedbackList,
}

impl InMemoryFeedbackRepository {
    /// Create a repository over shared storage
    pub fn new(feedbacks: FeedbackList) -> Self {
        Self { feedbacks }
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackRepository {
    async fn append(&self, feedback: &ReviewFeedback) -> Result<(), CoreError> {
        let mut feedbacks = self.feedbacks.write().await;
        feedbacks.push(feedback.clone());
        Ok(())
    }

    async fn find_by_stage(
        &self,
        review_stage_id: &ReviewStageId,
    ) -> Result<Vec<ReviewFeedback>, CoreError> {
        let feedbacks = self.feedbacks.read().await;
        Ok(feedbacks
            .iter()
            .filter(|f| f.review_stage_id == *review_stage_id)
            .cloned()
            .collect())
    }

    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<ReviewFeedback>, CoreError> {
        let feedbacks = self.feedbacks.read().await;
        Ok(feedbacks
            .iter()
            .filter(|f| f.application_id == *application_id)
            .cloned()
            .collect())
    }
}

/// In-memory license repository
pub struct InMemoryLicenseRepository {
    licenses: LicenseMap,
}

impl InMemoryLicenseRepository {
    /// Create a repository over shared storage
    pub fn new(licenses: LicenseMap) -> Self {
        Self { licenses }
    }
}

#[async_trait]
impl LicenseRepository for InMemoryLicenseRepository {
    async fn find_by_id(&self, id: &LicenseId) -> Result<Option<License>, CoreError> {
        let licenses = self.licenses.read().await;
        Ok(licenses.get(&id.0).cloned())
    }

    async fn save(&self, license: &License) -> Result<(), CoreError> {
        let mut licenses = self.licenses.write().await;
        licenses.insert(license.id.0, license.clone());
        Ok(())
    }

    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<License>, CoreError> {
        let licenses = self.licenses.read().await;
        let mut result: Vec<License> = licenses
            .values()
            .filter(|l| l.application_id == *application_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.license_number.cmp(&b.license_number));
        Ok(result)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<License>, CoreError> {
        let licenses = self.licenses.read().await;
        let mut result: Vec<License> = licenses
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.license_number.cmp(&b.license_number));
        Ok(result)
    }

    async fn find_all(&self) -> Result<Vec<License>, CoreError> {
        let licenses = self.licenses.read().await;
        Ok(licenses.values().cloned().collect())
    }
}

/// In-memory credential repository
pub struct InMemoryCredentialRepository {
    credentials: CredentialMap,
}

impl InMemoryCredentialRepository {
    /// Create a repository over shared storage
    pub fn new(credentials: CredentialMap) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn find_by_id(&self, id: &CredentialId) -> Result<Option<Credential>, CoreError> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(&id.0).cloned())
    }

    async fn save(&self, credential: &Credential) -> Result<(), CoreError> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(credential.id.0, credential.clone());
        Ok(())
    }

    async fn find_by_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Credential>, CoreError> {
        let credentials = self.credentials.read().await;
        Ok(credentials
            .values()
            .filter(|c| c.application_id == *application_id)
            .cloned()
            .collect())
    }
}

/// Atomic provisioning over the shared license and credential maps.
///
/// Both write locks are held for the whole batch so either every record
/// lands or none does.
pub struct InMemoryProvisioningRepository {
    licenses: LicenseMap,
    credentials: CredentialMap,
}

impl InMemoryProvisioningRepository {
    /// Create a repository over shared storage
    pub fn new(licenses: LicenseMap, credentials: CredentialMap) -> Self {
        Self {
            licenses,
            credentials,
        }
    }
}

#[async_trait]
impl ProvisioningRepository for InMemoryProvisioningRepository {
    async fn provision(
        &self,
        licenses: &[License],
        credentials: &[Credential],
    ) -> Result<(), CoreError> {
        let mut license_map = self.licenses.write().await;
        let mut credential_map = self.credentials.write().await;

        // Validate the whole batch before inserting anything
        for license in licenses {
            if license_map.contains_key(&license.id.0) {
                return Err(CoreError::Conflict(format!(
                    "license {} already exists",
                    license.id
                )));
            }
        }
        for credential in credentials {
            if credential_map.contains_key(&credential.id.0) {
                return Err(CoreError::Conflict(format!(
                    "credential {} already exists",
                    credential.id
                )));
            }
        }

        for license in licenses {
            license_map.insert(license.id.0, license.clone());
        }
        for credential in credentials {
            credential_map.insert(credential.id.0, credential.clone());
        }
        Ok(())
    }
}

/// In-memory per-year sequence counters
pub struct InMemorySequenceRepository {
    counters: Arc<RwLock<HashMap<(String, i32), u64>>>,
}

impl InMemorySequenceRepository {
    /// Create a new sequence repository
    pub fn new() -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn next(&self, prefix: &str, year: i32) -> u64 {
        let mut counters = self.counters.write().await;
        let counter = counters.entry((prefix.to_string(), year)).or_insert(0);
        *counter += 1;
        *counter
    }
}

impl Default for InMemorySequenceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SequenceRepository for InMemorySequenceRepository {
    async fn next_application_number(&self, year: i32) -> Result<String, CoreError> {
        let seq = self.next("APP", year).await;
        Ok(format!("APP-{}-{:04}", year, seq))
    }

    async fn next_license_number(&self, year: i32) -> Result<String, CoreError> {
        let seq = self.next("LIC", year).await;
        Ok(format!("LIC-{}-{:04}", year, seq))
    }
}

/// Static stage-to-reviewer assignment table.
///
/// Stands in for the HR directory collaborator; resolution still happens
/// at stage-entry time so reassignments apply to stages entered later.
pub struct StaticReviewerDirectory {
    assignments: RwLock<HashMap<StageName, ReviewerRef>>,
}

impl StaticReviewerDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
        }
    }

    /// Directory with one placeholder reviewer per stage
    pub fn with_defaults() -> Self {
        let defaults = [
            (StageName::TeamReview, "team-lead", "Team Lead", "Engineering"),
            (StageName::SecurityReview, "sec-reviewer", "Security Reviewer", "Security"),
            (StageName::EnvPreparation, "it-admin", "IT Admin", "IT"),
            (StageName::LicenseIssuance, "license-manager", "License Manager", "IT"),
        ];
        let assignments = defaults
            .into_iter()
            .map(|(stage, user_id, name, department)| {
                (
                    stage,
                    ReviewerRef {
                        user_id: user_id.to_string(),
                        name: name.to_string(),
                        department: department.to_string(),
                    },
                )
            })
            .collect();
        Self {
            assignments: RwLock::new(assignments),
        }
    }

    /// Assign a reviewer to a stage
    pub async fn assign(&self, stage: StageName, reviewer: ReviewerRef) {
        let mut assignments = self.assignments.write().await;
        assignments.insert(stage, reviewer);
    }
}

impl Default for StaticReviewerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewerDirectory for StaticReviewerDirectory {
    async fn resolve(&self, stage: StageName) -> Result<ReviewerRef, CoreError> {
        let assignments = self.assignments.read().await;
        assignments
            .get(&stage)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("Reviewer for stage {}", stage)))
    }
}
