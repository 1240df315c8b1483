//! In-memory state store implementation for the Tollgate platform
//!
//! This crate provides in-memory implementations of the repository
//! interfaces defined in the tollgate-core crate. It is primarily useful
//! for development, testing, and simple deployments where persistence is
//! not required.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod repositories;
pub use repositories::{
    InMemoryApplicationRepository, InMemoryCredentialRepository, InMemoryFeedbackRepository,
    InMemoryLicenseRepository, InMemoryProvisioningRepository, InMemoryReviewStageRepository,
    InMemorySequenceRepository, StaticReviewerDirectory,
};

use tollgate_core::domain::repository::{
    ApplicationRepository, CredentialRepository, FeedbackRepository, LicenseRepository,
    ProvisioningRepository, ReviewStageRepository, SequenceRepository,
};

use repositories::{ApplicationMap, CredentialMap, FeedbackList, LicenseMap, StageMap};

/// Provider bundling the in-memory repositories over shared storage
pub struct InMemoryStateProvider {
    applications: ApplicationMap,
    stages: StageMap,
    feedbacks: FeedbackList,
    licenses: LicenseMap,
    credentials: CredentialMap,
    sequences: Arc<InMemorySequenceRepository>,
}

impl InMemoryStateProvider {
    /// Create a new in-memory state provider
    pub fn new() -> Self {
        Self {
            applications: Arc::new(RwLock::new(HashMap::new())),
            stages: Arc::new(RwLock::new(HashMap::new())),
            feedbacks: Arc::new(RwLock::new(Vec::new())),
            licenses: Arc::new(RwLock::new(HashMap::new())),
            credentials: Arc::new(RwLock::new(HashMap::new())),
            sequences: Arc::new(InMemorySequenceRepository::new()),
        }
    }

    /// Application repository over the shared storage
    pub fn applications(&self) -> Arc<dyn ApplicationRepository> {
        Arc::new(InMemoryApplicationRepository::new(self.applications.clone()))
    }

    /// Review stage repository over the shared storage
    pub fn stages(&self) -> Arc<dyn ReviewStageRepository> {
        Arc::new(InMemoryReviewStageRepository::new(self.stages.clone()))
    }

    /// Feedback repository over the shared storage
    pub fn feedbacks(&self) -> Arc<dyn FeedbackRepository> {
        Arc::new(InMemoryFeedbackRepository::new(self.feedbacks.clone()))
    }

    /// License repository over the shared storage
    pub fn licenses(&self) -> Arc<dyn LicenseRepository> {
        Arc::new(InMemoryLicenseRepository::new(self.licenses.clone()))
    }

    /// Credential repository over the shared storage
    pub fn credentials(&self) -> Arc<dyn CredentialRepository> {
        Arc::new(InMemoryCredentialRepository::new(self.credentials.clone()))
    }

    /// Atomic provisioning over the shared storage
    pub fn provisioning(&self) -> Arc<dyn ProvisioningRepository> {
        Arc::new(InMemoryProvisioningRepository::new(
            self.licenses.clone(),
            self.credentials.clone(),
        ))
    }

    /// Shared sequence counters
    pub fn sequences(&self) -> Arc<dyn SequenceRepository> {
        self.sequences.clone()
    }
}

impl Default for InMemoryStateProvider {
    fn default() -> Self {
        Self::new()
    }
}
