use crate::{
    domain::application::Application,
    domain::license::{
        Credential, CredentialId, CredentialStatus, License, LicenseId, LicenseStatus,
    },
    domain::repository::{
        CredentialRepository, LicenseRepository, ProvisioningRepository, SequenceRepository,
    },
    CoreError,
};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Smallest quota a license manager may grant
pub const MIN_QUOTA_LIMIT: u64 = 100_000;

/// Permitted license validity periods
pub const ALLOWED_VALIDITY_MONTHS: [u32; 3] = [6, 12, 24];

/// Quota and validity configuration supplied by the license manager at
/// the final approval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseConfig {
    pub quota_limit: u64,
    pub validity_months: u32,
}

impl LicenseConfig {
    /// Validate the reviewer-supplied configuration
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.quota_limit < MIN_QUOTA_LIMIT {
            return Err(CoreError::ValidationError(format!(
                "quotaLimit must be at least {}, got {}",
                MIN_QUOTA_LIMIT, self.quota_limit
            )));
        }
        if !ALLOWED_VALIDITY_MONTHS.contains(&self.validity_months) {
            return Err(CoreError::ValidationError(format!(
                "validityMonths must be one of {:?}, got {}",
                ALLOWED_VALIDITY_MONTHS, self.validity_months
            )));
        }
        Ok(())
    }
}

/// Synthesizes licenses and credentials at final approval and carries the
/// lifecycle operations on the issued resources.
pub struct ProvisioningService {
    licenses: Arc<dyn LicenseRepository>,
    credentials: Arc<dyn CredentialRepository>,
    batch: Arc<dyn ProvisioningRepository>,
    sequences: Arc<dyn SequenceRepository>,
}

impl ProvisioningService {
    /// Create a new provisioning service
    pub fn new(
        licenses: Arc<dyn LicenseRepository>,
        credentials: Arc<dyn CredentialRepository>,
        batch: Arc<dyn ProvisioningRepository>,
        sequences: Arc<dyn SequenceRepository>,
    ) -> Self {
        Self {
            licenses,
            credentials,
            batch,
            sequences,
        }
    }

    /// Provision one license/credential pair per selected tool.
    ///
    /// Idempotently guarded: an application that already holds licenses is
    /// rejected. The whole batch is inserted through one atomic repository
    /// call, so a failure leaves no partial state behind.
    pub async fn provision_for(
        &self,
        application: &Application,
        config: &LicenseConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<(License, Credential)>, CoreError> {
        config.validate()?;

        let existing = self.licenses.find_by_application(&application.id).await?;
        if !existing.is_empty() {
            return Err(CoreError::Conflict(format!(
                "application {} already has provisioned licenses",
                application.application_number
            )));
        }

        let expires_at = now
            .checked_add_months(Months::new(config.validity_months))
            .ok_or_else(|| {
                CoreError::ProvisioningFailure("expiry date out of range".to_string())
            })?;

        let mut licenses = Vec::with_capacity(application.tools.len());
        let mut credentials = Vec::with_capacity(application.tools.len());
        for tool in &application.tools {
            let license_number = self.sequences.next_license_number(now.year()).await?;
            let license = License {
                id: LicenseId::new(),
                license_number,
                application_id: application.id,
                user_id: application.applicant.user_id.clone(),
                tool_id: tool.tool_id.clone(),
                tool_name: tool.tool_name.clone(),
                environment: application.environment,
                status: LicenseStatus::Active,
                issued_at: now,
                expires_at,
                quota_limit: config.quota_limit,
                quota_used: 0,
            };
            let credential = Credential {
                id: CredentialId::new(),
                application_id: application.id,
                license_id: license.id,
                tool_name: tool.tool_name.clone(),
                masked_key: Credential::masked_key_for(Uuid::new_v4()),
                status: CredentialStatus::Active,
                issued_at: now,
                expires_at,
                usage_count: 0,
                quota_limit: config.quota_limit,
                quota_used: 0,
            };
            licenses.push(license);
            credentials.push(credential);
        }

        self.batch
            .provision(&licenses, &credentials)
            .await
            .map_err(|err| CoreError::ProvisioningFailure(err.to_string()))?;

        info!(
            application = %application.application_number,
            count = licenses.len(),
            "licenses and credentials provisioned"
        );

        Ok(licenses.into_iter().zip(credentials).collect())
    }

    /// Revoke an active license
    pub async fn revoke_license(&self, id: LicenseId) -> Result<License, CoreError> {
        let mut license = self
            .licenses
            .find_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("License {}", id)))?;

        license.revoke()?;
        self.licenses.save(&license).await?;

        info!(license = %license.license_number, "license revoked");
        Ok(license)
    }

    /// Record metered usage against an active license. Over-quota use is
    /// logged, not blocked.
    pub async fn record_usage(&self, id: LicenseId, amount: u64) -> Result<License, CoreError> {
        let mut license = self
            .licenses
            .find_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("License {}", id)))?;

        license.record_usage(amount)?;
        self.licenses.save(&license).await?;

        info!(
            license = %license.license_number,
            used = license.quota_used,
            "license usage recorded"
        );
        Ok(license)
    }

    /// Expire every active license whose expiry date has passed.
    /// Returns the number of licenses expired.
    pub async fn expire_due_licenses(&self, today: NaiveDate) -> Result<usize, CoreError> {
        let mut expired = 0;
        for mut license in self.licenses.find_all().await? {
            if license.is_expired_as_of(today) {
                license.expire()?;
                self.licenses.save(&license).await?;
                expired += 1;
            }
        }

        if expired > 0 {
            info!(count = expired, "licenses expired");
        }
        Ok(expired)
    }

    /// Replace a credential's masked key, keeping its identity
    pub async fn regenerate_credential(
        &self,
        id: CredentialId,
    ) -> Result<Credential, CoreError> {
        let mut credential = self
            .credentials
            .find_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Credential {}", id)))?;

        credential.regenerate(Utc::now())?;
        self.credentials.save(&credential).await?;

        info!(credential = %credential.id, "credential regenerated");
        Ok(credential)
    }

    /// Revoke a credential. Terminal and irreversible.
    pub async fn revoke_credential(&self, id: CredentialId) -> Result<Credential, CoreError> {
        let mut credential = self
            .credentials
            .find_by_id(&id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Credential {}", id)))?;

        credential.revoke()?;
        self.credentials.save(&credential).await?;

        info!(credential = %credential.id, "credential revoked");
        Ok(credential)
    }
}
