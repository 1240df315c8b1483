use crate::domain::application::{ApplicationId, Environment};
use crate::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Value object: License ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseId(pub Uuid);

impl LicenseId {
    /// Generate a fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// License status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseStatus {
    Active,
    Expired,
    Revoked,
    Suspended,
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LicenseStatus::Active => "ACTIVE",
            LicenseStatus::Expired => "EXPIRED",
            LicenseStatus::Revoked => "REVOKED",
            LicenseStatus::Suspended => "SUSPENDED",
        };
        write!(f, "{}", s)
    }
}

/// A tool license issued at final approval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    /// Unique identifier
    pub id: LicenseId,

    /// Human-readable sequential number, e.g. LIC-2026-0001
    pub license_number: String,

    /// Application whose approval created this license
    pub application_id: ApplicationId,

    /// Owning user
    pub user_id: String,

    pub tool_id: String,
    pub tool_name: String,
    pub environment: Environment,

    pub status: LicenseStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Monthly token quota granted by the license manager
    pub quota_limit: u64,

    /// Consumed quota; monotonically non-decreasing while ACTIVE.
    /// quota_used <= quota_limit is a soft invariant, alerted not enforced.
    pub quota_used: u64,
}

impl License {
    /// Revoke an active license (terminal)
    pub fn revoke(&mut self) -> Result<(), CoreError> {
        if self.status != LicenseStatus::Active {
            return Err(CoreError::invalid_state(self.status.to_string(), "ACTIVE"));
        }
        self.status = LicenseStatus::Revoked;
        Ok(())
    }

    /// Mark an active license expired once its expiry date has passed
    pub fn expire(&mut self) -> Result<(), CoreError> {
        if self.status != LicenseStatus::Active {
            return Err(CoreError::invalid_state(self.status.to_string(), "ACTIVE"));
        }
        self.status = LicenseStatus::Expired;
        Ok(())
    }

    /// True if the license should be expired as of the given date
    pub fn is_expired_as_of(&self, today: NaiveDate) -> bool {
        self.status == LicenseStatus::Active && self.expires_at.date_naive() < today
    }

    /// Record consumed quota. Over-quota usage is logged, not blocked.
    pub fn record_usage(&mut self, amount: u64) -> Result<(), CoreError> {
        if self.status != LicenseStatus::Active {
            return Err(CoreError::invalid_state(self.status.to_string(), "ACTIVE"));
        }
        self.quota_used = self.quota_used.saturating_add(amount);
        if self.quota_used > self.quota_limit {
            warn!(
                license = %self.license_number,
                used = self.quota_used,
                limit = self.quota_limit,
                "license quota exceeded"
            );
        }
        Ok(())
    }
}

/// Value object: Credential ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    /// Generate a fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credential status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialStatus {
    Active,
    Revoked,
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialStatus::Active => "ACTIVE",
            CredentialStatus::Revoked => "REVOKED",
        };
        write!(f, "{}", s)
    }
}

/// API key record, issued 1:1 with each license.
///
/// Only a masked representation is held here; the raw secret is
/// materialized by the external secrets issuer and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Unique identifier; stable across regenerations
    pub id: CredentialId,

    /// Application whose approval created this credential
    pub application_id: ApplicationId,

    /// Paired license
    pub license_id: LicenseId,

    pub tool_name: String,

    /// Display-only masked key, e.g. tg-****-****-3fa1
    pub masked_key: String,

    pub status: CredentialStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Number of API calls observed for this key
    pub usage_count: u64,

    pub quota_limit: u64,
    pub quota_used: u64,
}

impl Credential {
    /// Synthesize a masked key representation from a fresh random suffix
    pub fn masked_key_for(suffix_source: Uuid) -> String {
        let simple = suffix_source.simple().to_string();
        let suffix = &simple[simple.len() - 4..];
        format!("tg-****-****-{}", suffix)
    }

    /// Replace the masked representation and reset the issuance timestamp.
    /// Identity and expiry are unchanged.
    pub fn regenerate(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status != CredentialStatus::Active {
            return Err(CoreError::invalid_state(self.status.to_string(), "ACTIVE"));
        }
        self.masked_key = Self::masked_key_for(Uuid::new_v4());
        self.issued_at = now;
        Ok(())
    }

    /// Revoke the credential. Terminal and irreversible.
    pub fn revoke(&mut self) -> Result<(), CoreError> {
        if self.status != CredentialStatus::Active {
            return Err(CoreError::invalid_state(self.status.to_string(), "ACTIVE"));
        }
        self.status = CredentialStatus::Revoked;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn license() -> License {
        let now = Utc::now();
        License {
            id: LicenseId::new(),
            license_number: "LIC-2026-0001".to_string(),
            application_id: ApplicationId::new(),
            user_id: "u-100".to_string(),
            tool_id: "t-1".to_string(),
            tool_name: "Copilot".to_string(),
            environment: Environment::Vdi,
            status: LicenseStatus::Active,
            issued_at: now,
            expires_at: now + Duration::days(365),
            quota_limit: 1_000_000,
            quota_used: 0,
        }
    }

    fn credential(license: &License) -> Credential {
        Credential {
            id: CredentialId::new(),
            application_id: license.application_id,
            license_id: license.id,
            tool_name: license.tool_name.clone(),
            masked_key: Credential::masked_key_for(Uuid::new_v4()),
            status: CredentialStatus::Active,
            issued_at: license.issued_at,
            expires_at: license.expires_at,
            usage_count: 0,
            quota_limit: license.quota_limit,
            quota_used: 0,
        }
    }

    #[test]
    fn test_revoke_is_terminal() {
        let mut lic = license();
        lic.revoke().unwrap();
        assert_eq!(lic.status, LicenseStatus::Revoked);
        assert!(lic.revoke().is_err());
        assert!(lic.expire().is_err());
    }

    #[test]
    fn test_expiry_check_uses_date() {
        let mut lic = license();
        let future = (Utc::now() + Duration::days(400)).date_naive();
        assert!(lic.is_expired_as_of(future));
        lic.expire().unwrap();
        assert_eq!(lic.status, LicenseStatus::Expired);
    }

    #[test]
    fn test_usage_over_quota_is_soft() {
        let mut lic = license();
        lic.record_usage(lic.quota_limit + 1).unwrap();
        assert!(lic.quota_used > lic.quota_limit);
        assert_eq!(lic.status, LicenseStatus::Active);
    }

    #[test]
    fn test_masked_key_shape() {
        let key = Credential::masked_key_for(Uuid::new_v4());
        assert!(key.starts_with("tg-****-****-"));
        assert_eq!(key.len(), "tg-****-****-".len() + 4);
    }

    #[test]
    fn test_regenerate_keeps_identity() {
        let lic = license();
        let mut cred = credential(&lic);
        let id = cred.id;
        let old_key = cred.masked_key.clone();

        let expires = cred.expires_at;
        cred.regenerate(Utc::now()).unwrap();
        assert_eq!(cred.id, id);
        assert_ne!(cred.masked_key, old_key);
        assert_eq!(cred.expires_at, expires);
    }

    #[test]
    fn test_credential_revoke_irreversible() {
        let lic = license();
        let mut cred = credential(&lic);
        cred.revoke().unwrap();
        assert!(cred.regenerate(Utc::now()).is_err());
        assert!(cred.revoke().is_err());
    }
}
