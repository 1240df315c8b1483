//! Stage router
//!
//! Maps reviewer roles to the pipeline stages they may decide. This is an
//! authorization boundary enforced inside `Decide`, independent of any
//! caller-side queue filtering.

use crate::domain::review_stage::StageName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reviewer roles known to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewerRole {
    TeamLead,
    SecurityReviewer,
    ItAdmin,
    LicenseManager,
    /// Administrative override: may act on every stage
    Admin,
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewerRole::TeamLead => "TEAM_LEAD",
            ReviewerRole::SecurityReviewer => "SECURITY_REVIEWER",
            ReviewerRole::ItAdmin => "IT_ADMIN",
            ReviewerRole::LicenseManager => "LICENSE_MANAGER",
            ReviewerRole::Admin => "ADMIN",
        };
        write!(f, "{}", s)
    }
}

impl ReviewerRole {
    /// Parse the wire representation, e.g. from an identity header
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TEAM_LEAD" => Some(ReviewerRole::TeamLead),
            "SECURITY_REVIEWER" => Some(ReviewerRole::SecurityReviewer),
            "IT_ADMIN" => Some(ReviewerRole::ItAdmin),
            "LICENSE_MANAGER" => Some(ReviewerRole::LicenseManager),
            "ADMIN" => Some(ReviewerRole::Admin),
            _ => None,
        }
    }
}

/// Stages a role is authorized to decide.
///
/// A feedback resubmission re-opens the same stage, so the same mapping
/// covers resubmitted stages.
pub fn eligible_stages(role: ReviewerRole) -> &'static [StageName] {
    match role {
        ReviewerRole::TeamLead => &[StageName::TeamReview],
        ReviewerRole::SecurityReviewer => &[StageName::SecurityReview],
        ReviewerRole::ItAdmin => &[StageName::EnvPreparation],
        ReviewerRole::LicenseManager => &[StageName::LicenseIssuance],
        ReviewerRole::Admin => StageName::all(),
    }
}

/// True if the role may decide the given stage
pub fn can_decide(role: ReviewerRole, stage: StageName) -> bool {
    eligible_stages(role).contains(&stage)
}
