//! Caller identity extraction
//!
//! Identity arrives via headers set by the corporate gateway in front of
//! this service: `x-user-id`, `x-user-name` and `x-user-role`. A missing
//! or unknown identity is rejected before any handler logic runs.

use axum::http::HeaderMap;

use tollgate_core::{Caller, CallerRole, ReviewerRole};

use super::errors::ApiError;

const USER_ID_HEADER: &str = "x-user-id";
const USER_NAME_HEADER: &str = "x-user-name";
const USER_ROLE_HEADER: &str = "x-user-role";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", name)))
}

/// Resolve the caller from the gateway identity headers
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let user_id = header_value(headers, USER_ID_HEADER)?.to_string();
    let name = header_value(headers, USER_NAME_HEADER)?.to_string();
    let role = header_value(headers, USER_ROLE_HEADER)?;

    let role = match role {
        "APPLICANT" => CallerRole::Applicant,
        other => match ReviewerRole::parse(other) {
            Some(reviewer) => CallerRole::Reviewer(reviewer),
            None => {
                return Err(ApiError::Unauthorized(format!(
                    "unknown role: {}",
                    other
                )))
            }
        },
    };

    Ok(Caller {
        user_id,
        name,
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(id: &str, name: &str, role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers.insert(USER_NAME_HEADER, HeaderValue::from_str(name).unwrap());
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        headers
    }

    #[test]
    fn test_applicant_identity() {
        let caller = caller_from_headers(&headers("u-1", "Kim", "APPLICANT")).unwrap();
        assert_eq!(caller.user_id, "u-1");
        assert!(matches!(caller.role, CallerRole::Applicant));
    }

    #[test]
    fn test_reviewer_identity() {
        let caller = caller_from_headers(&headers("lead", "Lee", "TEAM_LEAD")).unwrap();
        assert!(matches!(
            caller.role,
            CallerRole::Reviewer(ReviewerRole::TeamLead)
        ));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let err = caller_from_headers(&headers("u-1", "Kim", "WIZARD")).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let mut incomplete = HeaderMap::new();
        incomplete.insert(USER_ID_HEADER, HeaderValue::from_static("u-1"));
        let err = caller_from_headers(&incomplete).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
