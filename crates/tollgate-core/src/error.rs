use thiserror::Error;

/// Core error type for the Tollgate workflow engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Entity not found
    #[error("{0} not found")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Caller is not allowed to perform the action
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    /// Operation is not valid for the current state
    #[error("Invalid state: current state is {current}, expected {expected}")]
    InvalidState {
        /// The state the entity is actually in
        current: String,
        /// The state the operation requires
        expected: String,
    },

    /// Concurrent modification detected
    #[error("Conflict: {0}")]
    Conflict(String),

    /// License or credential creation failed
    #[error("Provisioning failure: {0}")]
    ProvisioningFailure(String),

    /// State store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Build an InvalidState error from anything stringly-typed
    pub fn invalid_state(current: impl Into<String>, expected: impl Into<String>) -> Self {
        CoreError::InvalidState {
            current: current.into(),
            expected: expected.into(),
        }
    }

    /// Check if the error is a state-transition rejection
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, CoreError::InvalidState { .. })
    }

    /// Check if the error is an authorization rejection
    pub fn is_authorization_error(&self) -> bool {
        matches!(self, CoreError::AuthorizationError(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}
