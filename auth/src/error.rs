use cassh_common::views::ApiErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("Invalid state - possible CSRF attack")]
    UnknownState,

    #[error("Invalid nonce - possible replay attack")]
    NonceMismatch,

    #[error("Failed to exchange authorization code: {0}")]
    TokenExchange(String),

    #[error("Failed to verify ID token: {0}")]
    TokenVerification(String),

    #[error("Failed to parse identity claims: {0}")]
    ClaimsParse(String),

    #[error("Failed to generate random data: {0}")]
    RandomGeneration(String),

    #[error("Failed to set up identity provider: {0}")]
    Discovery(String),
}

impl AuthError {
    /// Errors that may indicate a forged or replayed callback. These are
    /// reported to clients without any detail.
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, Self::UnknownState | Self::NonceMismatch)
    }
}

impl From<AuthError> for ApiErrorResponse {
    fn from(err: AuthError) -> Self {
        let (code, message) = match &err {
            AuthError::MissingParameter(_) => (
                "BadRequest",
                "The request is missing required parameters.",
            ),
            AuthError::UnknownState | AuthError::NonceMismatch => (
                "AuthenticationRejected",
                "The sign-in request was rejected. Please start again.",
            ),
            AuthError::TokenExchange(_) => (
                "UpstreamError",
                "The identity provider could not complete the sign-in. Please start again.",
            ),
            AuthError::TokenVerification(_) | AuthError::ClaimsParse(_) => (
                "AuthenticationFailed",
                "Your identity could not be verified.",
            ),
            AuthError::RandomGeneration(_) | AuthError::Discovery(_) => (
                "InternalError",
                "Something went wrong on our end. Please try again later.",
            ),
        };

        let details = if err.is_security_rejection() {
            None
        } else if cfg!(debug_assertions) {
            Some(err.to_string())
        } else {
            None
        };

        ApiErrorResponse {
            code: Some(code.into()),
            message: message.into(),
            details,
        }
    }
}
