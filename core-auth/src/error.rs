use crate::provider::ProviderError;
use thiserror::Error;

/// Errors surfaced by authentication and token operations.
///
/// Provider error codes are translated into these variants in exactly one
/// place, the [`From<ProviderError>`] impl below, so callers never see raw
/// provider codes.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Input rejected locally before any network call
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Wrong username or password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration attempted with an email that already has an account
    #[error("an account with this email already exists")]
    EmailExists,

    /// The account exists but has not confirmed its registration code
    #[error("account is not confirmed")]
    NotConfirmed,

    /// A confirmation or recovery code did not match
    #[error("invalid verification code")]
    InvalidCode,

    /// A confirmation or recovery code has expired
    #[error("verification code has expired")]
    CodeExpired,

    /// An MFA code was rejected
    #[error("invalid MFA code")]
    InvalidMfaCode,

    /// The provider is throttling requests
    #[error("too many attempts, slow down")]
    RateLimited,

    /// The provider reported an internal failure
    #[error("authentication service is unavailable")]
    ServiceUnavailable,

    /// The session can no longer be renewed and re-authentication is required
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// A token renewal attempt failed
    #[error("token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// The secure storage backend rejected an operation
    #[error("secure storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Stored token data could not be parsed and was discarded
    #[error("stored tokens were corrupted: {0}")]
    TokenCorrupted(String),

    /// A token could not be decoded
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// JSON encoding or decoding failed
    #[error("serialization error in {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A provider error with no dedicated variant
    #[error("authentication failed ({code}): {message}")]
    AuthenticationFailed { code: String, message: String },

    /// The request never produced a provider response
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Whether retrying the same operation (possibly with corrected input)
    /// can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AuthError::Validation { .. }
            | AuthError::InvalidCredentials
            | AuthError::NotConfirmed
            | AuthError::InvalidCode
            | AuthError::CodeExpired
            | AuthError::InvalidMfaCode
            | AuthError::RateLimited
            | AuthError::ServiceUnavailable
            | AuthError::Network(_) => true,
            AuthError::EmailExists
            | AuthError::SessionExpired(_)
            | AuthError::TokenRefreshFailed(_)
            | AuthError::StorageUnavailable(_)
            | AuthError::TokenCorrupted(_)
            | AuthError::InvalidToken(_)
            | AuthError::Serialization { .. }
            | AuthError::AuthenticationFailed { .. } => false,
        }
    }

    /// A short hint for the user about how to proceed, when one exists.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AuthError::InvalidCredentials => Some("Check your email and password and try again."),
            AuthError::EmailExists => Some("Sign in instead, or recover your password."),
            AuthError::NotConfirmed => {
                Some("Confirm your account with the code that was sent to you.")
            }
            AuthError::InvalidCode | AuthError::InvalidMfaCode => {
                Some("Re-enter the code, or request a new one.")
            }
            AuthError::CodeExpired => Some("Request a new code and try again."),
            AuthError::RateLimited => Some("Wait a moment before trying again."),
            AuthError::SessionExpired(_) => Some("Sign in again to continue."),
            _ => None,
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Service { code, message } => match code.as_str() {
                "NotAuthorizedException" => AuthError::InvalidCredentials,
                "UsernameExistsException" => AuthError::EmailExists,
                "UserNotConfirmedException" => AuthError::NotConfirmed,
                "CodeMismatchException" => AuthError::InvalidCode,
                "ExpiredCodeException" => AuthError::CodeExpired,
                "EnableSoftwareTokenMFAException" => AuthError::InvalidMfaCode,
                "TooManyRequestsException" | "LimitExceededException" => AuthError::RateLimited,
                "InternalErrorException" | "ServiceUnavailableException" => {
                    AuthError::ServiceUnavailable
                }
                "InvalidPasswordException" => AuthError::Validation {
                    field: "password".to_string(),
                    message,
                },
                _ => AuthError::AuthenticationFailed { code, message },
            },
            ProviderError::Transport(message) => AuthError::Network(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn service(code: &str) -> ProviderError {
        ProviderError::Service {
            code: code.to_string(),
            message: "detail".to_string(),
        }
    }

    #[test]
    fn test_provider_code_mapping() {
        assert!(matches!(
            AuthError::from(service("NotAuthorizedException")),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(service("UsernameExistsException")),
            AuthError::EmailExists
        ));
        assert!(matches!(
            AuthError::from(service("CodeMismatchException")),
            AuthError::InvalidCode
        ));
        assert!(matches!(
            AuthError::from(service("ExpiredCodeException")),
            AuthError::CodeExpired
        ));
        assert!(matches!(
            AuthError::from(service("LimitExceededException")),
            AuthError::RateLimited
        ));
        assert!(matches!(
            AuthError::from(service("ServiceUnavailableException")),
            AuthError::ServiceUnavailable
        ));
    }

    #[test]
    fn test_unknown_code_preserved() {
        let err = AuthError::from(service("SomethingNewException"));
        match err {
            AuthError::AuthenticationFailed { code, message } => {
                assert_eq!(code, "SomethingNewException");
                assert_eq!(message, "detail");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_transport_maps_to_network() {
        let err = AuthError::from(ProviderError::Transport("timeout".to_string()));
        assert!(matches!(err, AuthError::Network(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_recoverability() {
        assert!(AuthError::InvalidCredentials.is_recoverable());
        assert!(AuthError::RateLimited.is_recoverable());
        assert!(!AuthError::SessionExpired("reason".to_string()).is_recoverable());
        assert!(!AuthError::EmailExists.is_recoverable());
    }

    #[test]
    fn test_suggestions() {
        assert!(AuthError::InvalidCredentials.suggestion().is_some());
        assert!(AuthError::SessionExpired("x".to_string()).suggestion().is_some());
        assert!(AuthError::StorageUnavailable("x".to_string()).suggestion().is_none());
    }
}
