use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete set of session tokens issued by the identity provider.
///
/// A token set is only ever replaced wholesale: renewal produces a brand-new
/// `TokenSet`, never a field-by-field mutation of the stored one.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts token values.
///
/// # Examples
///
/// ```
/// use core_auth::TokenSet;
///
/// let tokens = TokenSet::new(
///     "access".to_string(),
///     "id".to_string(),
///     "refresh".to_string(),
///     3600,
/// );
/// assert_eq!(tokens.token_type, "Bearer");
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// Short-lived token used to authorize requests
    pub access_token: String,
    /// Token carrying identity claims
    pub id_token: String,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: String,
    /// Access token lifetime in seconds, as reported by the provider
    pub expires_in: i64,
    /// Always "Bearer"
    pub token_type: String,
}

impl TokenSet {
    /// Create a new token set with the standard "Bearer" token type.
    pub fn new(access_token: String, id_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            id_token,
            refresh_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// The authenticated identity derived from a stored ID token.
///
/// Computed on demand from the current token set and never cached
/// independently, so it cannot go stale relative to the tokens it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier from the token subject claim
    pub user_id: String,
    /// Email address, when the provider includes it
    pub email: Option<String>,
    /// Whether the email address has been verified
    pub email_verified: bool,
    /// Phone number, when enrolled
    pub phone_number: Option<String>,
    /// Whether the phone number has been verified
    pub phone_verified: bool,
    /// Group/claim membership, possibly empty
    pub groups: Vec<String>,
}

/// Named authentication challenge returned by a sign-in attempt.
///
/// Provider challenge names are normalized here so callers never branch on
/// provider-specific strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// A one-time MFA code is required to complete sign-in
    MfaRequired,
    /// The account must enroll an MFA factor before sign-in completes
    MfaSetup,
    /// The provider requires a new password before sign-in completes
    NewPasswordRequired,
    /// Any other provider-defined challenge, carried through verbatim
    Custom(String),
}

impl ChallengeKind {
    /// Normalize a provider challenge name.
    ///
    /// Both time-based and SMS MFA challenges map to [`ChallengeKind::MfaRequired`];
    /// the distinction is a delivery detail the caller does not branch on.
    pub fn from_provider_name(name: &str) -> Self {
        match name {
            "SOFTWARE_TOKEN_MFA" | "SMS_MFA" => ChallengeKind::MfaRequired,
            "MFA_SETUP" => ChallengeKind::MfaSetup,
            "NEW_PASSWORD_REQUIRED" => ChallengeKind::NewPasswordRequired,
            other => ChallengeKind::Custom(other.to_string()),
        }
    }

    /// Stable name for logging and serialization.
    pub fn as_str(&self) -> &str {
        match self {
            ChallengeKind::MfaRequired => "MFA_REQUIRED",
            ChallengeKind::MfaSetup => "MFA_SETUP",
            ChallengeKind::NewPasswordRequired => "NEW_PASSWORD_REQUIRED",
            ChallengeKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pending challenge: the named kind plus the opaque server-issued session
/// string that must be threaded through the matching follow-up call.
///
/// Consumed exactly once by the follow-up operation, then discarded. Mutually
/// exclusive with a stored token set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub kind: ChallengeKind,
    pub session: String,
}

/// Result of a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// Terminal success: tokens are stored and the identity is resolved.
    SignedIn {
        tokens: TokenSet,
        identity: Identity,
    },
    /// A follow-up operation is required; no tokens were stored.
    Challenge(Challenge),
}

impl SignInOutcome {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SignInOutcome::SignedIn { .. })
    }

    /// The pending challenge, when sign-in did not complete.
    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            SignInOutcome::Challenge(challenge) => Some(challenge),
            SignInOutcome::SignedIn { .. } => None,
        }
    }
}

/// Where a confirmation code was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDelivery {
    /// Masked destination (e.g., "j***@e***.com")
    pub destination: String,
    /// Delivery medium reported by the provider (e.g., "EMAIL", "SMS")
    pub medium: String,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// Whether the account is immediately usable without confirmation
    pub confirmed: bool,
    /// Where the confirmation code was sent, when confirmation is needed
    pub code_delivery: Option<CodeDelivery>,
}

/// Details returned when starting MFA enrollment.
#[derive(Clone, PartialEq, Eq)]
pub struct MfaSetup {
    /// Shared secret to enter manually into an authenticator app
    pub secret_code: String,
    /// Ready-to-render `otpauth://` URI embedding the secret and account label
    pub otpauth_uri: String,
}

impl fmt::Debug for MfaSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MfaSetup")
            .field("secret_code", &"[REDACTED]")
            .field("otpauth_uri", &"[REDACTED]")
            .finish()
    }
}
