//! Identity-provider abstraction and its wire-level response types.
//!
//! The provider trait speaks in raw provider terms (challenge names, error
//! codes, attribute lists). Everything above it translates those into the
//! crate's own types, so provider details never leak past this boundary.

use crate::error::Result;
use crate::types::TokenSet;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Error as the provider reported it, before translation into [`AuthError`].
///
/// [`AuthError`]: crate::error::AuthError
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a structured error
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    /// The request never produced a provider response
    #[error("transport error: {0}")]
    Transport(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Tokens as issued by the provider. The refresh token is absent when the
/// provider does not rotate it on renewal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticationResult {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

/// Response to an authentication attempt: either issued tokens or a named
/// challenge with an opaque session to thread through the follow-up call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    pub authentication_result: Option<AuthenticationResult>,
    pub challenge_name: Option<String>,
    pub session: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CodeDeliveryDetails {
    pub destination: String,
    pub delivery_medium: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUpResponse {
    pub user_confirmed: bool,
    pub code_delivery_details: Option<CodeDeliveryDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AssociateSoftwareTokenResponse {
    pub secret_code: String,
    pub session: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VerifySoftwareTokenResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeType {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetUserResponse {
    pub username: String,
    pub user_attributes: Vec<AttributeType>,
}

/// The operations this crate needs from an identity provider.
///
/// Implemented over HTTP by [`RestIdentityProvider`] and by hand-rolled fakes
/// in tests.
///
/// [`RestIdentityProvider`]: crate::rest::RestIdentityProvider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> ProviderResult<SignUpResponse>;

    async fn confirm_sign_up(&self, email: &str, code: &str) -> ProviderResult<()>;

    async fn resend_confirmation_code(&self, email: &str) -> ProviderResult<CodeDeliveryDetails>;

    async fn initiate_auth(&self, email: &str, password: &str) -> ProviderResult<AuthResponse>;

    /// Answer a pending challenge. `answer` is the MFA code or new password,
    /// depending on `challenge_name`.
    async fn respond_to_challenge(
        &self,
        username: &str,
        challenge_name: &str,
        session: &str,
        answer: &str,
    ) -> ProviderResult<AuthResponse>;

    async fn associate_software_token(
        &self,
        access_token: &str,
    ) -> ProviderResult<AssociateSoftwareTokenResponse>;

    async fn verify_software_token(
        &self,
        access_token: &str,
        code: &str,
    ) -> ProviderResult<VerifySoftwareTokenResponse>;

    async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> ProviderResult<()>;

    async fn forgot_password(&self, email: &str) -> ProviderResult<CodeDeliveryDetails>;

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ProviderResult<()>;

    async fn get_user(&self, access_token: &str) -> ProviderResult<GetUserResponse>;

    async fn global_sign_out(&self, access_token: &str) -> ProviderResult<()>;
}

/// Exchanges a refresh token for a fresh token set.
///
/// Split from [`IdentityProvider`] so the token manager depends on exactly
/// the one capability it needs, and tests can fake renewal without faking
/// the whole provider surface.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;
}
