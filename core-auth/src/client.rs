//! Sign-up, sign-in, challenge, and sign-out flows.

use crate::error::{AuthError, Result};
use crate::jwt::{self, Claims};
use crate::provider::{AuthResponse, AuthenticationResult, IdentityProvider, TokenRefresher};
use crate::rest::RestIdentityProvider;
use crate::token_manager::TokenManager;
use crate::types::{
    Challenge, ChallengeKind, CodeDelivery, Identity, MfaSetup, SignInOutcome, SignUpOutcome,
    TokenSet,
};
use crate::validate;
use bridge_traits::{Clock, SecureStore, SystemClock};
use core_runtime::config::CoreConfig;
use core_runtime::events::{AuthEvent, EventBus, SessionStatus};
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use url::Url;

/// Sign-in interrupted by a challenge: what the provider needs echoed back.
#[derive(Clone)]
struct PendingSignIn {
    username: String,
    // provider's own challenge name, echoed verbatim in the response call
    challenge_name: String,
}

/// Entry point for the authentication flows.
///
/// Owns a [`TokenManager`] for the session it establishes and an [`EventBus`]
/// on which every state transition is announced. Clone-cheap handles are not
/// provided; share an `Arc<AuthClient>` instead.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    tokens: Arc<TokenManager>,
    events: EventBus,
    totp_issuer: String,
    pending: RwLock<Option<PendingSignIn>>,
}

impl AuthClient {
    /// Build a client against the HTTP provider described by `config`.
    pub fn new(config: &CoreConfig) -> Self {
        let provider = Arc::new(RestIdentityProvider::new(
            config.endpoint_url(),
            config.client_id.clone(),
            config.http_client.clone(),
        ));
        Self::with_components(
            provider.clone(),
            provider,
            config.secure_store.clone(),
            Arc::new(SystemClock),
            EventBus::new(config.event_buffer),
            config.refresh_threshold_secs,
            config.refresh_wait_secs,
            config.totp_issuer.clone(),
        )
    }

    /// Build a client from explicit components. Primarily for tests and
    /// hosts that substitute their own provider transport.
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        provider: Arc<dyn IdentityProvider>,
        refresher: Arc<dyn TokenRefresher>,
        secure_store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        refresh_threshold_secs: i64,
        refresh_wait_secs: u64,
        totp_issuer: String,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(
            secure_store,
            refresher,
            events.clone(),
            clock,
            refresh_threshold_secs,
            refresh_wait_secs,
        ));
        Self {
            provider,
            tokens,
            events,
            totp_issuer,
            pending: RwLock::new(None),
        }
    }

    /// The token manager backing this client's session.
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Register a new account. Inputs are validated locally before any
    /// network call is made.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        validate::email(email)?;
        validate::password(password)?;

        let response = self.provider.sign_up(email, password).await?;
        info!(confirmed = response.user_confirmed, "account registered");
        Ok(SignUpOutcome {
            confirmed: response.user_confirmed,
            code_delivery: response.code_delivery_details.map(|d| CodeDelivery {
                destination: d.destination,
                medium: d.delivery_medium,
            }),
        })
    }

    /// Confirm a registration with the emailed code.
    pub async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<()> {
        validate::email(email)?;
        self.provider.confirm_sign_up(email, code).await?;
        Ok(())
    }

    /// Ask the provider to send a fresh confirmation code.
    pub async fn resend_confirmation_code(&self, email: &str) -> Result<CodeDelivery> {
        validate::email(email)?;
        let details = self.provider.resend_confirmation_code(email).await?;
        Ok(CodeDelivery {
            destination: details.destination,
            medium: details.delivery_medium,
        })
    }

    /// Authenticate with email and password.
    ///
    /// Either completes the session immediately or returns a [`Challenge`]
    /// whose follow-up call finishes the flow.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInOutcome> {
        validate::email(email)?;

        let response = self.provider.initiate_auth(email, password).await?;
        self.handle_auth_response(email, response).await
    }

    /// Answer an MFA challenge with a one-time code.
    ///
    /// `session` is the opaque string carried by the challenge. A wrong code
    /// keeps the pending sign-in alive so the caller can retry.
    pub async fn verify_mfa(&self, code: &str, session: &str) -> Result<SignInOutcome> {
        let pending = self.pending_sign_in().await?;

        let response = self
            .provider
            .respond_to_challenge(&pending.username, &pending.challenge_name, session, code)
            .await
            .map_err(|e| refine_mfa_error(e.into()))?;

        self.handle_auth_response(&pending.username, response).await
    }

    /// Answer a forced password rotation challenge.
    pub async fn respond_to_new_password(
        &self,
        new_password: &str,
        session: &str,
    ) -> Result<SignInOutcome> {
        validate::password(new_password)?;
        let pending = self.pending_sign_in().await?;

        let response = self
            .provider
            .respond_to_challenge(
                &pending.username,
                "NEW_PASSWORD_REQUIRED",
                session,
                new_password,
            )
            .await?;

        self.handle_auth_response(&pending.username, response).await
    }

    /// Begin enrolling a TOTP authenticator for the signed-in user.
    ///
    /// Returns the shared secret plus an `otpauth://` URI ready for a QR
    /// code. Enrollment is finished by [`AuthClient::confirm_mfa_setup`].
    pub async fn setup_mfa(&self) -> Result<MfaSetup> {
        let access_token = self.require_access_token().await?;
        let response = self
            .provider
            .associate_software_token(&access_token)
            .await?;

        let account = self
            .current_user()
            .await
            .map(|identity| identity.email.unwrap_or(identity.user_id))
            .unwrap_or_else(|| "account".to_string());

        let otpauth_uri = build_otpauth_uri(&self.totp_issuer, &account, &response.secret_code)?;
        Ok(MfaSetup {
            secret_code: response.secret_code,
            otpauth_uri,
        })
    }

    /// Verify the first code from the newly enrolled authenticator.
    pub async fn confirm_mfa_setup(&self, code: &str) -> Result<()> {
        let access_token = self.require_access_token().await?;
        let response = self
            .provider
            .verify_software_token(&access_token, code)
            .await
            .map_err(|e| refine_mfa_error(e.into()))?;

        if response.status != "SUCCESS" {
            return Err(AuthError::InvalidMfaCode);
        }
        info!("MFA authenticator enrolled");
        Ok(())
    }

    /// Change the signed-in user's password.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        validate::password(new_password)?;
        let access_token = self.require_access_token().await?;
        self.provider
            .change_password(&access_token, old_password, new_password)
            .await?;
        Ok(())
    }

    /// Start account recovery for a forgotten password.
    pub async fn forgot_password(&self, email: &str) -> Result<CodeDelivery> {
        validate::email(email)?;
        let details = self.provider.forgot_password(email).await?;
        Ok(CodeDelivery {
            destination: details.destination,
            medium: details.delivery_medium,
        })
    }

    /// Finish account recovery with the emailed code and a new password.
    pub async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<()> {
        validate::email(email)?;
        validate::password(new_password)?;
        self.provider
            .confirm_forgot_password(email, code, new_password)
            .await?;
        Ok(())
    }

    /// End the session.
    ///
    /// The provider-side revocation is best effort; the local session is
    /// always cleared even when the network call fails, so sign-out cannot
    /// strand the user in a half-signed-in state.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        let user_id = self.current_user().await.map(|identity| identity.user_id);

        if let Ok(Some(tokens)) = self.tokens.get_tokens().await {
            if let Err(e) = self.provider.global_sign_out(&tokens.access_token).await {
                warn!(error = %e, "remote sign-out failed, clearing local session anyway");
            }
        }

        self.tokens.clear_tokens().await?;
        *self.pending.write().await = None;

        let _ = self.events.emit(AuthEvent::SignedOut { user_id });
        let _ = self.events.emit(AuthEvent::StateChanged {
            status: SessionStatus::Unauthenticated,
            user_id: None,
        });
        info!("signed out");
        Ok(())
    }

    /// The currently signed-in identity, derived from the stored ID token.
    ///
    /// Recomputed on every call so it can never go stale relative to the
    /// tokens. `None` when no session is stored or the token is unreadable.
    pub async fn current_user(&self) -> Option<Identity> {
        let tokens = self.tokens.get_tokens().await.ok().flatten()?;
        jwt::decode_claims(&tokens.id_token).map(identity_from_claims)
    }

    /// Fetch the profile from the provider instead of the local ID token.
    ///
    /// Useful when attributes changed server-side after the tokens were
    /// issued.
    pub async fn fetch_profile(&self) -> Result<Identity> {
        let access_token = self.require_access_token().await?;
        let response = self.provider.get_user(&access_token).await?;

        let attr = |name: &str| {
            response
                .user_attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.clone())
        };
        let flag = |name: &str| attr(name).is_some_and(|v| v == "true");

        let user_id = attr("sub");
        let email = attr("email");
        let email_verified = flag("email_verified");
        let phone_number = attr("phone_number");
        let phone_verified = flag("phone_number_verified");

        Ok(Identity {
            user_id: user_id.unwrap_or(response.username),
            email,
            email_verified,
            phone_number,
            phone_verified,
            groups: Vec::new(),
        })
    }

    /// Shared tail of every authentication response: tokens mean the session
    /// is established, a challenge name means the flow pauses.
    async fn handle_auth_response(
        &self,
        username: &str,
        response: AuthResponse,
    ) -> Result<SignInOutcome> {
        if let Some(result) = response.authentication_result {
            return self.complete_sign_in(result).await;
        }

        match (response.challenge_name, response.session) {
            (Some(name), Some(session)) => {
                *self.pending.write().await = Some(PendingSignIn {
                    username: username.to_string(),
                    challenge_name: name.clone(),
                });
                let kind = ChallengeKind::from_provider_name(&name);
                info!(challenge = %kind, "sign-in paused on challenge");
                Ok(SignInOutcome::Challenge(Challenge { kind, session }))
            }
            _ => Err(AuthError::AuthenticationFailed {
                code: "MalformedResponse".to_string(),
                message: "provider returned neither tokens nor a challenge".to_string(),
            }),
        }
    }

    /// Store the issued tokens and announce the session, in this order:
    /// tokens persisted first, then `SignedIn`, then `StateChanged`.
    async fn complete_sign_in(&self, result: AuthenticationResult) -> Result<SignInOutcome> {
        let tokens = TokenSet::new(
            result.access_token,
            result.id_token,
            result.refresh_token.unwrap_or_default(),
            result.expires_in,
        );

        let claims = jwt::decode_claims(&tokens.id_token)
            .ok_or_else(|| AuthError::InvalidToken("ID token claims unreadable".to_string()))?;
        let identity = identity_from_claims(claims);

        self.tokens.store_tokens(&tokens).await?;
        *self.pending.write().await = None;

        let _ = self.events.emit(AuthEvent::SignedIn {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
        });
        let _ = self.events.emit(AuthEvent::StateChanged {
            status: SessionStatus::Authenticated,
            user_id: Some(identity.user_id.clone()),
        });
        info!(user_id = %identity.user_id, "signed in");

        Ok(SignInOutcome::SignedIn { tokens, identity })
    }

    async fn pending_sign_in(&self) -> Result<PendingSignIn> {
        self.pending
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::SessionExpired("no sign-in in progress".to_string()))
    }

    /// The stored access token, without triggering a renewal.
    async fn require_access_token(&self) -> Result<String> {
        self.tokens
            .get_tokens()
            .await?
            .map(|t| t.access_token)
            .ok_or_else(|| AuthError::SessionExpired("not signed in".to_string()))
    }
}

fn identity_from_claims(claims: Claims) -> Identity {
    Identity {
        user_id: claims.sub,
        email: claims.email,
        email_verified: claims.email_verified,
        phone_number: claims.phone_number,
        phone_verified: claims.phone_number_verified,
        groups: claims.groups,
    }
}

/// An MFA code rejection reads better as its own variant than as a generic
/// code mismatch.
fn refine_mfa_error(err: AuthError) -> AuthError {
    match err {
        AuthError::InvalidCode => AuthError::InvalidMfaCode,
        other => other,
    }
}

fn build_otpauth_uri(issuer: &str, account: &str, secret: &str) -> Result<String> {
    let mut uri = Url::parse("otpauth://totp")
        .map_err(|e| AuthError::InvalidToken(format!("otpauth base URI: {e}")))?;
    uri.set_path(&format!("/{issuer}:{account}"));
    uri.query_pairs_mut()
        .append_pair("secret", secret)
        .append_pair("issuer", issuer);
    Ok(uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encode_token;
    use crate::provider::{
        AssociateSoftwareTokenResponse, CodeDeliveryDetails, GetUserResponse, ProviderError,
        ProviderResult, SignUpResponse, VerifySoftwareTokenResponse,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    const NOW: i64 = 1_700_000_000;

    fn id_token(sub: &str, email: Option<&str>) -> String {
        let mut claims = json!({ "sub": sub, "exp": NOW + 3600 });
        if let Some(email) = email {
            claims["email"] = json!(email);
            claims["email_verified"] = json!(true);
        }
        encode_token(&claims)
    }

    fn access_token() -> String {
        encode_token(&json!({ "sub": "user-1", "exp": NOW + 3600 }))
    }

    #[derive(Default)]
    struct MemoryStore {
        secrets: StdMutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SecureStore for MemoryStore {
        async fn set_secret(&self, key: &str, value: &str) -> bridge_traits::error::Result<()> {
            self.secrets
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> bridge_traits::error::Result<Option<String>> {
            Ok(self.secrets.lock().unwrap().get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> bridge_traits::error::Result<()> {
            self.secrets.lock().unwrap().remove(key);
            Ok(())
        }

        async fn clear_all(&self) -> bridge_traits::error::Result<()> {
            self.secrets.lock().unwrap().clear();
            Ok(())
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(NOW, 0).single().unwrap()
        }
    }

    /// Scripted provider: enqueue auth responses, flip failure flags.
    #[derive(Default)]
    struct FakeProvider {
        auth_responses: StdMutex<Vec<ProviderResult<AuthResponse>>>,
        challenge_responses: StdMutex<Vec<ProviderResult<AuthResponse>>>,
        calls: AtomicUsize,
        fail_sign_out: bool,
        verify_status: StdMutex<String>,
    }

    impl FakeProvider {
        fn with_auth(responses: Vec<ProviderResult<AuthResponse>>) -> Self {
            Self {
                auth_responses: StdMutex::new(responses),
                verify_status: StdMutex::new("SUCCESS".to_string()),
                ..Default::default()
            }
        }

        fn tokens_response() -> AuthResponse {
            AuthResponse {
                authentication_result: Some(AuthenticationResult {
                    access_token: access_token(),
                    id_token: id_token("user-1", Some("user@example.com")),
                    refresh_token: Some("refresh-1".to_string()),
                    expires_in: 3600,
                }),
                challenge_name: None,
                session: None,
            }
        }

        fn challenge_response(name: &str) -> AuthResponse {
            AuthResponse {
                authentication_result: None,
                challenge_name: Some(name.to_string()),
                session: Some("opaque-session".to_string()),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_up(&self, email: &str, _password: &str) -> ProviderResult<SignUpResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SignUpResponse {
                user_confirmed: false,
                code_delivery_details: Some(CodeDeliveryDetails {
                    destination: mask(email),
                    delivery_medium: "EMAIL".to_string(),
                }),
            })
        }

        async fn confirm_sign_up(&self, _email: &str, _code: &str) -> ProviderResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn resend_confirmation_code(
            &self,
            email: &str,
        ) -> ProviderResult<CodeDeliveryDetails> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CodeDeliveryDetails {
                destination: mask(email),
                delivery_medium: "EMAIL".to_string(),
            })
        }

        async fn initiate_auth(
            &self,
            _email: &str,
            _password: &str,
        ) -> ProviderResult<AuthResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.auth_responses.lock().unwrap().remove(0)
        }

        async fn respond_to_challenge(
            &self,
            _username: &str,
            _challenge_name: &str,
            _session: &str,
            _answer: &str,
        ) -> ProviderResult<AuthResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.challenge_responses.lock().unwrap().remove(0)
        }

        async fn associate_software_token(
            &self,
            _access_token: &str,
        ) -> ProviderResult<AssociateSoftwareTokenResponse> {
            Ok(AssociateSoftwareTokenResponse {
                secret_code: "JBSWY3DPEHPK3PXP".to_string(),
                session: None,
            })
        }

        async fn verify_software_token(
            &self,
            _access_token: &str,
            _code: &str,
        ) -> ProviderResult<VerifySoftwareTokenResponse> {
            Ok(VerifySoftwareTokenResponse {
                status: self.verify_status.lock().unwrap().clone(),
            })
        }

        async fn change_password(
            &self,
            _access_token: &str,
            _old_password: &str,
            _new_password: &str,
        ) -> ProviderResult<()> {
            Ok(())
        }

        async fn forgot_password(&self, email: &str) -> ProviderResult<CodeDeliveryDetails> {
            Ok(CodeDeliveryDetails {
                destination: mask(email),
                delivery_medium: "EMAIL".to_string(),
            })
        }

        async fn confirm_forgot_password(
            &self,
            _email: &str,
            _code: &str,
            _new_password: &str,
        ) -> ProviderResult<()> {
            Ok(())
        }

        async fn get_user(&self, _access_token: &str) -> ProviderResult<GetUserResponse> {
            Ok(GetUserResponse {
                username: "user-1".to_string(),
                user_attributes: vec![
                    crate::provider::AttributeType {
                        name: "sub".to_string(),
                        value: "user-1".to_string(),
                    },
                    crate::provider::AttributeType {
                        name: "email".to_string(),
                        value: "user@example.com".to_string(),
                    },
                    crate::provider::AttributeType {
                        name: "email_verified".to_string(),
                        value: "true".to_string(),
                    },
                ],
            })
        }

        async fn global_sign_out(&self, _access_token: &str) -> ProviderResult<()> {
            if self.fail_sign_out {
                return Err(ProviderError::Transport("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeProvider {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
            Ok(TokenSet::new(
                access_token(),
                id_token("user-1", Some("user@example.com")),
                refresh_token.to_string(),
                3600,
            ))
        }
    }

    fn mask(email: &str) -> String {
        format!("{}***", &email[..1])
    }

    fn client(provider: Arc<FakeProvider>) -> AuthClient {
        AuthClient::with_components(
            provider.clone(),
            provider,
            Arc::new(MemoryStore::default()),
            Arc::new(FixedClock),
            EventBus::new(16),
            300,
            10,
            "ExampleApp".to_string(),
        )
    }

    #[tokio::test]
    async fn test_sign_in_success_stores_tokens_and_orders_events() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::tokens_response(),
        )]));
        let client = client(provider);
        let mut events = client.subscribe();

        let outcome = client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();
        assert!(outcome.is_signed_in());

        // tokens are persisted before any announcement
        assert!(client.tokens().get_tokens().await.unwrap().is_some());

        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::TokenRefreshed { .. }
        ));
        match events.recv().await.unwrap() {
            AuthEvent::SignedIn { user_id, email } => {
                assert_eq!(user_id, "user-1");
                assert_eq!(email.as_deref(), Some("user@example.com"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events.recv().await.unwrap() {
            AuthEvent::StateChanged { status, user_id } => {
                assert_eq!(status, SessionStatus::Authenticated);
                assert_eq!(user_id.as_deref(), Some("user-1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_in_challenge_stores_nothing() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::challenge_response("SOFTWARE_TOKEN_MFA"),
        )]));
        let client = client(provider);

        let outcome = client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();
        let challenge = outcome.challenge().unwrap();
        assert_eq!(challenge.kind, ChallengeKind::MfaRequired);
        assert_eq!(challenge.session, "opaque-session");

        assert!(client.tokens().get_tokens().await.unwrap().is_none());
        assert!(client.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_verify_mfa_completes_sign_in() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::challenge_response("SOFTWARE_TOKEN_MFA"),
        )]));
        *provider.challenge_responses.lock().unwrap() =
            vec![Ok(FakeProvider::tokens_response())];
        let client = client(provider);

        let outcome = client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();
        let session = outcome.challenge().unwrap().session.clone();

        let outcome = client.verify_mfa("123456", &session).await.unwrap();
        assert!(outcome.is_signed_in());
        assert_eq!(
            client.current_user().await.unwrap().user_id,
            "user-1".to_string()
        );
    }

    #[tokio::test]
    async fn test_verify_mfa_without_pending_sign_in() {
        let provider = Arc::new(FakeProvider::default());
        let client = client(provider);

        let err = client.verify_mfa("123456", "stale").await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired(_)));
    }

    #[tokio::test]
    async fn test_verify_mfa_wrong_code_allows_retry() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::challenge_response("SOFTWARE_TOKEN_MFA"),
        )]));
        *provider.challenge_responses.lock().unwrap() = vec![
            Err(ProviderError::Service {
                code: "CodeMismatchException".to_string(),
                message: "wrong code".to_string(),
            }),
            Ok(FakeProvider::tokens_response()),
        ];
        let client = client(provider);

        let outcome = client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();
        let session = outcome.challenge().unwrap().session.clone();

        let err = client.verify_mfa("000000", &session).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidMfaCode));
        assert!(client.tokens().get_tokens().await.unwrap().is_none());

        // the pending sign-in survived the wrong code
        let outcome = client.verify_mfa("123456", &session).await.unwrap();
        assert!(outcome.is_signed_in());
    }

    #[tokio::test]
    async fn test_new_password_challenge() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::challenge_response("NEW_PASSWORD_REQUIRED"),
        )]));
        *provider.challenge_responses.lock().unwrap() =
            vec![Ok(FakeProvider::tokens_response())];
        let client = client(provider);

        let outcome = client
            .sign_in("user@example.com", "old-password")
            .await
            .unwrap();
        let challenge = outcome.challenge().unwrap();
        assert_eq!(challenge.kind, ChallengeKind::NewPasswordRequired);
        let session = challenge.session.clone();

        let outcome = client
            .respond_to_new_password("brand-new-password", &session)
            .await
            .unwrap();
        assert!(outcome.is_signed_in());
    }

    #[tokio::test]
    async fn test_validation_rejects_before_network() {
        let provider = Arc::new(FakeProvider::default());
        let client = client(provider.clone());

        assert!(client.sign_in("not-an-email", "pw").await.is_err());
        assert!(client.sign_up("user@example.com", "short").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_out_swallows_network_failure() {
        let mut provider = FakeProvider::with_auth(vec![Ok(FakeProvider::tokens_response())]);
        provider.fail_sign_out = true;
        let provider = Arc::new(provider);
        let client = client(provider);

        client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();
        let mut events = client.subscribe();

        client.sign_out().await.unwrap();

        // local session is gone despite the failed revocation
        assert!(client.tokens().get_tokens().await.unwrap().is_none());
        assert!(client.current_user().await.is_none());

        match events.recv().await.unwrap() {
            AuthEvent::SignedOut { user_id } => {
                assert_eq!(user_id.as_deref(), Some("user-1"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            AuthEvent::StateChanged {
                status: SessionStatus::Unauthenticated,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_clean() {
        let provider = Arc::new(FakeProvider::default());
        let client = client(provider);
        client.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn test_current_user_derived_from_id_token() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::tokens_response(),
        )]));
        let client = client(provider);
        client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();

        let identity = client.current_user().await.unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("user@example.com"));
        assert!(identity.email_verified);
    }

    #[tokio::test]
    async fn test_setup_mfa_requires_session() {
        let provider = Arc::new(FakeProvider::default());
        let client = client(provider);

        let err = client.setup_mfa().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired(_)));
    }

    #[tokio::test]
    async fn test_setup_mfa_builds_otpauth_uri() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::tokens_response(),
        )]));
        let client = client(provider);
        client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();

        let setup = client.setup_mfa().await.unwrap();
        assert_eq!(setup.secret_code, "JBSWY3DPEHPK3PXP");
        assert!(setup.otpauth_uri.starts_with("otpauth://totp/"));
        assert!(setup.otpauth_uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(setup.otpauth_uri.contains("issuer=ExampleApp"));
    }

    #[tokio::test]
    async fn test_confirm_mfa_setup_rejects_non_success() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::tokens_response(),
        )]));
        *provider.verify_status.lock().unwrap() = "ERROR".to_string();
        let client = client(provider);
        client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();

        let err = client.confirm_mfa_setup("123456").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidMfaCode));
    }

    #[tokio::test]
    async fn test_fetch_profile_reads_attributes() {
        let provider = Arc::new(FakeProvider::with_auth(vec![Ok(
            FakeProvider::tokens_response(),
        )]));
        let client = client(provider);
        client
            .sign_in("user@example.com", "hunter22!")
            .await
            .unwrap();

        let identity = client.fetch_profile().await.unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert!(identity.email_verified);
    }
}
