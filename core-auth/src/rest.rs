//! HTTP implementation of the identity-provider traits.
//!
//! Every operation is a JSON `POST` to a single endpoint, with the operation
//! selected by the `X-Amz-Target` header. Errors come back as a JSON body
//! carrying a `__type` code and a `message`.

use crate::error::{AuthError, Result};
use crate::provider::{
    AssociateSoftwareTokenResponse, AuthResponse, CodeDeliveryDetails, GetUserResponse,
    IdentityProvider, ProviderError, ProviderResult, SignUpResponse, TokenRefresher,
    VerifySoftwareTokenResponse,
};
use crate::types::TokenSet;
use async_trait::async_trait;
use bridge_traits::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "__type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Identity provider speaking the Cognito-shaped JSON-over-POST protocol.
pub struct RestIdentityProvider {
    endpoint: String,
    client_id: String,
    http: Arc<dyn HttpClient>,
}

impl RestIdentityProvider {
    pub fn new(endpoint: String, client_id: String, http: Arc<dyn HttpClient>) -> Self {
        Self {
            endpoint,
            client_id,
            http,
        }
    }

    /// POST one operation and decode its response.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> ProviderResult<T> {
        let payload = serde_json::to_vec(&body)
            .map_err(|e| ProviderError::Transport(format!("request encoding failed: {e}")))?;

        let request = HttpRequest::new(HttpMethod::Post, &self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header("Content-Type", CONTENT_TYPE)
            .body(Bytes::from(payload));

        debug!(operation, "calling identity provider");

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(Self::decode_error(response.status, &response.body));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| ProviderError::Transport(format!("response decoding failed: {e}")))
    }

    /// For operations whose successful response body carries nothing useful.
    async fn call_unit(&self, operation: &str, body: serde_json::Value) -> ProviderResult<()> {
        let _: serde_json::Value = self.call(operation, body).await?;
        Ok(())
    }

    fn decode_error(status: u16, body: &[u8]) -> ProviderError {
        match serde_json::from_slice::<WireError>(body) {
            Ok(WireError {
                kind: Some(kind),
                message,
            }) => {
                // codes may arrive namespaced ("prefix#Code"), keep the code
                let code = kind.rsplit('#').next().unwrap_or(&kind).to_string();
                ProviderError::Service {
                    code,
                    message: message.unwrap_or_default(),
                }
            }
            _ => ProviderError::Service {
                code: format!("Http{status}"),
                message: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &str, password: &str) -> ProviderResult<SignUpResponse> {
        self.call(
            "SignUp",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "Password": password,
                "UserAttributes": [{ "Name": "email", "Value": email }],
            }),
        )
        .await
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> ProviderResult<()> {
        self.call_unit(
            "ConfirmSignUp",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "ConfirmationCode": code,
            }),
        )
        .await
    }

    async fn resend_confirmation_code(&self, email: &str) -> ProviderResult<CodeDeliveryDetails> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Response {
            code_delivery_details: CodeDeliveryDetails,
        }

        let response: Response = self
            .call(
                "ResendConfirmationCode",
                json!({
                    "ClientId": self.client_id,
                    "Username": email,
                }),
            )
            .await?;
        Ok(response.code_delivery_details)
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn initiate_auth(&self, email: &str, password: &str) -> ProviderResult<AuthResponse> {
        self.call(
            "InitiateAuth",
            json!({
                "ClientId": self.client_id,
                "AuthFlow": "USER_PASSWORD_AUTH",
                "AuthParameters": {
                    "USERNAME": email,
                    "PASSWORD": password,
                },
            }),
        )
        .await
    }

    async fn respond_to_challenge(
        &self,
        username: &str,
        challenge_name: &str,
        session: &str,
        answer: &str,
    ) -> ProviderResult<AuthResponse> {
        let responses = match challenge_name {
            "SOFTWARE_TOKEN_MFA" => json!({
                "USERNAME": username,
                "SOFTWARE_TOKEN_MFA_CODE": answer,
            }),
            "SMS_MFA" => json!({
                "USERNAME": username,
                "SMS_MFA_CODE": answer,
            }),
            "NEW_PASSWORD_REQUIRED" => json!({
                "USERNAME": username,
                "NEW_PASSWORD": answer,
            }),
            _ => json!({
                "USERNAME": username,
                "ANSWER": answer,
            }),
        };

        self.call(
            "RespondToAuthChallenge",
            json!({
                "ClientId": self.client_id,
                "ChallengeName": challenge_name,
                "Session": session,
                "ChallengeResponses": responses,
            }),
        )
        .await
    }

    async fn associate_software_token(
        &self,
        access_token: &str,
    ) -> ProviderResult<AssociateSoftwareTokenResponse> {
        self.call(
            "AssociateSoftwareToken",
            json!({ "AccessToken": access_token }),
        )
        .await
    }

    async fn verify_software_token(
        &self,
        access_token: &str,
        code: &str,
    ) -> ProviderResult<VerifySoftwareTokenResponse> {
        self.call(
            "VerifySoftwareToken",
            json!({
                "AccessToken": access_token,
                "UserCode": code,
            }),
        )
        .await
    }

    async fn change_password(
        &self,
        access_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> ProviderResult<()> {
        self.call_unit(
            "ChangePassword",
            json!({
                "AccessToken": access_token,
                "PreviousPassword": old_password,
                "ProposedPassword": new_password,
            }),
        )
        .await
    }

    async fn forgot_password(&self, email: &str) -> ProviderResult<CodeDeliveryDetails> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Response {
            code_delivery_details: CodeDeliveryDetails,
        }

        let response: Response = self
            .call(
                "ForgotPassword",
                json!({
                    "ClientId": self.client_id,
                    "Username": email,
                }),
            )
            .await?;
        Ok(response.code_delivery_details)
    }

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> ProviderResult<()> {
        self.call_unit(
            "ConfirmForgotPassword",
            json!({
                "ClientId": self.client_id,
                "Username": email,
                "ConfirmationCode": code,
                "Password": new_password,
            }),
        )
        .await
    }

    async fn get_user(&self, access_token: &str) -> ProviderResult<GetUserResponse> {
        self.call("GetUser", json!({ "AccessToken": access_token }))
            .await
    }

    async fn global_sign_out(&self, access_token: &str) -> ProviderResult<()> {
        self.call_unit("GlobalSignOut", json!({ "AccessToken": access_token }))
            .await
    }
}

#[async_trait]
impl TokenRefresher for RestIdentityProvider {
    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let response: AuthResponse = self
            .call(
                "InitiateAuth",
                json!({
                    "ClientId": self.client_id,
                    "AuthFlow": "REFRESH_TOKEN_AUTH",
                    "AuthParameters": {
                        "REFRESH_TOKEN": refresh_token,
                    },
                }),
            )
            .await
            .map_err(AuthError::from)?;

        let result = response.authentication_result.ok_or_else(|| {
            AuthError::TokenRefreshFailed("provider returned no tokens".to_string())
        })?;

        // providers often omit the refresh token on renewal, keep the old one
        Ok(TokenSet::new(
            result.access_token,
            result.id_token,
            result
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            result.expires_in,
        ))
    }
}
