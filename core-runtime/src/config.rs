//! # Core Configuration Module
//!
//! Provides configuration for the session core using a builder that enforces
//! fail-fast validation: every required host bridge must be present before the
//! SDK initializes, with actionable error messages when one is missing.
//!
//! ## Required Dependencies
//!
//! - `SecureStore` - credential persistence for the stored token set
//! - `HttpClient` - transport toward the identity provider
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .region("eu-west-1")
//!     .client_id("3n5k7example")
//!     .secure_store(Arc::new(MySecureStore))
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SecureStore};
use std::sync::Arc;

/// Default renewal threshold: refresh when the access token has five minutes
/// or less remaining.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Default bound on how long a caller waits for an in-flight renewal.
pub const DEFAULT_REFRESH_WAIT_SECS: u64 = 10;

/// Configuration for the session core.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Identity-provider region identifier (e.g., "eu-west-1")
    pub region: String,

    /// App client identifier registered with the provider
    pub client_id: String,

    /// Explicit endpoint override; when absent the regional endpoint is used
    pub endpoint: Option<String>,

    /// Secure credential storage (required)
    pub secure_store: Arc<dyn SecureStore>,

    /// HTTP client for provider calls (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Seconds before expiry at which tokens are proactively renewed
    pub refresh_threshold_secs: i64,

    /// Maximum seconds a caller waits on an in-flight renewal
    pub refresh_wait_secs: u64,

    /// Event bus buffer size per subscriber
    pub event_buffer: usize,

    /// Issuer label embedded in MFA enrollment URIs
    pub totp_issuer: String,
}

impl CoreConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Resolves the provider endpoint, preferring an explicit override.
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-idp.{}.amazonaws.com", self.region))
    }
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("region", &self.region)
            .field("client_id", &self.client_id)
            .field("endpoint", &self.endpoint)
            .field("refresh_threshold_secs", &self.refresh_threshold_secs)
            .field("refresh_wait_secs", &self.refresh_wait_secs)
            .field("event_buffer", &self.event_buffer)
            .field("totp_issuer", &self.totp_issuer)
            .finish()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    region: Option<String>,
    client_id: Option<String>,
    endpoint: Option<String>,
    secure_store: Option<Arc<dyn SecureStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    refresh_threshold_secs: Option<i64>,
    refresh_wait_secs: Option<u64>,
    event_buffer: Option<usize>,
    totp_issuer: Option<String>,
}

impl CoreConfigBuilder {
    /// Set the provider region identifier.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the app client identifier.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Override the provider endpoint (useful for tests and local stacks).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Provide the secure credential storage bridge (required).
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Provide the HTTP client bridge (required).
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Override the proactive renewal threshold in seconds.
    pub fn refresh_threshold_secs(mut self, secs: i64) -> Self {
        self.refresh_threshold_secs = Some(secs);
        self
    }

    /// Override the in-flight renewal wait bound in seconds.
    pub fn refresh_wait_secs(mut self, secs: u64) -> Self {
        self.refresh_wait_secs = Some(secs);
        self
    }

    /// Override the event bus buffer size.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    /// Set the issuer label used in MFA enrollment URIs.
    pub fn totp_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.totp_issuer = Some(issuer.into());
        self
    }

    /// Validates the configuration and builds a [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when region or client id are missing, and
    /// `Error::CapabilityMissing` with an actionable message when a required
    /// bridge was not provided.
    pub fn build(self) -> Result<CoreConfig> {
        let region = self
            .region
            .ok_or_else(|| Error::Config("region is required".to_string()))?;
        if region.trim().is_empty() {
            return Err(Error::Config("region must not be empty".to_string()));
        }

        let client_id = self
            .client_id
            .ok_or_else(|| Error::Config("client_id is required".to_string()))?;
        if client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".to_string()));
        }

        let secure_store = self.secure_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "SecureStore".to_string(),
            message: "No secure storage implementation provided. \
                      Inject a platform keychain/keystore adapter, or an \
                      in-memory store for tests."
                .to_string(),
        })?;

        let http_client = self.http_client.ok_or_else(|| Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "No HTTP client implementation provided. \
                      Inject the host HTTP adapter used for provider calls."
                .to_string(),
        })?;

        Ok(CoreConfig {
            region,
            client_id,
            endpoint: self.endpoint,
            secure_store,
            http_client,
            refresh_threshold_secs: self
                .refresh_threshold_secs
                .unwrap_or(DEFAULT_REFRESH_THRESHOLD_SECS),
            refresh_wait_secs: self.refresh_wait_secs.unwrap_or(DEFAULT_REFRESH_WAIT_SECS),
            event_buffer: self
                .event_buffer
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            totp_issuer: self.totp_issuer.unwrap_or_else(|| "AuthKit".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};

    struct NullStore;

    #[async_trait]
    impl SecureStore for NullStore {
        async fn set_secret(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "no network in tests".to_string(),
            ))
        }
    }

    #[test]
    fn build_with_all_required_fields() {
        let config = CoreConfig::builder()
            .region("eu-west-1")
            .client_id("client-abc")
            .secure_store(Arc::new(NullStore))
            .http_client(Arc::new(NullHttpClient))
            .build()
            .unwrap();

        assert_eq!(config.region, "eu-west-1");
        assert_eq!(
            config.refresh_threshold_secs,
            DEFAULT_REFRESH_THRESHOLD_SECS
        );
        assert_eq!(config.refresh_wait_secs, DEFAULT_REFRESH_WAIT_SECS);
        assert_eq!(
            config.endpoint_url(),
            "https://cognito-idp.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn endpoint_override_wins() {
        let config = CoreConfig::builder()
            .region("eu-west-1")
            .client_id("client-abc")
            .endpoint("http://localhost:9229")
            .secure_store(Arc::new(NullStore))
            .http_client(Arc::new(NullHttpClient))
            .build()
            .unwrap();

        assert_eq!(config.endpoint_url(), "http://localhost:9229");
    }

    #[test]
    fn missing_secure_store_fails_fast() {
        let result = CoreConfig::builder()
            .region("eu-west-1")
            .client_id("client-abc")
            .http_client(Arc::new(NullHttpClient))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "SecureStore");
            }
            other => panic!("Expected CapabilityMissing, got {:?}", other.err()),
        }
    }

    #[test]
    fn missing_region_fails_fast() {
        let result = CoreConfig::builder()
            .client_id("client-abc")
            .secure_store(Arc::new(NullStore))
            .http_client(Arc::new(NullHttpClient))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
