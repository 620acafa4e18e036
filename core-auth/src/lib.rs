//! # Authentication Session Core
//!
//! Owns the full session lifecycle against a hosted identity provider:
//! registration, sign-in with challenge handling (MFA, forced password
//! rotation), token storage and renewal, and sign-out.
//!
//! ## Architecture
//!
//! - [`AuthClient`] drives the provider protocol and emits session events
//! - [`TokenManager`] owns the stored token set, expiry tracking, renewal
//!   de-duplication, and the background auto-refresh task
//! - [`IdentityProvider`] / [`TokenRefresher`] are the seams toward the wire;
//!   [`RestIdentityProvider`] implements them over the host's `HttpClient`
//!
//! Tokens live in the host's `SecureStore`; the crate never touches platform
//! keychains directly.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::AuthClient;
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .region("eu-west-1")
//!     .client_id("3n5k7example")
//!     .secure_store(secure_store)
//!     .http_client(http_client)
//!     .build()?;
//!
//! let client = AuthClient::new(&config);
//! match client.sign_in("user@example.com", "password").await? {
//!     SignInOutcome::SignedIn { identity, .. } => println!("hello {}", identity.user_id),
//!     SignInOutcome::Challenge(challenge) => { /* prompt for the MFA code */ }
//! }
//! ```

pub mod client;
pub mod error;
pub mod jwt;
pub mod provider;
pub mod rest;
pub mod token_manager;
pub mod token_store;
pub mod types;
pub mod validate;

pub use client::AuthClient;
pub use error::{AuthError, Result};
pub use provider::{IdentityProvider, ProviderError, TokenRefresher};
pub use rest::RestIdentityProvider;
pub use token_manager::TokenManager;
pub use token_store::TokenStore;
pub use types::{
    Challenge, ChallengeKind, CodeDelivery, Identity, MfaSetup, SignInOutcome, SignUpOutcome,
    TokenSet,
};
