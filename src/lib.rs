//! # AuthKit
//!
//! Embeddable authentication session SDK: sign-up, sign-in with MFA and
//! other provider challenges, secure token storage, and automatic renewal.
//!
//! The work is split across three crates, re-exported here for convenience:
//!
//! - [`bridge`] - capability traits each host implements (storage, HTTP, time)
//! - [`runtime`] - configuration, logging, and the session event bus
//! - [`auth`] - the session flows and token lifecycle
//!
//! ## Quick start
//!
//! ```ignore
//! use authkit::auth::AuthClient;
//! use authkit::runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .region("eu-west-1")
//!     .client_id("3n5k7example")
//!     .secure_store(Arc::new(MyKeychain))
//!     .http_client(Arc::new(MyHttp))
//!     .build()?;
//!
//! let client = AuthClient::new(&config);
//! ```

pub use bridge_traits as bridge;
pub use core_auth as auth;
pub use core_runtime as runtime;

pub use core_auth::{AuthClient, AuthError, SignInOutcome, TokenManager, TokenSet};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{AuthEvent, EventBus, SessionStatus};
