//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host embedding
//! the SDK.
//!
//! ## Overview
//!
//! This crate defines the contract between the session core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that must be implemented differently per host (desktop
//! app, server-side job, test harness).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations toward the identity provider
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore/encrypted disk)
//! - [`Clock`](time::Clock) - Time source for deterministic expiry testing
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing; see `core-runtime`'s configuration builder.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Host
//! implementations should convert platform-specific errors to `BridgeError`
//! and provide actionable messages without leaking credential material.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared across async tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::SecureStore;
pub use time::{Clock, SystemClock};
