use thiserror::Error;

/// Errors raised while assembling or running the SDK runtime.
///
/// Everything here is a startup-time or wiring problem; session-level
/// failures live in the auth crate's own error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value was missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A required host bridge was not injected before the SDK initialized.
    /// The message names the missing capability and what to inject.
    #[error("missing host capability {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },

    /// Runtime wiring failed (subscriber installation, task setup).
    #[error("runtime error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
