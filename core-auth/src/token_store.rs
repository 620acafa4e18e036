use crate::error::{AuthError, Result};
use crate::types::TokenSet;
use bridge_traits::SecureStore;
use std::sync::Arc;
use tracing::{debug, warn};

const TOKEN_KEY: &str = "session_tokens";

/// Persistence layer for the current token set, backed by the host's
/// [`SecureStore`] capability.
///
/// At most one token set exists at a time under a single storage key, so a
/// store is always a wholesale replacement of whatever was there before.
pub struct TokenStore {
    store: Arc<dyn SecureStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Load the stored token set, if any.
    ///
    /// A payload that no longer parses is deleted before the error is
    /// returned, so the corrupted state cannot be observed twice.
    pub async fn get_tokens(&self) -> Result<Option<TokenSet>> {
        let raw = self
            .store
            .get_secret(TOKEN_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        match serde_json::from_str::<TokenSet>(&raw) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!("stored tokens failed to parse, clearing them");
                if let Err(del_err) = self.store.delete_secret(TOKEN_KEY).await {
                    warn!(error = %del_err, "failed to delete corrupted tokens");
                }
                Err(AuthError::TokenCorrupted(e.to_string()))
            }
        }
    }

    /// Replace the stored token set.
    pub async fn set_tokens(&self, tokens: &TokenSet) -> Result<()> {
        let json = serde_json::to_string(tokens).map_err(|e| AuthError::Serialization {
            context: "token set".to_string(),
            source: e,
        })?;

        self.store
            .set_secret(TOKEN_KEY, &json)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        debug!("token set stored");
        Ok(())
    }

    /// Remove the stored token set. Succeeds if nothing was stored.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.store
            .delete_secret(TOKEN_KEY)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        debug!("token set cleared");
        Ok(())
    }
}
