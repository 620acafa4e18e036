//! Token lifecycle: storage, expiry tracking, renewal, and auto-refresh.

use crate::error::{AuthError, Result};
use crate::jwt;
use crate::provider::TokenRefresher;
use crate::token_store::TokenStore;
use crate::types::TokenSet;
use bridge_traits::{Clock, SecureStore};
use core_runtime::events::{AuthEvent, EventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How often a waiting caller re-checks an in-flight refresh.
const REFRESH_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the stored token set and everything about keeping it fresh.
///
/// Renewal is de-duplicated: when several tasks ask for a refresh at once,
/// exactly one provider call is made and every caller receives its outcome.
pub struct TokenManager {
    store: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    refresh_threshold_secs: i64,
    refresh_wait: Duration,
    refresh_in_flight: AtomicBool,
    // outcome of the most recent refresh, published before the flag clears
    last_refresh: RwLock<Option<std::result::Result<TokenSet, String>>>,
    auto_refresh: Mutex<Option<CancellationToken>>,
}

impl TokenManager {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        refresher: Arc<dyn TokenRefresher>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        refresh_threshold_secs: i64,
        refresh_wait_secs: u64,
    ) -> Self {
        Self {
            store: TokenStore::new(secure_store),
            refresher,
            events,
            clock,
            refresh_threshold_secs,
            refresh_wait: Duration::from_secs(refresh_wait_secs),
            refresh_in_flight: AtomicBool::new(false),
            last_refresh: RwLock::new(None),
            auto_refresh: Mutex::new(None),
        }
    }

    /// Persist a new token set and announce the new expiry.
    pub async fn store_tokens(&self, tokens: &TokenSet) -> Result<()> {
        self.store.set_tokens(tokens).await?;
        // no subscribers is fine, the session does not depend on listeners
        let _ = self.events.emit(AuthEvent::TokenRefreshed {
            expires_at: self.expires_at(tokens),
        });
        Ok(())
    }

    pub async fn get_tokens(&self) -> Result<Option<TokenSet>> {
        self.store.get_tokens().await
    }

    /// Drop the stored session. Also stops auto-refresh so a cancelled
    /// session cannot resurrect itself.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.stop_auto_refresh().await;
        self.store.clear_tokens().await
    }

    /// Expiry instant of a token set, in unix seconds.
    ///
    /// Prefers the `exp` claim inside the access token; the provider-reported
    /// lifetime is the fallback when the token is opaque.
    fn expires_at(&self, tokens: &TokenSet) -> i64 {
        jwt::expires_at(&tokens.access_token)
            .unwrap_or_else(|| self.clock.unix_timestamp() + tokens.expires_in)
    }

    /// Seconds until the stored access token expires, clamped at zero.
    ///
    /// `None` means no session is stored at all. A token whose expiry cannot
    /// be decoded reads as already expired.
    pub async fn remaining_validity(&self) -> Result<Option<i64>> {
        let Some(tokens) = self.store.get_tokens().await? else {
            return Ok(None);
        };
        let remaining = match jwt::expires_at(&tokens.access_token) {
            Some(exp) => (exp - self.clock.unix_timestamp()).max(0),
            None => 0,
        };
        Ok(Some(remaining))
    }

    /// Seconds until expiry for callers that do not care whether a session
    /// exists: absent, expired, and unreadable tokens all read as zero.
    pub async fn time_until_expiry(&self) -> i64 {
        self.remaining_validity()
            .await
            .ok()
            .flatten()
            .unwrap_or(0)
    }

    /// Whether the stored access token is unusable. No session, an expired
    /// token, and an undecodable token all count as expired.
    pub async fn is_token_expired(&self) -> bool {
        match self.remaining_validity().await {
            Ok(Some(remaining)) => remaining == 0,
            Ok(None) | Err(_) => true,
        }
    }

    /// Exchange the stored refresh token for a fresh token set.
    ///
    /// Concurrent callers coalesce onto a single provider call; late callers
    /// wait up to the configured bound for its outcome.
    #[instrument(skip(self))]
    pub async fn refresh_tokens(&self) -> Result<TokenSet> {
        if self.refresh_in_flight.swap(true, Ordering::SeqCst) {
            debug!("refresh already in flight, waiting for its outcome");
            return self.wait_for_refresh().await;
        }

        let result = self.do_refresh().await;

        // publish the outcome before releasing ownership so waiters that
        // observe the cleared flag always find a result
        {
            let mut last = self.last_refresh.write().await;
            *last = Some(match &result {
                Ok(tokens) => Ok(tokens.clone()),
                Err(e) => Err(e.to_string()),
            });
        }
        self.refresh_in_flight.store(false, Ordering::SeqCst);

        result
    }

    async fn do_refresh(&self) -> Result<TokenSet> {
        let tokens = self.store.get_tokens().await?;
        let Some(tokens) = tokens.filter(|t| !t.refresh_token.is_empty()) else {
            let _ = self.events.emit(AuthEvent::SessionExpired {
                reason: "no refresh token available".to_string(),
            });
            return Err(AuthError::SessionExpired(
                "no refresh token available".to_string(),
            ));
        };

        match self.refresher.refresh(&tokens.refresh_token).await {
            Ok(fresh) => {
                self.store_tokens(&fresh).await?;
                info!("token set renewed");
                Ok(fresh)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                let _ = self.events.emit(AuthEvent::SessionExpired {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn wait_for_refresh(&self) -> Result<TokenSet> {
        let deadline = tokio::time::Instant::now() + self.refresh_wait;
        loop {
            if !self.refresh_in_flight.load(Ordering::SeqCst) {
                let last = self.last_refresh.read().await;
                return match &*last {
                    Some(Ok(tokens)) => Ok(tokens.clone()),
                    Some(Err(message)) => Err(AuthError::TokenRefreshFailed(message.clone())),
                    None => Err(AuthError::TokenRefreshFailed(
                        "refresh finished without a recorded outcome".to_string(),
                    )),
                };
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AuthError::TokenRefreshFailed(
                    "timed out waiting for in-flight refresh".to_string(),
                ));
            }
            tokio::time::sleep(REFRESH_POLL_INTERVAL).await;
        }
    }

    /// A usable access token, renewing first when expiry is near.
    ///
    /// When renewal fails but the current token is still valid, the stale
    /// token is returned so callers keep working until it truly expires.
    /// `None` means there is no usable token and the caller must
    /// re-authenticate.
    pub async fn get_access_token(&self) -> Result<Option<String>> {
        let Some(remaining) = self.remaining_validity().await? else {
            return Ok(None);
        };

        if remaining > self.refresh_threshold_secs {
            let tokens = self.store.get_tokens().await?;
            return Ok(tokens.map(|t| t.access_token));
        }

        match self.refresh_tokens().await {
            Ok(fresh) => Ok(Some(fresh.access_token)),
            Err(e) if remaining > 0 => {
                warn!(error = %e, "refresh failed, serving still-valid token");
                let tokens = self.store.get_tokens().await?;
                Ok(tokens.map(|t| t.access_token))
            }
            Err(e) => {
                warn!(error = %e, "refresh failed and token already expired");
                Ok(None)
            }
        }
    }

    /// Start the background renewal loop.
    ///
    /// The task sleeps until the token enters the refresh window, renews,
    /// then reschedules itself off the new expiry. It stops on the first
    /// failed renewal or when cancelled; it never retries a failure.
    pub async fn start_auto_refresh(self: &Arc<Self>) {
        let token = CancellationToken::new();
        let previous = {
            let mut guard = self.auto_refresh.lock().await;
            guard.replace(token.clone())
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let remaining = match manager.remaining_validity().await {
                    Ok(Some(remaining)) => remaining,
                    Ok(None) => {
                        debug!("auto-refresh stopping, no session stored");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "auto-refresh stopping, storage unavailable");
                        break;
                    }
                };
                let delay = (remaining - manager.refresh_threshold_secs).max(0) as u64;

                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("auto-refresh cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(delay)) => {
                        if let Err(e) = manager.refresh_tokens().await {
                            warn!(error = %e, "auto-refresh stopping after failed renewal");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Cancel the background renewal loop, if one is running.
    pub async fn stop_auto_refresh(&self) {
        if let Some(token) = self.auto_refresh.lock().await.take() {
            token.cancel();
        }
    }
}
