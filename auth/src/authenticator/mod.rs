use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use cassh_common::{params::CallbackParams, views::VerifiedIdentity};
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    config::{AuthenticatorConfig, STATE_RETENTION},
    error::AuthError,
    provider::IdentityProvider,
    store::{AuthStateStore, PendingAuthRequest},
    token::{generate_token, log_prefix},
};


/// Outcome of a successful callback: who signed in, and which key they asked
/// to have certified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub identity: VerifiedIdentity,
    pub public_key: String,
}

/// Drives the redirect-based sign-in flow.
///
/// # States
///
/// Each request token moves through:
///
/// - **Created** by [`start_auth`](Self::start_auth): stored with its nonce
///   and bound public key.
/// - **Resolved** or **Rejected** by [`handle_callback`](Self::handle_callback):
///   the pending request is removed before any provider call is made, so it
///   is consumed whatever the outcome.
/// - **Expired**: swept after [`STATE_RETENTION`] without a callback.
///
/// A token that has been consumed or swept can never be resolved again.
pub struct Authenticator {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<AuthStateStore>,
    config: AuthenticatorConfig,
    sweep_in_flight: Arc<AtomicBool>,
}

impl Authenticator {
    pub fn new<P: IdentityProvider + 'static>(provider: P, config: AuthenticatorConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            store: Arc::new(AuthStateStore::new()),
            config,
            sweep_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &AuthStateStore {
        &self.store
    }

    /// Number of sign-ins waiting for their callback.
    pub fn pending_requests(&self) -> usize {
        self.store.len()
    }

    /// Begin a sign-in for `public_key` and return the URL to redirect the
    /// user to.
    #[instrument(skip(self, public_key), fields(provider = self.provider.name()))]
    pub fn start_auth(&self, public_key: &str) -> Result<String, AuthError> {
        let state = generate_token()?;
        let nonce = generate_token()?;

        let url = self.provider.authorization_url(&state, &nonce);

        self.store.put(
            state.clone(),
            PendingAuthRequest::new(nonce, public_key.to_string()),
        );
        debug!(state = log_prefix(&state), "Stored pending authentication request");

        self.trigger_sweep();

        Ok(url)
    }

    /// Resolve the callback the identity provider redirected to.
    ///
    /// # Errors
    ///
    /// [`AuthError::UnknownState`] and [`AuthError::NonceMismatch`] indicate a
    /// forged or replayed callback and must not be retried.
    /// [`AuthError::TokenExchange`] is an upstream failure; the user may start
    /// a new sign-in.
    #[instrument(skip(self, params), fields(provider = self.provider.name()))]
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
    ) -> Result<ResolvedRequest, AuthError> {
        if params.state.is_empty() {
            return Err(AuthError::MissingParameter("state"));
        }
        if params.code.is_empty() {
            return Err(AuthError::MissingParameter("code"));
        }

        let pending = self.store.take_once(&params.state).ok_or_else(|| {
            warn!(
                state = log_prefix(&params.state),
                "Callback for unknown, expired or already used state"
            );
            AuthError::UnknownState
        })?;

        trace!("Exchanging authorization code");
        let tokens = self
            .with_deadline(self.provider.exchange_code(&params.code))
            .await
            .unwrap_or_else(|| {
                Err(AuthError::TokenExchange(
                    "identity provider did not respond in time".into(),
                ))
            })?;

        let id_token = tokens.id_token.ok_or_else(|| {
            AuthError::TokenExchange("no id_token in token response".into())
        })?;

        trace!("Verifying ID token");
        let claims = self
            .with_deadline(self.provider.verify_id_token(&id_token))
            .await
            .unwrap_or_else(|| {
                Err(AuthError::TokenVerification(
                    "identity provider did not respond in time".into(),
                ))
            })?;

        let nonce_matches = claims
            .nonce()
            .is_some_and(|nonce| constant_time_eq(nonce, &pending.nonce));
        if !nonce_matches {
            warn!("ID token nonce does not match pending request");
            return Err(AuthError::NonceMismatch);
        }

        let identity = claims.into_identity()?;

        info!(
            subject = %identity.subject,
            username = %identity.username,
            "User authenticated successfully"
        );

        Ok(ResolvedRequest {
            identity,
            public_key: pending.public_key,
        })
    }

    /// Remove pending requests older than [`STATE_RETENTION`] now, returning
    /// how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired(STATE_RETENTION)
    }

    /// Start a background sweep unless one is already running. Falls back to
    /// sweeping inline when called outside a Tokio runtime.
    fn trigger_sweep(&self) {
        if self.sweep_in_flight.swap(true, Ordering::AcqRel) {
            return;
        }

        let store = Arc::clone(&self.store);
        let guard = SweepGuard(Arc::clone(&self.sweep_in_flight));
        let sweep = move || {
            let _guard = guard;
            let removed = store.sweep_expired(STATE_RETENTION);
            if removed > 0 {
                debug!(removed, "Swept expired authentication requests");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { sweep() });
            }
            Err(_) => sweep(),
        }
    }

    /// Run a provider call, giving up after the configured timeout.
    async fn with_deadline<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        tokio::time::timeout(self.config.provider_timeout, call)
            .await
            .ok()
    }
}

/// Clears the in-flight flag when dropped, including when a spawned sweep is
/// discarded by a runtime that is shutting down without ever being polled.
struct SweepGuard(Arc<AtomicBool>);

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
