//! In-memory store of authentication requests waiting for their callback.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

/// A login that has been started but whose callback has not arrived yet.
#[derive(Clone)]
pub struct PendingAuthRequest {
    /// Nonce sent to the identity provider; must come back inside the ID token.
    pub nonce: String,
    /// The SSH public key (authorized_keys line) the user wants certified.
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

impl PendingAuthRequest {
    pub fn new(nonce: String, public_key: String) -> Self {
        Self {
            nonce,
            public_key,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for PendingAuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthRequest")
            .field("nonce", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Concurrent map from request token to [`PendingAuthRequest`].
///
/// # Security Properties
///
/// - [`take_once`](Self::take_once) is an atomic remove, so a token resolves
///   at most once even when callbacks race each other.
/// - Expired requests are dropped by [`sweep_expired`](Self::sweep_expired),
///   after which their token can never be resolved.
#[derive(Debug, Default)]
pub struct AuthStateStore {
    pending: DashMap<String, PendingAuthRequest>,
}

impl AuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, token: String, request: PendingAuthRequest) {
        self.pending.insert(token, request);
    }

    /// Remove and return the request stored under `token`.
    pub fn take_once(&self, token: &str) -> Option<PendingAuthRequest> {
        self.pending.remove(token).map(|(_, request)| request)
    }

    /// Remove every request created more than `retention` ago. Returns the
    /// number of requests removed.
    pub fn sweep_expired(&self, retention: Duration) -> usize {
        self.sweep_expired_at(Utc::now(), retention)
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>, retention: Duration) -> usize {
        let Some(cutoff) = TimeDelta::from_std(retention)
            .ok()
            .and_then(|retention| now.checked_sub_signed(retention))
        else {
            return 0;
        };

        let mut removed = 0;
        self.pending.retain(|_, request| {
            let keep = request.created_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
