use async_trait::async_trait;
use cassh_common::views::VerifiedIdentity;
use serde_json::Value;

use crate::error::AuthError;

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenSet {
    pub access_token: String,
    /// Raw compact JWT. Absent when the provider did not treat the request as
    /// an OpenID Connect request.
    pub id_token: Option<String>,
}

/// Claims of an ID token whose signature, issuer and audience have been
/// verified. The nonce has *not* been checked yet.
#[derive(Debug, Clone)]
pub struct IdTokenClaims(Value);

impl IdTokenClaims {
    pub fn new(claims: Value) -> Self {
        Self(claims)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.0.get("nonce").and_then(Value::as_str)
    }

    /// Extract the user's identity from the standard claims.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ClaimsParse`] if `sub` or `preferred_username` is
    /// missing, empty or of the wrong type.
    pub fn into_identity(self) -> Result<VerifiedIdentity, AuthError> {
        let identity: VerifiedIdentity =
            serde_json::from_value(self.0).map_err(|e| AuthError::ClaimsParse(e.to_string()))?;

        if identity.subject.is_empty() {
            return Err(AuthError::ClaimsParse("sub claim is empty".into()));
        }
        if identity.username.is_empty() {
            return Err(AuthError::ClaimsParse(
                "preferred_username claim is empty".into(),
            ));
        }

        Ok(identity)
    }
}

/// An OpenID Connect identity provider.
///
/// Implementations own all protocol and cryptographic detail: building the
/// authorization URL, redeeming codes and checking token signatures.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL to send the browser to, carrying `state` and `nonce`.
    fn authorization_url(&self, state: &str, nonce: &str) -> String;

    /// Redeem an authorization code at the token endpoint.
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError>;

    /// Verify an ID token's signature, issuer, audience and expiry and return
    /// its claims.
    async fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims, AuthError>;

    /// Name of this provider (for debugging/logging)
    fn name(&self) -> &'static str;
}
