use std::time::Duration;

use serde::Deserialize;

/// How long a pending authentication request may wait for its callback.
pub const STATE_RETENTION: Duration = Duration::from_secs(10 * 60);

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Microsoft Entra ID application registration.
#[derive(Clone, Deserialize)]
pub struct EntraConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Where the provider sends the browser after sign-in. Must match a
    /// redirect URI registered on the application.
    pub redirect_url: String,
}

impl EntraConfig {
    /// The v2.0 issuer for the configured tenant.
    pub fn issuer_url(&self) -> String {
        format!("https://login.microsoftonline.com/{}/v2.0", self.tenant_id)
    }
}

impl std::fmt::Debug for EntraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntraConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatorConfig {
    /// Upper bound on each round trip to the identity provider.
    pub provider_timeout: Duration,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}
