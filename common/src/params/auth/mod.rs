use serde::{Deserialize, Serialize};

/// Query parameters the identity provider appends to the redirect URL when it
/// sends the browser back after authentication.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CallbackParams {
    /// The opaque request token handed out when the flow started.
    #[serde(default)]
    pub state: String,

    /// The authorization code to exchange for tokens.
    #[serde(default)]
    pub code: String,
}
