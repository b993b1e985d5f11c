use serde::{Deserialize, Serialize};

/// The identity of a user as asserted by a verified ID token.
///
/// Only ever produced after the token signature, issuer, audience and nonce
/// have all been checked. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Stable subject identifier issued by the identity provider.
    #[serde(rename = "sub")]
    pub subject: String,

    /// The user's email address, if the provider released one.
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub email_verified: bool,

    /// The user's display name.
    #[serde(default)]
    pub name: Option<String>,

    /// The login name the user is known by. This becomes the certificate
    /// principal when the CA has no fixed principal list.
    #[serde(rename = "preferred_username")]
    pub username: String,
}
