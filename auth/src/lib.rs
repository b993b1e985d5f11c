//! OpenID Connect login flow that binds an SSH public key to a verified
//! identity.
//!
//! # Flow
//!
//! 1. The client submits the public key it wants certified.
//! 2. [`Authenticator::start_auth`] stores a pending request keyed by a fresh
//!    request token and returns the identity provider's authorization URL,
//!    carrying the token as `state` and a second random value as `nonce`.
//! 3. The provider authenticates the user and redirects back with `state` and
//!    `code`.
//! 4. [`Authenticator::handle_callback`] consumes the pending request, exchanges
//!    the code, verifies the ID token and its nonce, and returns the verified
//!    identity together with the bound public key.
//!
//! Pending requests expire after [`STATE_RETENTION`].

pub mod authenticator;
pub mod config;
pub mod error;
pub mod provider;
pub mod providers;
pub mod store;
pub mod token;

pub use authenticator::{Authenticator, ResolvedRequest};
pub use config::{AuthenticatorConfig, EntraConfig, STATE_RETENTION};
pub use error::AuthError;
pub use provider::{IdTokenClaims, IdentityProvider, TokenSet};
pub use providers::openid::OpenIdProvider;
pub use store::{AuthStateStore, PendingAuthRequest};
