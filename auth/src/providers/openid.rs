//! OpenID Connect provider backed by the `openidconnect` crate.
//!
//! Endpoints and signing keys come from the issuer's discovery document.
//! ID tokens are checked for signature (against the issuer's JWKS), issuer,
//! audience and expiry. The nonce is deliberately *not* checked here; the
//! [`Authenticator`](crate::Authenticator) compares it against the pending
//! request it belongs to.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use openidconnect::{
    AuthenticationFlow, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointMaybeSet,
    EndpointNotSet, EndpointSet, IssuerUrl, Nonce, OAuth2TokenResponse, RedirectUrl, Scope,
    TokenResponse,
    core::{CoreClient, CoreIdToken, CoreProviderMetadata, CoreResponseType},
};
use serde_json::json;
use tracing::{debug, instrument};

use crate::{
    config::EntraConfig,
    error::AuthError,
    provider::{IdTokenClaims, IdentityProvider, TokenSet},
};

const SCOPES: &[&str] = &["email", "profile"];

type DiscoveredClient = CoreClient<
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointMaybeSet,
    EndpointMaybeSet,
>;

pub struct OpenIdProvider {
    client: DiscoveredClient,
    http_client: reqwest::Client,
}

impl OpenIdProvider {
    /// Fetch the tenant's discovery document and JWKS and build a provider
    /// from them.
    #[instrument(skip(config), fields(issuer = %config.issuer_url()))]
    pub async fn discover(config: &EntraConfig, timeout: Duration) -> Result<Self, AuthError> {
        let http_client = http_client(timeout)?;

        let issuer = IssuerUrl::new(config.issuer_url())
            .map_err(|e| AuthError::Discovery(format!("Invalid issuer URL: {}", e)))?;

        let metadata = CoreProviderMetadata::discover_async(issuer, &http_client)
            .await
            .map_err(|e| AuthError::Discovery(e.to_string()))?;

        debug!("Loaded provider metadata");

        Self::from_metadata(config, metadata, http_client)
    }

    /// Build a provider from metadata that has already been obtained.
    pub fn from_metadata(
        config: &EntraConfig,
        metadata: CoreProviderMetadata,
        http_client: reqwest::Client,
    ) -> Result<Self, AuthError> {
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| AuthError::Discovery(format!("Invalid redirect URL: {}", e)))?;

        let client = CoreClient::from_provider_metadata(
            metadata,
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
        )
        .set_redirect_uri(redirect_url);

        Ok(Self {
            client,
            http_client,
        })
    }
}

/// HTTP client for provider round trips. Redirects are not followed, to
/// avoid being bounced to arbitrary hosts.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AuthError> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .build()
        .map_err(|e| AuthError::Discovery(format!("Failed to build HTTP client: {}", e)))
}

// The nonce is compared by the authenticator against the pending request.
fn defer_nonce_check(_: Option<&Nonce>) -> Result<(), String> {
    Ok(())
}

#[async_trait]
impl IdentityProvider for OpenIdProvider {
    fn authorization_url(&self, state: &str, nonce: &str) -> String {
        let state = state.to_string();
        let nonce = nonce.to_string();

        let mut request = self.client.authorize_url(
            AuthenticationFlow::<CoreResponseType>::AuthorizationCode,
            move || CsrfToken::new(state),
            move || Nonce::new(nonce),
        );
        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }

        let (url, _, _) = request.url();
        url.to_string()
    }

    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<TokenSet, AuthError> {
        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        Ok(TokenSet {
            access_token: response.access_token().secret().clone(),
            id_token: response.id_token().map(|token| token.to_string()),
        })
    }

    #[instrument(skip(self, id_token))]
    async fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims, AuthError> {
        let id_token = CoreIdToken::from_str(id_token)
            .map_err(|e| AuthError::TokenVerification(format!("Malformed ID token: {}", e)))?;

        let verifier = self.client.id_token_verifier();
        let claims = id_token
            .claims(&verifier, defer_nonce_check)
            .map_err(|e| AuthError::TokenVerification(e.to_string()))?;

        Ok(IdTokenClaims::new(json!({
            "sub": claims.subject().as_str(),
            "email": claims.email().map(|email| email.as_str()),
            "email_verified": claims.email_verified().unwrap_or(false),
            "name": claims
                .name()
                .and_then(|name| name.get(None))
                .map(|name| name.as_str()),
            "preferred_username": claims
                .preferred_username()
                .map(|username| username.as_str()),
            "nonce": claims.nonce().map(|nonce| nonce.secret().as_str()),
        })))
    }

    fn name(&self) -> &'static str {
        "openid"
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};
    use openidconnect::{
        Audience, AuthUrl, EmptyAdditionalClaims, EmptyAdditionalProviderMetadata,
        EndUserEmail, EndUserUsername, JsonWebKeyId, JsonWebKeySetUrl, PrivateSigningKey,
        ResponseTypes, StandardClaims, SubjectIdentifier, TokenUrl,
        core::{
            CoreIdTokenClaims, CoreJsonWebKeySet, CoreJwsSigningAlgorithm,
            CoreRsaPrivateSigningKey, CoreSubjectIdentifierType,
        },
        url::Url,
    };

    use super::*;

    const ISSUER: &str = "https://login.microsoftonline.com/contoso/v2.0";
    const RSA_SIGNING_KEY: &str = include_str!("testdata/rsa_signing_key.pem");

    fn signing_key() -> CoreRsaPrivateSigningKey {
        CoreRsaPrivateSigningKey::from_pem(RSA_SIGNING_KEY, Some(JsonWebKeyId::new("k1".into())))
            .unwrap()
    }

    /// Metadata whose JWKS holds the verification half of [`signing_key`].
    fn signed_metadata() -> CoreProviderMetadata {
        metadata().set_jwks(CoreJsonWebKeySet::new(vec![
            signing_key().as_verification_key(),
        ]))
    }

    fn sign_id_token(
        audience: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> String {
        let claims = CoreIdTokenClaims::new(
            IssuerUrl::new(ISSUER.into()).unwrap(),
            vec![Audience::new(audience.into())],
            expires_at,
            issued_at,
            StandardClaims::new(SubjectIdentifier::new("subject-1".into()))
                .set_email(Some(EndUserEmail::new("alice@contoso.com".into())))
                .set_email_verified(Some(true))
                .set_preferred_username(Some(EndUserUsername::new("alice".into()))),
            EmptyAdditionalClaims {},
        )
        .set_nonce(Some(Nonce::new("the-nonce".into())));

        CoreIdToken::new(
            claims,
            &signing_key(),
            CoreJwsSigningAlgorithm::RsaSsaPkcs1V15Sha256,
            None,
            None,
        )
        .unwrap()
        .to_string()
    }

    fn config() -> EntraConfig {
        EntraConfig {
            tenant_id: "contoso".into(),
            client_id: "cassh-client".into(),
            client_secret: "secret".into(),
            redirect_url: "http://localhost:8080/auth/callback".into(),
        }
    }

    fn metadata() -> CoreProviderMetadata {
        CoreProviderMetadata::new(
            IssuerUrl::new(ISSUER.into()).unwrap(),
            AuthUrl::new(
                "https://login.microsoftonline.com/contoso/oauth2/v2.0/authorize".into(),
            )
            .unwrap(),
            JsonWebKeySetUrl::new(
                "https://login.microsoftonline.com/contoso/discovery/v2.0/keys".into(),
            )
            .unwrap(),
            vec![ResponseTypes::new(vec![CoreResponseType::Code])],
            vec![CoreSubjectIdentifierType::Pairwise],
            vec![CoreJwsSigningAlgorithm::RsaSsaPkcs1V15Sha256],
            EmptyAdditionalProviderMetadata {},
        )
        .set_jwks(CoreJsonWebKeySet::new(vec![]))
    }

    fn provider(metadata: CoreProviderMetadata) -> OpenIdProvider {
        OpenIdProvider::from_metadata(
            &config(),
            metadata,
            http_client(Duration::from_secs(5)).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_carries_state_and_nonce() {
        let provider = provider(metadata());

        let url = Url::parse(&provider.authorization_url("state-123", "nonce-456")).unwrap();
        let query: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
        assert_eq!(url.path(), "/contoso/oauth2/v2.0/authorize");
        assert_eq!(query["state"], "state-123");
        assert_eq!(query["nonce"], "nonce-456");
        assert_eq!(query["client_id"], "cassh-client");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["redirect_uri"], "http://localhost:8080/auth/callback");
        assert_eq!(query["scope"], "openid email profile");
    }

    #[test]
    fn test_from_metadata_rejects_bad_redirect_url() {
        let mut config = config();
        config.redirect_url = "not a url".into();

        let result = OpenIdProvider::from_metadata(
            &config,
            metadata(),
            http_client(Duration::from_secs(5)).unwrap(),
        );

        assert!(matches!(result, Err(AuthError::Discovery(_))));
    }

    #[tokio::test]
    async fn test_exchange_without_token_endpoint_fails() {
        let provider = provider(metadata());

        let result = provider.exchange_code("code").await;

        assert!(matches!(result, Err(AuthError::TokenExchange(_))));
    }

    #[tokio::test]
    async fn test_exchange_against_unreachable_endpoint_fails() {
        let metadata = metadata()
            .set_token_endpoint(Some(TokenUrl::new("http://127.0.0.1:9/token".into()).unwrap()));
        let provider = provider(metadata);

        let result = provider.exchange_code("code").await;

        assert!(matches!(result, Err(AuthError::TokenExchange(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_malformed_token() {
        let provider = provider(metadata());

        let result = provider.verify_id_token("definitely.not.a-jwt").await;

        assert!(matches!(result, Err(AuthError::TokenVerification(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_unsigned_token() {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"k1"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            json!({
                "iss": ISSUER,
                "aud": "cassh-client",
                "sub": "subject-1",
                "exp": 4_102_444_800u64,
                "iat": 1_700_000_000u64,
                "preferred_username": "mallory",
            })
            .to_string(),
        );
        let signature = URL_SAFE_NO_PAD.encode([0u8; 256]);
        let token = format!("{}.{}.{}", header, payload, signature);

        let result = provider(metadata()).verify_id_token(&token).await;

        assert!(matches!(result, Err(AuthError::TokenVerification(_))));
    }

    #[tokio::test]
    async fn test_verify_accepts_token_signed_by_provider_key() {
        let now = Utc::now();
        let token = sign_id_token("cassh-client", now, now + TimeDelta::hours(1));

        let claims = provider(signed_metadata())
            .verify_id_token(&token)
            .await
            .unwrap();

        assert_eq!(claims.nonce(), Some("the-nonce"));

        let identity = claims.into_identity().unwrap();
        assert_eq!(identity.subject, "subject-1");
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.email.as_deref(), Some("alice@contoso.com"));
        assert!(identity.email_verified);
        assert_eq!(identity.name, None);
    }

    #[tokio::test]
    async fn test_verify_rejects_token_for_other_audience() {
        let now = Utc::now();
        let token = sign_id_token("some-other-app", now, now + TimeDelta::hours(1));

        let result = provider(signed_metadata()).verify_id_token(&token).await;

        assert!(matches!(result, Err(AuthError::TokenVerification(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let now = Utc::now();
        let token = sign_id_token(
            "cassh-client",
            now - TimeDelta::hours(2),
            now - TimeDelta::hours(1),
        );

        let result = provider(signed_metadata()).verify_id_token(&token).await;

        assert!(matches!(result, Err(AuthError::TokenVerification(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_token_signed_by_unknown_key() {
        let now = Utc::now();
        let token = sign_id_token("cassh-client", now, now + TimeDelta::hours(1));

        // The default metadata publishes an empty key set.
        let result = provider(metadata()).verify_id_token(&token).await;

        assert!(matches!(result, Err(AuthError::TokenVerification(_))));
    }
}
