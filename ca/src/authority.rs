use chrono::{DateTime, Utc};
use ssh_key::{
    Algorithm, Certificate, EcdsaCurve, PrivateKey, PublicKey,
    certificate::{Builder as CertBuilder, CertType},
    rand_core::OsRng,
};
use tracing::{debug, info, instrument};

use crate::{codec, error::CaError};

pub const DEFAULT_VALIDITY_HOURS: u32 = 12;

/// Comment attached to keys produced by [`generate_key_pair`].
const GENERATED_KEY_COMMENT: &str = "cassh generated key";

/// Extensions granted on every issued certificate.
const PERMIT_EXTENSIONS: &[&str] = &[
    "permit-agent-forwarding",
    "permit-port-forwarding",
    "permit-pty",
    "permit-user-rc",
];

/// Signing policy applied to every certificate a CA issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaPolicy {
    /// Lifetime of an issued certificate, in hours. Must be non-zero.
    pub validity_hours: u32,

    /// Principals written into every certificate. When empty, the
    /// authenticated username is used as the sole principal instead.
    pub principals: Vec<String>,
}

impl Default for CaPolicy {
    fn default() -> Self {
        Self {
            validity_hours: DEFAULT_VALIDITY_HOURS,
            principals: Vec::new(),
        }
    }
}

/// Signs user public keys into OpenSSH user certificates.
///
/// The signing key and policy are fixed at construction. Signing only borrows
/// the key, so a single authority can be shared behind an `Arc` and used from
/// many tasks at once.
pub struct CertificateAuthority {
    signing_key: PrivateKey,
    policy: CaPolicy,
}

impl std::fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("algorithm", &self.signing_key.algorithm())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CertificateAuthority {
    /// Load a CA from an OpenSSH PEM private key.
    ///
    /// # Errors
    ///
    /// Returns [`CaError::KeyParse`] if the key is malformed, encrypted or of a
    /// type that cannot sign certificates here (anything but Ed25519, RSA and
    /// ECDSA P-256/P-384), and [`CaError::InvalidPolicy`] if the validity is
    /// zero.
    pub fn new(signing_key_pem: &str, policy: CaPolicy) -> Result<Self, CaError> {
        let signing_key = codec::parse_private_key(signing_key_pem)?;

        if !can_sign_certificates(&signing_key.algorithm()) {
            return Err(CaError::KeyParse(format!(
                "unsupported CA key type: {}",
                signing_key.algorithm()
            )));
        }

        if policy.validity_hours == 0 {
            return Err(CaError::InvalidPolicy(
                "validity must be at least one hour".into(),
            ));
        }

        Ok(Self {
            signing_key,
            policy,
        })
    }

    pub fn policy(&self) -> &CaPolicy {
        &self.policy
    }

    /// The CA public key as an `authorized_keys` line. This is what SSH
    /// servers list in `TrustedUserCAKeys`.
    pub fn public_key(&self) -> Result<String, CaError> {
        codec::encode_public_key(self.signing_key.public_key())
    }

    /// Sign `user_key` into a user certificate valid from now for the
    /// configured number of hours.
    pub fn sign_public_key(
        &self,
        user_key: &PublicKey,
        key_id: &str,
        username: &str,
    ) -> Result<Certificate, CaError> {
        self.sign_public_key_at(user_key, key_id, username, Utc::now())
    }

    /// Sign `user_key` as if the current time were `now`.
    #[instrument(skip(self, user_key), fields(algorithm = %user_key.algorithm()))]
    pub fn sign_public_key_at(
        &self,
        user_key: &PublicKey,
        key_id: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<Certificate, CaError> {
        let serial = random_serial()?;

        let valid_after = u64::try_from(now.timestamp())
            .map_err(|_| CaError::Signing("system clock is before the Unix epoch".into()))?;
        let valid_before = valid_after + u64::from(self.policy.validity_hours) * 3600;

        let principals = if self.policy.principals.is_empty() {
            vec![username.to_string()]
        } else {
            self.policy.principals.clone()
        };

        let mut builder = CertBuilder::new_with_random_nonce(
            &mut OsRng,
            user_key.key_data().clone(),
            valid_after,
            valid_before,
        )
        .map_err(signing_error)?;

        builder
            .serial(serial)
            .map_err(signing_error)?
            .key_id(key_id)
            .map_err(signing_error)?
            .cert_type(CertType::User)
            .map_err(signing_error)?;

        for principal in &principals {
            debug!(%principal, "adding principal");
            builder
                .valid_principal(principal.as_str())
                .map_err(signing_error)?;
        }

        for extension in PERMIT_EXTENSIONS {
            builder.extension(*extension, "").map_err(signing_error)?;
        }

        let cert = builder.sign(&self.signing_key).map_err(signing_error)?;

        info!(
            serial,
            key_id,
            principals = ?principals,
            valid_before,
            "Signed user certificate"
        );

        Ok(cert)
    }
}

/// Generate a fresh Ed25519 keypair for a user.
pub fn generate_key_pair() -> Result<PrivateKey, CaError> {
    let key = PrivateKey::random(&mut OsRng, Algorithm::Ed25519)
        .map_err(|e| CaError::RandomGeneration(e.to_string()))?;

    PrivateKey::new(key.key_data().clone(), GENERATED_KEY_COMMENT)
        .map_err(|e| CaError::RandomGeneration(e.to_string()))
}

fn can_sign_certificates(algorithm: &Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::Ed25519
            | Algorithm::Rsa { .. }
            | Algorithm::Ecdsa {
                curve: EcdsaCurve::NistP256 | EcdsaCurve::NistP384
            }
    )
}

/// Draw a serial from the OS entropy source, read as a big-endian integer.
fn random_serial() -> Result<u64, CaError> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CaError::Signing(format!("Failed to generate serial: {}", e)))?;
    Ok(u64::from_be_bytes(bytes))
}

fn signing_error(err: ssh_key::Error) -> CaError {
    CaError::Signing(err.to_string())
}
