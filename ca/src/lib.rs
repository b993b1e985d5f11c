//! SSH user certificate authority.
//!
//! Signs user public keys into short-lived OpenSSH user certificates and
//! converts keys and certificates to and from their OpenSSH text encodings.
//!
//! ```no_run
//! use cassh_ca::{CaPolicy, CertificateAuthority, codec};
//!
//! # fn example() -> Result<(), cassh_ca::CaError> {
//! let pem = std::fs::read_to_string("ca_key").unwrap();
//! let ca = CertificateAuthority::new(&pem, CaPolicy::default())?;
//!
//! let user_key = codec::parse_public_key("ssh-ed25519 AAAA... alice@laptop")?;
//! let cert = ca.sign_public_key(&user_key, "alice", "alice")?;
//! println!("{}", codec::encode_certificate(&cert)?);
//! # Ok(())
//! # }
//! ```

pub mod authority;
pub mod codec;
pub mod describe;
pub mod error;

pub use authority::{CaPolicy, CertificateAuthority, DEFAULT_VALIDITY_HOURS, generate_key_pair};
pub use describe::{describe_certificate, describe_certificate_at};
pub use error::CaError;

pub use ssh_key::{Certificate, PrivateKey, PublicKey};
