use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaError {
    #[error("Failed to parse CA private key: {0}")]
    KeyParse(String),

    #[error("Invalid CA policy: {0}")]
    InvalidPolicy(String),

    #[error("Failed to sign certificate: {0}")]
    Signing(String),

    #[error("Failed to generate random data: {0}")]
    RandomGeneration(String),

    #[error("Malformed key material: {0}")]
    Format(String),

    #[error("Expected an SSH certificate but found a plain public key")]
    TypeMismatch,
}
