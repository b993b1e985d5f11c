use std::path::{Path, PathBuf};

use cassh_ca::codec;
use clap::Parser;
use tracing::info;

use crate::config::{CaArgs, FileConfig};

#[derive(Clone, Debug, Parser)]
pub struct SignParams {
    /// User public key to certify, in `authorized_keys` format.
    pub public_key: PathBuf,

    /// Username the certificate is issued to. Used as the sole principal
    /// when no principals are configured.
    #[clap(short, long)]
    pub username: String,

    /// Key ID recorded in the certificate. Defaults to the username.
    #[clap(short, long)]
    pub key_id: Option<String>,

    /// Where to write the certificate. Defaults to `<key>-cert.pub` next to
    /// the public key, where `ssh` picks it up automatically.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    #[clap(flatten)]
    pub ca: CaArgs,
}

/// Sign a user's public key file and write the certificate beside it.
/// Returns the path the certificate was written to.
pub fn sign(config: &FileConfig, params: SignParams) -> anyhow::Result<PathBuf> {
    let SignParams {
        public_key,
        username,
        key_id,
        output,
        ca,
    } = params;

    let ca = ca.merge(config.ca.clone()).authority()?;

    let line = std::fs::read_to_string(&public_key)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", public_key.display(), e))?;
    let user_key = codec::parse_public_key(&line)?;

    let key_id = key_id.unwrap_or_else(|| username.clone());
    let cert = ca.sign_public_key(&user_key, &key_id, &username)?;

    let output = output.unwrap_or_else(|| certificate_path(&public_key));
    let mut encoded = codec::encode_certificate(&cert)?;
    encoded.push('\n');
    std::fs::write(&output, encoded)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", output.display(), e))?;

    info!(path = %output.display(), serial = cert.serial(), "Wrote certificate");

    Ok(output)
}

/// `id_ed25519.pub` becomes `id_ed25519-cert.pub`, following the OpenSSH
/// naming convention.
fn certificate_path(public_key: &Path) -> PathBuf {
    let stem = match public_key.extension() {
        Some(ext) if ext == "pub" => public_key.with_extension(""),
        _ => public_key.to_path_buf(),
    };

    let mut name = stem.into_os_string();
    name.push("-cert.pub");
    PathBuf::from(name)
}
