mod inspect;
mod keygen;
mod sign;

pub use inspect::{InspectParams, inspect};
pub use keygen::{KeygenParams, keygen};
pub use sign::{SignParams, sign};

use clap::Parser;

use crate::config::{CaArgs, FileConfig};

#[derive(Clone, Debug, Parser)]
pub struct CaPublicKeyParams {
    #[clap(flatten)]
    pub ca: CaArgs,
}

/// The CA public key line, for `TrustedUserCAKeys` on SSH servers.
pub fn ca_public_key(config: &FileConfig, params: CaPublicKeyParams) -> anyhow::Result<String> {
    let ca = params.ca.merge(config.ca.clone()).authority()?;
    Ok(ca.public_key()?)
}
