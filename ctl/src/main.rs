use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::{
    commands::{CaPublicKeyParams, InspectParams, KeygenParams, SignParams},
    config::FileConfig,
};

mod commands;
mod config;

/// Operate the cassh SSH user certificate authority.
#[derive(Parser)]
#[command(version, about)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    /// TOML file whose `[ca]` section provides defaults for CA settings.
    #[clap(short, long, global = true, env = "CASSH_CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// Generate an Ed25519 keypair.
    #[command(name = "keygen")]
    Keygen(KeygenParams),

    /// Sign a user public key into a short-lived certificate.
    #[command(name = "sign")]
    Sign(SignParams),

    /// Describe a certificate.
    #[command(name = "inspect")]
    Inspect(InspectParams),

    /// Print the CA public key for `TrustedUserCAKeys`.
    #[command(name = "ca-public-key")]
    CaPublicKey(CaPublicKeyParams),
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or("casshctl=info,cassh_ca=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = FileConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Keygen(params) => {
            let files = commands::keygen(params)?;
            println!("Wrote {}", files.private_key.display());
            println!("Wrote {}", files.public_key.display());
        }
        Command::Sign(params) => {
            let path = commands::sign(&config, params)?;
            println!("Wrote {}", path.display());
        }
        Command::Inspect(params) => {
            commands::inspect(params, &mut std::io::stdout().lock())?;
        }
        Command::CaPublicKey(params) => {
            println!("{}", commands::ca_public_key(&config, params)?);
        }
    }

    Ok(())
}
