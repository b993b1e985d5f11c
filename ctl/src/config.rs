use std::path::{Path, PathBuf};

use cassh_ca::{CaPolicy, CertificateAuthority, DEFAULT_VALIDITY_HOURS};
use serde::Deserialize;

/// Contents of the optional `casshctl` TOML file.
///
/// ```toml
/// [ca]
/// key_file = "/etc/cassh/ca_key"
/// validity_hours = 8
/// principals = ["deploy"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub ca: CaFileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaFileConfig {
    pub key: Option<String>,
    pub key_file: Option<PathBuf>,
    pub validity_hours: Option<u32>,
    pub principals: Option<Vec<String>>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&config_str).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file {}: {}", path.display(), e)
        })?;
        Ok(config)
    }

    /// Load `path` if one was given, otherwise fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

/// CA settings accepted on the command line. Anything left unset falls back
/// to the `[ca]` section of the config file.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct CaArgs {
    /// CA private key (OpenSSH format): Ed25519, RSA or ECDSA P-256/P-384.
    ///
    /// Provide the key as an inline string. For security, prefer using
    /// `--ca-key-file` instead of embedding the key directly.
    ///
    /// Takes precedence over `--ca-key-file`.
    #[clap(long, env = "CASSH_CA_KEY", hide_env_values = true)]
    pub ca_key: Option<String>,

    /// Path to the CA private key file (OpenSSH format).
    ///
    /// Generate one using:
    /// ```bash
    /// casshctl keygen --out-dir /etc/cassh
    /// ```
    #[clap(long, env = "CASSH_CA_KEY_FILE")]
    pub ca_key_file: Option<PathBuf>,

    /// Lifetime of issued certificates, in hours.
    #[clap(long, env = "CASSH_VALIDITY_HOURS")]
    pub validity_hours: Option<u32>,

    /// Comma separated principals written into every certificate. Defaults to
    /// the signed-in username.
    #[clap(long, env = "CASSH_PRINCIPALS", value_delimiter = ',')]
    pub principals: Vec<String>,
}

/// CA settings after merging the command line over the config file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaSettings {
    pub key: Option<String>,
    pub key_file: Option<PathBuf>,
    pub validity_hours: u32,
    pub principals: Vec<String>,
}

impl CaArgs {
    pub fn merge(self, file: CaFileConfig) -> CaSettings {
        let principals = if self.principals.is_empty() {
            file.principals.unwrap_or_default()
        } else {
            self.principals
        };

        CaSettings {
            key: self.ca_key.or(file.key),
            key_file: self.ca_key_file.or(file.key_file),
            validity_hours: self
                .validity_hours
                .or(file.validity_hours)
                .unwrap_or(DEFAULT_VALIDITY_HOURS),
            principals,
        }
    }
}

impl CaSettings {
    /// Get the CA key from either inline config or file.
    ///
    /// Checks `key` first (inline), then falls back to reading from
    /// `key_file`. Returns an error if neither is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Neither `key` nor `key_file` is configured
    /// - `key_file` path doesn't exist or can't be read
    pub fn signing_key_pem(&self) -> anyhow::Result<String> {
        if let Some(ref key) = self.key {
            return Ok(key.clone());
        }

        if let Some(ref path) = self.key_file {
            return std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read CA key file: {}", e));
        }

        Err(anyhow::anyhow!(
            "no CA key configured (set CASSH_CA_KEY or CASSH_CA_KEY_FILE)"
        ))
    }

    pub fn policy(&self) -> CaPolicy {
        CaPolicy {
            validity_hours: self.validity_hours,
            principals: self.principals.clone(),
        }
    }

    pub fn authority(&self) -> anyhow::Result<CertificateAuthority> {
        let pem = self.signing_key_pem()?;
        CertificateAuthority::new(&pem, self.policy())
            .map_err(|e| anyhow::anyhow!("failed to load CA: {}", e))
    }
}
