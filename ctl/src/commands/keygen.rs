use std::path::{Path, PathBuf};

use clap::Parser;
use ssh_key::LineEnding;
use tracing::info;

const PRIVATE_KEY_FILE: &str = "id_ed25519";
const PUBLIC_KEY_FILE: &str = "id_ed25519.pub";

#[derive(Clone, Debug, Parser)]
pub struct KeygenParams {
    /// Directory to write `id_ed25519` and `id_ed25519.pub` into.
    #[clap(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Replace existing key files.
    #[clap(short, long, default_value_t = false)]
    pub force: bool,
}

/// Paths of a freshly written keypair.
#[derive(Debug)]
pub struct KeyFiles {
    pub private_key: PathBuf,
    pub public_key: PathBuf,
}

/// Generate an Ed25519 keypair and write it in OpenSSH format. The private
/// key file is created owner-readable only.
pub fn keygen(KeygenParams { out_dir, force }: KeygenParams) -> anyhow::Result<KeyFiles> {
    let files = KeyFiles {
        private_key: out_dir.join(PRIVATE_KEY_FILE),
        public_key: out_dir.join(PUBLIC_KEY_FILE),
    };

    // Keys are only created owner-readable; an existing file would keep its
    // old mode when overwritten.
    for path in [&files.private_key, &files.public_key] {
        if force {
            remove_existing(path)?;
        } else {
            ensure_absent(path)?;
        }
    }

    std::fs::create_dir_all(&out_dir)
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", out_dir.display(), e))?;

    let key = cassh_ca::generate_key_pair()?;

    key.write_openssh_file(&files.private_key, LineEnding::LF)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", files.private_key.display(), e))?;
    key.public_key()
        .write_openssh_file(&files.public_key)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", files.public_key.display(), e))?;

    info!(
        path = %files.private_key.display(),
        fingerprint = %key.fingerprint(ssh_key::HashAlg::Sha256),
        "Generated Ed25519 keypair"
    );

    Ok(files)
}

fn ensure_absent(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

fn remove_existing(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::anyhow!("failed to remove {}: {}", path.display(), e)),
    }
}

#[cfg(test)]
mod tests {
    use cassh_ca::codec;

    use super::*;

    #[test]
    fn test_keygen_writes_matching_pair() {
        let dir = tempfile::tempdir().unwrap();

        let files = keygen(KeygenParams {
            out_dir: dir.path().to_path_buf(),
            force: false,
        })
        .unwrap();

        let private = codec::parse_private_key(&std::fs::read_to_string(&files.private_key).unwrap())
            .unwrap();
        let public = codec::parse_public_key(&std::fs::read_to_string(&files.public_key).unwrap())
            .unwrap();

        assert_eq!(private.public_key().key_data(), public.key_data());
        assert_eq!(public.comment(), "cassh generated key");
    }

    #[cfg(unix)]
    #[test]
    fn test_private_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let files = keygen(KeygenParams {
            out_dir: dir.path().to_path_buf(),
            force: false,
        })
        .unwrap();

        let mode = std::fs::metadata(&files.private_key)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_force_replaces_world_readable_key_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let private_key = dir.path().join("id_ed25519");
        std::fs::write(&private_key, "old key").unwrap();
        std::fs::set_permissions(&private_key, std::fs::Permissions::from_mode(0o644)).unwrap();

        let files = keygen(KeygenParams {
            out_dir: dir.path().to_path_buf(),
            force: true,
        })
        .unwrap();

        let mode = std::fs::metadata(&files.private_key)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o077, 0, "private key mode is {:o}", mode & 0o777);
        assert_ne!(std::fs::read_to_string(&files.private_key).unwrap(), "old key");
    }

    #[test]
    fn test_keygen_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let params = KeygenParams {
            out_dir: dir.path().to_path_buf(),
            force: false,
        };

        let first = keygen(params.clone()).unwrap();
        let original = std::fs::read_to_string(&first.public_key).unwrap();

        assert!(keygen(params.clone()).is_err());
        assert_eq!(std::fs::read_to_string(&first.public_key).unwrap(), original);

        let replaced = keygen(KeygenParams {
            force: true,
            ..params
        })
        .unwrap();
        assert_ne!(std::fs::read_to_string(&replaced.public_key).unwrap(), original);
    }

    #[test]
    fn test_keygen_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("ca").join("keys");

        let files = keygen(KeygenParams {
            out_dir: nested.clone(),
            force: false,
        })
        .unwrap();

        assert!(files.private_key.starts_with(&nested));
        assert!(files.private_key.exists());
    }
}
