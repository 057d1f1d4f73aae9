//! Key-pair generation and loading (C2.1, C2.2).
//!
//! A key-pair is persisted as two text files sharing a base name under a
//! chosen directory: `<name>.pub` and `<name>.key`, each the hex encoding of
//! a 32-byte X25519 key. This plays the role the original's CURVE key-pairs
//! play, substituting an X25519 static secret for libsodium's CURVE keys
//! since the `zeromq` crate this workspace depends on has no native CURVE
//! support (see DESIGN.md).

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{CryptoError, Result};

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret: StaticSecret,
    pub public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    fn pub_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.pub"))
    }

    fn key_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.key"))
    }

    /// Generate and persist a new key-pair. Fails if either file already
    /// exists unless `overwrite` is set.
    pub fn generate_to(dir: &Path, name: &str, overwrite: bool) -> Result<Self> {
        let pub_path = Self::pub_path(dir, name);
        let key_path = Self::key_path(dir, name);
        if !overwrite {
            if pub_path.exists() {
                return Err(CryptoError::AlreadyExists(pub_path));
            }
            if key_path.exists() {
                return Err(CryptoError::AlreadyExists(key_path));
            }
        }
        let pair = Self::generate();
        fs::write(&pub_path, hex::encode(pair.public.as_bytes()))?;
        fs::write(&key_path, hex::encode(pair.secret.to_bytes()))?;
        Ok(pair)
    }

    /// Load an existing key-pair from `<dir>/<name>.{pub,key}`.
    pub fn load_from(dir: &Path, name: &str) -> Result<Self> {
        let pub_path = Self::pub_path(dir, name);
        let key_path = Self::key_path(dir, name);
        let public = load_public_key(&pub_path)?;
        let secret_bytes = read_hex32(&key_path)?;
        let secret = StaticSecret::from(secret_bytes);
        let derived_public = PublicKey::from(&secret);
        if derived_public.as_bytes() != public.as_bytes() {
            return Err(CryptoError::MalformedKey(key_path));
        }
        Ok(Self { secret, public })
    }
}

/// Load a standalone public key (e.g. the broker's, or a roster peer's).
pub fn load_public_key(path: &Path) -> Result<PublicKey> {
    let bytes = read_hex32(path)?;
    Ok(PublicKey::from(bytes))
}

fn read_hex32(path: &Path) -> Result<[u8; 32]> {
    if !path.exists() {
        return Err(CryptoError::MissingKeyFile(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| CryptoError::UnreadableKeyFile {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded =
        hex::decode(text.trim()).map_err(|_| CryptoError::MalformedKey(path.to_path_buf()))?;
    decoded
        .try_into()
        .map_err(|_| CryptoError::MalformedKey(path.to_path_buf()))
}

/// The data-plane symmetric key (§4.2, §5 shared-resource policy): since
/// the broker's front/back sockets are a blind relay that never decodes the
/// frames it forwards, pairwise per-link encryption (as used for the
/// settings service) can't apply to published/subscribed data without a
/// rendezvous the broker doesn't provide. Instead every authorized agent
/// reads the same symmetric key from the shared key directory, exactly as
/// it already reads the broker's public key from there — a single file
/// `<name>.group`, hex-encoded, generated once by whoever runs
/// `mads-keygen` for the broker. This is a deliberate simplification of the
/// original's per-socket CURVE sessions, recorded in DESIGN.md.
pub struct GroupKey(pub [u8; 32]);

impl GroupKey {
    fn path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.group"))
    }

    pub fn generate_to(dir: &Path, name: &str, overwrite: bool) -> Result<Self> {
        let path = Self::path(dir, name);
        if !overwrite && path.exists() {
            return Err(CryptoError::AlreadyExists(path));
        }
        let mut key = [0u8; 32];
        rand::RngCore::fill_bytes(&mut OsRng, &mut key);
        fs::write(&path, hex::encode(key))?;
        Ok(Self(key))
    }

    pub fn load_from(dir: &Path, name: &str) -> Result<Self> {
        let path = Self::path(dir, name);
        Ok(Self(read_hex32(&path)?))
    }
}

/// Enumerate every `*.pub` file in `dir` (excluding `exclude_name`, typically
/// the broker's own) to build the authorized-client roster.
pub fn discover_roster(dir: &Path, exclude_name: &str) -> Result<Vec<(String, PublicKey)>> {
    let mut roster = Vec::new();
    let entries = fs::read_dir(dir)?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("pub") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if stem == exclude_name {
            continue;
        }
        let public = load_public_key(&path)?;
        roster.push((stem, public));
    }
    if roster.is_empty() {
        return Err(CryptoError::EmptyRoster(dir.to_path_buf()));
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let generated = KeyPair::generate_to(dir.path(), "broker", false).unwrap();
        let loaded = KeyPair::load_from(dir.path(), "broker").unwrap();
        assert_eq!(generated.public.as_bytes(), loaded.public.as_bytes());
    }

    #[test]
    fn generate_refuses_overwrite_by_default() {
        let dir = tempfile::tempdir().unwrap();
        KeyPair::generate_to(dir.path(), "broker", false).unwrap();
        let result = KeyPair::generate_to(dir.path(), "broker", false);
        assert!(matches!(result, Err(CryptoError::AlreadyExists(_))));
    }

    #[test]
    fn generate_allows_overwrite_when_flagged() {
        let dir = tempfile::tempdir().unwrap();
        KeyPair::generate_to(dir.path(), "broker", false).unwrap();
        assert!(KeyPair::generate_to(dir.path(), "broker", true).is_ok());
    }

    #[test]
    fn load_missing_key_is_missing_key_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyPair::load_from(dir.path(), "nobody");
        assert!(matches!(result, Err(CryptoError::MissingKeyFile(_))));
    }

    #[test]
    fn discover_roster_excludes_broker_and_finds_clients() {
        let dir = tempfile::tempdir().unwrap();
        KeyPair::generate_to(dir.path(), "broker", false).unwrap();
        KeyPair::generate_to(dir.path(), "client-a", false).unwrap();
        KeyPair::generate_to(dir.path(), "client-b", false).unwrap();
        let roster = discover_roster(dir.path(), "broker").unwrap();
        let mut names: Vec<_> = roster.into_iter().map(|(n, _)| n).collect();
        names.sort();
        assert_eq!(names, vec!["client-a", "client-b"]);
    }

    #[test]
    fn discover_roster_empty_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_roster(dir.path(), "broker");
        assert!(matches!(result, Err(CryptoError::EmptyRoster(_))));
    }

    #[test]
    fn group_key_generate_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let generated = GroupKey::generate_to(dir.path(), "broker", false).unwrap();
        let loaded = GroupKey::load_from(dir.path(), "broker").unwrap();
        assert_eq!(generated.0, loaded.0);
    }

    #[test]
    fn group_key_load_missing_is_missing_key_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GroupKey::load_from(dir.path(), "broker");
        assert!(matches!(result, Err(CryptoError::MissingKeyFile(_))));
    }
}
