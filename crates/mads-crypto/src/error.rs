//! Crypto-specific error wrapping, folded into [`mads_core::MadsError::Credential`]
//! at the component boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key file already exists: {0}")]
    AlreadyExists(std::path::PathBuf),

    #[error("missing key file: {0}")]
    MissingKeyFile(std::path::PathBuf),

    #[error("unreadable key file {path}: {source}")]
    UnreadableKeyFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed key material in {0}")]
    MalformedKey(std::path::PathBuf),

    #[error("empty client roster: no *.pub files found under {0}")]
    EmptyRoster(std::path::PathBuf),

    #[error("peer not in authorized roster")]
    UnauthorizedPeer,

    #[error("source address not in allow-list: {0}")]
    AddressNotAllowed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("authenticated decryption failed")]
    DecryptFailed,
}

impl From<CryptoError> for mads_core::MadsError {
    fn from(e: CryptoError) -> Self {
        mads_core::MadsError::Credential(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
