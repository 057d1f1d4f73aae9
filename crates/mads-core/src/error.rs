//! The MADS error taxonomy.
//!
//! One variant per error kind named in the framework's error handling design,
//! not per call site. Crates that need additional local context (plugin ABI
//! failures, crypto setup) wrap this enum rather than replacing it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MadsError {
    #[error("config error: {0}")]
    Config(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("version mismatch: client {client}, broker {broker}")]
    VersionMismatch { client: String, broker: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("payload error: {0}")]
    Payload(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("plugin error: {0}")]
    Plugin(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snappy error: {0}")]
    Snappy(#[from] snap::Error),

    #[error("zmq error: {0}")]
    Zmq(#[from] zeromq::ZmqError),
}

pub type Result<T> = std::result::Result<T, MadsError>;
