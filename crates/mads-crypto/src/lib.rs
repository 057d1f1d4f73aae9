//! Credential & transport security (C2): key-pair generation and loading,
//! public-key roster discovery, server/client authenticated-link install,
//! and the per-link AEAD cipher.

pub mod auth;
pub mod cipher;
pub mod error;
pub mod keys;

pub use auth::{AuthVerbose, Authenticator, ClientLink, ServerLink};
pub use cipher::LinkCipher;
pub use error::CryptoError;
pub use keys::{GroupKey, KeyPair};
