//! Server-side and client-side authenticated-link install (C2.3, C2.4).
//!
//! Grounded on `examples/original_source/src/curve.hpp`'s `setup_auth` /
//! `setup_curve_server` / `setup_curve_client` sequence: read key material,
//! register every authorized client's public key, configure an IP
//! allow-list, and bind the result to the socket before any connect. The
//! transport primitive differs (X25519 + AES-GCM envelope rather than
//! libzmq's native CURVE/ZAP), but the capability shape is unchanged.

use std::net::IpAddr;
use std::path::Path;

use x25519_dalek::PublicKey;

use crate::cipher::LinkCipher;
use crate::error::{CryptoError, Result};
use crate::keys::{discover_roster, KeyPair};

/// Two-valued authenticator verbosity switch (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerbose {
    Off,
    On,
}

/// Authorized-client roster plus IP allow-list, analogous to the original's
/// ZAP authenticator. An empty allow-list means any address is permitted.
#[derive(Debug, Clone)]
pub struct Authenticator {
    roster: Vec<(String, PublicKey)>,
    ip_whitelist: Vec<String>,
    verbose: AuthVerbose,
}

impl Authenticator {
    pub fn new(roster: Vec<(String, PublicKey)>, ip_whitelist: Vec<String>, verbose: AuthVerbose) -> Self {
        if verbose == AuthVerbose::On {
            tracing::info!(clients = roster.len(), whitelist = ?ip_whitelist, "authenticator configured");
        }
        Self {
            roster,
            ip_whitelist,
            verbose,
        }
    }

    /// Build the roster by scanning `key_dir` for `*.pub` files, excluding
    /// the broker's own key.
    pub fn from_key_dir(
        key_dir: &Path,
        broker_name: &str,
        ip_whitelist: Vec<String>,
        verbose: AuthVerbose,
    ) -> Result<Self> {
        let roster = discover_roster(key_dir, broker_name)?;
        Ok(Self::new(roster, ip_whitelist, verbose))
    }

    pub fn is_address_allowed(&self, addr: &str) -> bool {
        if self.ip_whitelist.is_empty() {
            return true;
        }
        let allowed = self.ip_whitelist.iter().any(|w| w == addr);
        if !allowed && self.verbose == AuthVerbose::On {
            tracing::warn!(addr, "rejected: not in ip_whitelist");
        }
        allowed
    }

    pub fn is_authorized(&self, peer_public: &PublicKey) -> bool {
        let authorized = self
            .roster
            .iter()
            .any(|(_, pk)| pk.as_bytes() == peer_public.as_bytes());
        if !authorized && self.verbose == AuthVerbose::On {
            tracing::warn!("rejected: peer public key not in roster");
        }
        authorized
    }

    /// Validate a connecting peer by source address and public key,
    /// producing the first applicable [`CryptoError`] if rejected.
    pub fn admit(&self, addr: &str, peer_public: &PublicKey) -> Result<()> {
        if !self.is_address_allowed(addr) {
            return Err(CryptoError::AddressNotAllowed(addr.to_string()));
        }
        if !self.is_authorized(peer_public) {
            return Err(CryptoError::UnauthorizedPeer);
        }
        Ok(())
    }
}

/// A broker socket's server-side authenticated-link state: its own key-pair
/// plus the authenticator. Used to derive a per-client [`LinkCipher`] once a
/// client's public key is known.
pub struct ServerLink {
    pub keys: KeyPair,
    pub authenticator: Authenticator,
}

impl ServerLink {
    pub fn install(keys: KeyPair, authenticator: Authenticator) -> Self {
        Self { keys, authenticator }
    }

    /// Admit a client and derive the shared cipher for its link.
    pub fn accept(&self, addr: &str, client_public: &PublicKey) -> Result<LinkCipher> {
        self.authenticator.admit(addr, client_public)?;
        Ok(LinkCipher::derive(&self.keys.secret, client_public))
    }
}

/// A client socket's authenticated-link state: its own key-pair plus the
/// broker's known public key.
pub struct ClientLink {
    pub keys: KeyPair,
    pub server_public: PublicKey,
}

impl ClientLink {
    pub fn install(keys: KeyPair, server_public: PublicKey) -> Self {
        Self { keys, server_public }
    }

    pub fn cipher(&self) -> LinkCipher {
        LinkCipher::derive(&self.keys.secret, &self.server_public)
    }
}

pub fn parse_ip(addr: &str) -> Option<IpAddr> {
    addr.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn empty_whitelist_allows_any_address() {
        let auth = Authenticator::new(vec![], vec![], AuthVerbose::Off);
        assert!(auth.is_address_allowed("203.0.113.9"));
    }

    #[test]
    fn nonempty_whitelist_rejects_unknown_address() {
        let auth = Authenticator::new(vec![], vec!["127.0.0.1".into()], AuthVerbose::Off);
        assert!(auth.is_address_allowed("127.0.0.1"));
        assert!(!auth.is_address_allowed("10.0.0.5"));
    }

    #[test]
    fn roster_authorizes_known_peer_and_rejects_unknown() {
        let known = KeyPair::generate();
        let unknown = KeyPair::generate();
        let auth = Authenticator::new(
            vec![("client-a".to_string(), known.public)],
            vec![],
            AuthVerbose::Off,
        );
        assert!(auth.is_authorized(&known.public));
        assert!(!auth.is_authorized(&unknown.public));
    }

    #[test]
    fn admit_checks_address_before_roster() {
        let known = KeyPair::generate();
        let auth = Authenticator::new(
            vec![("client-a".to_string(), known.public)],
            vec!["127.0.0.1".into()],
            AuthVerbose::Off,
        );
        let result = auth.admit("10.0.0.5", &known.public);
        assert!(matches!(result, Err(CryptoError::AddressNotAllowed(_))));
    }

    #[test]
    fn server_and_client_links_derive_matching_ciphers() {
        let server_keys = KeyPair::generate();
        let client_keys = KeyPair::generate();

        let auth = Authenticator::new(
            vec![("client-a".to_string(), client_keys.public)],
            vec![],
            AuthVerbose::Off,
        );
        let server_public = server_keys.public;
        let server_link = ServerLink::install(server_keys, auth);
        let server_cipher = server_link.accept("127.0.0.1", &client_keys.public).unwrap();

        let client_link = ClientLink::install(client_keys, server_public);
        let client_cipher = client_link.cipher();

        let plaintext = b"hello broker";
        let sealed = client_cipher.seal(plaintext).unwrap();
        let opened = server_cipher.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }
}
