//! Authenticated encryption for a single link, derived from an X25519
//! Diffie-Hellman exchange. Grounded on `server::connections`'s AES-GCM
//! usage in this workspace, extended with a key-exchange step so each link
//! gets its own derived key rather than a single static passphrase.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{CryptoError, Result};

const NONCE_LEN: usize = 12;

/// A per-link AEAD cipher derived from a shared secret.
pub struct LinkCipher {
    cipher: Aes256Gcm,
}

impl LinkCipher {
    pub fn derive(own_secret: &StaticSecret, peer_public: &PublicKey) -> Self {
        let shared = own_secret.diffie_hellman(peer_public);
        let cipher = Aes256Gcm::new_from_slice(shared.as_bytes()).expect("32-byte shared secret");
        Self { cipher }
    }

    /// Build a cipher directly from a pre-shared 32-byte key, used for the
    /// data-plane [`crate::keys::GroupKey`] rather than a per-pair DH secret.
    pub fn from_raw_key(key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(key).expect("32-byte shared secret");
        Self { cipher }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::DecryptFailed)?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext` buffer produced by [`Self::seal`].
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::DecryptFailed);
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::DecryptFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn seal_then_open_roundtrips() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let cipher_a = LinkCipher::derive(&a.secret, &b.public);
        let cipher_b = LinkCipher::derive(&b.secret, &a.public);

        let sealed = cipher_a.seal(b"payload bytes").unwrap();
        let opened = cipher_b.open(&sealed).unwrap();
        assert_eq!(opened, b"payload bytes");
    }

    #[test]
    fn open_rejects_tampered_ciphertext() {
        let a = KeyPair::generate();
        let b = KeyPair::generate();
        let cipher_a = LinkCipher::derive(&a.secret, &b.public);
        let cipher_b = LinkCipher::derive(&b.secret, &a.public);

        let mut sealed = cipher_a.seal(b"payload bytes").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(cipher_b.open(&sealed).is_err());
    }

    #[test]
    fn from_raw_key_seal_then_open_roundtrips() {
        let key = [7u8; 32];
        let cipher = LinkCipher::from_raw_key(&key);
        let sealed = cipher.seal(b"broadcast payload").unwrap();
        let opened = cipher.open(&sealed).unwrap();
        assert_eq!(opened, b"broadcast payload");
    }

    #[test]
    fn open_rejects_truncated_buffer() {
        let a = KeyPair::generate();
        let cipher = LinkCipher::derive(&a.secret, &a.public);
        assert!(cipher.open(&[1, 2, 3]).is_err());
    }
}
