//! Envelope encryption boundary.
//!
//! The engine never holds key material. It talks to a [`RootKeyCipher`],
//! which a deployment backs with its key-management service. [`LocalRootKey`]
//! is a self-contained implementation using ChaCha20-Poly1305 with a data key
//! derived from a 256-bit root key.

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::types::SecretValue;

/// Size of the root key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

const DATA_KEY_CONTEXT: &str = "veil-sharing v1 secret payload";

/// An encrypt/decrypt capability backed by an externally managed root key.
pub trait RootKeyCipher: Send + Sync {
    /// Encrypts plaintext into an opaque ciphertext blob.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts a blob produced by [`RootKeyCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is malformed or fails authentication.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// A local root key.
///
/// The key is securely zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct LocalRootKey {
    data_key: [u8; KEY_SIZE],
}

impl LocalRootKey {
    /// Generates a new random root key.
    #[must_use]
    pub fn generate() -> Self {
        let mut root = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut root);
        let key = Self::derive(&root);
        root.zeroize();
        key
    }

    /// Creates a key from raw root key bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let root: &[u8; KEY_SIZE] = bytes.try_into().map_err(|_| Error::EncryptionError {
            reason: format!("key must be exactly {KEY_SIZE} bytes, got {}", bytes.len()),
        })?;
        Ok(Self::derive(root))
    }

    fn derive(root: &[u8; KEY_SIZE]) -> Self {
        Self {
            data_key: blake3::derive_key(DATA_KEY_CONTEXT, root),
        }
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        ChaCha20Poly1305::new_from_slice(&self.data_key).map_err(|e| Error::EncryptionError {
            reason: format!("failed to create cipher: {e}"),
        })
    }
}

impl std::fmt::Debug for LocalRootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRootKey")
            .field("data_key", &"[REDACTED]")
            .finish()
    }
}

impl RootKeyCipher for LocalRootKey {
    /// Output format: `nonce || ciphertext || tag`.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| Error::EncryptionError {
                reason: format!("encryption failed: {e}"),
            })?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::EncryptionError {
                reason: format!(
                    "ciphertext too short: expected at least {} bytes, got {}",
                    NONCE_SIZE + TAG_SIZE,
                    ciphertext.len()
                ),
            });
        }

        let cipher = self.cipher()?;
        let (nonce, encrypted) = ciphertext.split_at(NONCE_SIZE);

        cipher
            .decrypt(Nonce::from_slice(nonce), encrypted)
            .map_err(|e| Error::EncryptionError {
                reason: format!("decryption failed: {e}"),
            })
    }
}

/// Size-enforcing adapter between the engine and its [`RootKeyCipher`].
#[derive(Clone)]
pub struct EncryptionBoundary {
    cipher: Arc<dyn RootKeyCipher>,
    max_plaintext_len: usize,
}

impl EncryptionBoundary {
    /// Wraps a cipher with a plaintext size cap (inclusive).
    #[must_use]
    pub fn new(cipher: Arc<dyn RootKeyCipher>, max_plaintext_len: usize) -> Self {
        Self {
            cipher,
            max_plaintext_len,
        }
    }

    /// Rejects plaintext larger than the cap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if `plaintext` is too long.
    pub fn check_size(&self, plaintext: &str) -> Result<()> {
        if plaintext.len() > self.max_plaintext_len {
            return Err(Error::bad_request("Shared secret value too long"));
        }
        Ok(())
    }

    /// Checks the size of `plaintext` and encrypts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the plaintext is too long or the cipher fails.
    pub fn seal(&self, plaintext: &SecretValue) -> Result<Vec<u8>> {
        self.check_size(plaintext.expose())?;
        self.cipher.encrypt(plaintext.as_bytes())
    }

    /// Decrypts a stored blob into a [`SecretValue`].
    ///
    /// # Errors
    ///
    /// Returns an error if decryption fails or the plaintext is not UTF-8.
    pub fn open(&self, ciphertext: &[u8]) -> Result<SecretValue> {
        SecretValue::from_bytes(self.cipher.decrypt(ciphertext)?)
    }
}

impl std::fmt::Debug for EncryptionBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionBoundary")
            .field("max_plaintext_len", &self.max_plaintext_len)
            .finish_non_exhaustive()
    }
}
