//! Cipher collaborator boundary and a shared-secret implementation.
//!
//! The thread view only ever sees the [`MessageCipher`] trait: decrypt one
//! message, encrypt for one recipient, sign one transaction. The bundled
//! [`SharedSecretCipher`] implements it with X25519 ECDH for the per-contact
//! key, SHA-256 for key derivation and AES-256-GCM for the payload, with
//! Ed25519 signatures over submitted transactions.

use std::collections::HashMap;
use std::sync::RwLock;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use log::{debug, trace, warn};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::models::Message;

/// The size of the AES key in bytes (256 bits)
pub const AES_KEY_SIZE: usize = 32;

/// The size of the nonce in bytes for AES-GCM (96 bits)
pub const AES_NONCE_SIZE: usize = 12;

/// Errors related to cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No key material registered for the given contact
    #[error("No public key known for contact {0}")]
    UnknownContact(String),

    /// Error during AES-GCM encryption or decryption
    #[error("AES-GCM error: {0}")]
    AesGcmError(String),

    /// Payload could not be decoded from its transport form
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Payload too short or otherwise malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Cryptographic operations the thread view depends on.
///
/// Every method may fail per call; the caller decides whether the failure is
/// isolated (decryption) or aborts the operation (encryption, signing).
#[async_trait]
pub trait MessageCipher: Send + Sync {
    /// Decrypt one message's payload into plaintext.
    async fn decrypt(&self, message: &Message) -> Result<String>;

    /// Encrypt plaintext for the given recipient, returning the opaque
    /// transport form.
    async fn encrypt(&self, recipient_id: &str, plaintext: &str) -> Result<String>;

    /// Sign an unsigned transaction, returning the signed hex ready for
    /// submission.
    async fn sign(&self, transaction_hex: &str) -> Result<String>;
}

/// Shared-secret cipher for one local identity.
///
/// The payload key is symmetric per contact pair: SHA-256 over the X25519
/// shared secret. Both directions of a thread therefore decrypt with the
/// same key, which is what lets the view decrypt its own sent messages from
/// the archive. Transport form is base64(nonce || ciphertext).
pub struct SharedSecretCipher {
    exchange_secret: StaticSecret,
    signing_key: SigningKey,
    /// Known X25519 public keys, by contact identifier.
    contact_keys: RwLock<HashMap<String, PublicKey>>,
}

impl SharedSecretCipher {
    /// Generate a fresh local identity.
    pub fn generate() -> Self {
        let mut rng = OsRng;
        let mut exchange_bytes = [0u8; 32];
        rng.fill_bytes(&mut exchange_bytes);
        let mut signing_bytes = [0u8; 32];
        rng.fill_bytes(&mut signing_bytes);

        SharedSecretCipher {
            exchange_secret: StaticSecret::from(exchange_bytes),
            signing_key: SigningKey::from_bytes(&signing_bytes),
            contact_keys: RwLock::new(HashMap::new()),
        }
    }

    /// Build a cipher from existing key material (e.g. restored from the
    /// device's secure storage, which is outside this crate).
    pub fn from_keys(exchange_secret: [u8; 32], signing_key: [u8; 32]) -> Self {
        SharedSecretCipher {
            exchange_secret: StaticSecret::from(exchange_secret),
            signing_key: SigningKey::from_bytes(&signing_key),
            contact_keys: RwLock::new(HashMap::new()),
        }
    }

    /// The local X25519 public key, for handing to counterparties.
    pub fn exchange_public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.exchange_secret).to_bytes()
    }

    /// The local Ed25519 verifying key, for checking our signatures.
    pub fn verifying_key(&self) -> ed25519_dalek::VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Register a counterparty's X25519 public key under its identifier.
    pub fn add_contact_key(&self, contact_id: &str, public_key: [u8; 32]) {
        debug!("Registering exchange key for contact {}", contact_id);
        if let Ok(mut keys) = self.contact_keys.write() {
            keys.insert(contact_id.to_string(), PublicKey::from(public_key));
        }
    }

    /// Derive the symmetric payload key shared with one contact.
    fn shared_key(&self, contact_id: &str) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
        let contact_key = {
            let keys = self
                .contact_keys
                .read()
                .map_err(|_| CryptoError::UnknownContact(contact_id.to_string()))?;
            match keys.get(contact_id) {
                Some(key) => *key,
                None => return Err(CryptoError::UnknownContact(contact_id.to_string())),
            }
        };

        let shared = self.exchange_secret.diffie_hellman(&contact_key);
        let mut hasher = Sha256::new();
        hasher.update(shared.as_bytes());
        let digest = hasher.finalize();

        let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
        key.copy_from_slice(&digest);
        Ok(key)
    }

    fn encrypt_for(&self, contact_id: &str, plaintext: &[u8]) -> Result<String, CryptoError> {
        let key = self.shared_key(contact_id)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| CryptoError::AesGcmError(format!("Failed to create cipher: {}", e)))?;

        let mut nonce_bytes = [0u8; AES_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::AesGcmError(format!("Encryption failed: {}", e)))?;
        trace!("Encrypted {} plaintext bytes for {}", plaintext.len(), contact_id);

        let mut payload = Vec::with_capacity(AES_NONCE_SIZE + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(base64::engine::general_purpose::STANDARD.encode(payload))
    }

    fn decrypt_from(&self, contact_id: &str, payload: &str) -> Result<Vec<u8>, CryptoError> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| CryptoError::DecodingError(format!("Failed to decode payload: {}", e)))?;

        if raw.len() <= AES_NONCE_SIZE {
            return Err(CryptoError::InvalidPayload(format!(
                "Payload too short: {} bytes (need more than {})",
                raw.len(),
                AES_NONCE_SIZE
            )));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(AES_NONCE_SIZE);

        let key = self.shared_key(contact_id)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| CryptoError::AesGcmError(format!("Failed to create cipher: {}", e)))?;

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::AesGcmError(format!("Decryption failed: {}", e)))
    }
}

#[async_trait]
impl MessageCipher for SharedSecretCipher {
    async fn decrypt(&self, message: &Message) -> Result<String> {
        // The payload key is shared with the counterparty, which is the
        // sender for incoming messages and the recipient for our own.
        let contact_id = if message.is_outgoing {
            &message.recipient_id
        } else {
            &message.sender_id
        };

        let plaintext_bytes = self.decrypt_from(contact_id, &message.encrypted_text)?;
        let plaintext = String::from_utf8(plaintext_bytes)
            .map_err(|e| CryptoError::InvalidPayload(format!("Plaintext is not UTF-8: {}", e)))?;
        Ok(plaintext)
    }

    async fn encrypt(&self, recipient_id: &str, plaintext: &str) -> Result<String> {
        Ok(self.encrypt_for(recipient_id, plaintext.as_bytes())?)
    }

    async fn sign(&self, transaction_hex: &str) -> Result<String> {
        let transaction_bytes = hex::decode(transaction_hex)
            .map_err(|e| anyhow!("Invalid transaction hex: {}", e))?;
        if transaction_bytes.is_empty() {
            warn!("Signing an empty transaction payload");
        }

        let signature = self.signing_key.sign(&transaction_bytes);
        // Signed form: original transaction followed by the 64-byte signature.
        Ok(format!("{}{}", transaction_hex, hex::encode(signature.to_bytes())))
    }
}
