//! Password-at-rest encryption.
//!
//! AES-256-GCM with a random nonce prepended to the ciphertext, base64
//! encoded. Used as an opaque encrypt/decrypt primitive by the session
//! manager; the key comes from process configuration.

use aes_gcm::aead::{Aead, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CryptoError {
	#[error("invalid key size: expected {KEY_LEN} bytes, got {0}")]
	InvalidKeySize(usize),
	#[error("invalid ciphertext")]
	InvalidCiphertext,
	#[error("decryption failed")]
	DecryptFailed,
}

fn cipher(key: &str) -> Result<Aes256Gcm, CryptoError> {
	let bytes = key.as_bytes();
	if bytes.len() != KEY_LEN {
		return Err(CryptoError::InvalidKeySize(bytes.len()));
	}
	Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(bytes)))
}

/// Encrypts a password. Output is base64(nonce || ciphertext); a fresh
/// random nonce means repeated encryptions of one password differ.
pub fn encrypt_password(password: &str, key: &str) -> Result<String, CryptoError> {
	let cipher = cipher(key)?;
	let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
	let ciphertext = cipher
		.encrypt(&nonce, password.as_bytes())
		.map_err(|_| CryptoError::InvalidCiphertext)?;

	let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
	out.extend_from_slice(&nonce);
	out.extend_from_slice(&ciphertext);
	Ok(BASE64.encode(out))
}

/// Decrypts a password produced by [`encrypt_password`].
pub fn decrypt_password(encrypted: &str, key: &str) -> Result<String, CryptoError> {
	let cipher = cipher(key)?;
	let raw = BASE64.decode(encrypted).map_err(|_| CryptoError::InvalidCiphertext)?;
	if raw.len() < NONCE_LEN {
		return Err(CryptoError::InvalidCiphertext);
	}
	let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
	let plain = cipher
		.decrypt(Nonce::from_slice(nonce), ciphertext)
		.map_err(|_| CryptoError::DecryptFailed)?;
	String::from_utf8(plain).map_err(|_| CryptoError::DecryptFailed)
}
