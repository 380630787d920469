use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 24;

#[derive(Debug, Error)]
pub(crate) enum CryptoError {
    #[error("encryption failed")]
    Encrypt,
    #[error("ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("ciphertext is too short")]
    Truncated,
    #[error("ciphertext failed authentication")]
    Authentication,
    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// 设置值加解密：XChaCha20-Poly1305，密钥为进程密钥的 SHA-256，
/// 存储格式 `base64(nonce || ciphertext)`
#[derive(Clone)]
pub(crate) struct SettingsCipher {
    aead: XChaCha20Poly1305,
}

impl SettingsCipher {
    pub(crate) fn from_secret(secret: &str) -> Self {
        let key = Sha256::digest(secret.as_bytes());
        Self {
            aead: XChaCha20Poly1305::new(&key),
        }
    }

    pub(crate) fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .aead
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    pub(crate) fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let sealed = STANDARD.decode(encoded)?;
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::Truncated);
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .aead
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }
}
