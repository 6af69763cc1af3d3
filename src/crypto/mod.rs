//! crypto
//!
//! Passphrase-based encryption of tracked files.
//!
//! # Design
//!
//! The [`Encrypter`] trait is the seam between the sync engine and the
//! cipher: production code uses [`AgeEncrypter`] (age format, scrypt
//! recipient), tests substitute [`MockEncrypter`]. The envelope is
//! self-describing - format, algorithm, and key-derivation parameters
//! travel in the ciphertext header, so decryption needs only the
//! passphrase.
//!
//! New envelopes are pinned at scrypt work factor
//! [`SCRYPT_LOG_N`](crate::core::constants::SCRYPT_LOG_N); files
//! encrypted at other work factors still decrypt.

mod mock;
pub mod passphrase;

pub use mock::MockEncrypter;
pub use passphrase::PassphraseResolver;

use std::io::Write;

use age::secrecy::SecretString;
use thiserror::Error;

use crate::core::constants::{MAX_FILE_SIZE, SCRYPT_LOG_N};
use crate::core::errors::ErrorKind;
use crate::core::limits::{read_limited, LimitError};

/// Errors from encryption and decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed (verify passphrase is correct): {0}")]
    Decrypt(String),

    #[error("passphrase not available: {0}")]
    Passphrase(String),

    /// Decrypted output exceeded the size limit.
    #[error("{what} exceeds maximum size of {limit} bytes")]
    FileTooLarge { what: String, limit: u64 },
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::Encrypt(_) => ErrorKind::Encrypt,
            CryptoError::Decrypt(_) => ErrorKind::Decrypt,
            CryptoError::Passphrase(_) => ErrorKind::Passphrase,
            CryptoError::FileTooLarge { .. } => ErrorKind::FileSizeExceeded,
        }
    }
}

impl From<LimitError> for CryptoError {
    fn from(e: LimitError) -> Self {
        match e {
            LimitError::Exceeded { what, limit } => CryptoError::FileTooLarge { what, limit },
            LimitError::Io { what, source } => {
                CryptoError::Decrypt(format!("failed to read {what}: {source}"))
            }
        }
    }
}

/// Encryption and decryption of byte blobs.
pub trait Encrypter: Send + Sync {
    /// Encrypt plaintext, returning the self-describing ciphertext.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt ciphertext. Output is capped at 2 MiB.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check that this encrypter's passphrase can decrypt `ciphertext`.
    fn verify(&self, ciphertext: &[u8]) -> Result<(), CryptoError> {
        self.decrypt(ciphertext).map(|_| ())
    }
}

/// Age-based encrypter using a scrypt passphrase recipient.
pub struct AgeEncrypter {
    passphrase: String,
}

impl AgeEncrypter {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    fn recipient(&self) -> age::scrypt::Recipient {
        let mut recipient =
            age::scrypt::Recipient::new(SecretString::from(self.passphrase.clone()));
        // Fixed work factor: left unset, the age crate calibrates the
        // scrypt cost to the machine it runs on, and the written
        // parameter would vary across hosts.
        recipient.set_work_factor(SCRYPT_LOG_N);
        recipient
    }
}

impl Encrypter for AgeEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let recipient = self.recipient();
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        let mut ciphertext = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        writer
            .write_all(plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

        Ok(ciphertext)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let decryptor =
            age::Decryptor::new(ciphertext).map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        // The identity accepts envelopes written at any work factor, so
        // older (or newer) ciphertexts keep decrypting.
        let identity = age::scrypt::Identity::new(SecretString::from(self.passphrase.clone()));
        let reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| CryptoError::Decrypt(e.to_string()))?;

        let plaintext = read_limited(reader, MAX_FILE_SIZE, "decrypted content")?;
        Ok(plaintext)
    }
}

impl std::fmt::Debug for AgeEncrypter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgeEncrypter").finish_non_exhaustive()
    }
}
