//! crypto::mock
//!
//! Deterministic encrypter for tests.

use super::{CryptoError, Encrypter};
use crate::core::constants::MAX_FILE_SIZE;

const HEADER: &[u8] = b"mock-envelope\n";

/// Reversible sham encrypter.
///
/// The "ciphertext" is `mock-envelope\n<passphrase>\n<plaintext>`, which
/// keeps tests cheap while preserving the properties the sync engine
/// relies on: roundtripping, passphrase sensitivity, and the decrypt
/// size cap.
#[derive(Debug, Clone)]
pub struct MockEncrypter {
    passphrase: String,
}

impl MockEncrypter {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }
}

impl Encrypter for MockEncrypter {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::with_capacity(HEADER.len() + self.passphrase.len() + 1 + plaintext.len());
        out.extend_from_slice(HEADER);
        out.extend_from_slice(self.passphrase.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(plaintext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let body = ciphertext
            .strip_prefix(HEADER)
            .ok_or_else(|| CryptoError::Decrypt("not a mock envelope".into()))?;

        let split = body
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| CryptoError::Decrypt("truncated mock envelope".into()))?;
        let (tag, plaintext) = (&body[..split], &body[split + 1..]);

        if tag != self.passphrase.as_bytes() {
            return Err(CryptoError::Decrypt(
                "mock passphrase mismatch (verify passphrase is correct)".into(),
            ));
        }

        if plaintext.len() as u64 > MAX_FILE_SIZE {
            return Err(CryptoError::FileTooLarge {
                what: "decrypted content".into(),
                limit: MAX_FILE_SIZE,
            });
        }

        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let enc = MockEncrypter::new("pw");
        let ct = enc.encrypt(b"hello").unwrap();
        assert_eq!(enc.decrypt(&ct).unwrap(), b"hello");
    }

    #[test]
    fn wrong_passphrase_rejected() {
        let enc = MockEncrypter::new("pw");
        let ct = enc.encrypt(b"hello").unwrap();
        assert!(MockEncrypter::new("other").decrypt(&ct).is_err());
    }

    #[test]
    fn plaintext_with_newlines_survives() {
        let enc = MockEncrypter::new("pw");
        let ct = enc.encrypt(b"a\nb\nc\n").unwrap();
        assert_eq!(enc.decrypt(&ct).unwrap(), b"a\nb\nc\n");
    }

    #[test]
    fn decrypt_size_boundary() {
        let enc = MockEncrypter::new("pw");

        // Exactly at the limit is fine.
        let max = vec![b'x'; MAX_FILE_SIZE as usize];
        let ct = enc.encrypt(&max).unwrap();
        assert_eq!(enc.decrypt(&ct).unwrap().len(), MAX_FILE_SIZE as usize);

        // One byte past is not.
        let big = vec![b'x'; (MAX_FILE_SIZE + 1) as usize];
        let ct = enc.encrypt(&big).unwrap();
        assert!(matches!(
            enc.decrypt(&ct),
            Err(CryptoError::FileTooLarge { .. })
        ));
    }
}
