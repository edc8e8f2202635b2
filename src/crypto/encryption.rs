use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use super::keys::{generate_salt, DocumentKey, KEY_LENGTH, MIN_PBKDF2_ITERATIONS, SALT_LENGTH};
use super::CryptoError;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Magic bytes of a passphrase-protected document.
pub const CONTAINER_MAGIC: &[u8; MAGIC_LENGTH] = b"LABDOC01";
const MAGIC_LENGTH: usize = 8;
const HEADER_LENGTH: usize = MAGIC_LENGTH + 4 + SALT_LENGTH + NONCE_LENGTH;

/// Encrypted data container: nonce + ciphertext (includes AES-GCM auth tag)
#[derive(Debug, Clone)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Encrypt plaintext using AES-256-GCM with a random nonce
    pub(crate) fn encrypt(key_bytes: &[u8; KEY_LENGTH], plaintext: &[u8]) -> Result<Self, CryptoError> {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(Self {
            nonce: nonce_bytes,
            ciphertext,
        })
    }

    /// Decrypt ciphertext using AES-256-GCM
    pub(crate) fn decrypt(&self, key_bytes: &[u8; KEY_LENGTH]) -> Result<Vec<u8>, CryptoError> {
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&self.nonce);

        cipher
            .decrypt(nonce, self.ciphertext.as_ref())
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// Encrypt a document under a passphrase.
///
/// Layout: `[8-byte magic][u32 BE iterations][32-byte salt][12-byte nonce][ciphertext + tag]`.
/// The container carries its own KDF parameters, so documents stay readable
/// after the configured iteration count changes.
pub fn seal_with_passphrase(
    plaintext: &[u8],
    passphrase: &str,
    iterations: u32,
) -> Result<Vec<u8>, CryptoError> {
    let salt = generate_salt();
    let key = DocumentKey::derive(passphrase, &salt, iterations)?;
    let encrypted = key.encrypt(plaintext)?;

    let mut bytes = Vec::with_capacity(HEADER_LENGTH + encrypted.ciphertext.len());
    bytes.extend_from_slice(CONTAINER_MAGIC);
    bytes.extend_from_slice(&iterations.to_be_bytes());
    bytes.extend_from_slice(&salt);
    bytes.extend_from_slice(&encrypted.nonce);
    bytes.extend_from_slice(&encrypted.ciphertext);
    Ok(bytes)
}

/// Decrypt a container written by [`seal_with_passphrase`].
pub fn open_with_passphrase(container: &[u8], passphrase: &str) -> Result<Vec<u8>, CryptoError> {
    if container.len() < HEADER_LENGTH + TAG_LENGTH {
        return Err(CryptoError::MalformedContainer("too short"));
    }
    let (magic, rest) = container.split_at(MAGIC_LENGTH);
    if magic != CONTAINER_MAGIC.as_slice() {
        return Err(CryptoError::MalformedContainer("bad magic"));
    }

    let (iterations, rest) = rest.split_at(4);
    let mut iteration_bytes = [0u8; 4];
    iteration_bytes.copy_from_slice(iterations);
    let iterations = u32::from_be_bytes(iteration_bytes);
    if iterations < MIN_PBKDF2_ITERATIONS {
        return Err(CryptoError::MalformedContainer("iteration count below floor"));
    }

    let (salt_bytes, rest) = rest.split_at(SALT_LENGTH);
    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(salt_bytes);

    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LENGTH);
    let mut nonce = [0u8; NONCE_LENGTH];
    nonce.copy_from_slice(nonce_bytes);

    let key = DocumentKey::derive(passphrase, &salt, iterations)?;
    key.decrypt(&EncryptedData {
        nonce,
        ciphertext: ciphertext.to_vec(),
    })
}

/// Whether bytes start like a protected document.
pub fn is_sealed(bytes: &[u8]) -> bool {
    bytes.starts_with(CONTAINER_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = MIN_PBKDF2_ITERATIONS;

    fn test_key() -> DocumentKey {
        DocumentKey::derive("test_passphrase", &[0u8; SALT_LENGTH], FAST).unwrap()
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = test_key();
        let plaintext = b"Report body";
        let encrypted = key.encrypt(plaintext).unwrap();
        assert_eq!(key.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn tampered_ciphertext_detected() {
        let key = test_key();
        let mut tampered = key.encrypt(b"secret data").unwrap();
        tampered.ciphertext[0] ^= 0xFF;
        assert!(key.decrypt(&tampered).is_err());
    }

    #[test]
    fn different_encryptions_produce_different_nonces() {
        let key = test_key();
        let e1 = key.encrypt(b"same data").unwrap();
        let e2 = key.encrypt(b"same data").unwrap();
        assert_ne!(e1.nonce, e2.nonce);
    }

    #[test]
    fn container_round_trip() {
        let sealed = seal_with_passphrase(b"%PDF-1.3 body", "RSSMRA80A01H501U", FAST).unwrap();
        assert!(is_sealed(&sealed));
        assert_eq!(
            open_with_passphrase(&sealed, "RSSMRA80A01H501U").unwrap(),
            b"%PDF-1.3 body"
        );
    }

    #[test]
    fn container_records_iterations() {
        let sealed = seal_with_passphrase(b"x", "pass", FAST + 5).unwrap();
        let stored = u32::from_be_bytes([sealed[8], sealed[9], sealed[10], sealed[11]]);
        assert_eq!(stored, FAST + 5);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let sealed = seal_with_passphrase(b"body", "RSSMRA80A01H501U", FAST).unwrap();
        assert!(matches!(
            open_with_passphrase(&sealed, "VRDLGU75B12F205X"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let a = seal_with_passphrase(b"body", "pass", FAST).unwrap();
        let b = seal_with_passphrase(b"body", "pass", FAST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_containers_rejected() {
        assert!(matches!(
            open_with_passphrase(&[0u8; 10], "pass"),
            Err(CryptoError::MalformedContainer(_))
        ));
        let mut sealed = seal_with_passphrase(b"body", "pass", FAST).unwrap();
        sealed[0] = b'X';
        assert!(matches!(
            open_with_passphrase(&sealed, "pass"),
            Err(CryptoError::MalformedContainer("bad magic"))
        ));
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let sealed = seal_with_passphrase(b"", "pass", FAST).unwrap();
        assert!(open_with_passphrase(&sealed, "pass").unwrap().is_empty());
    }
}
