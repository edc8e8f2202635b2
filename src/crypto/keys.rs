use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::encryption::EncryptedData;
use super::CryptoError;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;
/// Floor accepted when reading a container or a configuration.
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;
pub const KEY_LENGTH: usize = 32; // AES-256
pub const SALT_LENGTH: usize = 32;

/// Per-document encryption key, zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DocumentKey {
    key_bytes: [u8; KEY_LENGTH],
}

impl DocumentKey {
    /// Derive from passphrase + salt using PBKDF2-SHA256
    pub fn derive(
        passphrase: &str,
        salt: &[u8; SALT_LENGTH],
        iterations: u32,
    ) -> Result<Self, CryptoError> {
        if iterations < MIN_PBKDF2_ITERATIONS {
            return Err(CryptoError::WeakKdf(iterations));
        }
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key_bytes);
        Ok(Self { key_bytes })
    }

    /// Encrypt data using AES-256-GCM
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        EncryptedData::encrypt(&self.key_bytes, plaintext)
    }

    /// Decrypt data using AES-256-GCM
    pub fn decrypt(&self, encrypted: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        encrypted.decrypt(&self.key_bytes)
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = MIN_PBKDF2_ITERATIONS;

    #[test]
    fn derive_produces_deterministic_key() {
        let salt = [42u8; SALT_LENGTH];
        let key1 = DocumentKey::derive("RSSMRA80A01H501U", &salt, FAST).unwrap();
        let key2 = DocumentKey::derive("RSSMRA80A01H501U", &salt, FAST).unwrap();
        assert_eq!(key1.key_bytes, key2.key_bytes);
    }

    #[test]
    fn different_passphrases_produce_different_keys() {
        let salt = [42u8; SALT_LENGTH];
        let key1 = DocumentKey::derive("RSSMRA80A01H501U", &salt, FAST).unwrap();
        let key2 = DocumentKey::derive("VRDLGU75B12F205X", &salt, FAST).unwrap();
        assert_ne!(key1.key_bytes, key2.key_bytes);
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let key1 = DocumentKey::derive("passphrase", &[1u8; SALT_LENGTH], FAST).unwrap();
        let key2 = DocumentKey::derive("passphrase", &[2u8; SALT_LENGTH], FAST).unwrap();
        assert_ne!(key1.key_bytes, key2.key_bytes);
    }

    #[test]
    fn iteration_count_changes_the_key() {
        let salt = [7u8; SALT_LENGTH];
        let key1 = DocumentKey::derive("passphrase", &salt, FAST).unwrap();
        let key2 = DocumentKey::derive("passphrase", &salt, FAST + 1).unwrap();
        assert_ne!(key1.key_bytes, key2.key_bytes);
    }

    #[test]
    fn too_few_iterations_rejected() {
        let result = DocumentKey::derive("passphrase", &[0u8; SALT_LENGTH], 10);
        assert!(matches!(result, Err(CryptoError::WeakKdf(10))));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
