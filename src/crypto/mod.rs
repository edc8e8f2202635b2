pub mod encryption;
pub mod keys;
pub mod passphrase;
pub mod phi_audit;
pub mod secure_delete;
pub mod signing;

pub use encryption::*;
pub use keys::*;
pub use passphrase::*;
pub use secure_delete::*;
pub use signing::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: wrong passphrase or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation needs at least {min} iterations, got {0}", min = keys::MIN_PBKDF2_ITERATIONS)]
    WeakKdf(u32),

    #[error("Malformed protected document: {0}")]
    MalformedContainer(&'static str),

    #[error("Passphrase material is empty")]
    EmptyPassphrase,

    #[error("Signing credential could not be unlocked")]
    CredentialLocked,

    #[error("Invalid signing key")]
    InvalidSigningKey,

    #[error("Invalid signing certificate")]
    InvalidCertificate,

    #[error("Signing certificate does not match the signing key")]
    CertificateKeyMismatch,

    #[error("Malformed signed envelope")]
    MalformedEnvelope,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
