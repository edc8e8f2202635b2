//! ECDSA P-256 countersigning of protected reports.
//!
//! ## Envelope format
//!
//! A signed report is a JSON envelope with a stable field order:
//!
//! - `version`: envelope format, currently 1
//! - `payload`: base64 of the protected (encrypted) report bytes
//! - `payload_sha256`: lowercase hex SHA-256 of the payload
//! - `signature`: base64 of the raw 64-byte `r || s` signature over the payload
//! - `public_key`: base64 of the SEC1 uncompressed public key
//! - `certificate`: base64 of the signer's PEM certificate
//! - `signed_at`: RFC 3339 UTC signing time
//!
//! The payload stays encrypted: signing never needs the patient passphrase.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;
use zeroize::Zeroizing;

use super::encryption::{open_with_passphrase, seal_with_passphrase};
use super::CryptoError;

const ENVELOPE_VERSION: u8 = 1;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
struct SignedEnvelopeV1 {
    version: u8,
    payload: String,
    payload_sha256: String,
    signature: String,
    public_key: String,
    certificate: String,
    signed_at: String,
}

/// A countersigning identity as the credential store hands it over: the
/// certificate in clear and the PKCS#8 private key sealed under the
/// credential passphrase.
#[derive(Clone)]
pub struct SigningCredential {
    certificate_pem: String,
    sealed_key: Vec<u8>,
}

impl std::fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredential").finish_non_exhaustive()
    }
}

impl SigningCredential {
    pub fn new(certificate_pem: String, sealed_key: Vec<u8>) -> Self {
        Self {
            certificate_pem,
            sealed_key,
        }
    }

    /// Seal a PKCS#8 PEM private key under `passphrase`. The key must match
    /// the certificate.
    pub fn seal(
        private_key_pem: &str,
        certificate_pem: &str,
        passphrase: &str,
        iterations: u32,
    ) -> Result<Self, CryptoError> {
        let signing_key = load_signing_key(private_key_pem)?;
        check_certificate_matches(certificate_pem, signing_key.verifying_key())?;
        let sealed_key = seal_with_passphrase(private_key_pem.as_bytes(), passphrase, iterations)?;
        Ok(Self::new(certificate_pem.to_string(), sealed_key))
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    pub fn sealed_key(&self) -> &[u8] {
        &self.sealed_key
    }

    /// Unseal the private key and check it against the certificate.
    fn unlock(&self, passphrase: &str) -> Result<SigningKey, CryptoError> {
        let key_pem = Zeroizing::new(
            open_with_passphrase(&self.sealed_key, passphrase)
                .map_err(|_| CryptoError::CredentialLocked)?,
        );
        let key_pem = std::str::from_utf8(&key_pem).map_err(|_| CryptoError::InvalidSigningKey)?;
        let signing_key = load_signing_key(key_pem)?;
        check_certificate_matches(&self.certificate_pem, signing_key.verifying_key())?;
        Ok(signing_key)
    }
}

/// Contents of a verified envelope.
#[derive(Debug, Clone)]
pub struct VerifiedEnvelope {
    pub payload: Vec<u8>,
    pub signed_at: DateTime<Utc>,
    pub certificate_pem: String,
}

/// Countersign `payload` and wrap it in an envelope.
pub fn sign(
    payload: &[u8],
    credential: &SigningCredential,
    passphrase: &str,
    signed_at: &DateTime<Utc>,
) -> Result<Vec<u8>, CryptoError> {
    let signing_key = credential.unlock(passphrase)?;
    let public_key_bytes = signing_key
        .verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();

    // Signature is raw 64-byte (r||s), base64-encoded.
    let signature: Signature = signing_key.sign(payload);

    let envelope = SignedEnvelopeV1 {
        version: ENVELOPE_VERSION,
        payload: general_purpose::STANDARD.encode(payload),
        payload_sha256: hex::encode(Sha256::digest(payload)),
        signature: general_purpose::STANDARD.encode(signature.to_bytes()),
        public_key: general_purpose::STANDARD.encode(&public_key_bytes),
        certificate: general_purpose::STANDARD.encode(credential.certificate_pem.as_bytes()),
        signed_at: signed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
    };
    serde_json::to_vec(&envelope).map_err(|_| CryptoError::MalformedEnvelope)
}

/// Verify an envelope: the signature must match the embedded public key,
/// and the embedded certificate must certify that same key.
pub fn verify_signed(signed: &[u8]) -> Result<VerifiedEnvelope, CryptoError> {
    let envelope: SignedEnvelopeV1 =
        serde_json::from_slice(signed).map_err(|_| CryptoError::MalformedEnvelope)?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(CryptoError::MalformedEnvelope);
    }

    let decode = |field: &str| {
        general_purpose::STANDARD
            .decode(field)
            .map_err(|_| CryptoError::MalformedEnvelope)
    };
    let payload = decode(&envelope.payload)?;
    let signature_bytes = decode(&envelope.signature)?;
    let public_key_bytes = decode(&envelope.public_key)?;
    let certificate_pem =
        String::from_utf8(decode(&envelope.certificate)?).map_err(|_| CryptoError::MalformedEnvelope)?;

    if hex::encode(Sha256::digest(&payload)) != envelope.payload_sha256 {
        return Err(CryptoError::SignatureInvalid);
    }

    let signature =
        Signature::from_slice(&signature_bytes).map_err(|_| CryptoError::MalformedEnvelope)?;
    let verifying_key =
        VerifyingKey::from_sec1_bytes(&public_key_bytes).map_err(|_| CryptoError::MalformedEnvelope)?;
    verifying_key
        .verify(&payload, &signature)
        .map_err(|_| CryptoError::SignatureInvalid)?;
    check_certificate_matches(&certificate_pem, &verifying_key)?;

    let signed_at = DateTime::parse_from_rfc3339(&envelope.signed_at)
        .map_err(|_| CryptoError::MalformedEnvelope)?
        .with_timezone(&Utc);

    Ok(VerifiedEnvelope {
        payload,
        signed_at,
        certificate_pem,
    })
}

fn load_signing_key(private_key_pem: &str) -> Result<SigningKey, CryptoError> {
    SigningKey::from_pkcs8_pem(private_key_pem).map_err(|_| CryptoError::InvalidSigningKey)
}

/// SEC1 public key bytes certified by a PEM certificate.
fn certificate_public_key(certificate_pem: &str) -> Result<Vec<u8>, CryptoError> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(certificate_pem.as_bytes())
        .map_err(|_| CryptoError::InvalidCertificate)?;
    let (_, cert) =
        X509Certificate::from_der(&pem.contents).map_err(|_| CryptoError::InvalidCertificate)?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}

fn check_certificate_matches(
    certificate_pem: &str,
    verifying_key: &VerifyingKey,
) -> Result<(), CryptoError> {
    let certified = certificate_public_key(certificate_pem)?;
    if certified != verifying_key.to_encoded_point(false).as_bytes() {
        return Err(CryptoError::CertificateKeyMismatch);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_credentials {
    use p256::pkcs8::EncodePrivateKey;
    use rcgen::{CertificateParams, KeyPair};

    use super::*;
    use crate::crypto::keys::MIN_PBKDF2_ITERATIONS;

    pub(crate) const CREDENTIAL_PASSPHRASE: &str = "credential-store-passphrase";

    /// Fresh P-256 key in PKCS#8 PEM with a self-signed certificate for it.
    pub(crate) fn key_and_certificate() -> (String, String) {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        let key_pem = signing_key
            .to_pkcs8_pem(p256::pkcs8::LineEnding::LF)
            .unwrap()
            .to_string();
        let key_pair = KeyPair::from_pem(&key_pem).unwrap();
        let cert = CertificateParams::new(vec!["lab.example".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();
        (key_pem, cert.pem())
    }

    pub(crate) fn credential() -> SigningCredential {
        let (key_pem, cert_pem) = key_and_certificate();
        SigningCredential::seal(&key_pem, &cert_pem, CREDENTIAL_PASSPHRASE, MIN_PBKDF2_ITERATIONS).unwrap()
    }
}
