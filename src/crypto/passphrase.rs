//! Patient passphrase derivation for protected reports.
//!
//! The default scheme uses the patient's fiscal code, upper-cased, as the
//! passphrase. This is a known and accepted weakness: the code is
//! low-entropy and derivable from public personal data, but the patient
//! already knows it, and the retrieval flow relies on that.
//! `FiscalCodeWithPepper` mixes a lab-held secret
//! into the passphrase; documents sealed that way can only be opened with
//! a passphrase the lab hands out.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::CryptoError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum PassphraseScheme {
    /// Upper-cased, trimmed fiscal code.
    FiscalCode,
    /// Hex SHA-256 of `pepper || ':' || fiscal code`.
    FiscalCodeWithPepper { pepper: String },
}

impl Default for PassphraseScheme {
    fn default() -> Self {
        Self::FiscalCode
    }
}

impl PassphraseScheme {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FiscalCode => "fiscal_code",
            Self::FiscalCodeWithPepper { .. } => "fiscal_code_with_pepper",
        }
    }

    /// Passphrase protecting the documents of the patient with `fiscal_code`.
    pub fn derive(&self, fiscal_code: &str) -> Result<Zeroizing<String>, CryptoError> {
        let normalized = fiscal_code.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(CryptoError::EmptyPassphrase);
        }
        match self {
            Self::FiscalCode => Ok(Zeroizing::new(normalized)),
            Self::FiscalCodeWithPepper { pepper } => {
                if pepper.is_empty() {
                    return Err(CryptoError::EmptyPassphrase);
                }
                let mut hasher = Sha256::new();
                hasher.update(pepper.as_bytes());
                hasher.update(b":");
                hasher.update(normalized.as_bytes());
                Ok(Zeroizing::new(hex::encode(hasher.finalize())))
            }
        }
    }
}
