//! Plain-language error details for the surfaces that show errors to lab
//! staff or patients. Messages never carry file paths, passphrases or key
//! material; internal failures collapse into one generic message.

use serde::Serialize;

use crate::config::ConfigError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::orders::OrderError;
use crate::pricing::PricingError;
use crate::report::ReportError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl ErrorDetail {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn internal(source: &dyn std::fmt::Display) -> Self {
        tracing::error!(error = %source, "Internal error");
        Self::new("INTERNAL", "An internal error occurred")
    }
}

pub trait UserFacing {
    fn detail(&self) -> ErrorDetail;
}

impl UserFacing for DatabaseError {
    fn detail(&self) -> ErrorDetail {
        match self {
            DatabaseError::NotFound { entity_type, .. } => {
                ErrorDetail::new("NOT_FOUND", format!("{entity_type} not found"))
            }
            DatabaseError::ConstraintViolation(reason) => ErrorDetail::new("INVALID_INPUT", reason.clone()),
            other => ErrorDetail::internal(other),
        }
    }
}

impl UserFacing for PricingError {
    fn detail(&self) -> ErrorDetail {
        match self {
            PricingError::ElementNotFound { category, .. } => {
                ErrorDetail::new("PRICE_NOT_FOUND", format!("No price for this {category} element"))
            }
            PricingError::Database(e) => e.detail(),
        }
    }
}

impl UserFacing for CryptoError {
    fn detail(&self) -> ErrorDetail {
        match self {
            CryptoError::DecryptionFailed => {
                ErrorDetail::new("WRONG_PASSPHRASE", "The document could not be opened with this code")
            }
            CryptoError::CredentialLocked => {
                ErrorDetail::new("CREDENTIAL_LOCKED", "The signing credential could not be unlocked")
            }
            CryptoError::InvalidCertificate | CryptoError::CertificateKeyMismatch => ErrorDetail::new(
                "INVALID_CERTIFICATE",
                "The signing certificate is not valid for this key",
            ),
            CryptoError::SignatureInvalid | CryptoError::MalformedEnvelope => {
                ErrorDetail::new("SIGNATURE_INVALID", "The signed report failed verification")
            }
            CryptoError::EmptyPassphrase => {
                ErrorDetail::new("MISSING_FISCAL_CODE", "The patient has no fiscal code on file")
            }
            other => ErrorDetail::internal(other),
        }
    }
}

impl UserFacing for OrderError {
    fn detail(&self) -> ErrorDetail {
        match self {
            OrderError::InvalidTransition { from, to } => ErrorDetail::new(
                "INVALID_TRANSITION",
                format!("An order cannot move from {from} to {to}"),
            ),
            OrderError::ArtifactRequired { status, .. } => ErrorDetail::new(
                "ARTIFACT_REQUIRED",
                format!("The report must exist before the order is {status}"),
            ),
            OrderError::NotFound(_) => ErrorDetail::new("NOT_FOUND", "Order not found"),
            OrderError::InvalidSelection(reason) => ErrorDetail::new("INVALID_SELECTION", reason.clone()),
            OrderError::ResultsLocked(status) => ErrorDetail::new(
                "RESULTS_LOCKED",
                format!("Results cannot be entered while the order is {status}"),
            ),
            OrderError::InvalidResult(reason) => ErrorDetail::new("INVALID_RESULT", reason.clone()),
            OrderError::Persistence(e) => e.detail(),
            OrderError::Pricing(e) => e.detail(),
        }
    }
}

impl UserFacing for ReportError {
    fn detail(&self) -> ErrorDetail {
        match self {
            ReportError::InvalidState { status, expected, .. } => ErrorDetail::new(
                "INVALID_STATE",
                format!("The order is {status}; this needs it to be {expected}"),
            ),
            ReportError::IncompleteResults { missing, .. } => ErrorDetail::new(
                "INCOMPLETE_RESULTS",
                format!("{missing} result(s) still missing"),
            ),
            ReportError::OrderNotFound(_) => ErrorDetail::new("NOT_FOUND", "Order not found"),
            ReportError::ArtifactMissing(_) => ErrorDetail::new("NOT_FOUND", "The report has not been generated"),
            ReportError::AlreadySigned(_) => ErrorDetail::new("ALREADY_SIGNED", "The report is already signed"),
            ReportError::NotApplicable { order_type, .. } => ErrorDetail::new(
                "NOT_APPLICABLE",
                format!("Not available for {order_type} orders"),
            ),
            ReportError::IntegrityMismatch => {
                ErrorDetail::new("INTEGRITY_MISMATCH", "The stored report does not match its record")
            }
            ReportError::Protect(e) => e.detail(),
            ReportError::Persistence(e) => e.detail(),
            ReportError::Order(e) => e.detail(),
            other @ (ReportError::LockPoisoned | ReportError::Render(_) | ReportError::Storage(_)) => {
                ErrorDetail::internal(other)
            }
        }
    }
}

impl UserFacing for ConfigError {
    fn detail(&self) -> ErrorDetail {
        match self {
            ConfigError::Invalid { var, reason } => {
                ErrorDetail::new("INVALID_CONFIG", format!("{var}: {reason}"))
            }
            ConfigError::NoHomeDirectory => ErrorDetail::internal(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::OrderStatus;
    use uuid::Uuid;

    #[test]
    fn transition_error_is_explained() {
        let detail = OrderError::InvalidTransition {
            from: OrderStatus::Executed,
            to: OrderStatus::Executed,
        }
        .detail();
        assert_eq!(detail.code, "INVALID_TRANSITION");
        assert!(detail.message.contains("executed"));
    }

    #[test]
    fn storage_errors_hide_their_source() {
        let err = ReportError::Storage(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/home/lab/artifacts/GEN-20260301-0001.pdf.enc",
        ));
        let detail = err.detail();
        assert_eq!(detail.code, "INTERNAL");
        assert!(!detail.message.contains('/'));
    }

    #[test]
    fn nested_errors_keep_their_code() {
        let err = ReportError::Order(OrderError::NotFound(Uuid::new_v4()));
        assert_eq!(err.detail().code, "NOT_FOUND");

        let err = ReportError::Protect(CryptoError::DecryptionFailed);
        assert_eq!(err.detail().code, "WRONG_PASSPHRASE");
    }

    #[test]
    fn detail_serializes_as_code_and_message() {
        let json = serde_json::to_value(ReportError::IntegrityMismatch.detail()).unwrap();
        assert_eq!(json["code"], "INTEGRITY_MISMATCH");
        assert!(json["message"].is_string());
    }
}
