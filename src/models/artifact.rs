use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The delivered report of an order.
///
/// `path` (encrypted, unsigned) is written once at generation; `signed_path`
/// and `signed_at` are set together, once, at countersigning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportArtifact {
    pub id: Uuid,
    pub order_id: Uuid,
    pub path: String,
    /// SHA-256 of the rendered document before encryption, lowercase hex.
    pub content_hash: String,
    pub scientist_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub signed_path: Option<String>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl ReportArtifact {
    pub fn is_signed(&self) -> bool {
        self.signed_path.is_some()
    }
}

/// A document uploaded from outside the lab (full microbiome reports).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDocument {
    pub order_id: Uuid,
    pub path: String,
    pub content_hash: String,
    pub uploaded_at: DateTime<Utc>,
}
