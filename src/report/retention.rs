use chrono::{DateTime, Duration, Utc};

use crate::models::ReportArtifact;

/// Whether a patient may still download `artifact` at `now`.
///
/// Only signed reports are downloadable, and only while fewer than
/// `retention_days` days have passed since the artifact was created. A
/// window reaching past the representable date range never closes.
pub fn download_allowed(artifact: &ReportArtifact, retention_days: u32, now: &DateTime<Utc>) -> bool {
    if !artifact.is_signed() {
        return false;
    }
    match artifact
        .created_at
        .checked_add_signed(Duration::days(i64::from(retention_days)))
    {
        Some(expires) => *now < expires,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn artifact(created_at: DateTime<Utc>, signed: bool) -> ReportArtifact {
        ReportArtifact {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            path: "GEN-20260301-0001-20260302T101500000Z.pdf.enc".into(),
            content_hash: "00".repeat(32),
            scientist_id: Uuid::new_v4(),
            created_at,
            signed_path: signed.then(|| "GEN-20260301-0001-20260302T101500000Z-signed.json".into()),
            signed_at: signed.then_some(created_at),
        }
    }

    #[test]
    fn within_window_is_allowed() {
        let created = Utc::now() - Duration::days(10);
        assert!(download_allowed(&artifact(created, true), 60, &Utc::now()));
    }

    #[test]
    fn window_end_is_exclusive() {
        let created = Utc::now();
        let end = created + Duration::days(60);
        assert!(!download_allowed(&artifact(created, true), 60, &end));
        assert!(download_allowed(&artifact(created, true), 60, &(end - Duration::seconds(1))));
    }

    #[test]
    fn unsigned_reports_are_never_downloadable() {
        assert!(!download_allowed(&artifact(Utc::now(), false), 60, &Utc::now()));
    }

    #[test]
    fn largest_retention_never_expires() {
        let created = Utc::now();
        let far_future = created + Duration::days(365 * 1000);
        assert!(download_allowed(&artifact(created, true), u32::MAX, &far_future));
        assert!(!download_allowed(&artifact(created, false), u32::MAX, &created));
    }
}
