//! Report Orchestrator: render → hash → protect → store → record, as one
//! all-or-nothing step per order.
//!
//! Files are written before the database transaction; when the transaction
//! fails the file is removed again, so an artifact row never points at a
//! missing file and no file outlives a failed generation.

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::layout::to_pdf;
use super::locks::OrderLocks;
use super::renderer::render;
use super::storage::{DocumentStore, StoredKind};
use super::ReportError;
use crate::config::LabConfig;
use crate::crypto::{
    open_with_passphrase, seal_with_passphrase, sign, verify_signed, PassphraseScheme,
    SigningCredential, VerifiedEnvelope, DEFAULT_PBKDF2_ITERATIONS,
};
use crate::db::{self, DatabaseError};
use crate::models::enums::{OrderStatus, OrderType};
use crate::models::{ExternalDocument, Order, ReportArtifact};
use crate::orders::state_machine::advance_in;
use crate::orders::audit_entity;

/// Document settings the orchestrator needs from the lab configuration.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub lab_lines: Vec<String>,
    pub pbkdf2_iterations: u32,
    pub passphrase_scheme: PassphraseScheme,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            lab_lines: Vec::new(),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            passphrase_scheme: PassphraseScheme::default(),
        }
    }
}

impl From<&LabConfig> for ReportSettings {
    fn from(config: &LabConfig) -> Self {
        Self {
            lab_lines: config.lab_lines.clone(),
            pbkdf2_iterations: config.pbkdf2_iterations,
            passphrase_scheme: config.passphrase_scheme.clone(),
        }
    }
}

pub struct ReportOrchestrator<S: DocumentStore> {
    store: S,
    settings: ReportSettings,
    locks: OrderLocks,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn load_order(conn: &Connection, order_id: &Uuid) -> Result<Order, ReportError> {
    db::get_order(conn, order_id)?.ok_or(ReportError::OrderNotFound(*order_id))
}

fn require_status(order: &Order, expected: OrderStatus) -> Result<(), ReportError> {
    if order.status == expected {
        Ok(())
    } else {
        Err(ReportError::InvalidState {
            order_id: order.id,
            status: order.status,
            expected,
        })
    }
}

impl<S: DocumentStore> ReportOrchestrator<S> {
    pub fn new(store: S, settings: ReportSettings) -> Self {
        Self {
            store,
            settings,
            locks: OrderLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    /// Generate, protect and store the report of an `executed` order, and
    /// advance it to `reported` in the same transaction as the artifact row.
    pub fn generate(
        &self,
        conn: &Connection,
        order_id: &Uuid,
        scientist_id: &Uuid,
    ) -> Result<ReportArtifact, ReportError> {
        let order_lock = self.locks.lock_for(order_id)?;
        let _guard = order_lock.lock().map_err(|_| ReportError::LockPoisoned)?;

        let order = load_order(conn, order_id)?;
        require_status(&order, OrderStatus::Executed)?;

        let document = render(conn, order_id, scientist_id, &self.settings.lab_lines)?;
        let pdf = to_pdf(&document)?;
        let content_hash = sha256_hex(&pdf);

        let patient = db::get_patient(conn, &order.patient_id)?
            .ok_or_else(|| DatabaseError::not_found("Patient", order.patient_id))?;
        let passphrase = self.settings.passphrase_scheme.derive(&patient.fiscal_code)?;
        let sealed = seal_with_passphrase(&pdf, &passphrase, self.settings.pbkdf2_iterations)?;

        let now = Utc::now();
        let key = self.store.put(&order.code, &now, StoredKind::Report, &sealed)?;

        let artifact = ReportArtifact {
            id: Uuid::new_v4(),
            order_id: *order_id,
            path: key,
            content_hash,
            scientist_id: *scientist_id,
            created_at: now,
            signed_path: None,
            signed_at: None,
        };
        if let Err(e) = record_generated(conn, &order, &artifact) {
            self.discard(&artifact.path);
            return Err(e);
        }

        let scheme = self.settings.passphrase_scheme.name();
        tracing::info!(order_id = %order_id, artifact_id = %artifact.id, scheme, "Report generated");
        Ok(artifact)
    }

    /// Countersign the protected report of a `reported` order and advance it
    /// to `signed`. The unsigned file is kept.
    pub fn sign_report(
        &self,
        conn: &Connection,
        order_id: &Uuid,
        credential: &SigningCredential,
        credential_passphrase: &str,
    ) -> Result<ReportArtifact, ReportError> {
        let order_lock = self.locks.lock_for(order_id)?;
        let _guard = order_lock.lock().map_err(|_| ReportError::LockPoisoned)?;

        let order = load_order(conn, order_id)?;
        require_status(&order, OrderStatus::Reported)?;
        let artifact =
            db::get_artifact_by_order(conn, order_id)?.ok_or(ReportError::ArtifactMissing(*order_id))?;

        let protected = self.store.get(&artifact.path)?;
        let now = Utc::now();
        let signed = sign(&protected, credential, credential_passphrase, &now)?;
        let key = self.store.put(&order.code, &now, StoredKind::Signed, &signed)?;

        if let Err(e) = record_signed(conn, &order, &key, &now) {
            self.discard(&key);
            return Err(e);
        }

        tracing::info!(order_id = %order_id, artifact_id = %artifact.id, "Report signed");
        db::get_artifact_by_order(conn, order_id)?.ok_or(ReportError::ArtifactMissing(*order_id))
    }

    /// Decrypt the report of an order with the passphrase derived from the
    /// fiscal code the patient supplied.
    pub fn open_protected(
        &self,
        conn: &Connection,
        order_id: &Uuid,
        fiscal_code: &str,
    ) -> Result<Vec<u8>, ReportError> {
        let artifact =
            db::get_artifact_by_order(conn, order_id)?.ok_or(ReportError::ArtifactMissing(*order_id))?;
        let protected = self.store.get(&artifact.path)?;
        let passphrase = self.settings.passphrase_scheme.derive(fiscal_code)?;
        Ok(open_with_passphrase(&protected, &passphrase)?)
    }

    /// Decrypt the stored report and compare it with the recorded hash.
    pub fn verify_integrity(&self, conn: &Connection, order_id: &Uuid) -> Result<bool, ReportError> {
        let artifact =
            db::get_artifact_by_order(conn, order_id)?.ok_or(ReportError::ArtifactMissing(*order_id))?;
        let order = load_order(conn, order_id)?;
        let patient = db::get_patient(conn, &order.patient_id)?
            .ok_or_else(|| DatabaseError::not_found("Patient", order.patient_id))?;

        let protected = self.store.get(&artifact.path)?;
        let passphrase = self.settings.passphrase_scheme.derive(&patient.fiscal_code)?;
        let document = open_with_passphrase(&protected, &passphrase)?;

        let actual = sha256_hex(&document);
        let matches: bool = actual
            .as_bytes()
            .ct_eq(artifact.content_hash.as_bytes())
            .into();
        if !matches {
            tracing::warn!(order_id = %order_id, artifact_id = %artifact.id, "Report hash mismatch");
        }
        Ok(matches)
    }

    /// Verify the signed report of an order. Its payload must be the stored
    /// protected report, byte for byte.
    pub fn verify_signed_report(
        &self,
        conn: &Connection,
        order_id: &Uuid,
    ) -> Result<VerifiedEnvelope, ReportError> {
        let artifact =
            db::get_artifact_by_order(conn, order_id)?.ok_or(ReportError::ArtifactMissing(*order_id))?;
        let signed_path = artifact
            .signed_path
            .as_deref()
            .ok_or(ReportError::ArtifactMissing(*order_id))?;

        let verified = verify_signed(&self.store.get(signed_path)?)?;
        let protected = self.store.get(&artifact.path)?;
        let same: bool = Sha256::digest(&verified.payload)
            .as_slice()
            .ct_eq(Sha256::digest(&protected).as_slice())
            .into();
        if !same {
            return Err(ReportError::IntegrityMismatch);
        }
        Ok(verified)
    }

    /// Store the externally produced full report of a microbiome order. A
    /// later upload replaces the earlier one.
    pub fn attach_external_document(
        &self,
        conn: &Connection,
        order_id: &Uuid,
        bytes: &[u8],
    ) -> Result<ExternalDocument, ReportError> {
        let order_lock = self.locks.lock_for(order_id)?;
        let _guard = order_lock.lock().map_err(|_| ReportError::LockPoisoned)?;

        let order = load_order(conn, order_id)?;
        if order.order_type != OrderType::Microbiome {
            return Err(ReportError::NotApplicable {
                order_id: *order_id,
                order_type: order.order_type,
            });
        }

        let now = Utc::now();
        let key = self.store.put(&order.code, &now, StoredKind::External, bytes)?;
        let document = ExternalDocument {
            order_id: *order_id,
            path: key,
            content_hash: sha256_hex(bytes),
            uploaded_at: now,
        };

        let previous = match record_external(conn, &order, &document) {
            Ok(previous) => previous,
            Err(e) => {
                self.discard(&document.path);
                return Err(e);
            }
        };
        if let Some(previous) = previous {
            self.discard(&previous.path);
        }

        tracing::info!(order_id = %order_id, "External document attached");
        Ok(document)
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(error = %e, "Failed to remove uncommitted document");
        }
    }
}

fn record_generated(conn: &Connection, order: &Order, artifact: &ReportArtifact) -> Result<(), ReportError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    db::insert_artifact(&tx, artifact)?;
    advance_in(&tx, &order.id, OrderStatus::Reported, &artifact.created_at)?;
    db::insert_audit_entry(
        &tx,
        "report_generated",
        &audit_entity(&order.id),
        Some(&artifact.id.to_string()),
    )?;
    tx.commit()?;
    Ok(())
}

fn record_signed(
    conn: &Connection,
    order: &Order,
    signed_key: &str,
    signed_at: &chrono::DateTime<Utc>,
) -> Result<(), ReportError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if !db::mark_artifact_signed(&tx, &order.id, signed_key, signed_at)? {
        return Err(ReportError::AlreadySigned(order.id));
    }
    advance_in(&tx, &order.id, OrderStatus::Signed, signed_at)?;
    db::insert_audit_entry(&tx, "report_signed", &audit_entity(&order.id), None)?;
    tx.commit()?;
    Ok(())
}

/// Returns the replaced document, if any, once the new one is committed.
fn record_external(
    conn: &Connection,
    order: &Order,
    document: &ExternalDocument,
) -> Result<Option<ExternalDocument>, ReportError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let previous = db::get_external_document(&tx, &order.id)?;
    db::upsert_external_document(&tx, document)?;
    db::insert_audit_entry(
        &tx,
        "external_document_attached",
        &audit_entity(&order.id),
        Some(&document.content_hash),
    )?;
    tx.commit()?;
    Ok(previous)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use super::*;
    use crate::crypto::signing::test_credentials::{credential, CREDENTIAL_PASSPHRASE};
    use crate::crypto::{CryptoError, MIN_PBKDF2_ITERATIONS};
    use crate::db::sqlite::{open_database, open_memory_database};
    use crate::models::enums::{Classification, IntoleranceGrade};
    use crate::models::{Money, NewResult, ResultTarget};
    use crate::orders::{record_results, Selection};
    use crate::report::storage::FsDocumentStore;
    use crate::test_support::{Fixture, PATIENT_FISCAL_CODE};

    fn settings() -> ReportSettings {
        ReportSettings {
            lab_lines: vec!["Example Lab".into()],
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
            passphrase_scheme: PassphraseScheme::FiscalCode,
        }
    }

    fn orchestrator(dir: &tempfile::TempDir) -> ReportOrchestrator<FsDocumentStore> {
        let store = FsDocumentStore::new(dir.path().join("artifacts")).unwrap();
        ReportOrchestrator::new(store, settings())
    }

    fn stored_files(orch: &ReportOrchestrator<FsDocumentStore>) -> usize {
        std::fs::read_dir(orch.store().root()).unwrap().flatten().count()
    }

    /// Genetic order MTHFR + APOE with both results recorded.
    fn complete_genetic_order(conn: &Connection, fx: &Fixture) -> Uuid {
        let order_id = fx.executed_order(
            conn,
            OrderType::Genetic,
            Selection::genetic(vec![fx.assay_a, fx.assay_b], vec![]),
        );
        let results: Vec<NewResult> = [
            (fx.assay_a, Classification::Heterozygous),
            (fx.assay_b, Classification::Negative),
        ]
        .into_iter()
        .map(|(assay, classification)| NewResult {
            target: ResultTarget::Assay(assay),
            classification,
            note: None,
        })
        .collect();
        record_results(conn, &order_id, &results).unwrap();
        order_id
    }

    #[test]
    fn generate_round_trip() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        assert_eq!(db::get_order(&conn, &order_id).unwrap().unwrap().final_price, Money::new(125, 0));

        let artifact = orch.generate(&conn, &order_id, &fx.scientist).unwrap();

        assert_eq!(artifact.content_hash.len(), 64);
        assert!(artifact.content_hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let order = db::get_order(&conn, &order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Reported);
        assert!(order.reported_at.is_some());
        assert!(artifact.path.starts_with(&order.code));

        let pdf = orch.open_protected(&conn, &order_id, &PATIENT_FISCAL_CODE.to_lowercase()).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(sha256_hex(&pdf), artifact.content_hash);
        assert!(orch.verify_integrity(&conn, &order_id).unwrap());

        let audit = db::query_audit_by_entity(&conn, &audit_entity(&order_id)).unwrap();
        assert!(audit.iter().any(|e| e.action == "report_generated"));
    }

    #[test]
    fn wrong_fiscal_code_cannot_open() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        orch.generate(&conn, &order_id, &fx.scientist).unwrap();

        let err = orch.open_protected(&conn, &order_id, "VRDLGU75B12F205X").unwrap_err();
        assert!(matches!(err, ReportError::Protect(CryptoError::DecryptionFailed)));
    }

    #[test]
    fn generate_needs_complete_results() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = fx.executed_order(&conn, OrderType::Genetic, Selection::genetic(vec![fx.assay_a], vec![]));

        let err = orch.generate(&conn, &order_id, &fx.scientist).unwrap_err();
        assert!(matches!(err, ReportError::IncompleteResults { missing: 1, .. }));
        assert_eq!(stored_files(&orch), 0);
    }

    #[test]
    fn generate_needs_executed_status() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        orch.generate(&conn, &order_id, &fx.scientist).unwrap();

        let err = orch.generate(&conn, &order_id, &fx.scientist).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidState { status: OrderStatus::Reported, expected: OrderStatus::Executed, .. }
        ));
        assert_eq!(stored_files(&orch), 1);
    }

    #[test]
    fn protect_failure_leaves_nothing_behind() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path().join("artifacts")).unwrap();
        let orch = ReportOrchestrator::new(
            store,
            ReportSettings {
                pbkdf2_iterations: 10,
                ..settings()
            },
        );
        let order_id = complete_genetic_order(&conn, &fx);

        let err = orch.generate(&conn, &order_id, &fx.scientist).unwrap_err();
        assert!(matches!(err, ReportError::Protect(CryptoError::WeakKdf(10))));
        assert_eq!(stored_files(&orch), 0);
        assert!(db::get_artifact_by_order(&conn, &order_id).unwrap().is_none());
        assert_eq!(db::get_order_status(&conn, &order_id).unwrap(), Some(OrderStatus::Executed));
    }

    #[test]
    fn failed_commit_removes_the_stored_file() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        conn.execute_batch(
            "CREATE TRIGGER reject_artifacts BEFORE INSERT ON report_artifacts
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .unwrap();

        let err = orch.generate(&conn, &order_id, &fx.scientist).unwrap_err();
        assert!(matches!(err, ReportError::Persistence(_)));
        assert_eq!(stored_files(&orch), 0);
        assert_eq!(db::get_order_status(&conn, &order_id).unwrap(), Some(OrderStatus::Executed));
    }

    #[test]
    fn sign_then_verify() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        let generated = orch.generate(&conn, &order_id, &fx.scientist).unwrap();
        let credential = credential();

        let signed = orch.sign_report(&conn, &order_id, &credential, CREDENTIAL_PASSPHRASE).unwrap();

        assert_eq!(signed.id, generated.id);
        assert_eq!(signed.path, generated.path);
        assert_eq!(signed.content_hash, generated.content_hash);
        assert!(signed.signed_path.as_deref().is_some_and(|p| p.ends_with("-signed.json")));
        assert!(signed.signed_at.is_some_and(|at| at >= generated.created_at));
        assert_eq!(db::get_order_status(&conn, &order_id).unwrap(), Some(OrderStatus::Signed));

        let verified = orch.verify_signed_report(&conn, &order_id).unwrap();
        assert_eq!(verified.certificate_pem, credential.certificate_pem());
        assert!(orch.verify_integrity(&conn, &order_id).unwrap());
    }

    #[test]
    fn signing_needs_reported_status_and_happens_once() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        let credential = credential();

        let err = orch.sign_report(&conn, &order_id, &credential, CREDENTIAL_PASSPHRASE).unwrap_err();
        assert!(matches!(err, ReportError::InvalidState { status: OrderStatus::Executed, .. }));

        orch.generate(&conn, &order_id, &fx.scientist).unwrap();
        let first = orch.sign_report(&conn, &order_id, &credential, CREDENTIAL_PASSPHRASE).unwrap();
        let err = orch.sign_report(&conn, &order_id, &credential, CREDENTIAL_PASSPHRASE).unwrap_err();
        assert!(matches!(err, ReportError::InvalidState { status: OrderStatus::Signed, .. }));

        let stored = db::get_artifact_by_order(&conn, &order_id).unwrap().unwrap();
        assert_eq!(stored.signed_path, first.signed_path);
        assert_eq!(stored_files(&orch), 2);
    }

    #[test]
    fn bad_credential_passphrase_keeps_order_reported() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);
        orch.generate(&conn, &order_id, &fx.scientist).unwrap();

        let err = orch.sign_report(&conn, &order_id, &credential(), "wrong").unwrap_err();
        assert!(matches!(err, ReportError::Protect(CryptoError::CredentialLocked)));
        assert_eq!(db::get_order_status(&conn, &order_id).unwrap(), Some(OrderStatus::Reported));
        assert_eq!(stored_files(&orch), 1);
    }

    #[test]
    fn intolerance_report_generates() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = fx.executed_order(
            &conn,
            OrderType::IntoleranceImmunoassay,
            Selection::single(fx.immunoassay_panel),
        );
        let results: Vec<NewResult> = fx
            .foods
            .iter()
            .zip([3u8, 3, 1, 0])
            .map(|(food, level)| NewResult {
                target: ResultTarget::FoodItem(*food),
                classification: IntoleranceGrade::from_level(level).unwrap().classification(),
                note: None,
            })
            .collect();
        record_results(&conn, &order_id, &results).unwrap();

        orch.generate(&conn, &order_id, &fx.scientist).unwrap();
        assert!(orch.verify_integrity(&conn, &order_id).unwrap());
    }

    #[test]
    fn external_document_is_replaced_on_reupload() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = fx.executed_order(&conn, OrderType::Microbiome, Selection::single(fx.microbiome_type));

        orch.attach_external_document(&conn, &order_id, b"first upload").unwrap();
        let second = orch.attach_external_document(&conn, &order_id, b"second upload").unwrap();

        assert_eq!(second.content_hash, sha256_hex(b"second upload"));
        let stored = db::get_external_document(&conn, &order_id).unwrap().unwrap();
        assert_eq!(stored.path, second.path);
        assert_eq!(stored_files(&orch), 1);

        let artifact = orch.generate(&conn, &order_id, &fx.scientist).unwrap();
        assert_eq!(artifact.order_id, order_id);
    }

    #[test]
    fn placeholder_assay_does_not_block_the_report() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let placeholder = Uuid::new_v4();
        let order_id = fx.executed_order(
            &conn,
            OrderType::Genetic,
            Selection::genetic(vec![fx.assay_a, placeholder], vec![]),
        );
        assert_eq!(db::get_order(&conn, &order_id).unwrap().unwrap().base_price, Money::new(50, 0));

        record_results(
            &conn,
            &order_id,
            &[NewResult {
                target: ResultTarget::Assay(fx.assay_a),
                classification: Classification::Negative,
                note: None,
            }],
        )
        .unwrap();

        orch.generate(&conn, &order_id, &fx.scientist).unwrap();
        assert_eq!(db::get_order_status(&conn, &order_id).unwrap(), Some(OrderStatus::Reported));
    }

    #[test]
    fn external_document_only_for_microbiome() {
        let conn = open_memory_database().unwrap();
        let fx = Fixture::seed(&conn);
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(&dir);
        let order_id = complete_genetic_order(&conn, &fx);

        let err = orch.attach_external_document(&conn, &order_id, b"pdf").unwrap_err();
        assert!(matches!(err, ReportError::NotApplicable { order_type: OrderType::Genetic, .. }));
    }

    #[test]
    fn concurrent_generation_yields_one_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("lab.db");
        let conn = open_database(&db_path).unwrap();
        let fx = Fixture::seed(&conn);
        let order_id = complete_genetic_order(&conn, &fx);
        drop(conn);

        let orch = Arc::new(orchestrator(&dir));
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let orch = Arc::clone(&orch);
                let barrier = Arc::clone(&barrier);
                let db_path = db_path.clone();
                let scientist = fx.scientist;
                thread::spawn(move || {
                    let conn = open_database(&db_path).unwrap();
                    barrier.wait();
                    orch.generate(&conn, &order_id, &scientist)
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|o| matches!(o, Err(ReportError::InvalidState { status: OrderStatus::Reported, .. }))));
        assert_eq!(stored_files(&orch), 1);
    }
}
