//! Report generation: render an executed order, protect the document with
//! the patient passphrase, store it and record the artifact.

pub mod document;
pub mod layout;
pub mod locks;
pub mod orchestrator;
pub mod renderer;
pub mod retention;
pub mod storage;

pub use document::{Entry, ReportDocument, ReportHeader, Section};
pub use layout::to_pdf;
pub use orchestrator::{ReportOrchestrator, ReportSettings};
pub use renderer::render;
pub use retention::download_allowed;
pub use storage::{DocumentStore, FsDocumentStore, StoredKind};

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::CryptoError;
use crate::db::DatabaseError;
use crate::models::enums::{OrderStatus, OrderType};
use crate::orders::OrderError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Order {order_id} is {status}, expected {expected}")]
    InvalidState {
        order_id: Uuid,
        status: OrderStatus,
        expected: OrderStatus,
    },

    #[error("Order {order_id} is missing {missing} result(s)")]
    IncompleteResults { order_id: Uuid, missing: usize },

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("No report artifact for order {0}")]
    ArtifactMissing(Uuid),

    #[error("Report of order {0} is already signed")]
    AlreadySigned(Uuid),

    #[error("Operation does not apply to {order_type} order {order_id}")]
    NotApplicable { order_id: Uuid, order_type: OrderType },

    #[error("Order lock poisoned")]
    LockPoisoned,

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Protection failed: {0}")]
    Protect(#[from] CryptoError),

    #[error("Document storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Decrypted report does not match its recorded hash")]
    IntegrityMismatch,

    #[error("Persistence failure: {0}")]
    Persistence(#[from] DatabaseError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl From<rusqlite::Error> for ReportError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence(DatabaseError::from(err))
    }
}
