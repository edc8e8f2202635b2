//! Per-order serialization of report generation and signing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::ReportError;

#[derive(Debug, Default)]
pub struct OrderLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock of `order_id`. Entries nobody holds any more are dropped on
    /// the way, so the map only grows with in-flight orders.
    pub fn lock_for(&self, order_id: &Uuid) -> Result<Arc<Mutex<()>>, ReportError> {
        let mut locks = self.locks.lock().map_err(|_| ReportError::LockPoisoned)?;
        locks.retain(|id, lock| id == order_id || Arc::strong_count(lock) > 1);
        Ok(locks.entry(*order_id).or_default().clone())
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
