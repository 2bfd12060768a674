// 📒 Expense Store - the authoritative in-memory collection
//
// Every mutation is written through to storage. Failures never escape to the
// caller: they land in the error slot and the in-memory state stays the source
// of truth for the session.

use crate::expense::{seed_expenses, Expense};
use crate::storage::{Storage, STORAGE_KEY};
use thiserror::Error;
use tracing::{debug, error, info};

// ============================================================================
// ERROR SLOT
// ============================================================================

/// Failure recorded in the store's error slot.
///
/// `Display` is the advisory text meant for the user; `reason()` carries the
/// underlying cause for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Failed to access storage. Using sample data instead.")]
    StorageUnavailable { reason: String },

    #[error("Failed to load your existing expenses. Using sample data instead.")]
    CorruptData { reason: String },

    #[error("Failed to save your expenses to storage.")]
    SaveFailed { reason: String },

    #[error("Failed to prepare your expenses for saving.")]
    Serialize { reason: String },
}

impl StoreError {
    pub fn reason(&self) -> &str {
        match self {
            StoreError::StorageUnavailable { reason }
            | StoreError::CorruptData { reason }
            | StoreError::SaveFailed { reason }
            | StoreError::Serialize { reason } => reason,
        }
    }

    /// True for failures raised while loading (the session runs on seed data).
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            StoreError::StorageUnavailable { .. } | StoreError::CorruptData { .. }
        )
    }
}

// ============================================================================
// STORE
// ============================================================================

pub struct ExpenseStore<S: Storage> {
    storage: S,
    records: Vec<Expense>,
    last_error: Option<StoreError>,
}

impl<S: Storage> ExpenseStore<S> {
    /// Load the collection from `storage`, falling back to the seed set when
    /// nothing was saved or the saved blob is unusable.
    pub fn load(storage: S) -> Self {
        let mut store = ExpenseStore {
            storage,
            records: Vec::new(),
            last_error: None,
        };

        match store.storage.get(STORAGE_KEY) {
            Ok(Some(text)) if !text.is_empty() => {
                match serde_json::from_str::<Vec<Expense>>(&text) {
                    Ok(records) => {
                        info!(count = records.len(), "Loaded saved expenses");
                        store.records = records;
                    }
                    Err(err) => {
                        error!(error = %err, "Failed to parse saved expenses");
                        store.last_error = Some(StoreError::CorruptData {
                            reason: err.to_string(),
                        });
                        store.records = seed_expenses();
                    }
                }
            }
            Ok(_) => {
                info!("No saved expenses found, using sample data");
                store.records = seed_expenses();
            }
            Err(err) => {
                error!(error = %format!("{:#}", err), "Error accessing storage");
                store.last_error = Some(StoreError::StorageUnavailable {
                    reason: format!("{:#}", err),
                });
                store.records = seed_expenses();
            }
        }

        store
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Current records in insertion order.
    pub fn expenses(&self) -> &[Expense] {
        &self.records
    }

    /// Owned copy of the current records, for views that outlive a borrow.
    pub fn snapshot(&self) -> Vec<Expense> {
        self.records.clone()
    }

    pub fn get(&self, id: &str) -> Option<&Expense> {
        self.records.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Message describing the most recent failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.as_ref().map(|e| e.to_string())
    }

    pub fn last_failure(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    /// Dismiss the current notice.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Append a record. Duplicate ids are not checked. Dates keep millisecond
    /// precision, the precision storage round-trips.
    pub fn add(&mut self, expense: Expense) {
        debug!(id = %expense.id, "Adding expense");
        self.records.push(expense.normalized());
        self.persist();
    }

    /// Replace the record with the same id. No-op when nothing matches.
    pub fn update(&mut self, expense: Expense) {
        match self.records.iter_mut().find(|e| e.id == expense.id) {
            Some(slot) => {
                debug!(id = %expense.id, "Updating expense");
                *slot = expense.normalized();
            }
            None => {
                debug!(id = %expense.id, "Update skipped, no such expense");
                return;
            }
        }
        self.persist();
    }

    /// Remove every record with this id. No-op when nothing matches.
    pub fn delete(&mut self, id: &str) {
        let before = self.records.len();
        self.records.retain(|e| e.id != id);

        if self.records.len() == before {
            debug!(id = %id, "Delete skipped, no such expense");
            return;
        }
        debug!(id = %id, removed = before - self.records.len(), "Deleted expense");
        self.persist();
    }

    /// Put a previously removed record back (undo). Same as `add`: the caller
    /// must not restore an id that is still present.
    pub fn restore(&mut self, expense: Expense) {
        debug!(id = %expense.id, "Restoring expense");
        self.records.push(expense.normalized());
        self.persist();
    }

    /// Serialized form of the current collection, as written to storage.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.records)
    }

    fn persist(&mut self) {
        let json = match self.to_json() {
            Ok(json) => json,
            Err(err) => {
                error!(error = %err, "Failed to serialize expenses");
                self.last_error = Some(StoreError::Serialize {
                    reason: err.to_string(),
                });
                return;
            }
        };

        match self.storage.set(STORAGE_KEY, &json) {
            Ok(()) => {
                debug!(count = self.records.len(), bytes = json.len(), "Saved expenses");
                self.last_error = None;
            }
            Err(err) => {
                error!(error = %format!("{:#}", err), "Failed to save expenses to storage");
                self.last_error = Some(StoreError::SaveFailed {
                    reason: format!("{:#}", err),
                });
            }
        }
    }
}
