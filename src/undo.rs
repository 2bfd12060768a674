// ↩️ Undo - reverse the most recent add or delete

use crate::expense::Expense;
use crate::storage::Storage;
use crate::store::ExpenseStore;

/// What it takes to reverse the last user action.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoAction {
    /// An expense was just added; undo removes it again.
    RemoveAdded { id: String, description: String },

    /// An expense was just deleted; undo puts the captured record back.
    RestoreDeleted(Expense),
}

impl UndoAction {
    pub fn after_add(expense: &Expense) -> Self {
        UndoAction::RemoveAdded {
            id: expense.id.clone(),
            description: expense.description.clone(),
        }
    }

    pub fn after_delete(expense: Expense) -> Self {
        UndoAction::RestoreDeleted(expense)
    }

    /// Short label for the pending undo ("Undo delete of Coffee").
    pub fn label(&self) -> String {
        match self {
            UndoAction::RemoveAdded { description, .. } => format!("Undo add of {}", description),
            UndoAction::RestoreDeleted(expense) => format!("Undo delete of {}", expense.description),
        }
    }

    /// Apply the reversal and return the notice to show.
    ///
    /// A deleted record whose id has come back in the meantime is not
    /// restored a second time.
    pub fn apply<S: Storage>(self, store: &mut ExpenseStore<S>) -> String {
        match self {
            UndoAction::RemoveAdded { id, .. } => {
                store.delete(&id);
                "Expense removed".to_string()
            }
            UndoAction::RestoreDeleted(expense) => {
                if store.contains(&expense.id) {
                    return format!("{} is already present", expense.description);
                }
                store.restore(expense);
                "Expense restored".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    fn coffee() -> Expense {
        Expense::new(
            "x",
            12.5,
            "Coffee",
            "Food",
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_undo_add_removes_record() {
        let mut store = ExpenseStore::load(MemoryStorage::new());
        let expense = coffee();
        store.add(expense.clone());

        let undo = UndoAction::after_add(&expense);
        assert_eq!(undo.label(), "Undo add of Coffee");
        assert_eq!(undo.apply(&mut store), "Expense removed");

        assert!(!store.contains("x"));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_undo_delete_restores_record() {
        let mut store = ExpenseStore::load(MemoryStorage::new());
        let captured = store.get("3").cloned().unwrap();
        store.delete("3");

        let notice = UndoAction::after_delete(captured.clone()).apply(&mut store);

        assert_eq!(notice, "Expense restored");
        assert_eq!(store.get("3"), Some(&captured));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_undo_delete_skips_live_id() {
        let mut store = ExpenseStore::load(MemoryStorage::new());
        let captured = store.get("1").cloned().unwrap();

        let notice = UndoAction::after_delete(captured).apply(&mut store);

        assert_eq!(notice, "Grocery shopping is already present");
        assert_eq!(store.expenses().iter().filter(|e| e.id == "1").count(), 1);
    }
}
