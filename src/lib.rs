// Expense Dashboard - Core Library
// Exposes the store, storage backends and aggregates for the CLI, the TUI and tests

pub mod expense;
pub mod storage;
pub mod store;
pub mod undo;
pub mod validation;   // Entry form rules
pub mod summary;      // Totals and category breakdown
pub mod config;

// Only compile the dashboard when the TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use expense::{
    Expense, Category,
    new_expense_id, seed_expenses, parse_date, midnight_utc,
};
pub use storage::{
    Storage, MemoryStorage, FileStorage, SqliteStorage,
    STORAGE_KEY,
};
pub use store::{ExpenseStore, StoreError};
pub use undo::UndoAction;
pub use validation::{ExpenseDraft, FieldError};
pub use summary::{
    SpendingSummary, CategoryTotal,
    category_totals, format_amount,
};
pub use config::{Config, Backend};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
