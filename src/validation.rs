// ✅ Entry validation - the rules the entry/edit forms apply before anything
// reaches the store. The store itself accepts whatever it is given.

use crate::expense::{midnight_utc, Category, Expense};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MIN_AMOUNT: f64 = 0.01;
pub const MIN_DESCRIPTION_LEN: usize = 3;
pub const MAX_DESCRIPTION_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Raw form input. Every field may still be missing or malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseDraft {
    pub amount: Option<f64>,
    pub description: String,
    pub category: String,
    pub date: Option<NaiveDate>,
}

impl ExpenseDraft {
    /// Pre-fill a draft from an existing record (edit form).
    pub fn from_expense(expense: &Expense) -> Self {
        ExpenseDraft {
            amount: Some(expense.amount),
            description: expense.description.clone(),
            category: expense.category.clone(),
            date: Some(expense.day()),
        }
    }

    /// Check every field; an empty result means the draft is acceptable.
    pub fn validate(&self, today: NaiveDate) -> Vec<FieldError> {
        let mut errors = Vec::new();

        match self.amount {
            None => errors.push(FieldError::new("amount", "Amount is required")),
            Some(amount) if !amount.is_finite() => {
                errors.push(FieldError::new("amount", "Amount must be a number"))
            }
            Some(amount) if amount <= 0.0 => {
                errors.push(FieldError::new("amount", "Amount must be positive"))
            }
            Some(amount) if amount < MIN_AMOUNT => {
                errors.push(FieldError::new("amount", "Amount must be at least 0.01"))
            }
            Some(_) => {}
        }

        let len = self.description.chars().count();
        if len < MIN_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                "Description must be at least 3 characters",
            ));
        } else if len > MAX_DESCRIPTION_LEN {
            errors.push(FieldError::new(
                "description",
                "Description must be less than 100 characters",
            ));
        }

        if self.category.trim().is_empty() {
            errors.push(FieldError::new("category", "Please select a category"));
        } else if self.category.parse::<Category>().is_err() {
            errors.push(FieldError::new("category", "Unknown category"));
        }

        match self.date {
            None => errors.push(FieldError::new("date", "Please select a date")),
            Some(date) if date > today => {
                errors.push(FieldError::new("date", "Date cannot be in the future"))
            }
            Some(_) => {}
        }

        errors
    }

    /// Validate and build the record to hand to the store.
    pub fn into_expense(self, id: String, today: NaiveDate) -> Result<Expense, Vec<FieldError>> {
        let errors = self.validate(today);
        if !errors.is_empty() {
            return Err(errors);
        }

        let (Some(amount), Some(date), Ok(category)) =
            (self.amount, self.date, self.category.parse::<Category>())
        else {
            return Err(errors);
        };

        Ok(Expense::new(
            id,
            amount,
            self.description,
            category.as_str(),
            midnight_utc(date),
        ))
    }
}

/// First error message for `field`, if any.
pub fn error_for<'a>(errors: &'a [FieldError], field: &str) -> Option<&'a str> {
    errors
        .iter()
        .find(|e| e.field == field)
        .map(|e| e.message.as_str())
}
