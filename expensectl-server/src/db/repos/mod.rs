//! Repository implementations for database access
//!
//! Each repository borrows the pool and scopes every query by user. Writes
//! that span several rows (bill totals, tombstones, category moves) run in a
//! transaction; the transaction-level helpers are `pub(crate)` so the sync
//! engine can compose them inside its own transaction.

pub mod api_keys;
pub mod autocomplete;
pub mod bill_items;
pub mod categories;
pub mod deletions;
pub mod expenses;
pub mod item_templates;
pub mod search;
pub mod templates;
pub mod users;

pub use api_keys::{ApiKey, ApiKeyRepo, AuthUser};
pub use autocomplete::{AutocompleteRepo, ItemHint};
pub use bill_items::{BillItem, BillItemFields, BillItemRepo, BulkItem, BulkItemEdit, BulkItemResult};
pub use categories::{
    BulkEditSummary, Category, CategoryChange, CategoryRepo, CategoryWithCount, NewCategory,
};
pub use deletions::DeletionRepo;
pub use expenses::{
    CategorySpending, Dashboard, DaySum, Expense, ExpenseFields, ExpenseListItem, ExpenseRepo,
};
pub use item_templates::{ItemTemplate, ItemTemplateFields, ItemTemplateRepo};
pub use search::{BillItemHit, PurchaseRow, SearchFor, SearchQuery, SearchRepo, SearchResults};
pub use templates::{ExpenseTemplate, TemplateFields, TemplateRepo};
pub use users::{User, UserRepo};

use expensectl_core::TemplateError;

use crate::models::ValidationError;

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("conflict: {reason}")]
    Conflict { reason: String },

    #[error("invalid request: {reason}")]
    Invalid { reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub(crate) fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}

/// True when the error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// ILIKE pattern matching values that start with `raw`.
pub(crate) fn like_prefix(raw: &str) -> String {
    format!("{}%", escape_like(raw))
}

/// ILIKE pattern matching values that contain `raw`.
pub(crate) fn like_contains(raw: &str) -> String {
    format!("%{}%", escape_like(raw))
}
