//! Repository implementations for database access
//!
//! Repositories borrow a single connection (`&mut SqliteConnection`), which
//! is the request-scoped connection checked out by the `DbConn` extractor.
//! Mutations open a transaction on that connection; dropping it without
//! commit rolls back.

pub mod items;
pub mod labels;
pub mod search;
pub mod states;
pub mod tags;

pub use items::{ChildItem, Item, ItemChanges, ItemRepo, ItemWithTags, NewItem};
pub use labels::{Label, LabelRepo};
pub use search::{SearchHit, SearchRepo};
pub use states::{State, StateRepo};
pub use tags::{Tag, TagRepo};

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },
}

impl DbError {
    pub(crate) fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// True when the statement failed because a referenced row is missing
    /// (label, parent item, state, tag).
    pub fn is_missing_reference(&self) -> bool {
        match self {
            Self::Sqlx(sqlx::Error::Database(e)) => e.is_foreign_key_violation(),
            _ => false,
        }
    }
}
