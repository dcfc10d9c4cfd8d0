//! Collaborator traits implemented by the persistence layer.
//!
//! The expense service is constructed with concrete implementations of
//! these traits at startup; there is no ambient or static lookup. Tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use kakeibo_shared::PageRequest;

use super::types::{
    ExpenseDraft, ExpensePage, ExpenseQuery, ExpenseRecord, FamilyRecord, UserRecord,
};

/// Opaque backend failure from a collaborator.
///
/// Keeps the domain layer free of database types; implementations wrap
/// their native errors into the message.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StoreError(String);

impl StoreError {
    /// Wraps a backend error.
    #[must_use]
    pub fn new(source: impl std::fmt::Display) -> Self {
        Self(source.to_string())
    }
}

/// Resolves usernames into stored user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks up a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Looks up the optional family grouping for a username.
#[async_trait]
pub trait FamilyDirectory: Send + Sync {
    /// Returns the family the given user belongs to, if any.
    async fn find_by_member(&self, username: &str) -> Result<Option<FamilyRecord>, StoreError>;
}

/// Persistence operations for expenses.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Pages expenses visible to a family (any member), restricted by the
    /// query's member/date/category/search bounds.
    async fn page_for_family(
        &self,
        family_id: Uuid,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError>;

    /// Pages one user's own expenses, restricted by the query's
    /// date/category/search bounds. The member restriction does not apply
    /// to individual scope.
    async fn page_for_user(
        &self,
        username: &str,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError>;

    /// Distinct categories across all expenses of all family members.
    async fn categories_for_family(&self, family_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Distinct categories across one user's own expenses.
    async fn categories_for_user(&self, username: &str) -> Result<Vec<String>, StoreError>;

    /// Fetches an expense by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExpenseRecord>, StoreError>;

    /// Persists a new expense owned by `owner`.
    async fn insert(&self, owner: &str, draft: &ExpenseDraft) -> Result<ExpenseRecord, StoreError>;

    /// Persists the mutable fields of an existing expense.
    async fn update(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, StoreError>;

    /// Deletes an expense by id.
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Append-only action log.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends an action message for the given actor.
    async fn append(&self, username: &str, message: &str) -> Result<(), StoreError>;
}
