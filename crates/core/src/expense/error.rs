//! Expense-specific error types.

use thiserror::Error;
use uuid::Uuid;

use super::store::StoreError;

/// Errors surfaced by the expense service.
///
/// All variants propagate synchronously to the boundary layer; nothing is
/// retried or swallowed inside the service.
#[derive(Debug, Error)]
pub enum ExpenseError {
    /// The authenticated principal has no corresponding stored user record.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// The requested expense id does not exist.
    #[error("expense not found: {0}")]
    ExpenseNotFound(Uuid),

    /// The caller does not own the expense being mutated.
    #[error("caller is not the owner of this expense")]
    PermissionDenied,

    /// Persistence or audit-log backend failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}
