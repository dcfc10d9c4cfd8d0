//! Audit log repository.
//!
//! Append-only from the application's perspective.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use uuid::Uuid;

use kakeibo_core::expense::{AuditLog, StoreError};

use crate::entities::audit_logs;

/// Audit log repository.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    db: DatabaseConnection,
}

impl AuditLogRepository {
    /// Creates a new audit log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends an action entry for the given actor.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn append(&self, username: &str, action: &str) -> Result<audit_logs::Model, DbErr> {
        let entry = audit_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username.to_string()),
            action: Set(action.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        entry.insert(&self.db).await
    }
}

#[async_trait]
impl AuditLog for AuditLogRepository {
    async fn append(&self, username: &str, message: &str) -> Result<(), StoreError> {
        Self::append(self, username, message)
            .await
            .map_err(StoreError::new)?;
        Ok(())
    }
}
