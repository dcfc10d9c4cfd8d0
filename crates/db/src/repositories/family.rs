//! Family repository for membership lookups.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use kakeibo_core::expense::{FamilyDirectory, FamilyRecord, StoreError};

use crate::entities::{families, family_members};

/// Family repository for grouping and membership operations.
#[derive(Debug, Clone)]
pub struct FamilyRepository {
    db: DatabaseConnection,
}

impl FamilyRepository {
    /// Creates a new family repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the family a user belongs to, if any.
    ///
    /// Membership is keyed on username; a user has at most one row in
    /// family_members.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_member(&self, username: &str) -> Result<Option<families::Model>, DbErr> {
        let result = family_members::Entity::find()
            .filter(family_members::Column::Username.eq(username))
            .find_also_related(families::Entity)
            .one(&self.db)
            .await?;

        Ok(result.and_then(|(_, family)| family))
    }

    /// Creates a new family.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(&self, name: &str) -> Result<families::Model, DbErr> {
        let family = families::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        family.insert(&self.db).await
    }

    /// Adds a user to a family.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including when the
    /// user already belongs to a family.
    pub async fn add_member(
        &self,
        family_id: Uuid,
        username: &str,
    ) -> Result<family_members::Model, DbErr> {
        let membership = family_members::ActiveModel {
            id: Set(Uuid::new_v4()),
            family_id: Set(family_id),
            username: Set(username.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        membership.insert(&self.db).await
    }
}

#[async_trait]
impl FamilyDirectory for FamilyRepository {
    async fn find_by_member(&self, username: &str) -> Result<Option<FamilyRecord>, StoreError> {
        let model = Self::find_by_member(self, username)
            .await
            .map_err(StoreError::new)?;
        Ok(model.map(|family| FamilyRecord {
            id: family.id,
            name: family.name,
        }))
    }
}
