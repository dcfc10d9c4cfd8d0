//! The expense service.

use std::sync::Arc;

use uuid::Uuid;

use kakeibo_shared::PageRequest;

use super::error::ExpenseError;
use super::store::{AuditLog, ExpenseStore, FamilyDirectory, UserDirectory};
use super::types::{ExpenseDraft, ExpenseFilter, ExpensePage, ExpenseRecord, UserRecord};

/// Stateless service enforcing per-user/per-family expense rules.
///
/// Every operation resolves the caller's identity first, then branches on
/// whether that identity belongs to a family (shared visibility) or not
/// (individual visibility). Family membership widens visibility only;
/// update and delete rights always require ownership.
///
/// The service holds no locks and no caches; concurrent updates to the
/// same expense are a plain read-then-write, so the store's last write
/// wins.
#[derive(Clone)]
pub struct ExpenseService {
    users: Arc<dyn UserDirectory>,
    families: Arc<dyn FamilyDirectory>,
    store: Arc<dyn ExpenseStore>,
    audit: Arc<dyn AuditLog>,
}

impl ExpenseService {
    /// Creates a new expense service with the given collaborators.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserDirectory>,
        families: Arc<dyn FamilyDirectory>,
        store: Arc<dyn ExpenseStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            users,
            families,
            store,
            audit,
        }
    }

    /// Resolves the authenticated principal into a stored user record.
    ///
    /// Re-derived on every call rather than cached, so each call reflects
    /// the latest persisted user state.
    async fn resolve_current_user(&self, principal: &str) -> Result<UserRecord, ExpenseError> {
        self.users
            .find_by_username(principal)
            .await?
            .ok_or_else(|| ExpenseError::UserNotFound(principal.to_string()))
    }

    /// Pages expenses visible to the caller.
    ///
    /// Filters are normalized first (`"all"` sentinels dropped, calendar
    /// dates widened to inclusive day bounds). A caller with a family sees
    /// every member's expenses, optionally restricted to one member by the
    /// user filter; a caller without one sees only their own, and the user
    /// filter is not applicable.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record.
    pub async fn page(
        &self,
        principal: &str,
        filter: ExpenseFilter,
        page: &PageRequest,
    ) -> Result<ExpensePage, ExpenseError> {
        let user = self.resolve_current_user(principal).await?;
        let query = filter.normalize();

        let result = match self.families.find_by_member(&user.username).await? {
            Some(family) => self.store.page_for_family(family.id, &query, page).await?,
            None => self.store.page_for_user(&user.username, &query, page).await?,
        };

        Ok(result)
    }

    /// Returns the items of the matching page, in store order.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record.
    pub async fn list(
        &self,
        principal: &str,
        filter: ExpenseFilter,
        page: &PageRequest,
    ) -> Result<Vec<ExpenseRecord>, ExpenseError> {
        Ok(self.page(principal, filter, page).await?.items)
    }

    /// Returns only the total element count for the matching filters.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record.
    pub async fn total(
        &self,
        principal: &str,
        filter: ExpenseFilter,
        page: &PageRequest,
    ) -> Result<u64, ExpenseError> {
        Ok(self.page(principal, filter, page).await?.total)
    }

    /// Returns the distinct categories visible to the caller.
    ///
    /// Family members see the union across all members; everyone else sees
    /// only their own.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record.
    pub async fn categories(&self, principal: &str) -> Result<Vec<String>, ExpenseError> {
        let user = self.resolve_current_user(principal).await?;

        let categories = match self.families.find_by_member(&user.username).await? {
            Some(family) => self.store.categories_for_family(family.id).await?,
            None => self.store.categories_for_user(&user.username).await?,
        };

        Ok(categories)
    }

    /// Creates a new expense owned by the caller.
    ///
    /// The owner is always the resolved current user; drafts carry no
    /// owner field, so a client cannot supply one.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record.
    pub async fn create(
        &self,
        principal: &str,
        draft: &ExpenseDraft,
    ) -> Result<ExpenseRecord, ExpenseError> {
        let user = self.resolve_current_user(principal).await?;

        let record = self.store.insert(&user.username, draft).await?;
        self.audit
            .append(&user.username, &format!("{} created new expense", user.username))
            .await?;

        Ok(record)
    }

    /// Fetches an expense by id.
    ///
    /// Plain retrieval performs no ownership or family-visibility check:
    /// any authenticated caller may fetch any expense by id.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound` if the id does not exist.
    pub async fn get(&self, id: Uuid) -> Result<ExpenseRecord, ExpenseError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(ExpenseError::ExpenseNotFound(id))
    }

    /// Updates an expense the caller owns.
    ///
    /// Merges the draft's fields onto the stored record (id and owner
    /// untouched), persists, and appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record,
    /// `ExpenseNotFound` if the id does not exist, and `PermissionDenied`
    /// if the caller is not the owner.
    pub async fn update(
        &self,
        principal: &str,
        id: Uuid,
        draft: &ExpenseDraft,
    ) -> Result<ExpenseRecord, ExpenseError> {
        let user = self.resolve_current_user(principal).await?;

        let mut record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ExpenseError::ExpenseNotFound(id))?;

        if record.owner != user.username {
            return Err(ExpenseError::PermissionDenied);
        }

        record.apply(draft);
        let updated = self.store.update(&record).await?;
        self.audit
            .append(
                &user.username,
                &format!("{} updated expense {}", user.username, updated.id),
            )
            .await?;

        Ok(updated)
    }

    /// Deletes an expense the caller owns.
    ///
    /// The audit entry is appended before the row is removed.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the principal has no stored user record,
    /// `ExpenseNotFound` if the id does not exist, and `PermissionDenied`
    /// if the caller is not the owner.
    pub async fn delete(&self, principal: &str, id: Uuid) -> Result<(), ExpenseError> {
        let user = self.resolve_current_user(principal).await?;

        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ExpenseError::ExpenseNotFound(id))?;

        if record.owner != user.username {
            return Err(ExpenseError::PermissionDenied);
        }

        self.audit
            .append(
                &user.username,
                &format!("{} deleted expense {}", user.username, record.id),
            )
            .await?;
        self.store.delete(record.id).await?;

        Ok(())
    }
}

impl std::fmt::Debug for ExpenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseService").finish_non_exhaustive()
    }
}
