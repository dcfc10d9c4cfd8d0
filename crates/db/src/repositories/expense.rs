//! Expense repository: filtered paged queries, category aggregation, CRUD.

use async_trait::async_trait;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use uuid::Uuid;

use kakeibo_core::expense::{
    ExpenseDraft, ExpensePage, ExpenseQuery, ExpenseRecord, ExpenseStore, StoreError,
};
use kakeibo_shared::PageRequest;

use crate::entities::{expenses, family_members};

/// Expense repository for filtered queries and CRUD operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Fetches an expense by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<expenses::Model>, DbErr> {
        expenses::Entity::find_by_id(id).one(&self.db).await
    }

    async fn run_page(
        &self,
        select: Select<expenses::Entity>,
        page: &PageRequest,
    ) -> Result<ExpensePage, DbErr> {
        let paginator = select.paginate(&self.db, page.limit());
        let total = paginator.num_items().await?;
        let items = paginator
            .fetch_page(page.zero_based())
            .await?
            .into_iter()
            .map(to_record)
            .collect();

        Ok(ExpensePage { items, total })
    }

    async fn run_categories(&self, select: Select<expenses::Entity>) -> Result<Vec<String>, DbErr> {
        select
            .select_only()
            .column(expenses::Column::Category)
            .distinct()
            .order_by_asc(expenses::Column::Category)
            .into_tuple::<String>()
            .all(&self.db)
            .await
    }
}

/// Scopes a select to every expense of every member of a family.
fn family_scope(family_id: Uuid) -> Select<expenses::Entity> {
    expenses::Entity::find().filter(
        expenses::Column::Username.in_subquery(
            Query::select()
                .column(family_members::Column::Username)
                .from(family_members::Entity)
                .and_where(family_members::Column::FamilyId.eq(family_id))
                .to_owned(),
        ),
    )
}

/// Scopes a select to one user's own expenses.
fn user_scope(username: &str) -> Select<expenses::Entity> {
    expenses::Entity::find().filter(expenses::Column::Username.eq(username))
}

/// Applies the normalized query bounds onto a scoped select.
///
/// The member restriction only applies to family scope; individual scope
/// is already restricted to the caller.
fn filtered(
    mut select: Select<expenses::Entity>,
    query: &ExpenseQuery,
    with_member: bool,
) -> Select<expenses::Entity> {
    if with_member {
        if let Some(member) = &query.member {
            select = select.filter(expenses::Column::Username.eq(member.as_str()));
        }
    }

    if let Some(from) = query.from {
        select = select.filter(expenses::Column::ExpenseDate.gte(from));
    }

    if let Some(to) = query.to {
        select = select.filter(expenses::Column::ExpenseDate.lte(to));
    }

    if let Some(category) = &query.category {
        select = select.filter(expenses::Column::Category.eq(category.as_str()));
    }

    if let Some(term) = &query.search {
        select = select.filter(
            Condition::any()
                .add(expenses::Column::Description.contains(term.as_str()))
                .add(expenses::Column::Category.contains(term.as_str())),
        );
    }

    select
        .order_by_desc(expenses::Column::ExpenseDate)
        .order_by_desc(expenses::Column::CreatedAt)
}

/// Maps a stored expense onto the domain record.
fn to_record(model: expenses::Model) -> ExpenseRecord {
    ExpenseRecord {
        id: model.id,
        owner: model.username,
        amount: model.amount,
        category: model.category,
        description: model.description,
        expense_date: model.expense_date,
    }
}

#[async_trait]
impl ExpenseStore for ExpenseRepository {
    async fn page_for_family(
        &self,
        family_id: Uuid,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError> {
        let select = filtered(family_scope(family_id), query, true);
        self.run_page(select, page).await.map_err(StoreError::new)
    }

    async fn page_for_user(
        &self,
        username: &str,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError> {
        let select = filtered(user_scope(username), query, false);
        self.run_page(select, page).await.map_err(StoreError::new)
    }

    async fn categories_for_family(&self, family_id: Uuid) -> Result<Vec<String>, StoreError> {
        self.run_categories(family_scope(family_id))
            .await
            .map_err(StoreError::new)
    }

    async fn categories_for_user(&self, username: &str) -> Result<Vec<String>, StoreError> {
        self.run_categories(user_scope(username))
            .await
            .map_err(StoreError::new)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExpenseRecord>, StoreError> {
        let model = Self::find_by_id(self, id).await.map_err(StoreError::new)?;
        Ok(model.map(to_record))
    }

    async fn insert(&self, owner: &str, draft: &ExpenseDraft) -> Result<ExpenseRecord, StoreError> {
        let now = chrono::Utc::now().into();
        let expense = expenses::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(owner.to_string()),
            amount: Set(draft.amount),
            category: Set(draft.category.clone()),
            description: Set(draft.description.clone()),
            expense_date: Set(draft.expense_date),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = expense.insert(&self.db).await.map_err(StoreError::new)?;
        Ok(to_record(model))
    }

    async fn update(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, StoreError> {
        // Owner and created_at stay NotSet: the merge never touches them.
        let expense = expenses::ActiveModel {
            id: ActiveValue::Unchanged(record.id),
            amount: Set(record.amount),
            category: Set(record.category.clone()),
            description: Set(record.description.clone()),
            expense_date: Set(record.expense_date),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        let model = expense.update(&self.db).await.map_err(StoreError::new)?;
        Ok(to_record(model))
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        expenses::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(StoreError::new)?;
        Ok(())
    }
}
