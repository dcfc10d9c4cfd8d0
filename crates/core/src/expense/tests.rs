//! Expense service tests against in-memory collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use kakeibo_shared::PageRequest;

use super::error::ExpenseError;
use super::service::ExpenseService;
use super::store::{AuditLog, ExpenseStore, FamilyDirectory, StoreError, UserDirectory};
use super::types::{
    ExpenseDraft, ExpenseFilter, ExpensePage, ExpenseQuery, ExpenseRecord, FamilyRecord,
    UserRecord,
};

// ============================================================================
// In-memory collaborators
// ============================================================================

/// One backend implementing all four collaborator traits.
#[derive(Default)]
struct MemoryBackend {
    users: Mutex<Vec<UserRecord>>,
    families: Mutex<Vec<FamilyRecord>>,
    memberships: Mutex<Vec<(Uuid, String)>>,
    expenses: Mutex<Vec<ExpenseRecord>>,
    audit: Mutex<Vec<(String, String)>>,
}

impl MemoryBackend {
    fn add_user(&self, username: &str) {
        self.users.lock().unwrap().push(UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_string(),
        });
    }

    fn add_family(&self, name: &str, members: &[&str]) -> Uuid {
        let family = FamilyRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = family.id;
        self.families.lock().unwrap().push(family);
        let mut memberships = self.memberships.lock().unwrap();
        for member in members {
            memberships.push((id, (*member).to_string()));
        }
        id
    }

    fn members_of(&self, family_id: Uuid) -> Vec<String> {
        self.memberships
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == family_id)
            .map(|(_, username)| username.clone())
            .collect()
    }

    fn audit_entries(&self) -> Vec<(String, String)> {
        self.audit.lock().unwrap().clone()
    }
}

fn matches(record: &ExpenseRecord, query: &ExpenseQuery) -> bool {
    query.from.is_none_or(|from| record.expense_date >= from)
        && query.to.is_none_or(|to| record.expense_date <= to)
        && query
            .category
            .as_ref()
            .is_none_or(|category| &record.category == category)
        && query.search.as_ref().is_none_or(|term| {
            record.description.contains(term.as_str()) || record.category.contains(term.as_str())
        })
}

fn paged(mut items: Vec<ExpenseRecord>, page: &PageRequest) -> ExpensePage {
    items.sort_by(|a, b| b.expense_date.cmp(&a.expense_date));
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(page.zero_based() * page.limit()).unwrap())
        .take(usize::try_from(page.limit()).unwrap())
        .collect();
    ExpensePage { items, total }
}

fn distinct_categories(records: &[ExpenseRecord]) -> Vec<String> {
    let mut categories: Vec<String> = records.iter().map(|r| r.category.clone()).collect();
    categories.sort();
    categories.dedup();
    categories
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

#[async_trait]
impl FamilyDirectory for MemoryBackend {
    async fn find_by_member(&self, username: &str) -> Result<Option<FamilyRecord>, StoreError> {
        let memberships = self.memberships.lock().unwrap();
        let Some((family_id, _)) = memberships.iter().find(|(_, member)| member == username) else {
            return Ok(None);
        };
        Ok(self
            .families
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == *family_id)
            .cloned())
    }
}

#[async_trait]
impl ExpenseStore for MemoryBackend {
    async fn page_for_family(
        &self,
        family_id: Uuid,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError> {
        let members = self.members_of(family_id);
        let items: Vec<ExpenseRecord> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| members.contains(&r.owner))
            .filter(|r| query.member.as_ref().is_none_or(|member| &r.owner == member))
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        Ok(paged(items, page))
    }

    async fn page_for_user(
        &self,
        username: &str,
        query: &ExpenseQuery,
        page: &PageRequest,
    ) -> Result<ExpensePage, StoreError> {
        let items: Vec<ExpenseRecord> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == username)
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        Ok(paged(items, page))
    }

    async fn categories_for_family(&self, family_id: Uuid) -> Result<Vec<String>, StoreError> {
        let members = self.members_of(family_id);
        let records: Vec<ExpenseRecord> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| members.contains(&r.owner))
            .cloned()
            .collect();
        Ok(distinct_categories(&records))
    }

    async fn categories_for_user(&self, username: &str) -> Result<Vec<String>, StoreError> {
        let records: Vec<ExpenseRecord> = self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == username)
            .cloned()
            .collect();
        Ok(distinct_categories(&records))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ExpenseRecord>, StoreError> {
        Ok(self
            .expenses
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn insert(&self, owner: &str, draft: &ExpenseDraft) -> Result<ExpenseRecord, StoreError> {
        let record = ExpenseRecord {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            amount: draft.amount,
            category: draft.category.clone(),
            description: draft.description.clone(),
            expense_date: draft.expense_date,
        };
        self.expenses.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, record: &ExpenseRecord) -> Result<ExpenseRecord, StoreError> {
        let mut expenses = self.expenses.lock().unwrap();
        let stored = expenses
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or_else(|| StoreError::new("row vanished"))?;
        *stored = record.clone();
        Ok(record.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.expenses.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }
}

#[async_trait]
impl AuditLog for MemoryBackend {
    async fn append(&self, username: &str, message: &str) -> Result<(), StoreError> {
        self.audit
            .lock()
            .unwrap()
            .push((username.to_string(), message.to_string()));
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn service(backend: &Arc<MemoryBackend>) -> ExpenseService {
    ExpenseService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend.clone(),
    )
}

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

fn draft(amount: Decimal, category: &str, date: NaiveDateTime) -> ExpenseDraft {
    ExpenseDraft {
        amount,
        category: category.to_string(),
        description: format!("{category} purchase"),
        expense_date: date,
    }
}

fn everything() -> ExpenseFilter {
    ExpenseFilter::default()
}

fn first_page() -> PageRequest {
    PageRequest::default()
}

// ============================================================================
// Ownership rules
// ============================================================================

#[tokio::test]
async fn update_and_delete_require_ownership_even_within_family() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("bob");
    backend.add_family("hart", &["alice", "bob"]);
    let svc = service(&backend);

    let created = svc
        .create("alice", &draft(dec!(25.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();

    let update = svc
        .update("bob", created.id, &draft(dec!(30.00), "food", created.expense_date))
        .await;
    assert!(matches!(update, Err(ExpenseError::PermissionDenied)));

    let delete = svc.delete("bob", created.id).await;
    assert!(matches!(delete, Err(ExpenseError::PermissionDenied)));

    // Family membership widened visibility, never mutation rights.
    let visible = svc.list("bob", everything(), &first_page()).await.unwrap();
    assert_eq!(visible.len(), 1);
}

#[tokio::test]
async fn create_stamps_owner_from_resolved_user() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    let created = svc
        .create("alice", &draft(dec!(9.99), "books", dt(2024, 2, 1, 9, 0, 0)))
        .await
        .unwrap();

    assert_eq!(created.owner, "alice");
    assert_eq!(
        backend.audit_entries(),
        vec![("alice".to_string(), "alice created new expense".to_string())]
    );
}

#[tokio::test]
async fn fetch_by_id_ignores_ownership() {
    // Pins current behavior: plain retrieval by id is not scoped to the
    // caller, unlike listing, update, and delete.
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("carol");
    let svc = service(&backend);

    let created = svc
        .create("alice", &draft(dec!(5.00), "coffee", dt(2024, 3, 1, 8, 0, 0)))
        .await
        .unwrap();

    let fetched = svc.get(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn unknown_principal_is_user_not_found() {
    let backend = Arc::new(MemoryBackend::default());
    let svc = service(&backend);

    let list = svc.list("ghost", everything(), &first_page()).await;
    assert!(matches!(list, Err(ExpenseError::UserNotFound(_))));

    let create = svc
        .create("ghost", &draft(dec!(1.00), "misc", dt(2024, 1, 1, 0, 0, 0)))
        .await;
    assert!(matches!(create, Err(ExpenseError::UserNotFound(_))));

    let categories = svc.categories("ghost").await;
    assert!(matches!(categories, Err(ExpenseError::UserNotFound(_))));
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn user_without_family_sees_only_own_expenses() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("carol");
    let svc = service(&backend);

    svc.create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("carol", &draft(dec!(99.00), "travel", dt(2024, 1, 6, 12, 0, 0)))
        .await
        .unwrap();

    let visible = svc.list("alice", everything(), &first_page()).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].owner, "alice");

    assert_eq!(svc.categories("alice").await.unwrap(), vec!["food"]);
}

#[tokio::test]
async fn family_members_see_the_union() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("bob");
    backend.add_family("hart", &["alice", "bob"]);
    let svc = service(&backend);

    svc.create("alice", &draft(dec!(10.00), "groceries", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("bob", &draft(dec!(20.00), "fuel", dt(2024, 1, 6, 12, 0, 0)))
        .await
        .unwrap();

    let visible = svc.list("bob", everything(), &first_page()).await.unwrap();
    assert_eq!(visible.len(), 2);

    // Categories called as bob include alice's category.
    assert_eq!(
        svc.categories("bob").await.unwrap(),
        vec!["fuel", "groceries"]
    );
}

#[tokio::test]
async fn user_filter_restricts_to_one_family_member() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("bob");
    backend.add_family("hart", &["alice", "bob"]);
    let svc = service(&backend);

    svc.create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("bob", &draft(dec!(20.00), "food", dt(2024, 1, 6, 12, 0, 0)))
        .await
        .unwrap();

    let filter = ExpenseFilter {
        user: Some("alice".to_string()),
        ..ExpenseFilter::default()
    };
    let visible = svc.list("bob", filter, &first_page()).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].owner, "alice");
}

// ============================================================================
// Filters
// ============================================================================

#[rstest]
#[case::user_all(
    ExpenseFilter { user: Some("all".to_string()), ..ExpenseFilter::default() },
    ExpenseFilter::default()
)]
#[case::category_all(
    ExpenseFilter { category: Some("all".to_string()), ..ExpenseFilter::default() },
    ExpenseFilter::default()
)]
#[case::both_all(
    ExpenseFilter {
        user: Some("all".to_string()),
        category: Some("all".to_string()),
        ..ExpenseFilter::default()
    },
    ExpenseFilter::default()
)]
fn all_sentinel_normalizes_to_absent_filter(
    #[case] with_sentinel: ExpenseFilter,
    #[case] absent: ExpenseFilter,
) {
    assert_eq!(with_sentinel.normalize(), absent.normalize());
}

#[tokio::test]
async fn all_sentinel_lists_like_absent_filter() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("bob");
    backend.add_family("hart", &["alice", "bob"]);
    let svc = service(&backend);

    svc.create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("bob", &draft(dec!(20.00), "fuel", dt(2024, 1, 6, 12, 0, 0)))
        .await
        .unwrap();

    let sentinel = ExpenseFilter {
        user: Some("all".to_string()),
        category: Some("all".to_string()),
        ..ExpenseFilter::default()
    };
    let with_sentinel = svc.list("alice", sentinel, &first_page()).await.unwrap();
    let without = svc.list("alice", everything(), &first_page()).await.unwrap();
    assert_eq!(with_sentinel, without);
}

#[tokio::test]
async fn end_date_includes_the_whole_day() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    let late_on_boundary = svc
        .create("alice", &draft(dec!(10.00), "food", dt(2024, 3, 10, 23, 59, 59)))
        .await
        .unwrap();
    svc.create("alice", &draft(dec!(20.00), "food", dt(2024, 3, 11, 0, 0, 0)))
        .await
        .unwrap();

    let filter = ExpenseFilter {
        end_date: NaiveDate::from_ymd_opt(2024, 3, 10),
        ..ExpenseFilter::default()
    };
    let visible = svc.list("alice", filter, &first_page()).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, late_on_boundary.id);
}

#[tokio::test]
async fn date_range_and_category_and_search_compose() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    svc.create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("alice", &draft(dec!(20.00), "food", dt(2024, 2, 5, 12, 0, 0)))
        .await
        .unwrap();
    svc.create("alice", &draft(dec!(30.00), "travel", dt(2024, 1, 6, 12, 0, 0)))
        .await
        .unwrap();

    let filter = ExpenseFilter {
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
        category: Some("food".to_string()),
        search: Some("food".to_string()),
        ..ExpenseFilter::default()
    };
    let visible = svc.list("alice", filter, &first_page()).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].amount, dec!(10.00));
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn total_counts_all_matches_beyond_the_page() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    for day in 1..=3 {
        svc.create("alice", &draft(dec!(5.00), "food", dt(2024, 4, day, 12, 0, 0)))
            .await
            .unwrap();
    }

    let small_page = PageRequest {
        page: 1,
        per_page: 2,
    };
    let page = svc.page("alice", everything(), &small_page).await.unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 3);

    assert_eq!(svc.total("alice", everything(), &small_page).await.unwrap(), 3);
}

// ============================================================================
// Mutation and audit scenarios
// ============================================================================

#[tokio::test]
async fn solo_owner_update_scenario() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    backend.add_user("bob");
    let svc = service(&backend);

    let created = svc
        .create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();

    assert_eq!(svc.get(created.id).await.unwrap(), created);

    let denied = svc
        .update("bob", created.id, &draft(dec!(10.00), "dining", created.expense_date))
        .await;
    assert!(matches!(denied, Err(ExpenseError::PermissionDenied)));

    let updated = svc
        .update("alice", created.id, &draft(dec!(10.00), "dining", created.expense_date))
        .await
        .unwrap();
    assert_eq!(updated.category, "dining");
    assert_eq!(updated.owner, "alice");
    assert_eq!(updated.id, created.id);

    let expected = format!("alice updated expense {}", created.id);
    assert!(
        backend
            .audit_entries()
            .iter()
            .any(|(actor, message)| actor == "alice" && message == &expected)
    );
}

#[tokio::test]
async fn delete_logs_before_removing() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    let created = svc
        .create("alice", &draft(dec!(10.00), "food", dt(2024, 1, 5, 12, 0, 0)))
        .await
        .unwrap();

    svc.delete("alice", created.id).await.unwrap();

    let gone = svc.get(created.id).await;
    assert!(matches!(gone, Err(ExpenseError::ExpenseNotFound(_))));

    let expected = format!("alice deleted expense {}", created.id);
    assert!(
        backend
            .audit_entries()
            .iter()
            .any(|(actor, message)| actor == "alice" && message == &expected)
    );
}

#[tokio::test]
async fn delete_of_missing_id_writes_no_audit_entry() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    let result = svc.delete("alice", Uuid::new_v4()).await;
    assert!(matches!(result, Err(ExpenseError::ExpenseNotFound(_))));
    assert!(backend.audit_entries().is_empty());
}

#[tokio::test]
async fn update_of_missing_id_is_expense_not_found() {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_user("alice");
    let svc = service(&backend);

    let result = svc
        .update(
            "alice",
            Uuid::new_v4(),
            &draft(dec!(1.00), "misc", dt(2024, 1, 1, 0, 0, 0)),
        )
        .await;
    assert!(matches!(result, Err(ExpenseError::ExpenseNotFound(_))));
    assert!(backend.audit_entries().is_empty());
}
