//! Domain records, filters, and filter normalization.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel filter value meaning "no filter".
///
/// Clients send `"all"` for the user filter and the category filter when
/// they want an unrestricted listing; it is normalized to an absent filter
/// before any query runs.
pub const FILTER_ALL: &str = "all";

/// A stored user, as resolved from the authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User ID.
    pub id: Uuid,
    /// Unique username; expense ownership is compared on this.
    pub username: String,
    /// Display name shown in the UI.
    pub display_name: String,
}

/// A family grouping of users sharing expense visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRecord {
    /// Family ID.
    pub id: Uuid,
    /// Family name.
    pub name: String,
}

/// A stored expense.
///
/// The owner never changes after creation; updates merge the mutable
/// fields only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Expense ID.
    pub id: Uuid,
    /// Username of the owning user.
    pub owner: String,
    /// Amount spent.
    pub amount: Decimal,
    /// Free-text category label.
    pub category: String,
    /// Description of the expense.
    pub description: String,
    /// When the expense occurred.
    pub expense_date: NaiveDateTime,
}

impl ExpenseRecord {
    /// Merges the mutable fields of a draft onto this record.
    ///
    /// Id and owner are untouched by the merge.
    pub fn apply(&mut self, draft: &ExpenseDraft) {
        self.amount = draft.amount;
        self.category.clone_from(&draft.category);
        self.description.clone_from(&draft.description);
        self.expense_date = draft.expense_date;
    }
}

/// Client-supplied expense fields for create and update.
///
/// There is deliberately no owner field: the service stamps the owner from
/// the resolved current user on create and leaves it untouched on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    /// Amount spent.
    pub amount: Decimal,
    /// Free-text category label.
    pub category: String,
    /// Description of the expense.
    pub description: String,
    /// When the expense occurred.
    pub expense_date: NaiveDateTime,
}

/// Raw listing filters as received from the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Restrict to one family member's expenses (`"all"` means no filter).
    pub user: Option<String>,
    /// Inclusive lower calendar-date bound.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper calendar-date bound.
    pub end_date: Option<NaiveDate>,
    /// Restrict to one category (`"all"` means no filter).
    pub category: Option<String>,
    /// Free-text search over description and category.
    pub search: Option<String>,
}

impl ExpenseFilter {
    /// Normalizes the filter into query bounds.
    ///
    /// Sentinel `"all"` values become absent filters. `start_date` becomes
    /// an inclusive lower timestamp bound at 00:00:00 and `end_date` an
    /// inclusive upper bound at 23:59:59, so an expense dated any time of
    /// day on `end_date` is included.
    #[must_use]
    pub fn normalize(self) -> ExpenseQuery {
        ExpenseQuery {
            member: self.user.filter(|u| u != FILTER_ALL),
            from: self.start_date.map(start_of_day),
            to: self.end_date.map(end_of_day),
            category: self.category.filter(|c| c != FILTER_ALL),
            search: self.search,
        }
    }
}

/// Normalized query bounds handed to the expense store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseQuery {
    /// Restrict to one family member's expenses. Only meaningful for
    /// family-scoped queries; individual scope ignores it.
    pub member: Option<String>,
    /// Inclusive lower timestamp bound.
    pub from: Option<NaiveDateTime>,
    /// Inclusive upper timestamp bound.
    pub to: Option<NaiveDateTime>,
    /// Restrict to one category.
    pub category: Option<String>,
    /// Free-text search over description and category.
    pub search: Option<String>,
}

/// A bounded slice of query results plus total-count metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpensePage {
    /// Items on this page, in store order.
    pub items: Vec<ExpenseRecord>,
    /// Total number of matching expenses across all pages.
    pub total: u64,
}

/// Returns the first instant of the given calendar date.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Returns the last whole second (23:59:59) of the given calendar date.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::seconds(86_399)
}
