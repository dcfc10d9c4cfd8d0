//! Expense management routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::{AppState, middleware::AuthUser};
use kakeibo_core::expense::{ExpenseDraft, ExpenseError, ExpenseFilter, ExpenseRecord};
use kakeibo_shared::{PageRequest, PageResponse};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses))
        .route("/expenses", post(create_expense))
        .route("/expenses/count", get(count_expenses))
        .route("/expenses/categories", get(list_categories))
        .route("/expenses/{id}", get(get_expense))
        .route("/expenses/{id}", put(update_expense))
        .route("/expenses/{id}", delete(delete_expense))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing expenses.
#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    /// Restrict to one family member's expenses (`"all"` means no filter).
    pub user: Option<String>,
    /// Inclusive date range start (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Inclusive date range end (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Restrict to one category (`"all"` means no filter).
    pub category: Option<String>,
    /// Free-text search over description and category.
    pub search: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

impl ListExpensesQuery {
    fn filter(&self) -> ExpenseFilter {
        ExpenseFilter {
            user: self.user.clone(),
            start_date: self.from,
            end_date: self.to,
            category: self.category.clone(),
            search: self.search.clone(),
        }
    }

    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Request body for creating or updating an expense.
///
/// There is no owner field: the service stamps the owner from the
/// authenticated caller.
#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseRequest {
    /// Amount spent.
    pub amount: Decimal,
    /// Free-text category label.
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    /// Description of the expense.
    #[validate(length(max = 255))]
    pub description: String,
    /// When the expense occurred.
    pub date: NaiveDateTime,
}

impl ExpenseRequest {
    fn draft(&self) -> ExpenseDraft {
        ExpenseDraft {
            amount: self.amount,
            category: self.category.clone(),
            description: self.description.clone(),
            expense_date: self.date,
        }
    }
}

/// Response for a single expense.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
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
    pub date: NaiveDateTime,
}

impl From<ExpenseRecord> for ExpenseResponse {
    fn from(record: ExpenseRecord) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            amount: record.amount,
            category: record.category,
            description: record.description,
            date: record.expense_date,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/expenses` - List expenses visible to the caller, paginated.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> impl IntoResponse {
    let page_request = query.page_request();

    match state
        .expenses
        .page(auth.username(), query.filter(), &page_request)
        .await
    {
        Ok(page) => {
            let views: Vec<ExpenseResponse> =
                page.items.into_iter().map(ExpenseResponse::from).collect();
            (
                StatusCode::OK,
                Json(PageResponse::new(views, &page_request, page.total)),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list expenses");
            expense_error_response(&e)
        }
    }
}

/// GET `/expenses/count` - Total matching expenses without the payload.
async fn count_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListExpensesQuery>,
) -> impl IntoResponse {
    match state
        .expenses
        .total(auth.username(), query.filter(), &query.page_request())
        .await
    {
        Ok(total) => (StatusCode::OK, Json(json!({ "total": total }))).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to count expenses");
            expense_error_response(&e)
        }
    }
}

/// GET `/expenses/categories` - Distinct categories visible to the caller.
async fn list_categories(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    match state.expenses.categories(auth.username()).await {
        Ok(categories) => {
            (StatusCode::OK, Json(json!({ "categories": categories }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list categories");
            expense_error_response(&e)
        }
    }
}

/// POST `/expenses` - Create a new expense owned by the caller.
async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ExpenseRequest>,
) -> impl IntoResponse {
    if let Err(e) = payload.validate() {
        return validation_failed(&e);
    }

    match state.expenses.create(auth.username(), &payload.draft()).await {
        Ok(record) => {
            info!(expense_id = %record.id, owner = %record.owner, "Expense created");
            (StatusCode::CREATED, Json(ExpenseResponse::from(record))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create expense");
            expense_error_response(&e)
        }
    }
}

/// GET `/expenses/{id}` - Fetch one expense by id.
///
/// Plain retrieval is not scoped to the caller; any authenticated user may
/// fetch any expense by id.
async fn get_expense(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.expenses.get(id).await {
        Ok(record) => (StatusCode::OK, Json(ExpenseResponse::from(record))).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to get expense");
            expense_error_response(&e)
        }
    }
}

/// PUT `/expenses/{id}` - Update an expense the caller owns.
async fn update_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseRequest>,
) -> impl IntoResponse {
    if let Err(e) = payload.validate() {
        return validation_failed(&e);
    }

    match state
        .expenses
        .update(auth.username(), id, &payload.draft())
        .await
    {
        Ok(record) => {
            info!(expense_id = %record.id, "Expense updated");
            (StatusCode::OK, Json(ExpenseResponse::from(record))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to update expense");
            expense_error_response(&e)
        }
    }
}

/// DELETE `/expenses/{id}` - Delete an expense the caller owns.
async fn delete_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.expenses.delete(auth.username(), id).await {
        Ok(()) => {
            info!(expense_id = %id, "Expense deleted");
            (StatusCode::NO_CONTENT, ()).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to delete expense");
            expense_error_response(&e)
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn validation_failed(e: &validator::ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "validation_failed",
            "message": e.to_string()
        })),
    )
        .into_response()
}

fn expense_error_response(e: &ExpenseError) -> Response {
    match e {
        ExpenseError::UserNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "user_not_found",
                "message": "No stored user for the authenticated principal"
            })),
        )
            .into_response(),
        ExpenseError::ExpenseNotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "expense_not_found",
                "message": "Expense not found"
            })),
        )
            .into_response(),
        ExpenseError::PermissionDenied => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "permission_denied",
                "message": "You are not the owner of this expense"
            })),
        )
            .into_response(),
        ExpenseError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred"
            })),
        )
            .into_response(),
    }
}
