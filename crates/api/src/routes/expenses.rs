//! Expense routes.
//!
//! Id-addressed operations are scoped to the caller's own budget: a foreign
//! expense id gets a 404, never another user's data.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::CurrentUser};
use spendtrack_db::{
    ExpenseRepository,
    entities::expenses,
    repositories::expense::{CreateExpenseInput, ExpenseError, UpdateExpenseInput},
};

/// Creates the expense routes (session middleware applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(add_expense).get(list_expenses))
        .route(
            "/expenses/{id}",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating an expense.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseRequest {
    /// Amount in whole currency units.
    pub amount: i64,
    /// Day the expense occurred.
    pub date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Category.
    #[serde(rename = "type")]
    pub expense_type: String,
    /// Payment method.
    pub payment_method: String,
}

/// Request body for updating an expense.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseRequest {
    /// New amount.
    pub amount: Option<i64>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    #[serde(rename = "type")]
    pub expense_type: Option<String>,
    /// New payment method.
    pub payment_method: Option<String>,
}

/// Response for an expense.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResponse {
    /// Expense ID.
    pub id: Uuid,
    /// Amount.
    pub amount: i64,
    /// Date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// Category.
    #[serde(rename = "type")]
    pub expense_type: String,
    /// Payment method.
    pub payment_method: String,
}

impl From<expenses::Model> for ExpenseResponse {
    fn from(model: expenses::Model) -> Self {
        Self {
            id: model.id,
            amount: model.amount,
            date: model.date,
            description: model.description,
            expense_type: model.expense_type,
            payment_method: model.payment_method,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/api/expenses` - Book an expense against the caller's budget.
async fn add_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateExpenseRequest>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());

    let input = CreateExpenseInput {
        amount: payload.amount,
        date: payload.date,
        description: payload.description,
        expense_type: payload.expense_type,
        payment_method: payload.payment_method,
    };

    match repo.add_expense(user.id(), input).await {
        Ok(expense) => {
            info!(
                user_id = %user.id(),
                expense_id = %expense.id,
                amount = expense.amount,
                "Expense added"
            );

            (StatusCode::CREATED, Json(ExpenseResponse::from(expense))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to add expense");
            map_expense_error(&e)
        }
    }
}

/// GET `/api/expenses` - List the caller's expenses.
async fn list_expenses(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());

    match repo.list_expenses(user.id()).await {
        Ok(list) => {
            let response: Vec<ExpenseResponse> =
                list.into_iter().map(ExpenseResponse::from).collect();

            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list expenses");
            map_expense_error(&e)
        }
    }
}

/// GET `/api/expenses/{id}` - Get one of the caller's expenses.
async fn get_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());

    match repo.get_expense(user.id(), id).await {
        Ok(expense) => (StatusCode::OK, Json(ExpenseResponse::from(expense))).into_response(),
        Err(e @ ExpenseError::NotFound(_)) => map_expense_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to get expense");
            map_expense_error(&e)
        }
    }
}

/// PUT `/api/expenses/{id}` - Update one of the caller's expenses.
async fn update_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());

    let input = UpdateExpenseInput {
        amount: payload.amount,
        date: payload.date,
        description: payload.description,
        expense_type: payload.expense_type,
        payment_method: payload.payment_method,
    };

    match repo.update_expense(user.id(), id, input).await {
        Ok(expense) => {
            info!(user_id = %user.id(), expense_id = %expense.id, "Expense updated");

            (StatusCode::OK, Json(ExpenseResponse::from(expense))).into_response()
        }
        Err(e @ ExpenseError::NotFound(_)) => map_expense_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to update expense");
            map_expense_error(&e)
        }
    }
}

/// DELETE `/api/expenses/{id}` - Delete one of the caller's expenses.
async fn delete_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ExpenseRepository::new((*state.db).clone());

    match repo.delete_expense(user.id(), id).await {
        Ok(()) => {
            info!(user_id = %user.id(), expense_id = %id, "Expense deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ ExpenseError::NotFound(_)) => map_expense_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to delete expense");
            map_expense_error(&e)
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps expense errors to HTTP responses.
fn map_expense_error(e: &ExpenseError) -> axum::response::Response {
    match e {
        ExpenseError::NoBudget(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "error": "no_budget",
                "message": "Create a budget before adding expenses"
            })),
        )
            .into_response(),
        ExpenseError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": format!("Expense not found: {id}")
            })),
        )
            .into_response(),
        ExpenseError::NegativeAmount => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "negative_amount",
                "message": "Amount cannot be negative"
            })),
        )
            .into_response(),
        ExpenseError::Ledger(_) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "aggregate_invariant",
                "message": "The budget's spent total rejected this adjustment"
            })),
        )
            .into_response(),
        ExpenseError::ConcurrentModification(_) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "concurrent_modification",
                "message": "The budget was modified concurrently, please retry"
            })),
        )
            .into_response(),
        ExpenseError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred"
            })),
        )
            .into_response(),
    }
}
