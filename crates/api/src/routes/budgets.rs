//! Budget routes.
//!
//! All routes operate implicitly on the caller's own budget; there is no
//! budget id in the path.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{AppState, middleware::CurrentUser};
use spendtrack_db::{
    BudgetRepository,
    entities::budgets,
    repositories::budget::{BudgetError, CreateBudgetInput, UpdateBudgetInput},
};

/// Creates the budget routes (session middleware applied by the caller).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/budgets",
        post(create_budget)
            .get(get_budget)
            .put(update_budget)
            .delete(delete_budget),
    )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a budget.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    /// First day of the budget window.
    pub start_date: NaiveDate,
    /// Last day of the budget window.
    pub end_date: NaiveDate,
    /// Target amount.
    pub amount: i64,
    /// Starting spent total, for carried-over budgets. Defaults to zero.
    #[serde(default)]
    pub amount_used: Option<i64>,
}

/// Request body for updating a budget.
///
/// Carries no `amountUsed`: the spent total is owned by expense mutations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetRequest {
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New end date.
    pub end_date: Option<NaiveDate>,
    /// New target amount.
    pub amount: Option<i64>,
}

/// Response for a budget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetResponse {
    /// Budget ID.
    pub id: Uuid,
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
    /// Target amount.
    pub amount: i64,
    /// Spent total.
    pub amount_used: i64,
}

impl From<budgets::Model> for BudgetResponse {
    fn from(model: budgets::Model) -> Self {
        Self {
            id: model.id,
            start_date: model.start_date,
            end_date: model.end_date,
            amount: model.amount,
            amount_used: model.amount_used,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/api/budgets` - Create the caller's budget.
async fn create_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateBudgetRequest>,
) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    let input = CreateBudgetInput {
        start_date: payload.start_date,
        end_date: payload.end_date,
        amount: payload.amount,
        amount_used: payload.amount_used,
    };

    match repo.create_budget(user.id(), input).await {
        Ok(budget) => {
            info!(
                user_id = %user.id(),
                budget_id = %budget.id,
                amount = budget.amount,
                "Budget created"
            );

            (StatusCode::CREATED, Json(BudgetResponse::from(budget))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create budget");
            map_budget_error(&e)
        }
    }
}

/// GET `/api/budgets` - Get the caller's budget.
async fn get_budget(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    match repo.get_budget(user.id()).await {
        Ok(budget) => (StatusCode::OK, Json(BudgetResponse::from(budget))).into_response(),
        Err(e @ BudgetError::NotFound(_)) => map_budget_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to get budget");
            map_budget_error(&e)
        }
    }
}

/// PUT `/api/budgets` - Update the caller's budget window or target.
async fn update_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<UpdateBudgetRequest>,
) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    let input = UpdateBudgetInput {
        start_date: payload.start_date,
        end_date: payload.end_date,
        amount: payload.amount,
    };

    match repo.update_budget(user.id(), input).await {
        Ok(budget) => {
            info!(user_id = %user.id(), budget_id = %budget.id, "Budget updated");

            (StatusCode::OK, Json(BudgetResponse::from(budget))).into_response()
        }
        Err(e @ BudgetError::NotFound(_)) => map_budget_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to update budget");
            map_budget_error(&e)
        }
    }
}

/// DELETE `/api/budgets` - Delete the caller's budget and its expenses.
async fn delete_budget(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    let repo = BudgetRepository::new((*state.db).clone());

    match repo.delete_budget(user.id()).await {
        Ok(()) => {
            info!(user_id = %user.id(), "Budget deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e @ BudgetError::NotFound(_)) => map_budget_error(&e),
        Err(e) => {
            error!(error = %e, "Failed to delete budget");
            map_budget_error(&e)
        }
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Maps budget errors to HTTP responses.
fn map_budget_error(e: &BudgetError) -> axum::response::Response {
    match e {
        BudgetError::AlreadyExists(_) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "budget_exists",
                "message": "A budget already exists for this user"
            })),
        )
            .into_response(),
        BudgetError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "not_found",
                "message": "No budget found for this user"
            })),
        )
            .into_response(),
        BudgetError::NegativeAmount => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "negative_amount",
                "message": "Amount cannot be negative"
            })),
        )
            .into_response(),
        BudgetError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "internal_error",
                "message": "An error occurred"
            })),
        )
            .into_response(),
    }
}
