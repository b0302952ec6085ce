//! Expense repository: the expense half of the ledger engine.
//!
//! Every mutation here adjusts the parent budget's `amount_used` and writes
//! the expense row inside one database transaction. The aggregate write is a
//! compare-and-swap against the value observed at the start of the attempt,
//! so concurrent mutations on the same budget serialize instead of losing
//! updates; a lost race rolls back and retries from a fresh read.

use chrono::Utc;
use sea_orm::prelude::Date;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use spendtrack_core::ledger::{self, LedgerError};

use crate::entities::{budgets, expenses};

/// Attempts before a contended aggregate update is surfaced to the caller.
const CAS_ATTEMPTS: usize = 5;

/// Error types for expense operations.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    /// The owner has no budget to book expenses against.
    #[error("owner {0} has no budget")]
    NoBudget(Uuid),

    /// Expense not found under the caller's budget.
    #[error("expense not found: {0}")]
    NotFound(Uuid),

    /// Amount cannot be negative.
    #[error("amount cannot be negative")]
    NegativeAmount,

    /// The aggregate adjustment was rejected (overflow or a negative
    /// result). Signals stored-state corruption rather than caller error.
    #[error("aggregate adjustment rejected: {0}")]
    Ledger(#[from] LedgerError),

    /// Concurrent mutations kept invalidating the observed aggregate.
    #[error("concurrent modification of budget {0}, please retry")]
    ConcurrentModification(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseInput {
    /// Amount in whole currency units.
    pub amount: i64,
    /// Day the expense occurred.
    pub date: Date,
    /// Free-text description.
    pub description: String,
    /// Category.
    pub expense_type: String,
    /// Payment method.
    pub payment_method: String,
}

/// Input for updating an expense. Unset fields keep their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    /// New amount.
    pub amount: Option<i64>,
    /// New date.
    pub date: Option<Date>,
    /// New description.
    pub description: Option<String>,
    /// New category.
    pub expense_type: Option<String>,
    /// New payment method.
    pub payment_method: Option<String>,
}

/// Expense repository for CRUD operations.
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

    /// Books an expense against the owner's budget.
    ///
    /// Requires an existing budget; there is no auto-creation. The insert
    /// and the aggregate increment commit together.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The owner has no budget
    /// - The amount is negative
    /// - The aggregate adjustment is rejected
    /// - Database operation fails
    pub async fn add_expense(
        &self,
        owner_id: Uuid,
        input: CreateExpenseInput,
    ) -> Result<expenses::Model, ExpenseError> {
        if input.amount < 0 {
            return Err(ExpenseError::NegativeAmount);
        }

        let mut budget_id = None;
        for _ in 0..CAS_ATTEMPTS {
            let txn = self.db.begin().await?;

            let budget = budgets::Entity::find()
                .filter(budgets::Column::OwnerId.eq(owner_id))
                .one(&txn)
                .await?
                .ok_or(ExpenseError::NoBudget(owner_id))?;
            budget_id = Some(budget.id);

            let new_used = ledger::apply_delta(budget.amount_used, input.amount)?;
            if !swap_amount_used(&txn, &budget, new_used).await? {
                txn.rollback().await?;
                debug!(budget_id = %budget.id, "amount_used swap lost, retrying");
                continue;
            }

            let now = Utc::now().into();
            let expense = expenses::ActiveModel {
                id: Set(Uuid::new_v4()),
                budget_id: Set(budget.id),
                amount: Set(input.amount),
                date: Set(input.date),
                description: Set(input.description.clone()),
                expense_type: Set(input.expense_type.clone()),
                payment_method: Set(input.payment_method.clone()),
                created_at: Set(now),
                updated_at: Set(now),
            };
            let inserted = expense.insert(&txn).await?;

            txn.commit().await?;
            return Ok(inserted);
        }

        Err(ExpenseError::ConcurrentModification(
            budget_id.unwrap_or(owner_id),
        ))
    }

    /// Gets an expense by id, scoped to the caller's budget.
    ///
    /// A foreign expense id behaves exactly like a missing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is not under the caller's budget or
    /// the query fails.
    pub async fn get_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
    ) -> Result<expenses::Model, ExpenseError> {
        let (expense, _) = find_owned(&self.db, owner_id, expense_id).await?;
        Ok(expense)
    }

    /// Updates an expense, adjusting the parent aggregate by the delta
    /// between the *stored* amount and the new one.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The expense is not under the caller's budget
    /// - The new amount is negative
    /// - The aggregate adjustment is rejected
    /// - Database operation fails
    pub async fn update_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
        input: UpdateExpenseInput,
    ) -> Result<expenses::Model, ExpenseError> {
        if input.amount.is_some_and(|a| a < 0) {
            return Err(ExpenseError::NegativeAmount);
        }

        let mut budget_id = None;
        for _ in 0..CAS_ATTEMPTS {
            let txn = self.db.begin().await?;

            let (expense, budget) = find_owned(&txn, owner_id, expense_id).await?;
            budget_id = Some(budget.id);

            let new_amount = input.amount.unwrap_or(expense.amount);
            let delta = ledger::replacement_delta(expense.amount, new_amount)?;
            let new_used = ledger::apply_delta(budget.amount_used, delta)?;

            if !swap_amount_used(&txn, &budget, new_used).await? {
                txn.rollback().await?;
                debug!(budget_id = %budget.id, "amount_used swap lost, retrying");
                continue;
            }

            let mut active: expenses::ActiveModel = expense.into();
            active.amount = Set(new_amount);
            if let Some(date) = input.date {
                active.date = Set(date);
            }
            if let Some(ref description) = input.description {
                active.description = Set(description.clone());
            }
            if let Some(ref expense_type) = input.expense_type {
                active.expense_type = Set(expense_type.clone());
            }
            if let Some(ref payment_method) = input.payment_method {
                active.payment_method = Set(payment_method.clone());
            }
            active.updated_at = Set(Utc::now().into());
            let updated = active.update(&txn).await?;

            txn.commit().await?;
            return Ok(updated);
        }

        Err(ExpenseError::ConcurrentModification(
            budget_id.unwrap_or(owner_id),
        ))
    }

    /// Deletes an expense and decrements the parent aggregate, as one unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the expense is not under the caller's budget, the
    /// aggregate adjustment is rejected, or the transaction fails.
    pub async fn delete_expense(
        &self,
        owner_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), ExpenseError> {
        let mut budget_id = None;
        for _ in 0..CAS_ATTEMPTS {
            let txn = self.db.begin().await?;

            let (expense, budget) = find_owned(&txn, owner_id, expense_id).await?;
            budget_id = Some(budget.id);

            let new_used = ledger::apply_delta(budget.amount_used, -expense.amount)?;
            if !swap_amount_used(&txn, &budget, new_used).await? {
                txn.rollback().await?;
                debug!(budget_id = %budget.id, "amount_used swap lost, retrying");
                continue;
            }

            expenses::Entity::delete_by_id(expense.id).exec(&txn).await?;

            txn.commit().await?;
            return Ok(());
        }

        Err(ExpenseError::ConcurrentModification(
            budget_id.unwrap_or(owner_id),
        ))
    }

    /// Lists the expenses under the owner's budget, oldest first.
    ///
    /// A fresh query per call. An owner without a budget gets an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_expenses(&self, owner_id: Uuid) -> Result<Vec<expenses::Model>, ExpenseError> {
        let Some(budget) = budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?
        else {
            return Ok(Vec::new());
        };

        let list = expenses::Entity::find()
            .filter(expenses::Column::BudgetId.eq(budget.id))
            .order_by_asc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(list)
    }
}

/// Loads an expense together with its budget, verifying the budget belongs
/// to the caller.
async fn find_owned<C: ConnectionTrait>(
    conn: &C,
    owner_id: Uuid,
    expense_id: Uuid,
) -> Result<(expenses::Model, budgets::Model), ExpenseError> {
    let found = expenses::Entity::find_by_id(expense_id)
        .find_also_related(budgets::Entity)
        .one(conn)
        .await?;

    match found {
        Some((expense, Some(budget))) if budget.owner_id == owner_id => Ok((expense, budget)),
        _ => Err(ExpenseError::NotFound(expense_id)),
    }
}

/// Conditionally writes the aggregate: succeeds only when `amount_used`
/// still holds the value the caller observed.
async fn swap_amount_used<C: ConnectionTrait>(
    conn: &C,
    budget: &budgets::Model,
    new_used: i64,
) -> Result<bool, DbErr> {
    let result = budgets::Entity::update_many()
        .col_expr(
            budgets::Column::AmountUsed,
            sea_orm::sea_query::Expr::value(new_used),
        )
        .col_expr(
            budgets::Column::UpdatedAt,
            sea_orm::sea_query::Expr::value(Utc::now()),
        )
        .filter(budgets::Column::Id.eq(budget.id))
        .filter(budgets::Column::AmountUsed.eq(budget.amount_used))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}
