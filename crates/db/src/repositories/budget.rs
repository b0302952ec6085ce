//! Budget repository: the budget half of the ledger engine.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::prelude::Date;
use uuid::Uuid;

use crate::entities::{budgets, expenses};

/// Error types for budget operations.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// The owner already has a budget.
    #[error("owner {0} already has a budget")]
    AlreadyExists(Uuid),

    /// The owner has no budget.
    #[error("no budget for owner {0}")]
    NotFound(Uuid),

    /// Amount cannot be negative.
    #[error("amount cannot be negative")]
    NegativeAmount,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetInput {
    /// First day of the budget window (inclusive).
    pub start_date: Date,
    /// Last day of the budget window (inclusive).
    pub end_date: Date,
    /// Target amount.
    pub amount: i64,
    /// Starting spent aggregate; zero unless explicitly carried over.
    pub amount_used: Option<i64>,
}

/// Input for updating a budget.
///
/// Deliberately has no spent-aggregate field: that value is owned by expense
/// mutations and this path cannot touch it.
#[derive(Debug, Clone, Default)]
pub struct UpdateBudgetInput {
    /// New start date.
    pub start_date: Option<Date>,
    /// New end date.
    pub end_date: Option<Date>,
    /// New target amount.
    pub amount: Option<i64>,
}

/// Budget repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    db: DatabaseConnection,
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates the owner's budget.
    ///
    /// A second create for the same owner is rejected; the unique constraint
    /// on `owner_id` backstops the check under races.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The owner already has a budget
    /// - An amount is negative
    /// - Database operation fails
    pub async fn create_budget(
        &self,
        owner_id: Uuid,
        input: CreateBudgetInput,
    ) -> Result<budgets::Model, BudgetError> {
        if input.amount < 0 || input.amount_used.unwrap_or(0) < 0 {
            return Err(BudgetError::NegativeAmount);
        }

        let existing = budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?;

        if existing.is_some() {
            return Err(BudgetError::AlreadyExists(owner_id));
        }

        let now = Utc::now().into();
        let budget = budgets::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            amount: Set(input.amount),
            amount_used: Set(input.amount_used.unwrap_or(0)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = budget.insert(&self.db).await?;
        Ok(result)
    }

    /// Gets the owner's budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner has no budget or the query fails.
    pub async fn get_budget(&self, owner_id: Uuid) -> Result<budgets::Model, BudgetError> {
        budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .one(&self.db)
            .await?
            .ok_or(BudgetError::NotFound(owner_id))
    }

    /// Updates the window dates and target amount of the owner's budget.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The owner has no budget
    /// - The new amount is negative
    /// - Database operation fails
    pub async fn update_budget(
        &self,
        owner_id: Uuid,
        input: UpdateBudgetInput,
    ) -> Result<budgets::Model, BudgetError> {
        if input.amount.is_some_and(|a| a < 0) {
            return Err(BudgetError::NegativeAmount);
        }

        let budget = self.get_budget(owner_id).await?;

        let mut active: budgets::ActiveModel = budget.into();

        if let Some(start_date) = input.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(end_date) = input.end_date {
            active.end_date = Set(end_date);
        }
        if let Some(amount) = input.amount {
            active.amount = Set(amount);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Deletes the owner's budget and every expense under it, as one unit.
    ///
    /// The explicit expense delete and the budget delete share a database
    /// transaction; the store's `ON DELETE CASCADE` is a second line of
    /// defense, not the mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if the owner has no budget or the transaction fails.
    pub async fn delete_budget(&self, owner_id: Uuid) -> Result<(), BudgetError> {
        let txn = self.db.begin().await?;

        let budget = budgets::Entity::find()
            .filter(budgets::Column::OwnerId.eq(owner_id))
            .one(&txn)
            .await?
            .ok_or(BudgetError::NotFound(owner_id))?;

        expenses::Entity::delete_many()
            .filter(expenses::Column::BudgetId.eq(budget.id))
            .exec(&txn)
            .await?;

        budgets::Entity::delete_by_id(budget.id).exec(&txn).await?;

        txn.commit().await?;
        Ok(())
    }
}
