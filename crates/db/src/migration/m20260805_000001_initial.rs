//! Initial database migration.
//!
//! Creates the users, budgets, and expenses tables with the constraints the
//! ledger engine relies on: one budget per owner, a non-negative spent
//! aggregate, and cascading expense deletion.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(BUDGETS_SQL).await?;
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const USERS_SQL: &str = r"
CREATE TABLE users (
    id uuid PRIMARY KEY,
    username text NOT NULL UNIQUE,
    email text NOT NULL,
    password_hash text NOT NULL,
    created_at timestamptz NOT NULL DEFAULT now(),
    updated_at timestamptz NOT NULL DEFAULT now()
);
";

// owner_id UNIQUE is the store-level half of the one-budget-per-user rule;
// the repository check is the friendly-error half.
const BUDGETS_SQL: &str = r"
CREATE TABLE budgets (
    id uuid PRIMARY KEY,
    owner_id uuid NOT NULL UNIQUE REFERENCES users (id),
    start_date date NOT NULL,
    end_date date NOT NULL,
    amount bigint NOT NULL CHECK (amount >= 0),
    amount_used bigint NOT NULL DEFAULT 0 CHECK (amount_used >= 0),
    created_at timestamptz NOT NULL DEFAULT now(),
    updated_at timestamptz NOT NULL DEFAULT now()
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id uuid PRIMARY KEY,
    budget_id uuid NOT NULL REFERENCES budgets (id) ON DELETE CASCADE,
    amount bigint NOT NULL CHECK (amount >= 0),
    date date NOT NULL,
    description text NOT NULL,
    expense_type text NOT NULL,
    payment_method text NOT NULL,
    created_at timestamptz NOT NULL DEFAULT now(),
    updated_at timestamptz NOT NULL DEFAULT now()
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_expenses_budget_created ON expenses (budget_id, created_at);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS expenses;
DROP TABLE IF EXISTS budgets;
DROP TABLE IF EXISTS users;
";
