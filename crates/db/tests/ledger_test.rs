//! Integration tests for the ledger engine repositories.
//!
//! Runs against in-memory SQLite so no infrastructure is required. The
//! schema mirrors the Postgres migration, minus dialect-specific defaults.

use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};
use uuid::Uuid;

use spendtrack_db::{
    BudgetRepository, ExpenseRepository, UserRepository,
    entities::{budgets, expenses},
    repositories::{
        budget::{BudgetError, CreateBudgetInput, UpdateBudgetInput},
        expense::{CreateExpenseInput, ExpenseError, UpdateExpenseInput},
    },
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id uuid PRIMARY KEY,
        username text NOT NULL UNIQUE,
        email text NOT NULL,
        password_hash text NOT NULL,
        created_at text NOT NULL,
        updated_at text NOT NULL
    )",
    "CREATE TABLE budgets (
        id uuid PRIMARY KEY,
        owner_id uuid NOT NULL UNIQUE REFERENCES users (id),
        start_date text NOT NULL,
        end_date text NOT NULL,
        amount bigint NOT NULL CHECK (amount >= 0),
        amount_used bigint NOT NULL DEFAULT 0 CHECK (amount_used >= 0),
        created_at text NOT NULL,
        updated_at text NOT NULL
    )",
    "CREATE TABLE expenses (
        id uuid PRIMARY KEY,
        budget_id uuid NOT NULL REFERENCES budgets (id) ON DELETE CASCADE,
        amount bigint NOT NULL CHECK (amount >= 0),
        date text NOT NULL,
        description text NOT NULL,
        expense_type text NOT NULL,
        payment_method text NOT NULL,
        created_at text NOT NULL,
        updated_at text NOT NULL
    )",
];

async fn setup_db() -> DatabaseConnection {
    // A single pooled connection keeps every handle on the same in-memory
    // database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    for statement in SCHEMA {
        db.execute_unprepared(statement)
            .await
            .expect("Failed to create schema");
    }

    db
}

async fn create_user(db: &DatabaseConnection, username: &str) -> Uuid {
    let users = UserRepository::new(db.clone());
    let user = users
        .create(username, &format!("{username}@example.com"), "$argon2id$test")
        .await
        .expect("Failed to create user");
    user.id
}

fn budget_input(amount: i64) -> CreateBudgetInput {
    CreateBudgetInput {
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        amount,
        amount_used: None,
    }
}

fn expense_input(amount: i64) -> CreateExpenseInput {
    CreateExpenseInput {
        amount,
        date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        description: "groceries".to_string(),
        expense_type: "food".to_string(),
        payment_method: "card".to_string(),
    }
}

/// Reads the stored aggregate and independently recomputes the expense sum.
async fn aggregate_and_sum(db: &DatabaseConnection, owner_id: Uuid) -> (i64, i64) {
    let budget = budgets::Entity::find()
        .filter(budgets::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .unwrap()
        .expect("budget should exist");

    let sum = expenses::Entity::find()
        .filter(expenses::Column::BudgetId.eq(budget.id))
        .all(db)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();

    (budget.amount_used, sum)
}

#[tokio::test]
async fn test_create_then_get_budget_starts_at_zero() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let repo = BudgetRepository::new(db.clone());

    let created = repo.create_budget(owner, budget_input(1000)).await.unwrap();
    assert_eq!(created.amount_used, 0);
    assert_eq!(created.amount, 1000);

    let fetched = repo.get_budget(owner).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.amount_used, 0);
}

#[tokio::test]
async fn test_create_budget_with_carried_over_aggregate() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let repo = BudgetRepository::new(db.clone());

    let input = CreateBudgetInput {
        amount_used: Some(250),
        ..budget_input(1000)
    };
    let created = repo.create_budget(owner, input).await.unwrap();
    assert_eq!(created.amount_used, 250);
}

#[tokio::test]
async fn test_second_create_is_rejected() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let repo = BudgetRepository::new(db.clone());

    let first = repo.create_budget(owner, budget_input(1000)).await.unwrap();
    let second = repo.create_budget(owner, budget_input(2000)).await;
    assert!(matches!(second, Err(BudgetError::AlreadyExists(_))));

    // The original budget row survives untouched.
    let fetched = repo.get_budget(owner).await.unwrap();
    assert_eq!(fetched.id, first.id);
    assert_eq!(fetched.amount, 1000);
}

#[tokio::test]
async fn test_get_budget_for_unknown_owner_is_not_found() {
    let db = setup_db().await;
    let repo = BudgetRepository::new(db.clone());

    let result = repo.get_budget(Uuid::new_v4()).await;
    assert!(matches!(result, Err(BudgetError::NotFound(_))));
}

#[tokio::test]
async fn test_add_expense_requires_budget() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let repo = ExpenseRepository::new(db.clone());

    let result = repo.add_expense(owner, expense_input(50)).await;
    assert!(matches!(result, Err(ExpenseError::NoBudget(_))));
}

#[tokio::test]
async fn test_negative_amounts_are_rejected() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    assert!(matches!(
        budgets_repo.create_budget(owner, budget_input(-1)).await,
        Err(BudgetError::NegativeAmount)
    ));

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();

    assert!(matches!(
        expenses_repo.add_expense(owner, expense_input(-10)).await,
        Err(ExpenseError::NegativeAmount)
    ));

    let expense = expenses_repo.add_expense(owner, expense_input(10)).await.unwrap();
    let patch = UpdateExpenseInput {
        amount: Some(-5),
        ..UpdateExpenseInput::default()
    };
    assert!(matches!(
        expenses_repo.update_expense(owner, expense.id, patch).await,
        Err(ExpenseError::NegativeAmount)
    ));
}

#[tokio::test]
async fn test_aggregate_matches_sum_after_every_mutation() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();

    let first = expenses_repo.add_expense(owner, expense_input(150)).await.unwrap();
    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (150, 150));

    let second = expenses_repo.add_expense(owner, expense_input(50)).await.unwrap();
    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (200, 200));

    let patch = UpdateExpenseInput {
        amount: Some(100),
        ..UpdateExpenseInput::default()
    };
    expenses_repo
        .update_expense(owner, first.id, patch)
        .await
        .unwrap();
    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (150, 150));

    expenses_repo.delete_expense(owner, second.id).await.unwrap();
    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (100, 100));

    expenses_repo.delete_expense(owner, first.id).await.unwrap();
    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (0, 0));
}

#[tokio::test]
async fn test_update_delta_comes_from_stored_amount() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();
    let expense = expenses_repo.add_expense(owner, expense_input(150)).await.unwrap();

    let patch = UpdateExpenseInput {
        amount: Some(100),
        ..UpdateExpenseInput::default()
    };
    expenses_repo
        .update_expense(owner, expense.id, patch.clone())
        .await
        .unwrap();

    // Replaying the identical patch must be a no-op on the aggregate.
    expenses_repo
        .update_expense(owner, expense.id, patch)
        .await
        .unwrap();

    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (100, 100));
}

#[tokio::test]
async fn test_non_amount_update_leaves_aggregate_alone() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();
    let expense = expenses_repo.add_expense(owner, expense_input(150)).await.unwrap();

    let patch = UpdateExpenseInput {
        description: Some("dinner".to_string()),
        payment_method: Some("cash".to_string()),
        ..UpdateExpenseInput::default()
    };
    let updated = expenses_repo
        .update_expense(owner, expense.id, patch)
        .await
        .unwrap();

    assert_eq!(updated.description, "dinner");
    assert_eq!(updated.amount, 150);
    let (used, _) = aggregate_and_sum(&db, owner).await;
    assert_eq!(used, 150);
}

#[tokio::test]
async fn test_budget_update_cannot_touch_aggregate() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();
    expenses_repo.add_expense(owner, expense_input(150)).await.unwrap();

    let patch = UpdateBudgetInput {
        amount: Some(5000),
        start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        ..UpdateBudgetInput::default()
    };
    let updated = budgets_repo.update_budget(owner, patch).await.unwrap();

    assert_eq!(updated.amount, 5000);
    assert_eq!(updated.amount_used, 150);
}

#[tokio::test]
async fn test_delete_budget_cascades_to_expenses() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();
    for amount in [10, 20, 30] {
        expenses_repo.add_expense(owner, expense_input(amount)).await.unwrap();
    }

    budgets_repo.delete_budget(owner).await.unwrap();

    assert!(matches!(
        budgets_repo.get_budget(owner).await,
        Err(BudgetError::NotFound(_))
    ));
    assert!(expenses_repo.list_expenses(owner).await.unwrap().is_empty());

    let orphans = expenses::Entity::find().count(&db).await.unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_list_expenses_without_budget_is_empty() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let repo = ExpenseRepository::new(db.clone());

    assert!(repo.list_expenses(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expenses_are_scoped_to_their_owner() {
    let db = setup_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo.create_budget(alice, budget_input(1000)).await.unwrap();
    budgets_repo.create_budget(bob, budget_input(1000)).await.unwrap();
    let expense = expenses_repo.add_expense(alice, expense_input(150)).await.unwrap();

    // Bob cannot see or mutate Alice's expense; the id behaves as missing.
    assert!(matches!(
        expenses_repo.get_expense(bob, expense.id).await,
        Err(ExpenseError::NotFound(_))
    ));
    assert!(matches!(
        expenses_repo
            .update_expense(bob, expense.id, UpdateExpenseInput::default())
            .await,
        Err(ExpenseError::NotFound(_))
    ));
    assert!(matches!(
        expenses_repo.delete_expense(bob, expense.id).await,
        Err(ExpenseError::NotFound(_))
    ));

    // Alice's aggregate is untouched by the attempts.
    let (used, _) = aggregate_and_sum(&db, alice).await;
    assert_eq!(used, 150);
}

#[tokio::test]
async fn test_concurrent_adds_converge() {
    let db = setup_db().await;
    let owner = create_user(&db, "alice").await;
    let budgets_repo = BudgetRepository::new(db.clone());
    let expenses_repo = ExpenseRepository::new(db.clone());

    budgets_repo
        .create_budget(owner, budget_input(1000))
        .await
        .unwrap();

    let a = expenses_repo.clone();
    let b = expenses_repo.clone();
    let (first, second) = tokio::join!(
        a.add_expense(owner, expense_input(10)),
        b.add_expense(owner, expense_input(20)),
    );
    first.unwrap();
    second.unwrap();

    let (used, sum) = aggregate_and_sum(&db, owner).await;
    assert_eq!((used, sum), (30, 30));
}
