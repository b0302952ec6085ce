//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod budget;
pub mod expense;
pub mod user;

pub use budget::{BudgetError, BudgetRepository, CreateBudgetInput, UpdateBudgetInput};
pub use expense::{CreateExpenseInput, ExpenseError, ExpenseRepository, UpdateExpenseInput};
pub use user::UserRepository;
