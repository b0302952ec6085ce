//! `SeaORM` entity definitions.

pub mod budgets;
pub mod expenses;
pub mod users;
