//! PostgreSQL persistence for tally: models, embedded migrations, pool
//! helpers, and per-table query functions.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;

/// `true` when the error chain bottoms out in a PostgreSQL unique-constraint
/// violation (e.g. a duplicate customer email).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}

/// `true` when the error chain bottoms out in a foreign-key violation
/// (e.g. a plan referencing a customer that does not exist).
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_foreign_key_violation())
    })
}
