use std::time::Duration;

use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/tally-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Application tables, in dependency order (parents first).
pub const TABLES: [&str; 8] = [
    "customers",
    "partners",
    "service_plans",
    "plan_milestones",
    "plan_kpis",
    "plan_assignments",
    "contracts",
    "erp_connections",
];

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

async fn connect(config: &DbConfig, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.redacted()))
}

/// Create the application connection pool.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    connect(config, 10).await
}

/// Single-connection pool on the server's `postgres` database, for
/// `CREATE DATABASE` / `DROP DATABASE`.
pub async fn connect_maintenance(config: &DbConfig) -> Result<PgPool> {
    connect(&DbConfig::new(config.maintenance_url()), 1).await
}

/// Apply every pending migration.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!(known = MIGRATOR.iter().count(), "schema up to date");
    Ok(())
}

/// `CREATE DATABASE` takes no bind parameters, so names are restricted to
/// `[A-Za-z0-9_]`.
fn check_identifier(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("database name {name:?} must be non-empty and use only letters, digits, and underscores");
    }
    Ok(())
}

/// Issue `CREATE DATABASE name` on a maintenance connection.
pub async fn create_database(maint: &PgPool, name: &str) -> Result<()> {
    check_identifier(name)?;
    maint
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .with_context(|| format!("failed to create database {name}"))?;
    Ok(())
}

/// Create the configured database unless it already exists.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let name = config
        .database_name()
        .context("could not determine database name from URL")?;

    let maint = connect_maintenance(config).await?;
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(name)
            .fetch_one(&maint)
            .await
            .context("failed to query pg_database")?;

    let result = if exists {
        info!(db = name, "database already exists");
        Ok(())
    } else {
        create_database(&maint, name).await.map(|()| {
            info!(db = name, "database created");
        })
    };
    maint.close().await;
    result
}

/// Row count of each application table, in [`TABLES`] order.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table.to_owned(), count));
    }
    Ok(counts)
}
