use anyhow::{Context, Result, bail};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/skillmap-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const PLAN_TABLES: [&str; 2] = ["skill_maps", "skill_programs"];

pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.database_url))
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    info!("migrations applied");
    Ok(())
}

// ---------------------------------------------------------------------------
// Database lifecycle (run against the maintenance database)
// ---------------------------------------------------------------------------

/// `CREATE DATABASE` and `DROP DATABASE` take no bind parameters, so names
/// are restricted to plain identifiers before being spliced in.
fn checked_identifier(name: &str) -> Result<&str> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("database name {name:?} is not a plain identifier");
    }
    Ok(name)
}

pub async fn database_exists(maint: &PgPool, name: &str) -> Result<bool> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(name)
        .fetch_one(maint)
        .await
        .context("failed to query pg_database")
}

pub async fn create_database(maint: &PgPool, name: &str) -> Result<()> {
    let name = checked_identifier(name)?;
    maint
        .execute(format!("CREATE DATABASE {name}").as_str())
        .await
        .with_context(|| format!("failed to create database {name}"))?;
    info!(db = name, "database created");
    Ok(())
}

/// Disconnect remaining sessions and drop the database. A missing database
/// is not an error.
pub async fn drop_database(maint: &PgPool, name: &str) -> Result<()> {
    let name = checked_identifier(name)?;
    sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(name)
    .execute(maint)
    .await
    .with_context(|| format!("failed to disconnect sessions from {name}"))?;
    maint
        .execute(format!("DROP DATABASE IF EXISTS {name}").as_str())
        .await
        .with_context(|| format!("failed to drop database {name}"))?;
    Ok(())
}

/// Create the configured database unless it is already there. Used by
/// `skillmap db-init`.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let name = config
        .database_name()
        .with_context(|| format!("no database name in {}", config.database_url))?;

    let maint = create_pool(&config.maintenance()).await?;
    let result = match database_exists(&maint, name).await {
        Ok(true) => {
            info!(db = name, "database already exists");
            Ok(())
        }
        Ok(false) => create_database(&maint, name).await,
        Err(e) => Err(e),
    };
    maint.close().await;
    result
}

/// Return the row count of each plan table, for the `db-init` summary.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(String, i64)>> {
    let mut counts = Vec::with_capacity(PLAN_TABLES.len());
    for table in PLAN_TABLES {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table.to_owned(), count));
    }
    Ok(counts)
}
