//! Throwaway plan databases for integration tests.
//!
//! Tests share one PostgreSQL server per test binary: the one named by
//! `SKILLMAP_TEST_PG_URL` (a URL without a database path), or else a
//! container started on first use. Every test gets a fresh database on it
//! with migrations applied.

use std::time::Duration;

use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use skillmap_db::config::DbConfig;
use skillmap_db::pool;

/// Keeps the container, if any, alive for the life of the test binary.
struct Server {
    config: DbConfig,
    _container: Option<ContainerAsync<Postgres>>,
}

static SERVER: OnceCell<Server> = OnceCell::const_new();

async fn start_server() -> Server {
    let (base_url, container) = match std::env::var("SKILLMAP_TEST_PG_URL") {
        Ok(url) => (url, None),
        Err(_) => {
            let container = Postgres::default()
                .with_tag("16")
                .start()
                .await
                .expect("failed to start PostgreSQL container");
            let host = container.get_host().await.expect("container host");
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("container port");
            (
                format!("postgresql://postgres:postgres@{host}:{port}"),
                Some(container),
            )
        }
    };
    let config = DbConfig::new(format!("{}/postgres", base_url.trim_end_matches('/')))
        .with_acquire_timeout(Duration::from_secs(30));
    Server {
        config,
        _container: container,
    }
}

async fn server_config() -> &'static DbConfig {
    &SERVER.get_or_init(start_server).await.config
}

/// Create a migrated database and return a pool on it with its name.
///
/// Pass the name to [`drop_test_db`] once the pool is closed.
pub async fn create_test_db() -> (PgPool, String) {
    let server = server_config().await;
    let name = format!("skillmap_test_{}", Uuid::new_v4().simple());

    let maint = pool::create_pool(&server.maintenance())
        .await
        .expect("maintenance connection");
    pool::create_database(&maint, &name)
        .await
        .expect("create test database");
    maint.close().await;

    let db = pool::create_pool(&server.for_database(&name))
        .await
        .expect("connect to test database");
    pool::run_migrations(&db).await.expect("migrations");
    (db, name)
}

/// Drop a database made by [`create_test_db`]. Failures are ignored.
pub async fn drop_test_db(name: &str) {
    let server = server_config().await;
    if let Ok(maint) = pool::create_pool(&server.maintenance()).await {
        let _ = pool::drop_database(&maint, name).await;
        maint.close().await;
    }
}
