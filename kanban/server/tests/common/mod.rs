use chrono::{DateTime, TimeZone, Utc};
use kanban_server::clock::ManualClock;
use migration::MigratorTrait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

/// Test context shared by the integration tests.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<ManualClock>,
}

/// Instant the manual clock starts at in every test.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

/// Opens a fresh in-memory database with the schema applied.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    // Every pooled connection to sqlite::memory: is its own database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

pub async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = setup_db().await?;
    Ok(TestContext {
        db: Arc::new(db),
        clock: Arc::new(ManualClock::new(start_time())),
    })
}
