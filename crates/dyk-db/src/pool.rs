//! # SQLite Pool
//!
//! Opens the school database, applies the schema and hands out repositories
//! and order transactions.
//!
//! ```text
//! DbConfig::new(path) ──► Database::new ──► SqlitePool (WAL, foreign keys)
//!                                              │
//!                 ┌────────────────────────────┼──────────────────────────┐
//!                 ▼                            ▼                          ▼
//!        db.invoices().get_by_id     db.begin() ─► one order     db.settings().get
//!        (checkout per call)         (BEGIN IMMEDIATE … COMMIT)
//! ```
//!
//! Orders write concurrently from several connections. Every transaction
//! from [`Database::begin`] takes SQLite's write lock at `BEGIN`, so writers
//! queue on `busy_timeout`; one that still cannot get the lock fails with
//! [`DbError::Busy`], which callers treat as retryable.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::booking::BookingRepository;
use crate::repository::course::CourseRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::equipment::EquipmentRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::sequence::SequenceRepository;
use crate::repository::settings::SettingsRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings. Built with [`DbConfig::new`] and adjusted through the
/// chained setters.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/dyk/dyk.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database file, created on first open. `:memory:` for a scratch database.
    pub database_path: PathBuf,

    pub max_connections: u32,
    pub min_connections: u32,

    /// How long `begin()` and repository calls wait for a free connection.
    pub connect_timeout: Duration,

    /// Unused connections above `min_connections` are closed after this.
    pub idle_timeout: Duration,

    /// How long a writer waits on SQLite's lock before `DbError::Busy`.
    pub busy_timeout: Duration,

    /// Apply pending migrations inside [`Database::new`].
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private scratch database, used throughout the test suites.
    ///
    /// Each SQLite connection to `:memory:` sees its own database, so the
    /// pool is pinned to a single connection. Concurrent transactions queue
    /// on that connection instead of racing.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    /// Per-connection pragmas. NORMAL sync under WAL can lose the last
    /// commit on power loss but never corrupts the file.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true);

        Ok(options)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Cheap-to-clone handle over the pool.
///
/// Standalone reads go through the repository accessors. Work that has to
/// land atomically goes through [`Database::begin`] and the repositories'
/// connection-taking functions:
///
/// ```rust,ignore
/// let mut tx = db.begin().await?;
/// let number = SequenceRepository::next(&mut *tx).await?;
/// InvoiceRepository::insert(&mut *tx, &invoice, &items).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, migrates the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.is_in_memory(),
            "Opening database"
        );

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Pool ready"
        );

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. A no-op once the schema is current.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a write transaction with `BEGIN IMMEDIATE`.
    ///
    /// The write lock is taken up front, so a transaction that reads before
    /// it writes never has to upgrade. Competing writers wait up to
    /// `busy_timeout` for the lock instead of failing on the upgrade with
    /// `SQLITE_BUSY`.
    ///
    /// Dropping the returned transaction without calling `commit` rolls it
    /// back, which is also what happens when a caller's future is cancelled.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| match DbError::from(e) {
                busy @ DbError::Busy(_) => busy,
                other => DbError::TransactionFailed(other.to_string()),
            })
    }

    pub fn courses(&self) -> CourseRepository {
        CourseRepository::new(self.pool.clone())
    }

    pub fn equipment(&self) -> EquipmentRepository {
        EquipmentRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn bookings(&self) -> BookingRepository {
        BookingRepository::new(self.pool.clone())
    }

    /// ```rust,ignore
    /// let invoice = db.invoices().get_by_number("DYK-2026-0001").await?;
    /// ```
    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.pool.clone())
    }

    pub fn sequence(&self) -> SequenceRepository {
        SequenceRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections to return, then closes the pool.
    /// Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// `true` when a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
