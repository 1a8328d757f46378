//! Database Module
//!
//! SQLite connection pool, embedded migrations and the [`RecordStore`] seam
//! every service component talks to.

pub mod repository;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use shared::error::AppError;
use shared::models::{Book, BookUpdate, Order, Payment, Role, User};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub use repository::payment::{NewPayment, RecordOutcome};
pub use repository::{RepoError, RepoResult};

/// Database service, owns a SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (or create) the database file with WAL and apply migrations.
    ///
    /// `busy_timeout` bounds both lock waits inside SQLite and pool acquisition.
    pub async fn new(
        db_path: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, AppError> {
        if let Some(parent) = std::path::Path::new(db_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::database(format!("Failed to create database directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(busy_timeout)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        tracing::info!(
            path = db_path,
            busy_timeout_ms = busy_timeout.as_millis() as u64,
            "Database connection established (SQLite WAL)"
        );

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }
}

/// Persistent state behind every component.
///
/// Emails passed in are already normalised by the caller.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn ping(&self) -> RepoResult<()>;

    // ── Users ──
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    /// [`RepoError::Duplicate`] when the email is taken
    async fn insert_user(&self, user: &User) -> RepoResult<()>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn update_user_role(&self, id: i64, role: Role) -> RepoResult<User>;

    // ── Books ──
    async fn find_book(&self, id: i64) -> RepoResult<Option<Book>>;
    async fn insert_book(&self, book: &Book) -> RepoResult<()>;
    async fn list_books(&self) -> RepoResult<Vec<Book>>;
    async fn list_books_by_owner(&self, owner_email: &str) -> RepoResult<Vec<Book>>;
    async fn update_book(&self, id: i64, data: &BookUpdate) -> RepoResult<Book>;
    async fn delete_book(&self, id: i64) -> RepoResult<bool>;

    // ── Orders ──
    async fn find_order(&self, id: i64) -> RepoResult<Option<Order>>;
    /// [`RepoError::Duplicate`] on a tracking id collision
    async fn insert_order(&self, order: &Order) -> RepoResult<()>;
    async fn update_order_status(&self, id: i64, status: &str) -> RepoResult<Order>;
    async fn list_orders_by_customer(&self, email: &str) -> RepoResult<Vec<Order>>;
    async fn list_orders_by_librarian(&self, email: &str) -> RepoResult<Vec<Order>>;

    // ── Payments ──
    async fn find_payment_by_transaction(&self, transaction_id: &str)
    -> RepoResult<Option<Payment>>;
    /// Newest first; `None` lists the whole ledger
    async fn list_payments(&self, customer_email: Option<&str>) -> RepoResult<Vec<Payment>>;
    /// Atomic order-paid update plus ledger append
    async fn record_payment(&self, payment: NewPayment) -> RepoResult<RecordOutcome>;
}

/// [`RecordStore`] backed by SQLite
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn open(
        db_path: &str,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self, AppError> {
        let db = DbService::new(db_path, max_connections, busy_timeout).await?;
        Ok(Self::new(db.pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        repository::user::find_by_email(&self.pool, email).await
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        repository::user::find_by_id(&self.pool, id).await
    }

    async fn insert_user(&self, user: &User) -> RepoResult<()> {
        repository::user::create(&self.pool, user).await
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        repository::user::find_all(&self.pool).await
    }

    async fn update_user_role(&self, id: i64, role: Role) -> RepoResult<User> {
        repository::user::update_role(&self.pool, id, role).await
    }

    async fn find_book(&self, id: i64) -> RepoResult<Option<Book>> {
        repository::book::find_by_id(&self.pool, id).await
    }

    async fn insert_book(&self, book: &Book) -> RepoResult<()> {
        repository::book::create(&self.pool, book).await
    }

    async fn list_books(&self) -> RepoResult<Vec<Book>> {
        repository::book::find_all(&self.pool).await
    }

    async fn list_books_by_owner(&self, owner_email: &str) -> RepoResult<Vec<Book>> {
        repository::book::find_by_owner(&self.pool, owner_email).await
    }

    async fn update_book(&self, id: i64, data: &BookUpdate) -> RepoResult<Book> {
        repository::book::update(&self.pool, id, data).await
    }

    async fn delete_book(&self, id: i64) -> RepoResult<bool> {
        repository::book::delete(&self.pool, id).await
    }

    async fn find_order(&self, id: i64) -> RepoResult<Option<Order>> {
        repository::order::find_by_id(&self.pool, id).await
    }

    async fn insert_order(&self, order: &Order) -> RepoResult<()> {
        repository::order::create(&self.pool, order).await
    }

    async fn update_order_status(&self, id: i64, status: &str) -> RepoResult<Order> {
        repository::order::update_status(&self.pool, id, status).await
    }

    async fn list_orders_by_customer(&self, email: &str) -> RepoResult<Vec<Order>> {
        repository::order::find_by_customer(&self.pool, email).await
    }

    async fn list_orders_by_librarian(&self, email: &str) -> RepoResult<Vec<Order>> {
        repository::order::find_by_librarian(&self.pool, email).await
    }

    async fn find_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> RepoResult<Option<Payment>> {
        repository::payment::find_by_transaction_id(&self.pool, transaction_id).await
    }

    async fn list_payments(&self, customer_email: Option<&str>) -> RepoResult<Vec<Payment>> {
        match customer_email {
            Some(email) => repository::payment::find_by_customer(&self.pool, email).await,
            None => repository::payment::find_all(&self.pool).await,
        }
    }

    async fn record_payment(&self, payment: NewPayment) -> RepoResult<RecordOutcome> {
        repository::payment::record(&self.pool, payment).await
    }
}
