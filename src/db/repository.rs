//! Repository handle shared by the HTTP layer and the sync workflow.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::errors::AppError;

/// Database repository for all data operations.
///
/// Component operations live next to their documents (`db::users`,
/// `db::teams`, ...) as `impl Repository` blocks.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check out a pooled connection for a sequence of single-document operations.
    pub async fn conn(&self) -> Result<PoolConnection<Sqlite>, AppError> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a write transaction spanning several documents.
    ///
    /// The write lock is taken at `BEGIN`, so reads made to check a guard
    /// (status still pending, code still free) cannot be invalidated by a
    /// concurrent writer before this transaction writes. A competing caller
    /// waits for the lock and then sees the committed state.
    pub async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }
}
