//! Record sources for extraction passes.
//!
//! The reader only needs an ordered supply of [`SubSnpRow`]s, either from
//! one server-side cursor or from repeated keyset page queries. The
//! PostgreSQL implementation keeps one connection for the whole pass inside
//! a read-only repeatable-read transaction, so pages see a single snapshot.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, FromRow, Postgres, Transaction};
use tracing::debug;

use crate::error::{ImportError, SourceError};
use crate::mapper::SubSnpRow;
use crate::query::{BindValue, SubSnpQuery, ToSql};

/// SQLSTATE `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

const CURSOR_NAME: &str = "subsnp_cursor";

/// An ordered supply of raw extraction rows.
///
/// A source serves one pass. `close` is called exactly once by the reader,
/// on every exit path.
#[async_trait]
pub trait RowSource: Send {
    /// Start a cursor over a batch-scoped query.
    async fn declare_cursor(&mut self, query: &SubSnpQuery) -> Result<(), SourceError>;

    /// Next rows from the cursor, at most `max_rows`. Empty once exhausted.
    async fn fetch_cursor(&mut self, max_rows: usize) -> Result<Vec<SubSnpRow>, SourceError>;

    /// Run one page-scoped query to completion.
    async fn fetch_page(&mut self, query: &SubSnpQuery) -> Result<Vec<SubSnpRow>, SourceError>;

    /// Release the cursor and the connection.
    async fn close(&mut self) -> Result<(), SourceError>;
}

/// A connection pool to a dbSNP mirror.
#[derive(Clone)]
pub struct DbsnpDb {
    pool: PgPool,
}

impl DbsnpDb {
    /// Connect to a database using a connection URL.
    ///
    /// ```rust,ignore
    /// let db = DbsnpDb::connect("postgres://dbsnp@localhost/dbsnp_chicken", 2).await?;
    /// ```
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ImportError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(ImportError::Source)?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A fresh source for one extraction pass.
    pub fn source(&self) -> PgRowSource {
        PgRowSource {
            pool: self.pool.clone(),
            tx: None,
        }
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// [`RowSource`] over a PostgreSQL dbSNP mirror.
///
/// The connection is taken from the pool on first use and returned on
/// `close`. Dropping the source without closing it rolls the transaction back.
pub struct PgRowSource {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgRowSource {
    async fn transaction(&mut self) -> Result<&mut Transaction<'static, Postgres>, SourceError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                let mut tx = self.pool.begin().await.map_err(classify)?;
                (&mut *tx)
                    .execute("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
                    .await
                    .map_err(classify)?;
                tx
            }
        };
        Ok(self.tx.insert(tx))
    }
}

#[async_trait]
impl RowSource for PgRowSource {
    async fn declare_cursor(&mut self, query: &SubSnpQuery) -> Result<(), SourceError> {
        let declare_sql = format!("DECLARE {} NO SCROLL CURSOR FOR {}", CURSOR_NAME, query.to_sql());
        let mut declare = sqlx::query(&declare_sql);
        for bind in query.binds() {
            declare = match bind {
                BindValue::Null => declare.bind(Option::<i64>::None),
                BindValue::Int(v) => declare.bind(v),
                BindValue::Text(v) => declare.bind(v),
                BindValue::TextArray(v) => declare.bind(v),
            };
        }

        let tx = self.transaction().await?;
        declare.execute(&mut **tx).await.map_err(classify)?;
        debug!(build = query.build, "Declared {}", CURSOR_NAME);
        Ok(())
    }

    async fn fetch_cursor(&mut self, max_rows: usize) -> Result<Vec<SubSnpRow>, SourceError> {
        let fetch_sql = format!("FETCH {} FROM {}", max_rows, CURSOR_NAME);
        let tx = self.transaction().await?;
        let rows: Vec<PgRow> = (&mut **tx)
            .fetch_all(fetch_sql.as_str())
            .await
            .map_err(classify)?;

        rows.iter()
            .map(|row| SubSnpRow::from_row(row).map_err(classify))
            .collect()
    }

    async fn fetch_page(&mut self, query: &SubSnpQuery) -> Result<Vec<SubSnpRow>, SourceError> {
        let sql = query.to_sql();
        let mut page = sqlx::query_as::<_, SubSnpRow>(&sql);
        for bind in query.binds() {
            page = match bind {
                BindValue::Null => page.bind(Option::<i64>::None),
                BindValue::Int(v) => page.bind(v),
                BindValue::Text(v) => page.bind(v),
                BindValue::TextArray(v) => page.bind(v),
            };
        }

        let tx = self.transaction().await?;
        page.fetch_all(&mut **tx).await.map_err(classify)
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        // Rolling back also closes the cursor.
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(classify),
            None => Ok(()),
        }
    }
}

/// Separate a missing relation from every other database failure.
fn classify(err: sqlx::Error) -> SourceError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNDEFINED_TABLE) {
            return SourceError::MissingRelation(db.message().to_string());
        }
    }
    SourceError::Database(err)
}
