//! SQLite connection and schema runner.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteQueryResult, SqliteRow,
};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use super::table::Table;
use super::value::{bind_values, Value};
use crate::error::{StoreError, StoreResult};
use crate::persistence::traits::Record;

/// Schema scripts in the order they must be applied.
///
/// Each script only uses `IF NOT EXISTS` statements, so re-running the whole
/// list against an existing database is safe.
pub const SCHEMA_SCRIPTS: [(&str, &str); 3] = [
    (
        "schema_base",
        include_str!("../../../migrations/001_schema_base.sql"),
    ),
    (
        "schema_usuarios",
        include_str!("../../../migrations/002_schema_usuarios.sql"),
    ),
    (
        "schema_relatorios",
        include_str!("../../../migrations/003_schema_relatorios.sql"),
    ),
];

/// The single shared handle to the territory database.
///
/// The pool holds exactly one connection, so statements from every caller
/// run one after another on the same connection.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    ///
    /// The parent directory is created when missing. Call [`Database::setup`]
    /// afterwards to apply the schema and seed defaults.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(file_options(path))
            .await?;

        tracing::debug!(path = %path.display(), "database opened");
        Ok(Self {
            pool,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory database for testing. The schema is applied but
    /// nothing is seeded.
    #[cfg(test)]
    pub async fn new_in_memory() -> StoreResult<Self> {
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool, path: None };
        db.apply_schema().await?;
        Ok(db)
    }

    /// Apply every schema script, then seed sample data and the default
    /// administrator where their tables are empty.
    pub async fn setup(&self) -> StoreResult<()> {
        self.apply_schema().await?;
        super::seed::seed_defaults(self).await?;
        tracing::info!("database setup complete");
        Ok(())
    }

    /// Run the schema scripts in order, stopping at the first failure.
    pub async fn apply_schema(&self) -> StoreResult<()> {
        for (name, script) in SCHEMA_SCRIPTS {
            self.execute_script(script)
                .await
                .map_err(|e| StoreError::Script {
                    name,
                    message: e.to_string(),
                })?;
            tracing::debug!(script = name, "schema script applied");
        }
        Ok(())
    }

    /// Run one parameterized statement.
    ///
    /// Failures are logged with the statement and its parameters.
    pub async fn execute(&self, sql: &str, params: &[Value]) -> StoreResult<SqliteQueryResult> {
        bind_values(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, params, e))
    }

    /// Run the same statement once per parameter row, in one transaction.
    /// Returns the total number of affected rows.
    pub async fn execute_many(&self, sql: &str, rows: &[Vec<Value>]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut affected = 0;
        for params in rows {
            let result = bind_values(sqlx::query(sql), params)
                .execute(&mut *tx)
                .await
                .map_err(|e| statement_failed(sql, params, e))?;
            affected += result.rows_affected();
        }
        tx.commit().await?;
        Ok(affected)
    }

    /// Run a multi-statement script. Statements before a failing one stay
    /// applied.
    pub async fn execute_script(&self, script: &str) -> StoreResult<()> {
        sqlx::raw_sql(script)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "script failed");
                StoreError::from(e)
            })?;
        Ok(())
    }

    pub async fn fetch_all(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<SqliteRow>> {
        bind_values(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, params, e))
    }

    pub async fn fetch_optional(
        &self,
        sql: &str,
        params: &[Value],
    ) -> StoreResult<Option<SqliteRow>> {
        bind_values(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| statement_failed(sql, params, e))
    }

    /// First column of the first row as an integer. No row or NULL reads as 0.
    pub async fn fetch_scalar(&self, sql: &str, params: &[Value]) -> StoreResult<i64> {
        match self.fetch_optional(sql, params).await? {
            Some(row) => Ok(row.try_get::<Option<i64>, _>(0)?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Rebuild the database file, reclaiming free pages.
    pub async fn compact(&self) -> StoreResult<()> {
        self.execute_script("VACUUM").await
    }

    /// Repository for `R`.
    pub fn table<R: Record>(&self) -> Table<R> {
        Table::new(self.clone())
    }

    /// Location of the database file; `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Connection options for a database file.
///
/// The rollback journal keeps every committed change in the main file, which
/// file-copy backups rely on.
pub(crate) fn file_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .foreign_keys(true)
}

/// Log a failed statement with what was sent, then convert the error.
pub(crate) fn statement_failed(sql: &str, params: &[Value], e: sqlx::Error) -> StoreError {
    tracing::error!(error = %e, query = sql, params = ?params, "statement failed");
    StoreError::from(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::new_in_memory().await.unwrap();
        let one = db.fetch_scalar("SELECT 1", &[]).await.unwrap();
        assert_eq!(one, 1);
        assert!(db.path().is_none());
    }

    #[tokio::test]
    async fn test_schema_creates_tables() {
        let db = Database::new_in_memory().await.unwrap();
        let rows = db
            .fetch_all(
                "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                &[],
            )
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        for table in ["territorios", "imoveis", "usuarios", "sessoes", "relatorios"] {
            assert!(names.iter().any(|n| n == table), "missing {table}");
        }
    }

    #[tokio::test]
    async fn test_open_file_based_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("territorios.db");
        let db = Database::open(&db_path).await.unwrap();
        db.setup().await.unwrap();
        assert!(db_path.exists());
        assert_eq!(db.path(), Some(db_path.as_path()));
    }

    #[tokio::test]
    async fn test_failed_statement_is_an_error() {
        let db = Database::new_in_memory().await.unwrap();
        let err = db
            .execute("INSERT INTO no_such_table VALUES (?)", &[Value::Integer(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn test_execute_many_is_atomic() {
        let db = Database::new_in_memory().await.unwrap();
        let rows = vec![
            vec![Value::from("A")],
            vec![Value::Null],
            vec![Value::from("C")],
        ];
        let err = db
            .execute_many("INSERT INTO territorios (nome) VALUES (?)", &rows)
            .await;
        assert!(err.is_err());
        let count = db
            .fetch_scalar("SELECT COUNT(*) FROM territorios", &[])
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_setup_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("t.db")).await.unwrap();
        db.setup().await.unwrap();
        db.setup().await.unwrap();
        let territories = db
            .fetch_scalar("SELECT COUNT(*) FROM territorios", &[])
            .await
            .unwrap();
        assert_eq!(territories, 1);
        let admins = db
            .fetch_scalar("SELECT COUNT(*) FROM usuarios", &[])
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
