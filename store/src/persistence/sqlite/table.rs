//! Generic CRUD over any [`Record`].

use std::marker::PhantomData;

use super::database::{statement_failed, Database};
use super::value::{bind_values, Value};
use crate::error::{StoreError, StoreResult};
use crate::persistence::traits::{ListQuery, Record};

/// Repository for one record type, backed by the shared [`Database`].
pub struct Table<R> {
    db: Database,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Table<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Table<R> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _record: PhantomData,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn get_by_id(&self, id: i64) -> StoreResult<Option<R>> {
        let sql = format!("{} WHERE {} = ?", R::select_sql(), R::PRIMARY_KEY);
        self.fetch_optional(&sql, &[Value::Integer(id)]).await
    }

    /// Fetch every row matching `query`, fully materialized.
    pub async fn get_all(&self, query: &ListQuery) -> StoreResult<Vec<R>> {
        let mut sql = R::select_sql();
        let mut params = query.params.clone();
        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        if let Some(order) = query.order_by.as_deref().or(R::DEFAULT_ORDER) {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(limit));
        }
        self.fetch(&sql, &params).await
    }

    pub async fn count(&self, query: &ListQuery) -> StoreResult<i64> {
        let mut sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(filter);
        }
        self.db.fetch_scalar(&sql, &query.params).await
    }

    /// Validate, then INSERT (no id) or UPDATE (id set). Returns the id.
    ///
    /// Nothing is written when validation fails. An insert and the
    /// statements from [`Record::on_insert`] commit or fail together. An
    /// update blocked by [`Record::update_guard`] is a validation error.
    pub async fn save(&self, record: &mut R) -> StoreResult<i64> {
        let errors = record.validate();
        if !errors.is_empty() {
            tracing::debug!(entity = R::ENTITY, ?errors, "validation failed");
            return Err(StoreError::Validation(errors));
        }
        self.check_unique(record).await?;

        match record.id() {
            None => {
                let id = self.insert(record).await?;
                record.set_id(id);
                Ok(id)
            }
            Some(id) => {
                let guard = record.update_guard();
                let mut sql = update_sql::<R>();
                if let Some(guard) = &guard {
                    sql.push_str(&format!(" AND NOT ({})", guard.blocked_when));
                }
                let mut params = record.values();
                params.push(Value::Integer(id));
                let result = self.db.execute(&sql, &params).await?;
                if result.rows_affected() > 0 {
                    return Ok(id);
                }
                if let Some(guard) = guard {
                    if self.exists(id).await? {
                        tracing::debug!(entity = R::ENTITY, id, "update refused by guard");
                        return Err(StoreError::Validation(vec![guard.message]));
                    }
                }
                Err(StoreError::NotFound {
                    entity: R::ENTITY,
                    id,
                })
            }
        }
    }

    async fn insert(&self, record: &R) -> StoreResult<i64> {
        let sql = insert_sql::<R>();
        let params = record.values();

        let mut tx = self.db.pool().begin().await?;

        let result = bind_values(sqlx::query(&sql), &params)
            .execute(&mut *tx)
            .await
            .map_err(|e| statement_failed(&sql, &params, e))?;
        let id = result.last_insert_rowid();

        for statement in record.on_insert(id) {
            bind_values(sqlx::query(statement.sql), &statement.params)
                .execute(&mut *tx)
                .await
                .map_err(|e| statement_failed(statement.sql, &statement.params, e))?;
        }

        tx.commit().await?;
        Ok(id)
    }

    async fn exists(&self, id: i64) -> StoreResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} = ?",
            R::TABLE,
            R::PRIMARY_KEY
        );
        Ok(self.db.fetch_scalar(&sql, &[Value::Integer(id)]).await? > 0)
    }

    async fn check_unique(&self, record: &R) -> StoreResult<()> {
        let mut errors = Vec::new();
        for key in record.unique_keys() {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ? AND {} IS NOT ?",
                R::TABLE,
                key.column,
                R::PRIMARY_KEY
            );
            let taken = self
                .db
                .fetch_scalar(&sql, &[key.value, Value::from(record.id())])
                .await?;
            if taken > 0 {
                errors.push(key.message);
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(errors))
        }
    }

    /// Hard-delete the row with the record's id.
    pub async fn delete(&self, record: &R) -> StoreResult<()> {
        let id = record.id().ok_or(StoreError::MissingId { entity: R::ENTITY })?;
        self.delete_by_id(id).await?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub async fn delete_by_id(&self, id: i64) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", R::TABLE, R::PRIMARY_KEY);
        let result = self.db.execute(&sql, &[Value::Integer(id)]).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Run a custom SELECT and map every row.
    pub async fn fetch(&self, sql: &str, params: &[Value]) -> StoreResult<Vec<R>> {
        let rows = self.db.fetch_all(sql, params).await?;
        rows.iter().map(R::from_row).collect()
    }

    pub async fn fetch_optional(&self, sql: &str, params: &[Value]) -> StoreResult<Option<R>> {
        self.db
            .fetch_optional(sql, params)
            .await?
            .as_ref()
            .map(R::from_row)
            .transpose()
    }

    /// Select from the record's projection with a WHERE clause.
    pub(crate) async fn select_where(
        &self,
        condition: &str,
        order: &str,
        params: &[Value],
    ) -> StoreResult<Vec<R>> {
        let sql = format!("{} WHERE {} ORDER BY {}", R::select_sql(), condition, order);
        self.fetch(&sql, params).await
    }
}

fn insert_sql<R: Record>() -> String {
    let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders
    )
}

fn update_sql<R: Record>() -> String {
    let assignments = R::COLUMNS
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "UPDATE {} SET {} WHERE {} = ?",
        R::TABLE,
        assignments,
        R::PRIMARY_KEY
    )
}
