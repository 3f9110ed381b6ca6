//! Saved report definitions.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use territory::SavedReport;

use super::helpers::{get_code, get_opt_timestamp, now, opt_timestamp_value, timestamp_value};
use super::table::Table;
use super::value::Value;
use crate::error::{StoreError, StoreResult};
use crate::persistence::traits::Record;

impl Record for SavedReport {
    const ENTITY: &'static str = "Report";
    const TABLE: &'static str = "relatorios";
    const COLUMNS: &'static [&'static str] =
        &["nome", "tipo", "filtros", "usuario_id", "ultima_execucao"];
    const DEFAULT_ORDER: Option<&'static str> = Some("nome");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(&self.name),
            Value::from(self.kind.as_str()),
            Value::Text(self.filters.to_string()),
            Value::from(self.user_id),
            opt_timestamp_value(self.last_run),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let filters: Option<String> = row.try_get("filtros")?;
        let filters = match filters.as_deref() {
            None | Some("") => serde_json::Value::Object(Default::default()),
            Some(raw) => serde_json::from_str(raw)?,
        };
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("nome")?,
            kind: get_code(row, "tipo")?,
            filters,
            user_id: row.try_get("usuario_id")?,
            created_at: get_opt_timestamp(row, "data_criacao")?,
            last_run: get_opt_timestamp(row, "ultima_execucao")?,
        })
    }
}

impl Table<SavedReport> {
    pub async fn get_by_user(&self, user_id: i64) -> StoreResult<Vec<SavedReport>> {
        self.select_where("usuario_id = ?", "nome", &[Value::Integer(user_id)])
            .await
    }

    /// Stamp the report's last execution time with now.
    pub async fn mark_run(&self, id: i64) -> StoreResult<()> {
        let result = self
            .database()
            .execute(
                "UPDATE relatorios SET ultima_execucao = ? WHERE id = ?",
                &[timestamp_value(now()), Value::Integer(id)],
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: SavedReport::ENTITY,
                id,
            });
        }
        Ok(())
    }
}
