//! Record mapping shared by every stored entity.
//!
//! A [`Record`] names its table, primary key and writable columns as
//! associated constants and maps rows explicitly. [`Table`](super::Table)
//! supplies the CRUD operations for any `Record`; entity-specific queries are
//! inherent methods on `Table<Entity>`.

use sqlx::sqlite::SqliteRow;
use territory::Validate;

use super::sqlite::Value;
use crate::error::StoreResult;

pub trait Record: Validate + Sized + Send + Sync + Unpin + 'static {
    /// Human name used in errors and logs.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Columns written on insert and update, in the order of [`Record::values`].
    /// Database-managed columns (creation timestamps) are left out.
    const COLUMNS: &'static [&'static str];
    /// Joined projection adding display columns. Must expose every table column.
    const VIEW: Option<&'static str> = None;
    const DEFAULT_ORDER: Option<&'static str> = None;

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    fn values(&self) -> Vec<Value>;
    fn from_row(row: &SqliteRow) -> StoreResult<Self>;

    /// Column values that must not repeat across rows.
    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Statements run in the same transaction right after this record is
    /// inserted with `id`.
    fn on_insert(&self, _id: i64) -> Vec<Statement> {
        Vec::new()
    }

    /// Row state this record may not be written over. Checked in the same
    /// UPDATE that saves the record.
    fn update_guard(&self) -> Option<UpdateGuard> {
        None
    }

    fn select_sql() -> String {
        match Self::VIEW {
            Some(view) => format!("SELECT * FROM ({view})"),
            None => format!("SELECT * FROM {}", Self::TABLE),
        }
    }
}

pub struct UniqueKey {
    pub column: &'static str,
    pub value: Value,
    /// Reported as a validation message when the value is taken.
    pub message: String,
}

/// `blocked_when` is a SQL boolean over the stored row. An UPDATE against a
/// row matching it is refused with `message` as a validation error.
#[derive(Debug, Clone)]
pub struct UpdateGuard {
    pub blocked_when: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: &'static str,
    pub params: Vec<Value>,
}

/// Filter, order and limit for [`Table::get_all`](super::Table::get_all).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filter: Option<String>,
    pub params: Vec<Value>,
    pub order_by: Option<String>,
    pub limit: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// `condition` is a SQL boolean expression with `?` placeholders.
    pub fn filter(mut self, condition: impl Into<String>, params: Vec<Value>) -> Self {
        self.filter = Some(condition.into());
        self.params = params;
        self
    }

    pub fn order_by(mut self, order: impl Into<String>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}
