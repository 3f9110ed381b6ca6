//! Persistence layer: the SQLite gateway and typed repositories.

pub mod sqlite;
mod traits;

pub use sqlite::{
    Database, Table, TerritoryReportRow, Value, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD,
    SCHEMA_SCRIPTS,
};
pub use traits::{ListQuery, Record, Statement, UniqueKey, UpdateGuard};
