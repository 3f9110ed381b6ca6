//! SQLite-backed repositories.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **One connection** - every statement runs on the same connection, in order.
//! - **Rollback journal** - committed data always lives in the main file, so a
//!   plain file copy is a complete backup.
//! - **Foreign keys enabled** - enforced at the connection level.
//! - **Embedded schema scripts** - [`SCHEMA_SCRIPTS`] are applied by
//!   [`Database::setup`]. Every statement is `IF NOT EXISTS`, so setup is idempotent.
//!
//! ## Repositories
//!
//! [`Table<R>`] provides CRUD for any [`Record`](crate::persistence::Record).
//! Entity-specific queries live in inherent `impl Table<Entity>` blocks:
//!
//! | Module | Entities |
//! |--------|----------|
//! | `territory_repo` | `Territory`, `Street` |
//! | `property_repo` | `Property`, `Unit`, `PropertyHistory` |
//! | `schedule_repo` | `FieldTrip`, `Assignment`, `BuildingAssignment` |
//! | `service_repo` | `ServiceRecord` |
//! | `user_repo` | `User`, `ActivityLog` |
//! | `notification_repo` | `Notification` |
//! | `report_repo` | `SavedReport` |
//!
//! Dates, timestamps and coded enums are stored as `TEXT` and converted by the
//! shared [`helpers`].

mod database;
mod notification_repo;
mod property_repo;
mod report_repo;
mod schedule_repo;
mod seed;
mod service_repo;
mod table;
mod territory_repo;
mod user_repo;
mod value;
pub(crate) mod helpers;

pub use database::{Database, SCHEMA_SCRIPTS};
pub(crate) use database::file_options;
pub use seed::{DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
pub use table::Table;
pub use territory_repo::TerritoryReportRow;
pub use value::Value;
