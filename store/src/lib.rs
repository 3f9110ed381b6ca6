pub mod auth;
pub mod backup;
pub mod config;
pub mod error;
pub mod export;
pub mod notifications;
pub mod persistence;
pub mod reports;
pub mod schema;
pub mod telemetry;

pub use auth::{AuthService, AuthenticatedUser};
pub use backup::{BackupEntry, BackupService, BackupSettings};
pub use config::{AppConfig, ConfigError};
pub use error::{StoreError, StoreResult};
pub use notifications::NotificationService;
pub use persistence::{Database, ListQuery, Record, Table, Value};
pub use reports::{Report, ReportBuilder};
pub use schema::{FixReport, SchemaReport, SchemaValidator};
