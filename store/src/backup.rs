//! File-copy backups of the database with age and count retention.
//!
//! Backups are named `backup_YYYYMMDD_HHMMSS.<ext>`, where `<ext>` is the
//! database file's extension. A restore first copies the live file to
//! `<db>.before_restore_YYYYMMDD_HHMMSS` next to it.

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use serde::Serialize;
use sqlx::{ConnectOptions, Connection};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{StoreError, StoreResult};
use crate::persistence::sqlite::file_options;
use crate::persistence::sqlite::helpers::now;

const PREFIX: &str = "backup_";
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const STAMP_LEN: usize = 15;
const DEFAULT_EXTENSION: &str = "db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub db_path: PathBuf,
    pub backup_dir: PathBuf,
    /// Backups older than this many days are removed. 0 disables the rule.
    pub retention_days: u32,
    /// Only this many of the newest backups are kept. 0 disables the rule.
    pub max_files: usize,
}

impl BackupSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            db_path: config.database_path(),
            backup_dir: config.backup_dir(),
            retention_days: config.database.backup_retention_days,
            max_files: config.database.max_backup_files,
        }
    }
}

/// One backup file found in the backup directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub filename: String,
    /// Taken from the file name, or the modification time when the name
    /// does not carry one.
    pub timestamp: NaiveDateTime,
    pub size_bytes: u64,
    pub size_readable: String,
}

pub struct BackupService {
    settings: BackupSettings,
}

impl BackupService {
    pub fn new(settings: BackupSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    /// Copy the live database into the backup directory, then prune.
    ///
    /// The file is compacted first on its own connection. A failed
    /// compaction is logged and the copy goes ahead.
    pub async fn create_backup(&self) -> StoreResult<PathBuf> {
        let db_path = &self.settings.db_path;
        if !db_path.exists() {
            tracing::error!(path = %db_path.display(), "database file not found");
            return Err(StoreError::DatabaseFileMissing(db_path.clone()));
        }
        let backup_dir = &self.settings.backup_dir;
        std::fs::create_dir_all(backup_dir).map_err(|e| {
            tracing::error!(
                path = %backup_dir.display(),
                error = %e,
                "could not create backup directory"
            );
            e
        })?;

        if let Err(e) = compact(db_path).await {
            tracing::warn!(error = %e, "could not compact database before backup");
        }

        let target = self.next_backup_path();
        std::fs::copy(db_path, &target).map_err(|e| {
            tracing::error!(path = %target.display(), error = %e, "backup copy failed");
            e
        })?;
        tracing::info!(path = %target.display(), "backup created");

        if let Err(e) = self.prune() {
            tracing::warn!(error = %e, "could not prune old backups");
        }
        Ok(target)
    }

    /// Apply the age rule and the count rule, each against the full list.
    /// Returns the removed files.
    pub fn prune(&self) -> StoreResult<Vec<PathBuf>> {
        let entries = self.list_backups()?;
        let mut doomed = BTreeSet::new();

        if self.settings.retention_days > 0 {
            let cutoff = now() - Duration::days(i64::from(self.settings.retention_days));
            doomed.extend(
                entries
                    .iter()
                    .filter(|entry| entry.timestamp < cutoff)
                    .map(|entry| entry.path.clone()),
            );
        }
        if self.settings.max_files > 0 {
            doomed.extend(
                entries
                    .iter()
                    .skip(self.settings.max_files)
                    .map(|entry| entry.path.clone()),
            );
        }

        let mut removed = Vec::new();
        for path in doomed {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "old backup removed");
                    removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove backup");
                }
            }
        }
        Ok(removed)
    }

    /// Replace the live database with `backup`.
    ///
    /// Any open [`Database`](crate::Database) on the file must be closed
    /// first and reopened afterwards.
    pub fn restore_backup(&self, backup: &Path) -> StoreResult<()> {
        if !backup.is_file() {
            tracing::error!(path = %backup.display(), "backup file not found");
            return Err(StoreError::BackupNotFound(backup.to_path_buf()));
        }

        let db_path = &self.settings.db_path;
        let safety = if db_path.exists() {
            let mut name = db_path.as_os_str().to_owned();
            name.push(format!(".before_restore_{}", now().format(STAMP_FORMAT)));
            let safety = PathBuf::from(name);
            std::fs::copy(db_path, &safety).map_err(|e| {
                tracing::error!(path = %safety.display(), error = %e, "safety copy failed");
                e
            })?;
            tracing::info!(path = %safety.display(), "safety copy created");
            Some(safety)
        } else {
            None
        };

        match std::fs::copy(backup, db_path) {
            Ok(_) => {
                tracing::info!(from = %backup.display(), "backup restored");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "restore failed");
                let rolled_back = match &safety {
                    Some(safety) => match std::fs::copy(safety, db_path) {
                        Ok(_) => {
                            tracing::info!("database recovered from safety copy");
                            true
                        }
                        Err(recover) => {
                            tracing::error!(error = %recover, "could not recover from safety copy");
                            false
                        }
                    },
                    None => false,
                };
                Err(StoreError::Restore {
                    message: e.to_string(),
                    rolled_back,
                })
            }
        }
    }

    /// Backups in the backup directory, newest first.
    pub fn list_backups(&self) -> StoreResult<Vec<BackupEntry>> {
        let dir = &self.settings.backup_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let extension = self.extension();
        let mut entries = Vec::new();
        for item in std::fs::read_dir(dir)? {
            let item = item?;
            let path = item.path();
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let is_backup = filename.starts_with(PREFIX)
                && path.extension().and_then(|e| e.to_str()) == Some(extension.as_str());
            if !is_backup {
                continue;
            }
            let metadata = item.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let timestamp = match parse_stamp(filename) {
                Some(stamp) => stamp,
                None => DateTime::<Local>::from(metadata.modified()?).naive_local(),
            };
            entries.push(BackupEntry {
                filename: filename.to_string(),
                path,
                timestamp,
                size_bytes: metadata.len(),
                size_readable: format_size(metadata.len()),
            });
        }

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(entries)
    }

    fn extension(&self) -> String {
        self.settings
            .db_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_EXTENSION)
            .to_string()
    }

    /// A fresh name for a backup taken now. A second backup within the same
    /// second gets a numeric suffix.
    fn next_backup_path(&self) -> PathBuf {
        let stamp = now().format(STAMP_FORMAT).to_string();
        let extension = self.extension();
        let mut candidate = self
            .settings
            .backup_dir
            .join(format!("{PREFIX}{stamp}.{extension}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self
                .settings
                .backup_dir
                .join(format!("{PREFIX}{stamp}_{n}.{extension}"));
            n += 1;
        }
        candidate
    }
}

async fn compact(db_path: &Path) -> StoreResult<()> {
    let mut conn = file_options(db_path)
        .create_if_missing(false)
        .connect()
        .await?;
    sqlx::raw_sql("VACUUM").execute(&mut conn).await?;
    conn.close().await?;
    Ok(())
}

fn parse_stamp(filename: &str) -> Option<NaiveDateTime> {
    let stamp = filename.strip_prefix(PREFIX)?.get(..STAMP_LEN)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// Human-readable size with two decimals above one kilobyte.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;
    if size < KB {
        format!("{bytes} bytes")
    } else if size < KB * KB {
        format!("{:.2} KB", size / KB)
    } else if size < KB * KB * KB {
        format!("{:.2} MB", size / (KB * KB))
    } else {
        format!("{:.2} GB", size / (KB * KB * KB))
    }
}
