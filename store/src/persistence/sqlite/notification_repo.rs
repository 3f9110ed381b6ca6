//! In-app notifications.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use territory::{Notification, NotificationKind, NotificationStatus};

use super::helpers::{get_code, get_opt_timestamp, now, opt_timestamp_value, timestamp_value};
use super::table::Table;
use super::value::Value;
use crate::error::StoreResult;
use crate::params;
use crate::persistence::traits::Record;

impl Record for Notification {
    const ENTITY: &'static str = "Notification";
    const TABLE: &'static str = "notificacoes";
    const COLUMNS: &'static [&'static str] = &[
        "usuario_id",
        "tipo",
        "titulo",
        "mensagem",
        "status",
        "data_leitura",
        "link",
        "entidade",
        "entidade_id",
    ];
    const DEFAULT_ORDER: Option<&'static str> = Some("data_criacao DESC, id DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.user_id),
            Value::from(self.kind.as_str()),
            Value::from(&self.title),
            Value::from(&self.message),
            Value::from(self.status.as_str()),
            opt_timestamp_value(self.read_at),
            Value::from(self.link.clone()),
            Value::from(self.entity.clone()),
            Value::from(self.entity_id),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("usuario_id")?,
            kind: get_code(row, "tipo")?,
            title: row.try_get("titulo")?,
            message: row.try_get("mensagem")?,
            status: get_code(row, "status")?,
            created_at: get_opt_timestamp(row, "data_criacao")?,
            read_at: get_opt_timestamp(row, "data_leitura")?,
            link: row.try_get("link")?,
            entity: row.try_get("entidade")?,
            entity_id: row.try_get("entidade_id")?,
        })
    }
}

impl Table<Notification> {
    /// Store a new notification and return its id.
    pub async fn create(&self, notification: &mut Notification) -> StoreResult<i64> {
        notification.id = None;
        notification.status = NotificationStatus::Unread;
        notification.read_at = None;
        self.save(notification).await
    }

    /// Send the same notification to every active user. Returns how many
    /// were created.
    pub async fn create_for_all_active(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> StoreResult<u64> {
        self.database()
            .execute(
                "INSERT INTO notificacoes (usuario_id, tipo, titulo, mensagem, status) \
                 SELECT id, ?, ?, ?, 'nao_lida' FROM usuarios WHERE ativo = 1",
                &params![kind.as_str(), title, message],
            )
            .await
            .map(|result| result.rows_affected())
    }

    /// A user's notifications, newest first. Archived ones are left out.
    pub async fn get_by_user(&self, user_id: i64, unread_only: bool) -> StoreResult<Vec<Notification>> {
        let condition = if unread_only {
            "usuario_id = ? AND status = 'nao_lida'"
        } else {
            "usuario_id = ? AND status != 'arquivada'"
        };
        self.select_where(condition, "data_criacao DESC, id DESC", &[Value::Integer(user_id)])
            .await
    }

    /// Mark an unread notification read. Returns false if it was not unread.
    pub async fn mark_read(&self, id: i64) -> StoreResult<bool> {
        let result = self
            .database()
            .execute(
                "UPDATE notificacoes SET status = 'lida', data_leitura = ? \
                 WHERE id = ? AND status = 'nao_lida'",
                &[timestamp_value(now()), Value::Integer(id)],
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive a notification from any status. Returns false if it does not exist.
    pub async fn archive(&self, id: i64) -> StoreResult<bool> {
        let result = self
            .database()
            .execute(
                "UPDATE notificacoes SET status = 'arquivada' WHERE id = ?",
                &[Value::Integer(id)],
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn unread_count(&self, user_id: i64) -> StoreResult<i64> {
        self.database()
            .fetch_scalar(
                "SELECT COUNT(*) FROM notificacoes WHERE usuario_id = ? AND status = 'nao_lida'",
                &[Value::Integer(user_id)],
            )
            .await
    }

    /// Whether the user already has an unread alert about this entity.
    pub async fn has_unread_alert(
        &self,
        user_id: i64,
        entity: &str,
        entity_id: i64,
    ) -> StoreResult<bool> {
        let count = self
            .database()
            .fetch_scalar(
                "SELECT COUNT(*) FROM notificacoes \
                 WHERE usuario_id = ? AND tipo = 'alerta' AND status = 'nao_lida' \
                 AND entidade = ? AND entidade_id = ?",
                &params![user_id, entity, entity_id],
            )
            .await?;
        Ok(count > 0)
    }
}
