//! Users and the activity log.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use territory::{ActivityKind, ActivityLog, PermissionLevel, User};

use super::helpers::{get_code, get_joined, get_opt_timestamp};
use super::table::Table;
use super::value::Value;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{StoreError, StoreResult};
use crate::params;
use crate::persistence::traits::{ListQuery, Record, UniqueKey};

impl Record for User {
    const ENTITY: &'static str = "User";
    const TABLE: &'static str = "usuarios";
    const COLUMNS: &'static [&'static str] =
        &["nome", "email", "senha_hash", "nivel_permissao", "ativo"];
    const DEFAULT_ORDER: Option<&'static str> = Some("nome");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        params![
            &self.name,
            &self.email,
            &self.password_hash,
            self.permission.as_i64(),
            self.active,
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        let level: i64 = row.try_get("nivel_permissao")?;
        let permission = PermissionLevel::try_from(level).map_err(|e| StoreError::Decode {
            column: "nivel_permissao".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("nome")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("senha_hash")?,
            permission,
            active: row.try_get::<i64, _>("ativo")? != 0,
            created_at: get_opt_timestamp(row, "data_criacao")?,
            last_activity: get_opt_timestamp(row, "ultima_atividade")?,
        })
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey {
            column: "email",
            value: Value::from(&self.email),
            message: format!("Email already registered: {}", self.email),
        }]
    }
}

impl Record for ActivityLog {
    const ENTITY: &'static str = "Activity log";
    const TABLE: &'static str = "log_atividades";
    const COLUMNS: &'static [&'static str] =
        &["usuario_id", "tipo_acao", "descricao", "entidade", "entidade_id"];
    const VIEW: Option<&'static str> = Some(
        "SELECT l.*, u.nome AS user_name \
         FROM log_atividades l LEFT JOIN usuarios u ON u.id = l.usuario_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some("data_hora DESC, id DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        params![
            self.user_id,
            self.kind.as_str(),
            &self.description,
            self.entity.clone(),
            self.entity_id,
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("usuario_id")?,
            kind: get_code(row, "tipo_acao")?,
            description: row.try_get("descricao")?,
            at: get_opt_timestamp(row, "data_hora")?,
            entity: row.try_get("entidade")?,
            entity_id: row.try_get("entidade_id")?,
            user_name: get_joined(row, "user_name")?,
        })
    }
}

impl Table<User> {
    pub async fn get_active(&self) -> StoreResult<Vec<User>> {
        self.select_where("ativo = 1", "nome", &[]).await
    }

    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE email = ?", User::select_sql());
        self.fetch_optional(&sql, &params![email]).await
    }

    /// The active user with these credentials, if any.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
        let sql = format!("{} WHERE email = ? AND ativo = 1", User::select_sql());
        let Some(user) = self.fetch_optional(&sql, &params![email]).await? else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash) {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    /// Replace a user's password with a fresh salted hash.
    pub async fn set_password(&self, user_id: i64, password: &str) -> StoreResult<()> {
        if password.is_empty() {
            return Err(StoreError::Validation(vec!["Password cannot be empty".to_string()]));
        }
        let result = self
            .database()
            .execute(
                "UPDATE usuarios SET senha_hash = ? WHERE id = ?",
                &params![hash_password(password), user_id],
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: User::ENTITY,
                id: user_id,
            });
        }
        Ok(())
    }

    pub async fn touch_activity(&self, user_id: i64) -> StoreResult<()> {
        self.database()
            .execute(
                "UPDATE usuarios SET ultima_atividade = datetime('now', 'localtime') WHERE id = ?",
                &[Value::Integer(user_id)],
            )
            .await?;
        Ok(())
    }
}

impl Table<ActivityLog> {
    /// Append an entry to the activity log.
    pub async fn record(
        &self,
        user_id: Option<i64>,
        kind: ActivityKind,
        description: &str,
        entity: Option<(&str, Option<i64>)>,
    ) -> StoreResult<i64> {
        let mut entry = ActivityLog::new(user_id, kind, description);
        if let Some((name, id)) = entity {
            entry = entry.about(name, id);
        }
        self.save(&mut entry).await
    }

    pub async fn get_recent(&self, limit: i64) -> StoreResult<Vec<ActivityLog>> {
        self.get_all(&ListQuery::new().limit(limit)).await
    }

    pub async fn get_by_user(&self, user_id: i64, limit: i64) -> StoreResult<Vec<ActivityLog>> {
        let sql = format!(
            "{} WHERE usuario_id = ? ORDER BY data_hora DESC, id DESC LIMIT ?",
            ActivityLog::select_sql()
        );
        self.fetch(&sql, &params![user_id, limit]).await
    }

    /// Entries about `entity`, optionally narrowed to one row id.
    pub async fn get_by_entity(
        &self,
        entity: &str,
        entity_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<ActivityLog>> {
        let mut sql = format!("{} WHERE entidade = ?", ActivityLog::select_sql());
        let mut params = params![entity];
        if let Some(id) = entity_id {
            sql.push_str(" AND entidade_id = ?");
            params.push(Value::Integer(id));
        }
        sql.push_str(" ORDER BY data_hora DESC, id DESC LIMIT ?");
        params.push(Value::Integer(limit));
        self.fetch(&sql, &params).await
    }
}
