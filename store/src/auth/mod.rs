//! Login, login sessions and password hashing.

pub mod password;

use chrono::Duration;
use rand::Rng;
use serde::Serialize;
use territory::{ActivityKind, ActivityLog, User};

use crate::config::SessionConfig;
use crate::error::StoreResult;
use crate::persistence::sqlite::helpers::{now, timestamp_value};
use crate::persistence::{Database, Record};
use crate::{params, Value};

const TOKEN_BYTES: usize = 32;

/// A user who just logged in, with the session token issued for them.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

pub struct AuthService {
    db: Database,
    timeout_minutes: i64,
}

impl AuthService {
    pub fn new(db: &Database, config: &SessionConfig) -> Self {
        Self {
            db: db.clone(),
            timeout_minutes: config.timeout_minutes,
        }
    }

    /// Check credentials and open a session.
    ///
    /// Unknown emails, inactive users and wrong passwords all give `None`.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> StoreResult<Option<AuthenticatedUser>> {
        let users = self.db.table::<User>();
        let Some(mut user) = users.verify_credentials(email, password).await? else {
            tracing::info!(email, "login rejected");
            return Ok(None);
        };
        let Some(user_id) = user.id else {
            return Ok(None);
        };

        users.touch_activity(user_id).await?;
        let token = self.create_session(user_id, None, None, None).await?;
        self.db
            .table::<ActivityLog>()
            .record(
                Some(user_id),
                ActivityKind::Login,
                "Login successful",
                Some(("usuario", Some(user_id))),
            )
            .await?;

        if let Some(fresh) = users.get_by_id(user_id).await? {
            user = fresh;
        }
        tracing::info!(user_id, "login succeeded");
        Ok(Some(AuthenticatedUser { user, token }))
    }

    /// Persist a new session and return its token.
    ///
    /// The session expires `timeout_minutes` from now, or after the
    /// configured timeout when `None`.
    pub async fn create_session(
        &self,
        user_id: i64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        timeout_minutes: Option<i64>,
    ) -> StoreResult<String> {
        let token = generate_token();
        let minutes = timeout_minutes.unwrap_or(self.timeout_minutes);
        let expires_at = now() + Duration::minutes(minutes);

        self.db
            .execute(
                "INSERT INTO sessoes (usuario_id, token, ip_address, user_agent, data_expiracao) \
                 VALUES (?, ?, ?, ?, ?)",
                &[
                    Value::Integer(user_id),
                    Value::from(&token),
                    Value::from(ip_address),
                    Value::from(user_agent),
                    timestamp_value(expires_at),
                ],
            )
            .await?;
        tracing::debug!(user_id, %expires_at, "session created");
        Ok(token)
    }

    /// The active user owning an unexpired session with this token.
    pub async fn validate_session(&self, token: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "{} WHERE ativo = 1 AND id = \
             (SELECT usuario_id FROM sessoes WHERE token = ? AND data_expiracao > ?)",
            User::select_sql()
        );
        self.db
            .table::<User>()
            .fetch_optional(&sql, &[Value::from(token), timestamp_value(now())])
            .await
    }

    /// End a session. Returns false when the token was unknown.
    pub async fn logout(&self, token: &str) -> StoreResult<bool> {
        let user_id = self
            .db
            .fetch_scalar("SELECT usuario_id FROM sessoes WHERE token = ?", &params![token])
            .await?;
        let result = self
            .db
            .execute("DELETE FROM sessoes WHERE token = ?", &params![token])
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        self.db
            .table::<ActivityLog>()
            .record(
                Some(user_id),
                ActivityKind::Logout,
                "Logout",
                Some(("usuario", Some(user_id))),
            )
            .await?;
        Ok(true)
    }

    /// Delete every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let result = self
            .db
            .execute(
                "DELETE FROM sessoes WHERE data_expiracao <= ?",
                &[timestamp_value(now())],
            )
            .await?;
        let removed = result.rows_affected();
        if removed > 0 {
            tracing::info!(removed, "expired sessions purged");
        }
        Ok(removed)
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::ListQuery;
    use territory::PermissionLevel;

    async fn service_with_user(active: bool) -> (AuthService, i64) {
        let db = Database::new_in_memory().await.unwrap();
        let mut user = User::new("Ana", "ana@example.com", PermissionLevel::Basic);
        user.password_hash = password::hash_password("correct horse");
        user.active = active;
        let id = db.table::<User>().save(&mut user).await.unwrap();
        (AuthService::new(&db, &SessionConfig::default()), id)
    }

    #[tokio::test]
    async fn test_authenticate_with_correct_password() {
        let (auth, id) = service_with_user(true).await;
        let login = auth
            .authenticate("ana@example.com", "correct horse")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(login.user.id, Some(id));
        assert_eq!(login.token.len(), TOKEN_BYTES * 2);
        assert!(login.user.last_activity.is_some());

        let log = auth
            .db
            .table::<ActivityLog>()
            .get_all(&ListQuery::new())
            .await
            .unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ActivityKind::Login);
        assert_eq!(log[0].entity.as_deref(), Some("usuario"));
    }

    #[tokio::test]
    async fn test_authenticate_with_wrong_password() {
        let (auth, _) = service_with_user(true).await;
        let login = auth.authenticate("ana@example.com", "wrong").await.unwrap();
        assert!(login.is_none());
        let sessions = auth
            .db
            .fetch_scalar("SELECT COUNT(*) FROM sessoes", &[])
            .await
            .unwrap();
        assert_eq!(sessions, 0);
    }

    #[tokio::test]
    async fn test_inactive_user_cannot_log_in() {
        let (auth, _) = service_with_user(false).await;
        let login = auth
            .authenticate("ana@example.com", "correct horse")
            .await
            .unwrap();
        assert!(login.is_none());
    }

    #[tokio::test]
    async fn test_unknown_email_cannot_log_in() {
        let (auth, _) = service_with_user(true).await;
        assert!(auth
            .authenticate("nobody@example.com", "correct horse")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (auth, id) = service_with_user(true).await;
        let token = auth
            .create_session(id, Some("127.0.0.1"), Some("tests"), None)
            .await
            .unwrap();

        let user = auth.validate_session(&token).await.unwrap().unwrap();
        assert_eq!(user.id, Some(id));
        assert!(auth.validate_session("bogus").await.unwrap().is_none());

        assert!(auth.logout(&token).await.unwrap());
        assert!(!auth.logout(&token).await.unwrap());
        assert!(auth.validate_session(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_rejected_and_purged() {
        let (auth, id) = service_with_user(true).await;
        let expired = auth.create_session(id, None, None, Some(-5)).await.unwrap();
        let live = auth.create_session(id, None, None, Some(60)).await.unwrap();
        assert_ne!(expired, live);

        assert!(auth.validate_session(&expired).await.unwrap().is_none());
        assert_eq!(auth.purge_expired().await.unwrap(), 1);
        assert!(auth.validate_session(&live).await.unwrap().is_some());
    }
}
