//! Users, their audit trail and their in-app notifications.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::codes::{ActivityKind, NotificationKind, NotificationStatus, PermissionLevel};
use crate::validate::{require_id, require_text, Validate};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    /// `salt_hex:hash_hex`. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub permission: PermissionLevel,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub last_activity: Option<NaiveDateTime>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, permission: PermissionLevel) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            password_hash: String::new(),
            permission,
            active: true,
            created_at: None,
            last_activity: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.permission == PermissionLevel::Admin
    }

    /// Managers and admins receive assignment alerts.
    pub fn can_manage(&self) -> bool {
        self.permission >= PermissionLevel::Manager
    }
}

impl Validate for User {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_text(&mut errors, &self.name, "Name");
        if self.email.trim().is_empty() {
            errors.push("Email is required".to_string());
        } else if !self.email.contains('@') {
            errors.push("Invalid email".to_string());
        }
        if self.id.is_none() && self.password_hash.is_empty() {
            errors.push("Password is required for new users".to_string());
        }
        errors
    }
}

/// One audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub kind: ActivityKind,
    pub description: String,
    pub at: Option<NaiveDateTime>,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
    pub user_name: Option<String>,
}

impl ActivityLog {
    pub fn new(user_id: Option<i64>, kind: ActivityKind, description: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id,
            kind,
            description: description.into(),
            at: None,
            entity: None,
            entity_id: None,
            user_name: None,
        }
    }

    pub fn about(mut self, entity: impl Into<String>, entity_id: Option<i64>) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = entity_id;
        self
    }
}

impl Validate for ActivityLog {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_text(&mut errors, &self.description, "Description");
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Option<i64>,
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: Option<NaiveDateTime>,
    pub read_at: Option<NaiveDateTime>,
    pub link: Option<String>,
    pub entity: Option<String>,
    pub entity_id: Option<i64>,
}

impl Notification {
    pub fn new(
        user_id: i64,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            status: NotificationStatus::Unread,
            created_at: None,
            read_at: None,
            link: None,
            entity: None,
            entity_id: None,
        }
    }

    pub fn about(mut self, entity: impl Into<String>, entity_id: i64) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = Some(entity_id);
        self
    }

    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

impl Validate for Notification {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_id(&mut errors, self.user_id, "User");
        require_text(&mut errors, &self.title, "Title");
        require_text(&mut errors, &self.message, "Message");
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_needs_password_and_valid_email() {
        let mut user = User::new("Ana", "ana.example.com", PermissionLevel::Basic);
        assert_eq!(
            user.validate(),
            vec!["Invalid email", "Password is required for new users"]
        );
        user.email = "ana@example.com".to_string();
        user.password_hash = "aa:bb".to_string();
        assert!(user.is_valid());
    }

    #[test]
    fn existing_user_keeps_password_optional() {
        let mut user = User::new("Ana", "ana@example.com", PermissionLevel::Manager);
        user.id = Some(4);
        assert!(user.is_valid());
        assert!(user.can_manage());
        assert!(!user.is_admin());
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let mut user = User::new("Ana", "ana@example.com", PermissionLevel::Basic);
        user.password_hash = "secret".to_string();
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn notification_starts_unread() {
        let n = Notification::new(1, NotificationKind::Info, "Hi", "Welcome");
        assert!(n.is_unread());
        assert!(n.is_valid());
        assert_eq!(Notification::new(0, NotificationKind::Info, "", "").validate().len(), 3);
    }
}
