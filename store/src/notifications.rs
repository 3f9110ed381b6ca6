//! Due-date alerts for assignments, and thin helpers over the notification table.

use chrono::{Duration, NaiveDate};
use territory::{Assignment, BuildingAssignment, Notification, NotificationKind, User};

use crate::config::NotificationConfig;
use crate::error::StoreResult;
use crate::persistence::{Database, Table};

pub const ASSIGNMENT_ENTITY: &str = "designacao";
pub const BUILDING_ASSIGNMENT_ENTITY: &str = "designacao_predios_vilas";

/// An active assignment whose return date is close.
struct DueSoon {
    entity: &'static str,
    id: i64,
    title: String,
    message: String,
}

pub struct NotificationService {
    db: Database,
    config: NotificationConfig,
}

impl NotificationService {
    pub fn new(db: &Database, config: &NotificationConfig) -> Self {
        Self {
            db: db.clone(),
            config: config.clone(),
        }
    }

    fn notifications(&self) -> Table<Notification> {
        self.db.table::<Notification>()
    }

    /// Alert every active manager and admin about assignments due between
    /// `today` and `today + alert_days_before`.
    ///
    /// A user who still has an unread alert for the same assignment is not
    /// alerted again. Returns how many notifications were created.
    pub async fn check_all(&self, today: NaiveDate) -> StoreResult<usize> {
        if !self.config.enabled || !self.config.show_assignment_alerts {
            return Ok(0);
        }
        let limit = today + Duration::days(self.config.alert_days_before);

        let mut due = self.territory_assignments_due(today, limit).await?;
        due.extend(self.building_assignments_due(today, limit).await?);
        if due.is_empty() {
            return Ok(0);
        }

        let managers: Vec<User> = self
            .db
            .table::<User>()
            .get_active()
            .await?
            .into_iter()
            .filter(User::can_manage)
            .collect();

        let notifications = self.notifications();
        let mut created = 0;
        for item in &due {
            for user in &managers {
                let Some(user_id) = user.id else { continue };
                if notifications
                    .has_unread_alert(user_id, item.entity, item.id)
                    .await?
                {
                    continue;
                }
                let mut alert =
                    Notification::new(user_id, NotificationKind::Alert, &item.title, &item.message)
                        .about(item.entity, item.id);
                notifications.create(&mut alert).await?;
                created += 1;
            }
        }
        if created > 0 {
            tracing::info!(created, "assignment alerts created");
        }
        Ok(created)
    }

    async fn territory_assignments_due(
        &self,
        today: NaiveDate,
        limit: NaiveDate,
    ) -> StoreResult<Vec<DueSoon>> {
        let active = self.db.table::<Assignment>().get_active().await?;
        Ok(active
            .into_iter()
            .filter_map(|a| {
                let due = a.due_on.filter(|d| *d >= today && *d <= limit)?;
                let id = a.id?;
                let name = a
                    .territory_name
                    .unwrap_or_else(|| format!("#{}", a.territory_id));
                Some(DueSoon {
                    entity: ASSIGNMENT_ENTITY,
                    id,
                    title: format!("Assignment due soon: {name}"),
                    message: format!(
                        "The assignment of territory '{name}' is due in {} days ({due}).",
                        (due - today).num_days()
                    ),
                })
            })
            .collect())
    }

    async fn building_assignments_due(
        &self,
        today: NaiveDate,
        limit: NaiveDate,
    ) -> StoreResult<Vec<DueSoon>> {
        let active = self.db.table::<BuildingAssignment>().get_active().await?;
        Ok(active
            .into_iter()
            .filter_map(|a| {
                let due = a.due_on.filter(|d| *d >= today && *d <= limit)?;
                let id = a.id?;
                let name = a
                    .property_name
                    .or_else(|| a.property_number.map(|n| format!("No. {n}")))
                    .unwrap_or_else(|| format!("#{}", a.property_id));
                let kind = a.property_kind.map(|k| k.as_str()).unwrap_or("property");
                Some(DueSoon {
                    entity: BUILDING_ASSIGNMENT_ENTITY,
                    id,
                    title: format!("Assignment due soon: {name}"),
                    message: format!(
                        "The assignment of {kind} '{name}' is due in {} days ({due}).",
                        (due - today).num_days()
                    ),
                })
            })
            .collect())
    }

    /// Send a notification to one user.
    pub async fn notify_user(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        link: Option<&str>,
        entity: Option<(&str, i64)>,
    ) -> StoreResult<i64> {
        let mut notification = Notification::new(user_id, kind, title, message);
        notification.link = link.map(str::to_string);
        if let Some((name, id)) = entity {
            notification = notification.about(name, id);
        }
        self.notifications().create(&mut notification).await
    }

    /// Send a notification to every active user.
    pub async fn notify_all(&self, kind: NotificationKind, title: &str, message: &str) -> StoreResult<u64> {
        self.notifications()
            .create_for_all_active(kind, title, message)
            .await
    }

    pub async fn unread(&self, user_id: i64) -> StoreResult<Vec<Notification>> {
        self.notifications().get_by_user(user_id, true).await
    }

    pub async fn unread_count(&self, user_id: i64) -> StoreResult<i64> {
        self.notifications().unread_count(user_id).await
    }

    pub async fn mark_read(&self, id: i64) -> StoreResult<bool> {
        self.notifications().mark_read(id).await
    }

    pub async fn archive(&self, id: i64) -> StoreResult<bool> {
        self.notifications().archive(id).await
    }
}
