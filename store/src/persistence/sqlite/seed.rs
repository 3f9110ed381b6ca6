//! Sample data and the default administrator for a fresh database.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use territory::{FieldTrip, PermissionLevel, Property, PropertyKind, Street, Territory, User};

use super::database::Database;
use super::helpers::now;
use crate::auth::password::hash_password;
use crate::error::StoreResult;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@sistema.local";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

const SAMPLE_TRIPS: [(&str, Weekday, u32, u32, &str); 3] = [
    ("Saída 1", Weekday::Tue, 9, 0, "João"),
    ("Saída 2", Weekday::Wed, 19, 30, "Maria"),
    ("Saída 3", Weekday::Fri, 14, 0, "Pedro"),
];

/// Seed each group only when its table is still empty.
pub(crate) async fn seed_defaults(db: &Database) -> StoreResult<()> {
    if db.fetch_scalar("SELECT COUNT(*) FROM territorios", &[]).await? == 0 {
        seed_sample_data(db).await?;
        tracing::info!("sample territory data seeded");
    }
    if db.fetch_scalar("SELECT COUNT(*) FROM usuarios", &[]).await? == 0 {
        seed_admin(db).await?;
        tracing::info!(email = DEFAULT_ADMIN_EMAIL, "default administrator created");
    }
    Ok(())
}

async fn seed_sample_data(db: &Database) -> StoreResult<()> {
    let mut territory =
        Territory::new("Território 1").with_description("Quadra 10 - Setor Central");
    let territory_id = db.table::<Territory>().save(&mut territory).await?;

    let mut street = Street::new(territory_id, "Rua das Flores");
    let street_id = db.table::<Street>().save(&mut street).await?;

    let properties = db.table::<Property>();
    let mut samples = vec![
        Property::new(street_id, "123", PropertyKind::Residential),
        Property::new(street_id, "125", PropertyKind::Commercial),
        Property::multi_unit(street_id, "127", PropertyKind::Building, "Edifício Central", 12),
        Property::multi_unit(street_id, "129", PropertyKind::VillageBlock, "Vila Aurora", 8),
    ];
    for property in &mut samples {
        properties.save(property).await?;
    }

    let today = now().date();
    let trips = db.table::<FieldTrip>();
    for (name, weekday, hour, minute, leader) in SAMPLE_TRIPS {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
        let mut trip = FieldTrip::new(name, next_weekday(today, weekday), time).led_by(leader);
        trips.save(&mut trip).await?;
    }
    Ok(())
}

async fn seed_admin(db: &Database) -> StoreResult<()> {
    let mut admin = User::new("Administrador", DEFAULT_ADMIN_EMAIL, PermissionLevel::Admin);
    admin.password_hash = hash_password(DEFAULT_ADMIN_PASSWORD);
    db.table::<User>().save(&mut admin).await?;
    Ok(())
}

/// The first `weekday` on or after `from`.
fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(i64::from(ahead))
}
