//! Territories and streets.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use territory::{percentage, Street, Territory, TerritoryStatistics};

use super::helpers::{date_value, get_joined, get_opt_date, get_opt_timestamp, opt_date_value};
use super::table::Table;
use super::value::Value;
use crate::error::{StoreError, StoreResult};
use crate::params;
use crate::persistence::traits::Record;

impl Record for Territory {
    const ENTITY: &'static str = "Territory";
    const TABLE: &'static str = "territorios";
    const COLUMNS: &'static [&'static str] = &["nome", "descricao", "ultima_visita"];
    const DEFAULT_ORDER: Option<&'static str> = Some("nome");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(&self.name),
            Value::from(self.description.clone()),
            opt_date_value(self.last_visit),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("nome")?,
            description: row.try_get("descricao")?,
            last_visit: get_opt_date(row, "ultima_visita")?,
            created_at: get_opt_timestamp(row, "data_criacao")?,
        })
    }
}

impl Record for Street {
    const ENTITY: &'static str = "Street";
    const TABLE: &'static str = "ruas";
    const COLUMNS: &'static [&'static str] = &["territorio_id", "nome"];
    const VIEW: Option<&'static str> = Some(
        "SELECT r.*, t.nome AS territory_name \
         FROM ruas r LEFT JOIN territorios t ON t.id = r.territorio_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some("nome");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        params![self.territory_id, &self.name]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            territory_id: row.try_get("territorio_id")?,
            name: row.try_get("nome")?,
            territory_name: get_joined(row, "territory_name")?,
        })
    }
}

/// One line of the territory report.
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryReportRow {
    pub territory: Territory,
    pub statistics: TerritoryStatistics,
    pub records_this_month: i64,
}

impl Table<Territory> {
    pub async fn get_streets(&self, territory_id: i64) -> StoreResult<Vec<Street>> {
        self.database()
            .table::<Street>()
            .get_by_territory(territory_id)
            .await
    }

    pub async fn add_street(&self, territory_id: i64, name: &str) -> StoreResult<Street> {
        let mut street = Street::new(territory_id, name);
        self.database().table::<Street>().save(&mut street).await?;
        Ok(street)
    }

    /// Street, property and service-record counts plus coverage.
    pub async fn statistics(&self, territory_id: i64) -> StoreResult<TerritoryStatistics> {
        let db = self.database();
        let id = [Value::Integer(territory_id)];

        let total_streets = db
            .fetch_scalar("SELECT COUNT(*) FROM ruas WHERE territorio_id = ?", &id)
            .await?;
        let total_properties = db
            .fetch_scalar(
                "SELECT COUNT(*) FROM imoveis i \
                 JOIN ruas r ON r.id = i.rua_id WHERE r.territorio_id = ?",
                &id,
            )
            .await?;
        let total_service_records = db
            .fetch_scalar(
                "SELECT COUNT(*) FROM atendimentos a \
                 JOIN imoveis i ON i.id = a.imovel_id \
                 JOIN ruas r ON r.id = i.rua_id WHERE r.territorio_id = ?",
                &id,
            )
            .await?;
        let served_properties = db
            .fetch_scalar(
                "SELECT COUNT(DISTINCT a.imovel_id) FROM atendimentos a \
                 JOIN imoveis i ON i.id = a.imovel_id \
                 JOIN ruas r ON r.id = i.rua_id WHERE r.territorio_id = ?",
                &id,
            )
            .await?;

        Ok(TerritoryStatistics {
            total_streets,
            total_properties,
            total_service_records,
            served_properties,
            coverage: percentage(served_properties, total_properties),
        })
    }

    pub async fn update_last_visit(&self, territory_id: i64, day: NaiveDate) -> StoreResult<()> {
        let result = self
            .database()
            .execute(
                "UPDATE territorios SET ultima_visita = ? WHERE id = ?",
                &[date_value(day), Value::Integer(territory_id)],
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: Territory::ENTITY,
                id: territory_id,
            });
        }
        Ok(())
    }

    /// Every territory with its statistics and the records of `month`
    /// (`YYYY-MM`).
    pub async fn report_rows(&self, month: &str) -> StoreResult<Vec<TerritoryReportRow>> {
        let territories = self.get_all(&Default::default()).await?;
        let mut rows = Vec::with_capacity(territories.len());
        for territory in territories {
            let Some(id) = territory.id else { continue };
            let statistics = self.statistics(id).await?;
            let records_this_month = self
                .database()
                .fetch_scalar(
                    "SELECT COUNT(*) FROM atendimentos a \
                     JOIN imoveis i ON i.id = a.imovel_id \
                     JOIN ruas r ON r.id = i.rua_id \
                     WHERE r.territorio_id = ? AND strftime('%Y-%m', a.data) = ?",
                    &params![id, month],
                )
                .await?;
            rows.push(TerritoryReportRow {
                territory,
                statistics,
                records_this_month,
            });
        }
        Ok(rows)
    }
}

impl Table<Street> {
    pub async fn get_by_territory(&self, territory_id: i64) -> StoreResult<Vec<Street>> {
        self.select_where("territorio_id = ?", "nome", &[Value::Integer(territory_id)])
            .await
    }

    pub async fn count_properties(&self, street_id: i64) -> StoreResult<i64> {
        self.database()
            .fetch_scalar(
                "SELECT COUNT(*) FROM imoveis WHERE rua_id = ?",
                &[Value::Integer(street_id)],
            )
            .await
    }
}
