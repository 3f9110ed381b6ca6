//! Service records.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;
use territory::{Outcome, ServiceRecord, ServiceStatistics};

use super::helpers::{
    date_value, get_date, get_joined, get_joined_code, get_opt_code, get_opt_timestamp,
};
use super::schedule_repo::grouped_counts;
use super::table::Table;
use super::value::Value;
use crate::error::StoreResult;
use crate::persistence::traits::Record;

const ORDER: &str = "data DESC, id DESC";

impl Record for ServiceRecord {
    const ENTITY: &'static str = "Service record";
    const TABLE: &'static str = "atendimentos";
    const COLUMNS: &'static [&'static str] =
        &["imovel_id", "unidade_id", "data", "resultado", "observacoes"];
    const VIEW: Option<&'static str> = Some(
        "SELECT a.*, i.numero AS property_number, i.tipo AS property_kind, \
                r.nome AS street_name, t.nome AS territory_name, u.numero AS unit_label \
         FROM atendimentos a \
         LEFT JOIN imoveis i ON i.id = a.imovel_id \
         LEFT JOIN ruas r ON r.id = i.rua_id \
         LEFT JOIN territorios t ON t.id = r.territorio_id \
         LEFT JOIN unidades u ON u.id = a.unidade_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some(ORDER);

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.property_id),
            Value::from(self.unit_id),
            date_value(self.date),
            Value::from(self.outcome.map(|o| o.as_str())),
            Value::from(self.notes.clone()),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            property_id: row.try_get("imovel_id")?,
            unit_id: row.try_get("unidade_id")?,
            date: get_date(row, "data")?,
            outcome: get_opt_code(row, "resultado")?,
            notes: row.try_get("observacoes")?,
            recorded_at: get_opt_timestamp(row, "data_registro")?,
            property_number: get_joined(row, "property_number")?,
            property_kind: get_joined_code(row, "property_kind")?,
            street_name: get_joined(row, "street_name")?,
            territory_name: get_joined(row, "territory_name")?,
            unit_label: get_joined(row, "unit_label")?,
        })
    }
}

impl Table<ServiceRecord> {
    pub async fn get_by_property(&self, property_id: i64) -> StoreResult<Vec<ServiceRecord>> {
        self.select_where("imovel_id = ?", ORDER, &[Value::Integer(property_id)])
            .await
    }

    pub async fn get_by_unit(&self, unit_id: i64) -> StoreResult<Vec<ServiceRecord>> {
        self.select_where("unidade_id = ?", ORDER, &[Value::Integer(unit_id)])
            .await
    }

    /// The most recently registered records.
    pub async fn get_latest(&self, limit: i64) -> StoreResult<Vec<ServiceRecord>> {
        let sql = format!(
            "{} ORDER BY data_registro DESC, id DESC LIMIT ?",
            ServiceRecord::select_sql()
        );
        self.fetch(&sql, &[Value::Integer(limit)]).await
    }

    /// Totals by outcome, property kind, territory and month.
    pub async fn statistics(&self) -> StoreResult<ServiceStatistics> {
        let db = self.database();
        let total = db.fetch_scalar("SELECT COUNT(*) FROM atendimentos", &[]).await?;
        let raw_outcomes = grouped_counts(
            db,
            "SELECT resultado AS label, COUNT(*) AS total FROM atendimentos \
             GROUP BY resultado ORDER BY resultado",
        )
        .await?;
        // Legacy codes are folded into their current spelling.
        let mut by_outcome = BTreeMap::new();
        for (code, count) in raw_outcomes {
            let key = code
                .parse::<Outcome>()
                .map(|o| o.as_str().to_string())
                .unwrap_or(code);
            *by_outcome.entry(key).or_insert(0) += count;
        }
        let by_property_kind = grouped_counts(
            db,
            "SELECT i.tipo AS label, COUNT(*) AS total FROM atendimentos a \
             JOIN imoveis i ON i.id = a.imovel_id \
             GROUP BY i.tipo ORDER BY i.tipo",
        )
        .await?;
        let by_territory = grouped_counts(
            db,
            "SELECT t.nome AS label, COUNT(*) AS total FROM atendimentos a \
             JOIN imoveis i ON i.id = a.imovel_id \
             JOIN ruas r ON r.id = i.rua_id \
             JOIN territorios t ON t.id = r.territorio_id \
             GROUP BY t.nome ORDER BY t.nome",
        )
        .await?;
        let by_month = grouped_counts(
            db,
            "SELECT strftime('%Y-%m', data) AS label, COUNT(*) AS total FROM atendimentos \
             GROUP BY label ORDER BY label",
        )
        .await?;

        Ok(ServiceStatistics {
            total,
            by_outcome,
            by_property_kind,
            by_territory,
            by_month,
        })
    }
}
