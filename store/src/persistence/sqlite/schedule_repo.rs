//! Field trips and the two kinds of assignment.

use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;
use territory::{
    Assignment, AssignmentStatistics, AssignmentStatus, BuildingAssignment, FieldTrip,
};

use super::database::Database;
use super::helpers::{
    date_value, get_code, get_date, get_joined, get_joined_code, get_opt_date, get_opt_timestamp,
    get_time, opt_date_value, time_value,
};
use super::table::Table;
use super::value::Value;
use crate::error::{StoreError, StoreResult};
use crate::params;
use crate::persistence::traits::{Record, UpdateGuard};

impl Record for FieldTrip {
    const ENTITY: &'static str = "Field trip";
    const TABLE: &'static str = "saidas_campo";
    const COLUMNS: &'static [&'static str] = &["nome", "data", "dia_semana", "horario", "dirigente"];
    const DEFAULT_ORDER: Option<&'static str> = Some("data DESC, horario DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(&self.name),
            date_value(self.date),
            Value::from(&self.weekday),
            time_value(self.time),
            Value::from(self.leader.clone()),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            name: row.try_get("nome")?,
            date: get_date(row, "data")?,
            weekday: row.try_get("dia_semana")?,
            time: get_time(row, "horario")?,
            leader: row.try_get("dirigente")?,
            created_at: get_opt_timestamp(row, "data_criacao")?,
        })
    }
}

impl Record for Assignment {
    const ENTITY: &'static str = "Assignment";
    const TABLE: &'static str = "designacoes";
    const COLUMNS: &'static [&'static str] = &[
        "territorio_id",
        "saida_campo_id",
        "data_designacao",
        "data_devolucao",
        "responsavel",
        "status",
    ];
    const VIEW: Option<&'static str> = Some(
        "SELECT d.*, t.nome AS territory_name, s.nome AS field_trip_name \
         FROM designacoes d \
         LEFT JOIN territorios t ON t.id = d.territorio_id \
         LEFT JOIN saidas_campo s ON s.id = d.saida_campo_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some("data_designacao DESC, id DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.territory_id),
            Value::Integer(self.field_trip_id),
            date_value(self.assigned_on),
            opt_date_value(self.due_on),
            Value::from(self.responsible.clone()),
            Value::from(self.status.as_str()),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            territory_id: row.try_get("territorio_id")?,
            field_trip_id: row.try_get("saida_campo_id")?,
            assigned_on: get_date(row, "data_designacao")?,
            due_on: get_opt_date(row, "data_devolucao")?,
            responsible: row.try_get("responsavel")?,
            status: get_code(row, "status")?,
            territory_name: get_joined(row, "territory_name")?,
            field_trip_name: get_joined(row, "field_trip_name")?,
        })
    }

    fn update_guard(&self) -> Option<UpdateGuard> {
        completed_guard(self.status)
    }
}

impl Record for BuildingAssignment {
    const ENTITY: &'static str = "Building assignment";
    const TABLE: &'static str = "designacoes_predios_vilas";
    const COLUMNS: &'static [&'static str] = &[
        "imovel_id",
        "responsavel",
        "saida_campo_id",
        "data_designacao",
        "data_devolucao",
        "status",
    ];
    const VIEW: Option<&'static str> = Some(
        "SELECT d.*, i.numero AS property_number, i.nome AS property_name, \
                i.tipo AS property_kind, s.nome AS field_trip_name, \
                r.nome AS street_name, t.nome AS territory_name \
         FROM designacoes_predios_vilas d \
         LEFT JOIN imoveis i ON i.id = d.imovel_id \
         LEFT JOIN ruas r ON r.id = i.rua_id \
         LEFT JOIN territorios t ON t.id = r.territorio_id \
         LEFT JOIN saidas_campo s ON s.id = d.saida_campo_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some("data_designacao DESC, id DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.property_id),
            Value::from(&self.responsible),
            Value::from(self.field_trip_id),
            date_value(self.assigned_on),
            opt_date_value(self.due_on),
            Value::from(self.status.as_str()),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            property_id: row.try_get("imovel_id")?,
            responsible: row.try_get("responsavel")?,
            field_trip_id: row.try_get("saida_campo_id")?,
            assigned_on: get_date(row, "data_designacao")?,
            due_on: get_opt_date(row, "data_devolucao")?,
            status: get_code(row, "status")?,
            property_number: get_joined(row, "property_number")?,
            property_name: get_joined(row, "property_name")?,
            property_kind: get_joined_code(row, "property_kind")?,
            field_trip_name: get_joined(row, "field_trip_name")?,
            street_name: get_joined(row, "street_name")?,
            territory_name: get_joined(row, "territory_name")?,
        })
    }

    fn update_guard(&self) -> Option<UpdateGuard> {
        completed_guard(self.status)
    }
}

impl Table<FieldTrip> {
    /// Trips on or after `today`, soonest first.
    pub async fn get_upcoming(&self, today: NaiveDate, limit: i64) -> StoreResult<Vec<FieldTrip>> {
        let sql = format!(
            "{} WHERE data >= ? ORDER BY data, horario LIMIT ?",
            FieldTrip::select_sql()
        );
        self.fetch(&sql, &[date_value(today), Value::Integer(limit)])
            .await
    }
}

const ACTIVE: &str = "status = 'ativo'";

/// Status only moves from active to completed.
fn completed_guard(status: AssignmentStatus) -> Option<UpdateGuard> {
    match status {
        AssignmentStatus::Active => Some(UpdateGuard {
            blocked_when: "status = 'concluido'",
            message: "A completed assignment cannot be reactivated".to_string(),
        }),
        AssignmentStatus::Completed => None,
    }
}

impl Table<Assignment> {
    pub async fn get_active(&self) -> StoreResult<Vec<Assignment>> {
        self.select_where(ACTIVE, "data_designacao DESC, id DESC", &[])
            .await
    }

    pub async fn get_by_territory(&self, territory_id: i64) -> StoreResult<Vec<Assignment>> {
        self.select_where(
            "territorio_id = ?",
            "data_designacao DESC, id DESC",
            &[Value::Integer(territory_id)],
        )
        .await
    }

    /// The most recent active assignment whose window covers `today`.
    pub async fn get_for_today(&self, today: NaiveDate) -> StoreResult<Option<Assignment>> {
        let sql = format!(
            "{} WHERE {ACTIVE} AND data_designacao <= ? \
             AND (data_devolucao IS NULL OR data_devolucao >= ?) \
             ORDER BY data_designacao DESC, id DESC LIMIT 1",
            Assignment::select_sql()
        );
        self.fetch_optional(&sql, &[date_value(today), date_value(today)])
            .await
    }

    /// Mark the assignment completed. Completing twice is a no-op.
    pub async fn complete(&self, id: i64) -> StoreResult<()> {
        complete_in(self.database(), Assignment::TABLE, Assignment::ENTITY, id).await
    }

    pub async fn statistics(&self) -> StoreResult<AssignmentStatistics> {
        assignment_statistics(
            self.database(),
            "designacoes",
            "SELECT t.nome AS label, COUNT(*) AS total FROM designacoes d \
             JOIN territorios t ON t.id = d.territorio_id \
             GROUP BY t.nome ORDER BY t.nome",
        )
        .await
    }
}

impl Table<BuildingAssignment> {
    pub async fn get_active(&self) -> StoreResult<Vec<BuildingAssignment>> {
        self.select_where(ACTIVE, "data_designacao DESC, id DESC", &[])
            .await
    }

    pub async fn get_active_for_property(
        &self,
        property_id: i64,
    ) -> StoreResult<Option<BuildingAssignment>> {
        let sql = format!(
            "{} WHERE {ACTIVE} AND imovel_id = ? ORDER BY data_designacao DESC, id DESC LIMIT 1",
            BuildingAssignment::select_sql()
        );
        self.fetch_optional(&sql, &[Value::Integer(property_id)])
            .await
    }

    /// Mark the assignment completed. Completing twice is a no-op.
    pub async fn complete(&self, id: i64) -> StoreResult<()> {
        complete_in(
            self.database(),
            BuildingAssignment::TABLE,
            BuildingAssignment::ENTITY,
            id,
        )
        .await
    }

    pub async fn statistics(&self) -> StoreResult<AssignmentStatistics> {
        assignment_statistics(
            self.database(),
            "designacoes_predios_vilas",
            "SELECT t.nome AS label, COUNT(*) AS total FROM designacoes_predios_vilas d \
             JOIN imoveis i ON i.id = d.imovel_id \
             JOIN ruas r ON r.id = i.rua_id \
             JOIN territorios t ON t.id = r.territorio_id \
             GROUP BY t.nome ORDER BY t.nome",
        )
        .await
    }
}

async fn complete_in(db: &Database, table: &str, entity: &'static str, id: i64) -> StoreResult<()> {
    let sql = format!("UPDATE {table} SET status = ? WHERE id = ?");
    let result = db
        .execute(&sql, &params![AssignmentStatus::Completed.as_str(), id])
        .await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound { entity, id });
    }
    tracing::info!(entity, id, "assignment completed");
    Ok(())
}

async fn assignment_statistics(
    db: &Database,
    table: &str,
    by_territory_sql: &str,
) -> StoreResult<AssignmentStatistics> {
    let active = db
        .fetch_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE {ACTIVE}"), &[])
        .await?;
    let completed = db
        .fetch_scalar(
            &format!("SELECT COUNT(*) FROM {table} WHERE status = 'concluido'"),
            &[],
        )
        .await?;
    let by_territory = grouped_counts(db, by_territory_sql).await?;
    let by_month = grouped_counts(
        db,
        &format!(
            "SELECT strftime('%Y-%m', data_designacao) AS label, COUNT(*) AS total \
             FROM {table} GROUP BY label ORDER BY label"
        ),
    )
    .await?;

    Ok(AssignmentStatistics {
        total: active + completed,
        active,
        completed,
        by_territory,
        by_month,
    })
}

/// Collect `label`/`total` rows into a map. NULL labels are skipped.
pub(crate) async fn grouped_counts(db: &Database, sql: &str) -> StoreResult<BTreeMap<String, i64>> {
    let rows = db.fetch_all(sql, &[]).await?;
    let mut counts = BTreeMap::new();
    for row in rows {
        let label: Option<String> = row.try_get("label")?;
        let total: i64 = row.try_get("total")?;
        if let Some(label) = label {
            counts.insert(label, total);
        }
    }
    Ok(counts)
}
